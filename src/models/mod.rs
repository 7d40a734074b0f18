pub mod dashboard;
pub mod mystery_box;
pub mod pagination;
pub mod room;

pub use dashboard::*;
pub use mystery_box::*;
pub use pagination::*;
pub use room::*;
