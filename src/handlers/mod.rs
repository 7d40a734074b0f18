pub mod campaign;
pub mod dashboard;
pub mod mystery_box;
pub mod room;

pub use campaign::campaign_config;
pub use dashboard::dashboard_config;
pub use mystery_box::mystery_box_config;
pub use room::room_config;
