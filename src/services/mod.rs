pub mod achievement_catalog;
pub mod achievement_service;
pub mod campaign_service;
pub mod coupon_service;
pub mod dashboard_service;
pub mod mystery_box_service;
pub mod prize_draw;
pub mod room_service;

pub use achievement_service::*;
pub use campaign_service::*;
pub use coupon_service::*;
pub use dashboard_service::*;
pub use mystery_box_service::*;
pub use room_service::*;
