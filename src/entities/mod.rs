pub mod achievement_progress;
pub mod audit_logs;
pub mod box_open_records;
pub mod campaigns;
pub mod coupon_balances;
pub mod mystery_boxes;
pub mod prizes;
pub mod user_prizes;

pub use achievement_progress as achievement_progress_entity;
pub use audit_logs as audit_log_entity;
pub use box_open_records as box_open_record_entity;
pub use campaigns as campaign_entity;
pub use coupon_balances as coupon_balance_entity;
pub use mystery_boxes as mystery_box_entity;
pub use prizes as prize_entity;
pub use user_prizes as user_prize_entity;

pub use mystery_boxes::BoxStatus;
pub use prizes::{JACKPOT_TIER, PrizeType};
pub use user_prizes::ClaimStatus;
