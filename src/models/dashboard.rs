use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use utoipa::ToSchema;

use super::{CouponBalanceResponse, RoomInfo};

/// 门店统计快照 (由开盒记录计算)
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub total_boxes_opened: i64,
    /// 非“谢谢参与”类奖品数量
    pub total_prizes_won: i64,
    /// 截至今天连续有开盒的天数
    pub streak: i64,
    pub prizes_by_tier: BTreeMap<String, i64>,
    /// 百分比, 保留一位小数
    pub win_rate: f64,
    pub rooms_visited: i64,
    pub room_size: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AchievementStatusResponse {
    pub code: String,
    pub name: String,
    pub description: String,
    pub tier: String,
    pub requirement: i64,
    pub progress: i64,
    pub unlocked: bool,
    pub unlocked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub coupon_balance: CouponBalanceResponse,
    pub stats: StatsSnapshot,
    pub rooms: Vec<RoomInfo>,
    pub achievements: Vec<AchievementStatusResponse>,
}
