use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::{
    ClaimStatus, PrizeType, box_open_record_entity as record_entity,
    coupon_balance_entity as balance_entity, prize_entity,
};

use super::PaginatedResponse;

/// 开盒记录查询参数
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct OpenHistoryQuery {
    /// 页码 (默认 1)
    pub page: Option<u32>,
    /// 每页数量 (默认 20, 最大 100)
    pub per_page: Option<u32>,
}

/// 门店优惠券余额
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CouponBalanceResponse {
    /// 累计获得
    pub total_earned: i64,
    /// 已使用
    pub total_used: i64,
    /// 可用 = 累计获得 - 已使用
    pub balance: i64,
}

impl From<balance_entity::Model> for CouponBalanceResponse {
    fn from(m: balance_entity::Model) -> Self {
        CouponBalanceResponse {
            total_earned: m.total_earned,
            total_used: m.total_used,
            balance: m.available(),
        }
    }
}

/// 开盒获得的奖品
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WonPrize {
    pub id: i64,
    pub name: String,
    pub tier: String,
    #[serde(rename = "type")]
    pub prize_type: PrizeType,
    pub image_url: Option<String>,
}

impl From<prize_entity::Model> for WonPrize {
    fn from(m: prize_entity::Model) -> Self {
        WonPrize {
            id: m.id,
            name: m.name,
            tier: m.tier,
            prize_type: m.prize_type,
            image_url: m.image_url,
        }
    }
}

/// 开盒响应
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OpenBoxResponse {
    pub prize: WonPrize,
    pub coupon_balance: CouponBalanceResponse,
}

/// 奖品展示信息
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrizeResponse {
    pub id: i64,
    pub name: String,
    pub tier: String,
    #[serde(rename = "type")]
    pub prize_type: PrizeType,
    pub image_url: Option<String>,
    pub stock_total: i64,
    pub stock_remaining: i64,
}

impl From<prize_entity::Model> for PrizeResponse {
    fn from(m: prize_entity::Model) -> Self {
        PrizeResponse {
            id: m.id,
            name: m.name,
            tier: m.tier,
            prize_type: m.prize_type,
            image_url: m.image_url,
            stock_total: m.stock_total,
            stock_remaining: m.stock_remaining,
        }
    }
}

/// 开盒历史
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OpenRecordResponse {
    pub id: i64,
    pub box_id: i64,
    pub box_number: i32,
    pub prize_id: i64,
    /// 奖品名称 (历史快照)
    pub prize_name: String,
    pub prize_tier: String,
    pub prize_type: PrizeType,
    /// 领奖状态 (无领奖记录时为空)
    pub claim_status: Option<ClaimStatus>,
    pub opened_at: DateTime<Utc>,
}

impl OpenRecordResponse {
    pub fn new(m: record_entity::Model, claim_status: Option<ClaimStatus>) -> Self {
        OpenRecordResponse {
            id: m.id,
            box_id: m.box_id,
            box_number: m.box_number,
            prize_id: m.prize_id,
            prize_name: m.prize_name,
            prize_tier: m.prize_tier,
            prize_type: m.prize_type,
            claim_status,
            opened_at: m.opened_at,
        }
    }
}

/// 开盒历史分页响应
pub type OpenHistoryPageResponse = PaginatedResponse<OpenRecordResponse>;
