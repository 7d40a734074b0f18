use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 大奖档位, 参与全活动节奏控制
pub const JACKPOT_TIER: &str = "S";

/// 奖品类型; NoPrize 为“谢谢参与”类安慰奖, 不计入中奖数
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "snake_case")]
pub enum PrizeType {
    #[sea_orm(string_value = "physical")]
    Physical,
    #[sea_orm(string_value = "voucher")]
    Voucher,
    #[sea_orm(string_value = "points")]
    Points,
    #[sea_orm(string_value = "none")]
    NoPrize,
}

impl std::fmt::Display for PrizeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrizeType::Physical => write!(f, "physical"),
            PrizeType::Voucher => write!(f, "voucher"),
            PrizeType::Points => write!(f, "points"),
            PrizeType::NoPrize => write!(f, "none"),
        }
    }
}

/// 奖品池实体
/// 说明:
/// - base_probability: 权重 (非负实数, 不要求归一)
/// - stock_remaining: 剩余库存, 只由开盒流程扣减, 单调不增
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "prizes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub campaign_id: i64,
    pub name: String,
    pub tier: String,
    pub prize_type: PrizeType,
    pub image_url: Option<String>,
    pub base_probability: f64,
    pub stock_total: i64,
    pub stock_remaining: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn is_jackpot(&self) -> bool {
        self.tier == JACKPOT_TIER
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
