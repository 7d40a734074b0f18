use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 门店优惠券账户
/// 说明:
/// - total_earned: 累计获得 (由外部发券流程增加)
/// - total_used: 已使用 (仅开盒流程增加)
/// - 可用 = total_earned - total_used
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "coupon_balances")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub store_id: i64,
    pub campaign_id: i64,
    pub total_earned: i64,
    pub total_used: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn available(&self) -> i64 {
        self.total_earned - self.total_used
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
