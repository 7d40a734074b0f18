use crate::entities::coupon_balance_entity as balances;
use crate::error::AppResult;
use crate::models::CouponBalanceResponse;
use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, FromQueryResult,
    QueryFilter, QuerySelect, Set,
};

#[derive(Clone)]
pub struct CouponService {
    pool: DatabaseConnection,
}

impl CouponService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// 获取门店在活动中的优惠券余额（不存在则初始化）
    pub async fn get_balance(
        &self,
        store_id: i64,
        campaign_id: i64,
    ) -> AppResult<CouponBalanceResponse> {
        let model = ensure_balance(&self.pool, store_id, campaign_id).await?;
        Ok(model.into())
    }
}

async fn find_balance<C: ConnectionTrait>(
    db: &C,
    store_id: i64,
    campaign_id: i64,
) -> Result<Option<balances::Model>, DbErr> {
    balances::Entity::find()
        .filter(balances::Column::StoreId.eq(store_id))
        .filter(balances::Column::CampaignId.eq(campaign_id))
        .one(db)
        .await
}

/// 读取账户, 不存在则以 earned = 0 创建
///
/// 并发创建时依赖 (store_id, campaign_id) 唯一索引, 冲突方不插入直接重新读取。
pub async fn ensure_balance<C: ConnectionTrait>(
    db: &C,
    store_id: i64,
    campaign_id: i64,
) -> Result<balances::Model, DbErr> {
    if let Some(m) = find_balance(db, store_id, campaign_id).await? {
        return Ok(m);
    }

    let now = Utc::now();
    balances::Entity::insert(balances::ActiveModel {
        store_id: Set(store_id),
        campaign_id: Set(campaign_id),
        total_earned: Set(0),
        total_used: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    })
    .on_conflict(
        OnConflict::columns([balances::Column::StoreId, balances::Column::CampaignId])
            .do_nothing()
            .to_owned(),
    )
    .exec_without_returning(db)
    .await?;

    find_balance(db, store_id, campaign_id)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound("coupon balance".into()))
}

/// 整个活动剩余可兑换次数 Σ(earned - used)，覆盖所有门店
pub async fn campaign_remaining_redemptions<C: ConnectionTrait>(
    db: &C,
    campaign_id: i64,
) -> Result<i64, DbErr> {
    #[derive(Debug, FromQueryResult)]
    struct RemainingRow {
        remaining: i64,
    }

    let remaining = balances::Entity::find()
        .select_only()
        .column_as(
            Expr::cust("CAST(COALESCE(SUM(total_earned - total_used), 0) AS BIGINT)"),
            "remaining",
        )
        .filter(balances::Column::CampaignId.eq(campaign_id))
        .into_model::<RemainingRow>()
        .one(db)
        .await?
        .map(|r| r.remaining)
        .unwrap_or(0);

    Ok(remaining)
}
