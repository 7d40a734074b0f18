use crate::entities::{
    BoxStatus, ClaimStatus, box_open_record_entity as records,
    coupon_balance_entity as balances, mystery_box_entity as boxes, prize_entity as prizes,
    user_prize_entity as user_prizes,
};
use crate::error::{AppError, AppResult};
use crate::external::{AuditEntry, AuditSink};
use crate::models::{
    OpenBoxResponse, OpenHistoryPageResponse, OpenHistoryQuery, OpenRecordResponse,
    PaginatedResponse, PaginationParams,
};
use crate::services::prize_draw::{self, RngSource, UnitSource};
use crate::services::{CampaignService, RoomService, coupon_service};
use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    IsolationLevel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use std::collections::HashMap;
use std::sync::Arc;

/// 一次成功开盒的结果
#[derive(Debug, Clone)]
pub struct Allocation {
    pub record: records::Model,
    pub prize: prizes::Model,
    /// 扣减后的账户
    pub balance: balances::Model,
}

#[derive(Clone)]
pub struct MysteryBoxService {
    pool: DatabaseConnection,
    campaign_service: CampaignService,
    room_service: RoomService,
    audit_sink: Arc<dyn AuditSink>,
    serializable: bool,
}

impl MysteryBoxService {
    pub fn new(
        pool: DatabaseConnection,
        campaign_service: CampaignService,
        room_service: RoomService,
        audit_sink: Arc<dyn AuditSink>,
        serializable: bool,
    ) -> Self {
        Self {
            pool,
            campaign_service,
            room_service,
            audit_sink,
            serializable,
        }
    }

    /// 开盒 (OpenBox)
    ///
    /// 前置检查（事务外）:
    /// 1. 活动存在、启用且在时间窗口内
    /// 2. 盒子所在房间已解锁
    ///
    /// 之后在单个事务内完成抽奖、扣库存、开盒、扣券、写记录, 任何一步失败整体回滚。
    pub async fn open_box(
        &self,
        store_id: i64,
        campaign_id: i64,
        box_id: i64,
    ) -> AppResult<OpenBoxResponse> {
        let mut source = RngSource(StdRng::from_entropy());
        self.open_box_with(store_id, campaign_id, box_id, &mut source)
            .await
    }

    /// 同 [`open_box`](Self::open_box), 随机数来源由调用方提供
    pub async fn open_box_with<S: UnitSource + Send>(
        &self,
        store_id: i64,
        campaign_id: i64,
        box_id: i64,
        source: &mut S,
    ) -> AppResult<OpenBoxResponse> {
        let campaign = self
            .campaign_service
            .ensure_active(campaign_id, Utc::now())
            .await?;
        self.room_service
            .ensure_box_accessible(&campaign, box_id)
            .await?;

        let allocation = self.allocate(store_id, campaign.id, box_id, source).await?;

        log::info!(
            "Box opened: store={} campaign={} box={} prize={} tier={}",
            store_id,
            campaign.id,
            box_id,
            allocation.prize.id,
            allocation.prize.tier
        );

        self.spawn_audit(AuditEntry::box_open(
            store_id,
            campaign.id,
            box_id,
            &allocation.prize,
            allocation.record.opened_at,
        ));

        Ok(OpenBoxResponse {
            prize: allocation.prize.into(),
            coupon_balance: allocation.balance.into(),
        })
    }

    /// 开盒事务本体
    ///
    /// 逻辑:
    /// 1. 读取盒子, 不存在 / 已开启直接失败
    /// 2. 读取（或创建）优惠券账户, 可用 <= 0 失败
    /// 3. 读取有库存的启用奖品
    /// 4. 按大奖节奏 + 权重抽取一个奖品
    /// 5. 条件扣减库存 (where stock_remaining > 0)
    /// 6. 条件开盒 (where status != opened)
    /// 7. 条件扣券 (where total_used = 第 2 步读到的值)
    /// 8. 写开盒记录与领奖记录
    ///
    /// 5-7 任一条件更新影响 0 行即说明并发请求已抢先, 返回错误, 事务随 drop 回滚。
    pub async fn allocate<S: UnitSource + Send>(
        &self,
        store_id: i64,
        campaign_id: i64,
        box_id: i64,
        source: &mut S,
    ) -> AppResult<Allocation> {
        let txn = self.begin().await?;
        let draft = prepare_allocation(&txn, store_id, campaign_id, box_id, source).await?;
        apply_allocation(txn, store_id, campaign_id, draft, Utc::now()).await
    }

    /// 分页获取门店在活动中的开盒记录（倒序）
    pub async fn list_history(
        &self,
        store_id: i64,
        campaign_id: i64,
        query: &OpenHistoryQuery,
    ) -> AppResult<OpenHistoryPageResponse> {
        let params = PaginationParams::new(query.page, query.per_page);

        let base_query = records::Entity::find()
            .filter(records::Column::StoreId.eq(store_id))
            .filter(records::Column::CampaignId.eq(campaign_id));

        let total = base_query.clone().count(&self.pool).await? as i64;

        let items_models = base_query
            .order_by_desc(records::Column::OpenedAt)
            .order_by_desc(records::Column::Id)
            .limit(params.get_limit() as u64)
            .offset(params.get_offset() as u64)
            .all(&self.pool)
            .await?;

        let record_ids: Vec<i64> = items_models.iter().map(|r| r.id).collect();
        let claims: HashMap<i64, ClaimStatus> = user_prizes::Entity::find()
            .filter(user_prizes::Column::OpenRecordId.is_in(record_ids))
            .all(&self.pool)
            .await?
            .into_iter()
            .map(|up| (up.open_record_id, up.claim_status))
            .collect();

        let items = items_models
            .into_iter()
            .map(|m| {
                let status = claims.get(&m.id).copied();
                OpenRecordResponse::new(m, status)
            })
            .collect();

        Ok(PaginatedResponse::new(
            items,
            params.get_page(),
            params.get_limit(),
            total,
        ))
    }

    async fn begin(&self) -> Result<DatabaseTransaction, DbErr> {
        if self.serializable {
            self.pool
                .begin_with_config(Some(IsolationLevel::Serializable), None)
                .await
        } else {
            self.pool.begin().await
        }
    }

    fn spawn_audit(&self, entry: AuditEntry) {
        let sink = self.audit_sink.clone();
        tokio::spawn(async move {
            let entity_id = entry.entity_id;
            if let Err(e) = sink.append(entry).await {
                log::warn!("Failed to append audit entry for box {entity_id}: {e}");
            }
        });
    }
}

/// 事务内读取阶段 (1-4) 的结果
struct Draft {
    target: boxes::Model,
    balance: balances::Model,
    prize: prizes::Model,
}

async fn prepare_allocation<S: UnitSource + Send>(
    txn: &DatabaseTransaction,
    store_id: i64,
    campaign_id: i64,
    box_id: i64,
    source: &mut S,
) -> AppResult<Draft> {
    let target = boxes::Entity::find_by_id(box_id)
        .filter(boxes::Column::CampaignId.eq(campaign_id))
        .one(txn)
        .await?
        .ok_or(AppError::BoxNotFound)?;
    if target.is_opened() {
        return Err(AppError::BoxAlreadyOpened);
    }

    let balance = coupon_service::ensure_balance(txn, store_id, campaign_id).await?;
    if balance.available() <= 0 {
        return Err(AppError::NoCouponsLeft);
    }

    let available = prizes::Entity::find()
        .filter(prizes::Column::CampaignId.eq(campaign_id))
        .filter(prizes::Column::IsActive.eq(true))
        .filter(prizes::Column::StockRemaining.gt(0))
        .order_by_asc(prizes::Column::Id)
        .all(txn)
        .await?;
    if available.is_empty() {
        return Err(AppError::NoPrizesAvailable);
    }

    // 与后续写操作在同一事务内读取, 保证节奏计算与扣减一致
    let remaining_redemptions =
        coupon_service::campaign_remaining_redemptions(txn, campaign_id).await?;
    let prize = prize_draw::draw_prize(source, &available, remaining_redemptions)?.clone();

    Ok(Draft {
        target,
        balance,
        prize,
    })
}

/// 条件更新 (5-7) + 写记录 (8) + 提交; 任一条件更新落空时事务随 drop 回滚
async fn apply_allocation(
    txn: DatabaseTransaction,
    store_id: i64,
    campaign_id: i64,
    draft: Draft,
    now: DateTime<Utc>,
) -> AppResult<Allocation> {
    let Draft {
        target,
        balance,
        mut prize,
    } = draft;
    let box_id = target.id;

    if !decrement_stock(&txn, prize.id, now).await? {
        log::warn!(
            "Lost stock race on prize {} (store={store_id}, box={box_id})",
            prize.id
        );
        return Err(AppError::PrizeSelectionFailed(format!(
            "prize {} ran out of stock",
            prize.id
        )));
    }
    prize.stock_remaining -= 1;

    if !mark_box_opened(&txn, box_id, store_id, now).await? {
        log::warn!("Lost box race on box {box_id} (store={store_id})");
        return Err(AppError::BoxAlreadyOpened);
    }

    if !debit_coupon(&txn, balance.id, balance.total_used, now).await? {
        log::warn!("Lost ledger race on balance {} (store={store_id})", balance.id);
        return Err(AppError::NoCouponsLeft);
    }

    let record = records::ActiveModel {
        store_id: Set(store_id),
        campaign_id: Set(campaign_id),
        box_id: Set(box_id),
        box_number: Set(target.box_number),
        prize_id: Set(prize.id),
        prize_name: Set(prize.name.clone()),
        prize_tier: Set(prize.tier.clone()),
        prize_type: Set(prize.prize_type),
        opened_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    user_prizes::ActiveModel {
        store_id: Set(store_id),
        campaign_id: Set(campaign_id),
        open_record_id: Set(record.id),
        prize_id: Set(prize.id),
        claim_status: Set(ClaimStatus::Unclaimed),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    let balance = balances::Model {
        total_used: balance.total_used + 1,
        updated_at: now,
        ..balance
    };

    Ok(Allocation {
        record,
        prize,
        balance,
    })
}

/// 条件扣减库存, 仅当 stock_remaining > 0 时生效
async fn decrement_stock(
    txn: &DatabaseTransaction,
    prize_id: i64,
    now: DateTime<Utc>,
) -> Result<bool, DbErr> {
    let res = prizes::Entity::update_many()
        .col_expr(
            prizes::Column::StockRemaining,
            Expr::col(prizes::Column::StockRemaining).sub(1),
        )
        .col_expr(prizes::Column::UpdatedAt, Expr::value(now))
        .filter(prizes::Column::Id.eq(prize_id))
        .filter(prizes::Column::StockRemaining.gt(0))
        .exec(txn)
        .await?;
    Ok(res.rows_affected == 1)
}

/// 条件开盒, 仅当盒子尚未开启时生效
async fn mark_box_opened(
    txn: &DatabaseTransaction,
    box_id: i64,
    store_id: i64,
    now: DateTime<Utc>,
) -> Result<bool, DbErr> {
    let res = boxes::Entity::update_many()
        .set(boxes::ActiveModel {
            status: Set(BoxStatus::Opened),
            opened_by: Set(Some(store_id)),
            opened_at: Set(Some(now)),
            ..Default::default()
        })
        .filter(boxes::Column::Id.eq(box_id))
        .filter(boxes::Column::Status.ne(BoxStatus::Opened))
        .exec(txn)
        .await?;
    Ok(res.rows_affected == 1)
}

/// 条件扣券 (乐观锁): 仅当 total_used 仍等于之前读取的值时 +1
async fn debit_coupon(
    txn: &DatabaseTransaction,
    balance_id: i64,
    read_used: i64,
    now: DateTime<Utc>,
) -> Result<bool, DbErr> {
    let res = balances::Entity::update_many()
        .col_expr(
            balances::Column::TotalUsed,
            Expr::col(balances::Column::TotalUsed).add(1),
        )
        .col_expr(balances::Column::UpdatedAt, Expr::value(now))
        .filter(balances::Column::Id.eq(balance_id))
        .filter(balances::Column::TotalUsed.eq(read_used))
        .exec(txn)
        .await?;
    Ok(res.rows_affected == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::DbAuditSink;
    use crate::test_support::{
        ChannelAuditSink, FailingAuditSink, TestDb, grant_coupons, mark_opened, seed_boxes,
        seed_campaign, seed_campaign_with, seed_prize, seed_room_campaign,
    };
    use chrono::Duration;
    use std::collections::HashSet;

    fn service(db: &TestDb, sink: Arc<dyn AuditSink>) -> MysteryBoxService {
        let campaign_service = CampaignService::new(db.conn.clone());
        let room_service = RoomService::new(db.conn.clone(), campaign_service.clone(), 100);
        MysteryBoxService::new(db.conn.clone(), campaign_service, room_service, sink, false)
    }

    fn db_service(db: &TestDb) -> MysteryBoxService {
        service(db, Arc::new(DbAuditSink::new(db.conn.clone())))
    }

    async fn prize_stock(db: &TestDb, id: i64) -> i64 {
        prizes::Entity::find_by_id(id)
            .one(&db.conn)
            .await
            .unwrap()
            .unwrap()
            .stock_remaining
    }

    async fn balance_of(db: &TestDb, store_id: i64, campaign_id: i64) -> balances::Model {
        coupon_service::ensure_balance(&db.conn, store_id, campaign_id)
            .await
            .unwrap()
    }

    async fn record_count(db: &TestDb) -> u64 {
        records::Entity::find().count(&db.conn).await.unwrap()
    }

    #[tokio::test]
    async fn test_open_box_success_updates_everything() {
        let db = TestDb::new().await;
        let campaign = seed_campaign(&db.conn).await;
        let boxes = seed_boxes(&db.conn, campaign.id, 3).await;
        let prize = seed_prize(&db.conn, campaign.id, "Headphones", "A", 10.0, 5).await;
        grant_coupons(&db.conn, 1, campaign.id, 3, 0).await;

        let svc = db_service(&db);
        let resp = svc.open_box(1, campaign.id, boxes[0].id).await.unwrap();

        assert_eq!(resp.prize.id, prize.id);
        assert_eq!(resp.prize.tier, "A");
        assert_eq!(resp.coupon_balance.total_earned, 3);
        assert_eq!(resp.coupon_balance.total_used, 1);
        assert_eq!(resp.coupon_balance.balance, 2);

        assert_eq!(prize_stock(&db, prize.id).await, 4);
        let opened = boxes::Entity::find_by_id(boxes[0].id)
            .one(&db.conn)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(opened.status, BoxStatus::Opened);
        assert_eq!(opened.opened_by, Some(1));
        assert_eq!(balance_of(&db, 1, campaign.id).await.total_used, 1);

        let recs = records::Entity::find().all(&db.conn).await.unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].box_number, boxes[0].box_number);
        let claims = user_prizes::Entity::find().all(&db.conn).await.unwrap();
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].open_record_id, recs[0].id);
        assert_eq!(claims[0].claim_status, ClaimStatus::Unclaimed);
    }

    #[tokio::test]
    async fn test_no_coupons_left_mutates_nothing() {
        let db = TestDb::new().await;
        let campaign = seed_campaign(&db.conn).await;
        let boxes = seed_boxes(&db.conn, campaign.id, 1).await;
        let prize = seed_prize(&db.conn, campaign.id, "Headphones", "A", 10.0, 5).await;
        grant_coupons(&db.conn, 1, campaign.id, 5, 5).await;

        let svc = db_service(&db);
        let err = svc.open_box(1, campaign.id, boxes[0].id).await.unwrap_err();
        assert!(matches!(err, AppError::NoCouponsLeft));

        assert_eq!(prize_stock(&db, prize.id).await, 5);
        assert_eq!(balance_of(&db, 1, campaign.id).await.total_used, 5);
        assert_eq!(record_count(&db).await, 0);
        let b = boxes::Entity::find_by_id(boxes[0].id)
            .one(&db.conn)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(b.status, BoxStatus::Available);
    }

    #[tokio::test]
    async fn test_store_without_balance_row_gets_no_coupons_left() {
        let db = TestDb::new().await;
        let campaign = seed_campaign(&db.conn).await;
        let boxes = seed_boxes(&db.conn, campaign.id, 1).await;
        seed_prize(&db.conn, campaign.id, "Headphones", "A", 10.0, 5).await;

        let svc = db_service(&db);
        assert!(matches!(
            svc.open_box(99, campaign.id, boxes[0].id).await,
            Err(AppError::NoCouponsLeft)
        ));
    }

    #[tokio::test]
    async fn test_already_opened_box_fails_before_any_mutation() {
        let db = TestDb::new().await;
        let campaign = seed_campaign(&db.conn).await;
        let boxes = seed_boxes(&db.conn, campaign.id, 1).await;
        let prize = seed_prize(&db.conn, campaign.id, "Headphones", "A", 10.0, 5).await;
        grant_coupons(&db.conn, 1, campaign.id, 2, 0).await;
        mark_opened(&db.conn, boxes[0].id, 2).await;

        let svc = db_service(&db);
        assert!(matches!(
            svc.open_box(1, campaign.id, boxes[0].id).await,
            Err(AppError::BoxAlreadyOpened)
        ));
        assert_eq!(prize_stock(&db, prize.id).await, 5);
        assert_eq!(balance_of(&db, 1, campaign.id).await.total_used, 0);
    }

    #[tokio::test]
    async fn test_precondition_failures() {
        let db = TestDb::new().await;
        let now = Utc::now();
        let inactive = seed_campaign_with(
            &db.conn,
            false,
            now - Duration::days(1),
            now + Duration::days(1),
            None,
        )
        .await;
        let inactive_boxes = seed_boxes(&db.conn, inactive.id, 1).await;
        let svc = db_service(&db);
        assert!(matches!(
            svc.open_box(1, inactive.id, inactive_boxes[0].id).await,
            Err(AppError::CampaignInactive)
        ));

        let campaign = seed_campaign(&db.conn).await;
        grant_coupons(&db.conn, 1, campaign.id, 2, 0).await;
        assert!(matches!(
            svc.open_box(1, campaign.id, 12_345).await,
            Err(AppError::BoxNotFound)
        ));
        // 其他活动的盒子
        assert!(matches!(
            svc.open_box(1, campaign.id, inactive_boxes[0].id).await,
            Err(AppError::BoxNotFound)
        ));

        let boxes = seed_boxes(&db.conn, campaign.id, 1).await;
        assert!(matches!(
            svc.open_box(1, campaign.id, boxes[0].id).await,
            Err(AppError::NoPrizesAvailable)
        ));
        assert_eq!(balance_of(&db, 1, campaign.id).await.total_used, 0);
    }

    #[tokio::test]
    async fn test_sold_out_and_inactive_prizes_are_not_drawn() {
        let db = TestDb::new().await;
        let campaign = seed_campaign(&db.conn).await;
        let boxes = seed_boxes(&db.conn, campaign.id, 1).await;
        seed_prize(&db.conn, campaign.id, "Sold out", "A", 1_000.0, 0).await;
        let inactive = seed_prize(&db.conn, campaign.id, "Retired", "A", 1_000.0, 5).await;
        let mut am: prizes::ActiveModel = inactive.into();
        am.is_active = Set(false);
        am.update(&db.conn).await.unwrap();
        let sticker = seed_prize(&db.conn, campaign.id, "Sticker", "C", 1.0, 5).await;
        grant_coupons(&db.conn, 1, campaign.id, 1, 0).await;

        let resp = db_service(&db)
            .open_box(1, campaign.id, boxes[0].id)
            .await
            .unwrap();
        assert_eq!(resp.prize.id, sticker.id);
    }

    #[tokio::test]
    async fn test_misconfigured_weights_fail_and_roll_back() {
        let db = TestDb::new().await;
        let campaign = seed_campaign(&db.conn).await;
        let boxes = seed_boxes(&db.conn, campaign.id, 1).await;
        let prize = seed_prize(&db.conn, campaign.id, "Zero", "A", 0.0, 5).await;
        grant_coupons(&db.conn, 1, campaign.id, 1, 0).await;

        let err = db_service(&db)
            .open_box(1, campaign.id, boxes[0].id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PrizeSelectionFailed(_)));
        assert_eq!(prize_stock(&db, prize.id).await, 5);
        assert_eq!(balance_of(&db, 1, campaign.id).await.total_used, 0);
    }

    #[tokio::test]
    async fn test_locked_room_rejected() {
        let db = TestDb::new().await;
        let campaign = seed_room_campaign(&db.conn, 2, Some(1)).await;
        let boxes = seed_boxes(&db.conn, campaign.id, 4).await;
        seed_prize(&db.conn, campaign.id, "Sticker", "C", 1.0, 10).await;
        grant_coupons(&db.conn, 1, campaign.id, 4, 0).await;
        let svc = db_service(&db);

        assert!(matches!(
            svc.open_box(1, campaign.id, boxes[2].id).await,
            Err(AppError::RoomLocked)
        ));
        svc.open_box(1, campaign.id, boxes[0].id).await.unwrap();
        svc.open_box(1, campaign.id, boxes[2].id).await.unwrap();
    }

    #[tokio::test]
    async fn test_stale_stock_read_loses_race() {
        let db = TestDb::new().await;
        let campaign = seed_campaign(&db.conn).await;
        let prize = seed_prize(&db.conn, campaign.id, "Last one", "A", 1.0, 1).await;
        let now = Utc::now();

        let txn = db.conn.begin().await.unwrap();
        assert!(decrement_stock(&txn, prize.id, now).await.unwrap());
        // 同一快照再次扣减: 库存已为 0
        assert!(!decrement_stock(&txn, prize.id, now).await.unwrap());
        txn.commit().await.unwrap();
        assert_eq!(prize_stock(&db, prize.id).await, 0);
    }

    #[tokio::test]
    async fn test_stale_box_and_ledger_reads_lose_race() {
        let db = TestDb::new().await;
        let campaign = seed_campaign(&db.conn).await;
        let boxes = seed_boxes(&db.conn, campaign.id, 1).await;
        let balance = grant_coupons(&db.conn, 1, campaign.id, 5, 0).await;
        let now = Utc::now();

        let txn = db.conn.begin().await.unwrap();
        assert!(mark_box_opened(&txn, boxes[0].id, 1, now).await.unwrap());
        assert!(!mark_box_opened(&txn, boxes[0].id, 2, now).await.unwrap());

        assert!(debit_coupon(&txn, balance.id, 0, now).await.unwrap());
        // 读到的 used = 0 已过期, 即使余额仍为正也失败
        assert!(!debit_coupon(&txn, balance.id, 0, now).await.unwrap());
        txn.commit().await.unwrap();

        let after = balance_of(&db, 1, campaign.id).await;
        assert_eq!(after.total_used, 1);
        let b = boxes::Entity::find_by_id(boxes[0].id)
            .one(&db.conn)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(b.opened_by, Some(1));
    }

    #[tokio::test]
    async fn test_rollback_undoes_partial_writes() {
        let db = TestDb::new().await;
        let campaign = seed_campaign(&db.conn).await;
        let boxes = seed_boxes(&db.conn, campaign.id, 1).await;
        let prize = seed_prize(&db.conn, campaign.id, "Headphones", "A", 1.0, 3).await;
        let now = Utc::now();

        {
            let txn = db.conn.begin().await.unwrap();
            assert!(decrement_stock(&txn, prize.id, now).await.unwrap());
            assert!(mark_box_opened(&txn, boxes[0].id, 1, now).await.unwrap());
            txn.rollback().await.unwrap();
        }

        assert_eq!(prize_stock(&db, prize.id).await, 3);
        let b = boxes::Entity::find_by_id(boxes[0].id)
            .one(&db.conn)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(b.status, BoxStatus::Available);
    }

    /// 在读阶段之后、条件更新之前抢先提交的另一个请求
    #[derive(Debug, Clone, Copy)]
    enum Rival {
        TakesLastUnit,
        OpensBox,
        SpendsCoupon,
    }

    /// 读完之后由 rival 在同一事务内改写对应行, 再执行条件更新
    async fn allocate_against(rival: Rival) -> AppError {
        let db = TestDb::new().await;
        let campaign = seed_campaign(&db.conn).await;
        let boxes = seed_boxes(&db.conn, campaign.id, 1).await;
        let prize = seed_prize(&db.conn, campaign.id, "Last one", "A", 1.0, 1).await;
        let balance = grant_coupons(&db.conn, 1, campaign.id, 3, 0).await;
        let now = Utc::now();

        let txn = db.conn.begin().await.unwrap();
        let mut source = RngSource(StdRng::seed_from_u64(7));
        let draft = prepare_allocation(&txn, 1, campaign.id, boxes[0].id, &mut source)
            .await
            .unwrap();
        assert_eq!(draft.prize.id, prize.id);

        match rival {
            Rival::TakesLastUnit => assert!(decrement_stock(&txn, prize.id, now).await.unwrap()),
            Rival::OpensBox => assert!(mark_box_opened(&txn, boxes[0].id, 2, now).await.unwrap()),
            Rival::SpendsCoupon => assert!(debit_coupon(&txn, balance.id, 0, now).await.unwrap()),
        }

        let err = apply_allocation(txn, 1, campaign.id, draft, now)
            .await
            .unwrap_err();

        // 整个事务回滚: 已成功的条件更新一并撤销
        assert_eq!(prize_stock(&db, prize.id).await, 1, "{rival:?}");
        let b = boxes::Entity::find_by_id(boxes[0].id)
            .one(&db.conn)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(b.status, BoxStatus::Available, "{rival:?}");
        assert_eq!(b.opened_by, None, "{rival:?}");
        assert_eq!(balance_of(&db, 1, campaign.id).await.total_used, 0, "{rival:?}");
        assert_eq!(record_count(&db).await, 0, "{rival:?}");
        assert_eq!(user_prizes::Entity::find().count(&db.conn).await.unwrap(), 0);
        err
    }

    #[tokio::test]
    async fn test_lost_stock_guard_fails_with_selection_error() {
        let err = allocate_against(Rival::TakesLastUnit).await;
        assert!(matches!(err, AppError::PrizeSelectionFailed(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_lost_box_guard_rolls_back_stock() {
        let err = allocate_against(Rival::OpensBox).await;
        assert!(matches!(err, AppError::BoxAlreadyOpened));
    }

    #[tokio::test]
    async fn test_lost_ledger_guard_rolls_back_stock_and_box() {
        let err = allocate_against(Rival::SpendsCoupon).await;
        assert!(matches!(err, AppError::NoCouponsLeft));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_opens_of_same_box_have_one_winner() {
        let db = TestDb::new().await;
        let campaign = seed_campaign(&db.conn).await;
        let boxes = seed_boxes(&db.conn, campaign.id, 1).await;
        seed_prize(&db.conn, campaign.id, "Sticker", "C", 1.0, 100).await;
        for store in 1..=20 {
            grant_coupons(&db.conn, store, campaign.id, 1, 0).await;
        }
        let svc = db_service(&db);

        let mut handles = Vec::new();
        for store in 1..=20 {
            let svc = svc.clone();
            let box_id = boxes[0].id;
            let campaign_id = campaign.id;
            handles.push(tokio::spawn(async move {
                svc.open_box(store, campaign_id, box_id).await
            }));
        }

        let mut ok = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(_) => ok += 1,
                Err(AppError::BoxAlreadyOpened) => {}
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(record_count(&db).await, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_last_unit_has_exactly_one_winner() {
        let db = TestDb::new().await;
        let campaign = seed_campaign(&db.conn).await;
        let boxes = seed_boxes(&db.conn, campaign.id, 100).await;
        let prize = seed_prize(&db.conn, campaign.id, "Scooter", "A", 1.0, 1).await;
        for store in 1..=100 {
            grant_coupons(&db.conn, store, campaign.id, 1, 0).await;
        }
        let svc = db_service(&db);

        let mut handles = Vec::new();
        for (i, b) in boxes.iter().enumerate() {
            let svc = svc.clone();
            let box_id = b.id;
            let campaign_id = campaign.id;
            let store = i as i64 + 1;
            handles.push(tokio::spawn(async move {
                svc.open_box(store, campaign_id, box_id).await
            }));
        }

        let mut winners = Vec::new();
        for h in handles {
            match h.await.unwrap() {
                Ok(resp) => winners.push(resp.prize.id),
                Err(AppError::NoPrizesAvailable) | Err(AppError::PrizeSelectionFailed(_)) => {}
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(winners, vec![prize.id]);
        assert_eq!(prize_stock(&db, prize.id).await, 0);
        assert_eq!(record_count(&db).await, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_stock_and_ledger_invariants_under_load() {
        let db = TestDb::new().await;
        let campaign = seed_campaign(&db.conn).await;
        let boxes = seed_boxes(&db.conn, campaign.id, 60).await;
        let a = seed_prize(&db.conn, campaign.id, "Mug", "A", 3.0, 10).await;
        let b = seed_prize(&db.conn, campaign.id, "Pen", "B", 5.0, 15).await;
        let c = seed_prize(&db.conn, campaign.id, "Sticker", "C", 8.0, 20).await;
        // 3 家门店各 10 张券, 共抢 60 个盒子
        for store in 1..=3 {
            grant_coupons(&db.conn, store, campaign.id, 10, 0).await;
        }
        let svc = db_service(&db);

        let mut handles = Vec::new();
        for (i, bx) in boxes.iter().enumerate() {
            let svc = svc.clone();
            let box_id = bx.id;
            let campaign_id = campaign.id;
            let store = (i % 3) as i64 + 1;
            handles.push(tokio::spawn(async move {
                svc.open_box(store, campaign_id, box_id).await
            }));
        }
        let mut successes = 0;
        for h in handles {
            if h.await.unwrap().is_ok() {
                successes += 1;
            }
        }
        assert_eq!(successes, 30);

        let recs = records::Entity::find().all(&db.conn).await.unwrap();
        assert_eq!(recs.len(), 30);
        let distinct_boxes: HashSet<i64> = recs.iter().map(|r| r.box_id).collect();
        assert_eq!(distinct_boxes.len(), recs.len());

        for p in [&a, &b, &c] {
            let won = recs.iter().filter(|r| r.prize_id == p.id).count() as i64;
            let remaining = prize_stock(&db, p.id).await;
            assert!(remaining >= 0);
            assert_eq!(remaining, p.stock_total - won);
        }

        for store in 1..=3 {
            let bal = balance_of(&db, store, campaign.id).await;
            let opens = recs.iter().filter(|r| r.store_id == store).count() as i64;
            assert!(bal.total_used <= opens);
            assert!(bal.available() >= 0);
            assert_eq!(bal.total_used, 10);
        }
    }

    #[tokio::test]
    async fn test_audit_entry_appended_after_commit() {
        let db = TestDb::new().await;
        let campaign = seed_campaign(&db.conn).await;
        let boxes = seed_boxes(&db.conn, campaign.id, 1).await;
        let prize = seed_prize(&db.conn, campaign.id, "Scooter", "S", 1.0, 1).await;
        grant_coupons(&db.conn, 5, campaign.id, 1, 0).await;

        let (sink, mut rx) = ChannelAuditSink::new();
        let svc = service(&db, Arc::new(sink));
        svc.open_box(5, campaign.id, boxes[0].id).await.unwrap();

        let entry = tokio::time::timeout(std::time::Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.action, "BOX_OPEN");
        assert_eq!(entry.actor_id, 5);
        assert_eq!(entry.entity_id, boxes[0].id);
        assert_eq!(entry.campaign_id, Some(campaign.id));
        assert_eq!(entry.details["prizeId"], prize.id);
        assert_eq!(entry.details["prizeTier"], "S");
    }

    #[tokio::test]
    async fn test_failing_audit_sink_does_not_fail_open() {
        let db = TestDb::new().await;
        let campaign = seed_campaign(&db.conn).await;
        let boxes = seed_boxes(&db.conn, campaign.id, 1).await;
        seed_prize(&db.conn, campaign.id, "Sticker", "C", 1.0, 1).await;
        grant_coupons(&db.conn, 1, campaign.id, 1, 0).await;

        let svc = service(&db, Arc::new(FailingAuditSink));
        assert!(svc.open_box(1, campaign.id, boxes[0].id).await.is_ok());
        assert_eq!(record_count(&db).await, 1);
    }

    #[tokio::test]
    async fn test_history_is_paginated_newest_first() {
        let db = TestDb::new().await;
        let campaign = seed_campaign(&db.conn).await;
        let boxes = seed_boxes(&db.conn, campaign.id, 3).await;
        seed_prize(&db.conn, campaign.id, "Sticker", "C", 1.0, 10).await;
        grant_coupons(&db.conn, 1, campaign.id, 3, 0).await;
        let svc = db_service(&db);
        for b in &boxes {
            svc.open_box(1, campaign.id, b.id).await.unwrap();
        }

        let page = svc
            .list_history(
                1,
                campaign.id,
                &OpenHistoryQuery {
                    page: Some(1),
                    per_page: Some(2),
                },
            )
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.data.len(), 2);
        assert_eq!(page.data[0].box_id, boxes[2].id);
        assert_eq!(page.data[0].claim_status, Some(ClaimStatus::Unclaimed));

        let other_store = svc
            .list_history(
                2,
                campaign.id,
                &OpenHistoryQuery {
                    page: None,
                    per_page: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(other_store.total, 0);
    }

    #[tokio::test]
    async fn test_pacing_reads_campaign_wide_balances() {
        let db = TestDb::new().await;
        let campaign = seed_campaign(&db.conn).await;
        let boxes = seed_boxes(&db.conn, campaign.id, 1).await;
        let jackpot = seed_prize(&db.conn, campaign.id, "Scooter", "S", 1.0, 1).await;
        seed_prize(&db.conn, campaign.id, "Sticker", "C", 1.0, 100).await;
        grant_coupons(&db.conn, 1, campaign.id, 1, 0).await;
        // 其他门店还有 99 张券: p = 1 / 100
        grant_coupons(&db.conn, 2, campaign.id, 99, 0).await;

        struct Fixed(f64);
        impl UnitSource for Fixed {
            fn next_unit(&mut self) -> f64 {
                self.0
            }
        }

        let svc = db_service(&db);
        let resp = svc
            .open_box_with(1, campaign.id, boxes[0].id, &mut Fixed(0.5))
            .await
            .unwrap();
        assert_ne!(resp.prize.id, jackpot.id);
    }
}
