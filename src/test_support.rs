//! 测试用数据库与数据构造
//!
//! 每个测试使用临时目录下独立的 SQLite 文件, 并执行完整迁移。

use crate::entities::{
    BoxStatus, PrizeType, box_open_record_entity as records, campaign_entity as campaigns,
    coupon_balance_entity as balances, mystery_box_entity as boxes, prize_entity as prizes,
};
use crate::error::{AppError, AppResult};
use crate::external::{AuditEntry, AuditSink};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use tempfile::TempDir;
use tokio::sync::mpsc;

pub struct TestDb {
    pub conn: DatabaseConnection,
    _dir: TempDir,
}

impl TestDb {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());

        // 单连接: 事务天然串行, 避免 SQLITE_BUSY
        let mut opt = ConnectOptions::new(url);
        opt.max_connections(1)
            .min_connections(1)
            .acquire_timeout(std::time::Duration::from_secs(60))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await.unwrap();
        Migrator::up(&conn, None).await.unwrap();

        Self { conn, _dir: dir }
    }
}

/// 正在进行中的活动, 房间全部解锁
pub async fn seed_campaign(conn: &DatabaseConnection) -> campaigns::Model {
    let now = Utc::now();
    seed_campaign_with(
        conn,
        true,
        now - Duration::days(1),
        now + Duration::days(30),
        None,
    )
    .await
}

pub async fn seed_campaign_with(
    conn: &DatabaseConnection,
    is_active: bool,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    room_unlock_threshold: Option<i32>,
) -> campaigns::Model {
    insert_campaign(conn, is_active, start_date, end_date, 100, room_unlock_threshold).await
}

pub async fn seed_room_campaign(
    conn: &DatabaseConnection,
    room_size: i32,
    room_unlock_threshold: Option<i32>,
) -> campaigns::Model {
    let now = Utc::now();
    insert_campaign(
        conn,
        true,
        now - Duration::days(1),
        now + Duration::days(30),
        room_size,
        room_unlock_threshold,
    )
    .await
}

async fn insert_campaign(
    conn: &DatabaseConnection,
    is_active: bool,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    room_size: i32,
    room_unlock_threshold: Option<i32>,
) -> campaigns::Model {
    let now = Utc::now();
    campaigns::ActiveModel {
        name: Set("Autumn Mystery Box".into()),
        is_active: Set(is_active),
        start_date: Set(start_date),
        end_date: Set(end_date),
        room_size: Set(room_size),
        room_unlock_threshold: Set(room_unlock_threshold),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(conn)
    .await
    .unwrap()
}

/// 为活动创建编号 1..=n 的盒子
pub async fn seed_boxes(
    conn: &DatabaseConnection,
    campaign_id: i64,
    n: i32,
) -> Vec<boxes::Model> {
    let mut out = Vec::with_capacity(n as usize);
    for number in 1..=n {
        let m = boxes::ActiveModel {
            campaign_id: Set(campaign_id),
            box_number: Set(number),
            status: Set(BoxStatus::Available),
            prize_id: Set(None),
            opened_by: Set(None),
            opened_at: Set(None),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(conn)
        .await
        .unwrap();
        out.push(m);
    }
    out
}

pub async fn seed_prize(
    conn: &DatabaseConnection,
    campaign_id: i64,
    name: &str,
    tier: &str,
    weight: f64,
    stock: i64,
) -> prizes::Model {
    seed_prize_typed(conn, campaign_id, name, tier, PrizeType::Physical, weight, stock).await
}

pub async fn seed_prize_typed(
    conn: &DatabaseConnection,
    campaign_id: i64,
    name: &str,
    tier: &str,
    prize_type: PrizeType,
    weight: f64,
    stock: i64,
) -> prizes::Model {
    let now = Utc::now();
    prizes::ActiveModel {
        campaign_id: Set(campaign_id),
        name: Set(name.to_string()),
        tier: Set(tier.to_string()),
        prize_type: Set(prize_type),
        image_url: Set(None),
        base_probability: Set(weight),
        stock_total: Set(stock),
        stock_remaining: Set(stock),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(conn)
    .await
    .unwrap()
}

/// 直接写入优惠券账户（发券由外部系统负责）
pub async fn grant_coupons(
    conn: &DatabaseConnection,
    store_id: i64,
    campaign_id: i64,
    earned: i64,
    used: i64,
) -> balances::Model {
    let now = Utc::now();
    balances::ActiveModel {
        store_id: Set(store_id),
        campaign_id: Set(campaign_id),
        total_earned: Set(earned),
        total_used: Set(used),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(conn)
    .await
    .unwrap()
}

/// 绕过开盒流程直接把盒子标记为已开启
pub async fn mark_opened(conn: &DatabaseConnection, box_id: i64, store_id: i64) {
    boxes::ActiveModel {
        id: Set(box_id),
        status: Set(BoxStatus::Opened),
        opened_by: Set(Some(store_id)),
        opened_at: Set(Some(Utc::now())),
        ..Default::default()
    }
    .update(conn)
    .await
    .unwrap();
}

/// 写入一条开盒记录快照, 用于统计/成就测试
pub async fn insert_open_record(
    conn: &DatabaseConnection,
    store_id: i64,
    campaign_id: i64,
    box_number: i32,
    prize: &prizes::Model,
    opened_at: DateTime<Utc>,
) -> records::Model {
    let slot = boxes::ActiveModel {
        campaign_id: Set(campaign_id),
        box_number: Set(box_number),
        status: Set(BoxStatus::Opened),
        prize_id: Set(Some(prize.id)),
        opened_by: Set(Some(store_id)),
        opened_at: Set(Some(opened_at)),
        created_at: Set(opened_at),
        ..Default::default()
    }
    .insert(conn)
    .await
    .unwrap();

    records::ActiveModel {
        store_id: Set(store_id),
        campaign_id: Set(campaign_id),
        box_id: Set(slot.id),
        box_number: Set(box_number),
        prize_id: Set(prize.id),
        prize_name: Set(prize.name.clone()),
        prize_tier: Set(prize.tier.clone()),
        prize_type: Set(prize.prize_type),
        opened_at: Set(opened_at),
        ..Default::default()
    }
    .insert(conn)
    .await
    .unwrap()
}

/// 把审计记录转发到 channel, 供测试断言
pub struct ChannelAuditSink {
    tx: mpsc::UnboundedSender<AuditEntry>,
}

impl ChannelAuditSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<AuditEntry>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl AuditSink for ChannelAuditSink {
    async fn append(&self, entry: AuditEntry) -> AppResult<()> {
        self.tx
            .send(entry)
            .map_err(|e| AppError::InternalError(e.to_string()))
    }
}

/// 永远写入失败的审计出口
pub struct FailingAuditSink;

#[async_trait]
impl AuditSink for FailingAuditSink {
    async fn append(&self, _entry: AuditEntry) -> AppResult<()> {
        Err(AppError::InternalError("audit store unavailable".into()))
    }
}
