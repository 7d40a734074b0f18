use crate::entities::{audit_log_entity as audit_logs, prize_entity as prizes};
use crate::error::AppResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use serde::Serialize;
use serde_json::json;

pub const ACTION_BOX_OPEN: &str = "BOX_OPEN";

/// 审计记录（只追加）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub actor_type: String,
    pub actor_id: i64,
    pub action: String,
    pub entity_type: String,
    pub entity_id: i64,
    pub campaign_id: Option<i64>,
    pub details: serde_json::Value,
}

impl AuditEntry {
    /// 开盒成功的审计记录
    pub fn box_open(
        store_id: i64,
        campaign_id: i64,
        box_id: i64,
        prize: &prizes::Model,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            timestamp: at,
            actor_type: "store".into(),
            actor_id: store_id,
            action: ACTION_BOX_OPEN.into(),
            entity_type: "box".into(),
            entity_id: box_id,
            campaign_id: Some(campaign_id),
            details: json!({
                "prizeId": prize.id,
                "prizeName": prize.name,
                "prizeTier": prize.tier,
                "prizeType": prize.prize_type,
            }),
        }
    }
}

/// 审计日志出口, 调用方不关心写入结果
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, entry: AuditEntry) -> AppResult<()>;
}

/// 写入 audit_logs 表
#[derive(Clone)]
pub struct DbAuditSink {
    pool: DatabaseConnection,
}

impl DbAuditSink {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for DbAuditSink {
    async fn append(&self, entry: AuditEntry) -> AppResult<()> {
        audit_logs::ActiveModel {
            actor_type: Set(entry.actor_type),
            actor_id: Set(entry.actor_id),
            action: Set(entry.action),
            entity_type: Set(entry.entity_type),
            entity_id: Set(entry.entity_id),
            campaign_id: Set(entry.campaign_id),
            details: Set(Some(entry.details)),
            created_at: Set(entry.timestamp),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;
        Ok(())
    }
}
