use crate::entities::{campaign_entity as campaigns, prize_entity as prizes};
use crate::error::{AppError, AppResult};
use crate::models::PrizeResponse;
use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

#[derive(Clone)]
pub struct CampaignService {
    pool: DatabaseConnection,
}

impl CampaignService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// 读取活动（不存在返回 NotFound）
    pub async fn find_campaign(&self, campaign_id: i64) -> AppResult<campaigns::Model> {
        campaigns::Entity::find_by_id(campaign_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Campaign not found".into()))
    }

    /// 开盒前置检查: 活动存在、已启用且当前时间在 [start_date, end_date] 内
    pub async fn ensure_active(
        &self,
        campaign_id: i64,
        now: DateTime<Utc>,
    ) -> AppResult<campaigns::Model> {
        match campaigns::Entity::find_by_id(campaign_id)
            .one(&self.pool)
            .await?
        {
            Some(c) if c.is_running_at(now) => Ok(c),
            _ => Err(AppError::CampaignInactive),
        }
    }

    /// 活动中启用的奖品（按档位、ID 排序）
    pub async fn list_prizes(&self, campaign_id: i64) -> AppResult<Vec<PrizeResponse>> {
        self.find_campaign(campaign_id).await?;
        let list = prizes::Entity::find()
            .filter(prizes::Column::CampaignId.eq(campaign_id))
            .filter(prizes::Column::IsActive.eq(true))
            .order_by_asc(prizes::Column::Tier)
            .order_by_asc(prizes::Column::Id)
            .all(&self.pool)
            .await?;
        Ok(list.into_iter().map(Into::into).collect())
    }
}
