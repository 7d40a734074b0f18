use crate::error::AppResult;
use crate::models::DashboardResponse;
use crate::services::{AchievementService, CampaignService, RoomService, coupon_service};
use chrono::Utc;
use sea_orm::DatabaseConnection;

/// 门店看板: 余额 + 统计 + 房间 + 成就
#[derive(Clone)]
pub struct DashboardService {
    pool: DatabaseConnection,
    campaign_service: CampaignService,
    room_service: RoomService,
    achievement_service: AchievementService,
}

impl DashboardService {
    pub fn new(
        pool: DatabaseConnection,
        campaign_service: CampaignService,
        room_service: RoomService,
        achievement_service: AchievementService,
    ) -> Self {
        Self {
            pool,
            campaign_service,
            room_service,
            achievement_service,
        }
    }

    /// 每次获取看板都会重新评估成就（幂等）
    pub async fn get_dashboard(
        &self,
        store_id: i64,
        campaign_id: i64,
    ) -> AppResult<DashboardResponse> {
        let campaign = self.campaign_service.find_campaign(campaign_id).await?;
        let now = Utc::now();

        let balance = coupon_service::ensure_balance(&self.pool, store_id, campaign.id).await?;
        let room_size = self.room_service.room_size_for(&campaign);
        let stats = self
            .achievement_service
            .stats_for(
                store_id,
                room_size,
                |c| self.room_service.room_size_for(c),
                now,
            )
            .await?;
        let achievements = self
            .achievement_service
            .evaluate(store_id, &stats, now)
            .await?;
        let rooms = self.room_service.rooms_for(&campaign).await?;

        Ok(DashboardResponse {
            coupon_balance: balance.into(),
            stats,
            rooms,
            achievements,
        })
    }
}
