use crate::entities::{campaign_entity as campaigns, mystery_box_entity as boxes};
use crate::error::{AppError, AppResult};
use crate::models::{RoomBoxResponse, RoomBoxesResponse, RoomInfo};
use crate::services::CampaignService;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

/// 房间解锁策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockPolicy {
    /// 所有房间始终解锁
    AlwaysUnlocked,
    /// 上一房间开盒数达到阈值后解锁, 第一个房间始终解锁
    Threshold(i64),
}

impl UnlockPolicy {
    /// 以活动配置为准: room_unlock_threshold 为空时全部解锁
    pub fn for_campaign(campaign: &campaigns::Model) -> Self {
        match campaign.room_unlock_threshold {
            Some(t) => UnlockPolicy::Threshold(i64::from(t.max(0))),
            None => UnlockPolicy::AlwaysUnlocked,
        }
    }

    fn is_unlocked(&self, previous_opened: Option<i64>) -> bool {
        match (self, previous_opened) {
            (UnlockPolicy::AlwaysUnlocked, _) => true,
            (UnlockPolicy::Threshold(_), None) => true,
            (UnlockPolicy::Threshold(t), Some(opened)) => opened >= *t,
        }
    }
}

/// 将按编号排好序的盒子按 room_size 分组并计算每个房间的元数据
pub fn build_rooms(ordered: &[boxes::Model], room_size: i64, policy: UnlockPolicy) -> Vec<RoomInfo> {
    let size = room_size.max(1) as usize;
    let mut rooms = Vec::with_capacity(ordered.len().div_ceil(size));
    let mut previous_opened: Option<i64> = None;

    for (idx, chunk) in ordered.chunks(size).enumerate() {
        let total = chunk.len() as i64;
        let opened = chunk.iter().filter(|b| b.is_opened()).count() as i64;
        rooms.push(RoomInfo {
            room_number: idx as i64 + 1,
            start_box: chunk.first().map(|b| b.box_number).unwrap_or_default(),
            end_box: chunk.last().map(|b| b.box_number).unwrap_or_default(),
            total_boxes: total,
            opened_count: opened,
            remaining_boxes: total - opened,
            is_unlocked: policy.is_unlocked(previous_opened),
        });
        previous_opened = Some(opened);
    }

    rooms
}

/// 房间门禁: 分页展示与开盒前的房间解锁检查
#[derive(Clone)]
pub struct RoomService {
    pool: DatabaseConnection,
    campaign_service: CampaignService,
    default_room_size: i64,
}

impl RoomService {
    pub fn new(
        pool: DatabaseConnection,
        campaign_service: CampaignService,
        default_room_size: i64,
    ) -> Self {
        Self {
            pool,
            campaign_service,
            default_room_size: default_room_size.max(1),
        }
    }

    /// 活动房间大小（未配置或非法时使用默认值）
    pub fn room_size_for(&self, campaign: &campaigns::Model) -> i64 {
        if campaign.room_size > 0 {
            i64::from(campaign.room_size)
        } else {
            self.default_room_size
        }
    }

    async fn ordered_boxes(&self, campaign_id: i64) -> AppResult<Vec<boxes::Model>> {
        let list = boxes::Entity::find()
            .filter(boxes::Column::CampaignId.eq(campaign_id))
            .order_by_asc(boxes::Column::BoxNumber)
            .all(&self.pool)
            .await?;
        Ok(list)
    }

    /// 计算活动全部房间的元数据
    pub async fn rooms_for(&self, campaign: &campaigns::Model) -> AppResult<Vec<RoomInfo>> {
        let ordered = self.ordered_boxes(campaign.id).await?;
        Ok(build_rooms(
            &ordered,
            self.room_size_for(campaign),
            UnlockPolicy::for_campaign(campaign),
        ))
    }

    pub async fn list_rooms(&self, campaign_id: i64) -> AppResult<Vec<RoomInfo>> {
        let campaign = self.campaign_service.find_campaign(campaign_id).await?;
        self.rooms_for(&campaign).await
    }

    /// 列出某个房间的盒子, 房间未解锁时返回 RoomLocked
    pub async fn list_room_boxes(
        &self,
        campaign_id: i64,
        room_number: i64,
    ) -> AppResult<RoomBoxesResponse> {
        let campaign = self.campaign_service.find_campaign(campaign_id).await?;
        let ordered = self.ordered_boxes(campaign.id).await?;
        let room_size = self.room_size_for(&campaign);
        let rooms = build_rooms(&ordered, room_size, UnlockPolicy::for_campaign(&campaign));

        let idx = room_number
            .checked_sub(1)
            .and_then(|n| usize::try_from(n).ok())
            .filter(|&n| n < rooms.len())
            .ok_or_else(|| AppError::NotFound("Room not found".into()))?;
        let room = rooms[idx].clone();
        if !room.is_unlocked {
            return Err(AppError::RoomLocked);
        }

        let boxes = ordered
            .chunks(room_size as usize)
            .nth(idx)
            .unwrap_or_default()
            .iter()
            .map(|b| RoomBoxResponse {
                id: b.id,
                box_number: b.box_number,
                status: b.status,
            })
            .collect();

        Ok(RoomBoxesResponse { room, boxes })
    }

    /// 开盒前置检查: 目标盒子所在房间必须已解锁
    pub async fn ensure_box_accessible(
        &self,
        campaign: &campaigns::Model,
        box_id: i64,
    ) -> AppResult<()> {
        let policy = UnlockPolicy::for_campaign(campaign);
        if policy == UnlockPolicy::AlwaysUnlocked {
            return Ok(());
        }

        let ordered = self.ordered_boxes(campaign.id).await?;
        let position = ordered
            .iter()
            .position(|b| b.id == box_id)
            .ok_or(AppError::BoxNotFound)?;
        let room_size = self.room_size_for(campaign);
        let rooms = build_rooms(&ordered, room_size, policy);
        let room_idx = position / room_size as usize;

        match rooms.get(room_idx) {
            Some(room) if room.is_unlocked => Ok(()),
            _ => {
                log::warn!(
                    "Room {} of campaign {} is locked for box {box_id}",
                    room_idx + 1,
                    campaign.id
                );
                Err(AppError::RoomLocked)
            }
        }
    }
}
