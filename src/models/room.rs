use serde::Serialize;
use utoipa::ToSchema;

use crate::entities::BoxStatus;

/// 房间元数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoomInfo {
    /// 房间序号, 从 1 开始
    pub room_number: i64,
    /// 房间内第一个盒子编号
    pub start_box: i32,
    /// 房间内最后一个盒子编号
    pub end_box: i32,
    pub total_boxes: i64,
    pub opened_count: i64,
    pub remaining_boxes: i64,
    pub is_unlocked: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoomBoxResponse {
    pub id: i64,
    pub box_number: i32,
    pub status: BoxStatus,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoomBoxesResponse {
    pub room: RoomInfo,
    pub boxes: Vec<RoomBoxResponse>,
}
