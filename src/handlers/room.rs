use crate::services::RoomService;
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/campaigns/{campaign_id}/rooms",
    tag = "room",
    params(
        ("campaign_id" = i64, Path, description = "活动ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取房间列表成功", body = [RoomInfo]),
        (status = 401, description = "未授权"),
        (status = 404, description = "活动不存在")
    )
)]
/// 获取活动全部房间及解锁状态
pub async fn list_rooms(
    service: web::Data<RoomService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match service.list_rooms(path.into_inner()).await {
        Ok(rooms) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": rooms }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/campaigns/{campaign_id}/rooms/{room_number}/boxes",
    tag = "room",
    params(
        ("campaign_id" = i64, Path, description = "活动ID"),
        ("room_number" = i64, Path, description = "房间序号 (从1开始)")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取房间盒子成功", body = RoomBoxesResponse),
        (status = 401, description = "未授权"),
        (status = 403, description = "房间未解锁"),
        (status = 404, description = "活动或房间不存在")
    )
)]
/// 获取某个房间内的盒子
pub async fn list_room_boxes(
    service: web::Data<RoomService>,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse> {
    let (campaign_id, room_number) = path.into_inner();
    match service.list_room_boxes(campaign_id, room_number).await {
        Ok(room) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": room }))),
        Err(e) => Ok(e.error_response()),
    }
}

/// 路由配置
pub fn room_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/campaigns/{campaign_id}/rooms", web::get().to(list_rooms))
        .route(
            "/campaigns/{campaign_id}/rooms/{room_number}/boxes",
            web::get().to(list_room_boxes),
        );
}
