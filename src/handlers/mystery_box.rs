use crate::middlewares::current_store_id;
use crate::models::*;
use crate::services::{CouponService, MysteryBoxService};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    post,
    path = "/campaigns/{campaign_id}/boxes/{box_id}/open",
    tag = "mystery_box",
    params(
        ("campaign_id" = i64, Path, description = "活动ID"),
        ("box_id" = i64, Path, description = "盒子ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "开盒成功", body = OpenBoxResponse),
        (status = 400, description = "优惠券不足"),
        (status = 401, description = "未授权"),
        (status = 403, description = "活动未开始/已结束, 或房间未解锁"),
        (status = 404, description = "盒子不存在"),
        (status = 409, description = "盒子已被开启或奖品已被抢完, 可重试"),
        (status = 503, description = "奖品已全部发完")
    )
)]
/// 开盒: 消耗一张优惠券, 抽取一个奖品
pub async fn open_box(
    service: web::Data<MysteryBoxService>,
    req: HttpRequest,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse> {
    let store_id = match current_store_id(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };
    let (campaign_id, box_id) = path.into_inner();
    match service.open_box(store_id, campaign_id, box_id).await {
        Ok(result) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": result }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/campaigns/{campaign_id}/coupons",
    tag = "mystery_box",
    params(
        ("campaign_id" = i64, Path, description = "活动ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取优惠券余额成功", body = CouponBalanceResponse),
        (status = 401, description = "未授权")
    )
)]
/// 获取门店在活动中的优惠券余额, 没有记录时初始化为 0
pub async fn get_coupons(
    service: web::Data<CouponService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let store_id = match current_store_id(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };
    match service.get_balance(store_id, path.into_inner()).await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/campaigns/{campaign_id}/history",
    tag = "mystery_box",
    params(
        ("campaign_id" = i64, Path, description = "活动ID"),
        ("page" = Option<u32>, Query, description = "页码 (默认1)"),
        ("per_page" = Option<u32>, Query, description = "每页数量 (默认20)")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取开盒记录成功", body = PaginatedResponse<OpenRecordResponse>),
        (status = 401, description = "未授权")
    )
)]
/// 分页获取开盒记录（倒序）
pub async fn get_history(
    service: web::Data<MysteryBoxService>,
    req: HttpRequest,
    path: web::Path<i64>,
    query: web::Query<OpenHistoryQuery>,
) -> Result<HttpResponse> {
    let store_id = match current_store_id(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };
    match service
        .list_history(store_id, path.into_inner(), &query.into_inner())
        .await
    {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": page }))),
        Err(e) => Ok(e.error_response()),
    }
}

/// 路由配置
pub fn mystery_box_config(cfg: &mut web::ServiceConfig) {
    cfg.route(
        "/campaigns/{campaign_id}/boxes/{box_id}/open",
        web::post().to(open_box),
    )
    .route("/campaigns/{campaign_id}/coupons", web::get().to(get_coupons))
    .route("/campaigns/{campaign_id}/history", web::get().to(get_history));
}
