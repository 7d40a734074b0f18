use crate::middlewares::current_store_id;
use crate::services::DashboardService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/campaigns/{campaign_id}/dashboard",
    tag = "dashboard",
    params(
        ("campaign_id" = i64, Path, description = "活动ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取看板成功", body = DashboardResponse),
        (status = 401, description = "未授权"),
        (status = 404, description = "活动不存在")
    )
)]
/// 门店看板: 优惠券余额、统计、房间、成就
/// 每次请求都会重新评估成就并保存进度
pub async fn get_dashboard(
    service: web::Data<DashboardService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let store_id = match current_store_id(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };
    match service.get_dashboard(store_id, path.into_inner()).await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

/// 路由配置
pub fn dashboard_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/campaigns/{campaign_id}/dashboard", web::get().to(get_dashboard));
}
