use crate::services::CampaignService;
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/campaigns/{campaign_id}/prizes",
    tag = "campaign",
    params(
        ("campaign_id" = i64, Path, description = "活动ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取奖品列表成功", body = [PrizeResponse]),
        (status = 401, description = "未授权"),
        (status = 404, description = "活动不存在")
    )
)]
/// 获取活动中启用的奖品（含库存）
pub async fn get_prizes(
    service: web::Data<CampaignService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match service.list_prizes(path.into_inner()).await {
        Ok(list) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": list }))),
        Err(e) => Ok(e.error_response()),
    }
}

/// 路由配置
pub fn campaign_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/campaigns/{campaign_id}/prizes", web::get().to(get_prizes));
}
