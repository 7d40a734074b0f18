use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use crate::entities::{BoxStatus, ClaimStatus, PrizeType};
use crate::models::*;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::mystery_box::open_box,
        handlers::mystery_box::get_coupons,
        handlers::mystery_box::get_history,
        handlers::campaign::get_prizes,
        handlers::room::list_rooms,
        handlers::room::list_room_boxes,
        handlers::dashboard::get_dashboard,
    ),
    components(
        schemas(
            BoxStatus,
            PrizeType,
            ClaimStatus,
            CouponBalanceResponse,
            WonPrize,
            OpenBoxResponse,
            PrizeResponse,
            OpenRecordResponse,
            OpenHistoryQuery,
            RoomInfo,
            RoomBoxResponse,
            RoomBoxesResponse,
            StatsSnapshot,
            AchievementStatusResponse,
            DashboardResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "mystery_box", description = "Box opening and coupon API"),
        (name = "campaign", description = "Campaign prize API"),
        (name = "room", description = "Room browsing API"),
        (name = "dashboard", description = "Store dashboard and achievements API"),
    ),
    info(
        title = "Mystery Box API",
        version = "1.0.0",
        description = "Mystery box loyalty campaign REST API documentation"
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
