use actix_web::{App, HttpServer, middleware::Logger, web};
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter
use std::sync::Arc;

use mystery_box_backend::{
    config::Config,
    database::{create_pool, run_migrations},
    external::DbAuditSink,
    handlers,
    middlewares::{AuthMiddleware, create_cors},
    services::*,
    swagger::swagger_config,
    utils::JwtService,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    // 加载配置
    let config = Config::from_toml().expect("Failed to load configuration file");

    // 创建数据库连接池
    let pool = create_pool(&config.database)
        .await
        .expect("Failed to create database connection pool");

    // 运行数据库迁移
    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    let jwt_service = JwtService::new(&config.jwt.secret);

    // 创建服务
    let campaign_service = CampaignService::new(pool.clone());
    let coupon_service = CouponService::new(pool.clone());
    let room_service = RoomService::new(
        pool.clone(),
        campaign_service.clone(),
        config.rooms.default_room_size,
    );
    let achievement_service = AchievementService::new(pool.clone());
    let mystery_box_service = MysteryBoxService::new(
        pool.clone(),
        campaign_service.clone(),
        room_service.clone(),
        Arc::new(DbAuditSink::new(pool.clone())),
        config.allocation.serializable,
    );
    let dashboard_service = DashboardService::new(
        pool.clone(),
        campaign_service.clone(),
        room_service.clone(),
        achievement_service,
    );

    log::info!(
        "Starting HTTP server at {}:{} (serializable allocation: {})",
        config.server.host,
        config.server.port,
        config.allocation.serializable
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(create_cors())
            .wrap(AuthMiddleware::new(jwt_service.clone()))
            .app_data(web::Data::new(campaign_service.clone()))
            .app_data(web::Data::new(coupon_service.clone()))
            .app_data(web::Data::new(room_service.clone()))
            .app_data(web::Data::new(mystery_box_service.clone()))
            .app_data(web::Data::new(dashboard_service.clone()))
            .configure(swagger_config)
            .service(
                web::scope("/api/v1")
                    .configure(handlers::mystery_box_config)
                    .configure(handlers::campaign_config)
                    .configure(handlers::room_config)
                    .configure(handlers::dashboard_config),
            )
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
