use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Campaign is not active")]
    CampaignInactive,

    #[error("No coupons left")]
    NoCouponsLeft,

    #[error("No prizes available")]
    NoPrizesAvailable,

    #[error("Prize selection failed: {0}")]
    PrizeSelectionFailed(String),

    #[error("Box already opened")]
    BoxAlreadyOpened,

    #[error("Box not found")]
    BoxNotFound,

    #[error("Room is locked")]
    RoomLocked,

    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),

    #[error("Auth error: {0}")]
    AuthError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    /// 并发竞争下的正常结果, 调用方可以重新发起一次（重新抽取, 而不是重放）
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::PrizeSelectionFailed(_) | AppError::BoxAlreadyOpened
        )
    }

    /// 稳定的错误码
    pub fn code(&self) -> &'static str {
        match self {
            AppError::CampaignInactive => "CAMPAIGN_INACTIVE",
            AppError::NoCouponsLeft => "NO_COUPONS_LEFT",
            AppError::NoPrizesAvailable => "NO_PRIZES_AVAILABLE",
            AppError::PrizeSelectionFailed(_) => "PRIZE_SELECTION_FAILED",
            AppError::BoxAlreadyOpened => "BOX_ALREADY_OPENED",
            AppError::BoxNotFound => "BOX_NOT_FOUND",
            AppError::RoomLocked => "ROOM_LOCKED",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::AuthError(_) | AppError::JwtError(_) => "AUTH_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            _ => "INTERNAL_ERROR",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::CampaignInactive | AppError::RoomLocked => StatusCode::FORBIDDEN,
            AppError::NoCouponsLeft => StatusCode::BAD_REQUEST,
            AppError::NoPrizesAvailable => StatusCode::SERVICE_UNAVAILABLE,
            AppError::PrizeSelectionFailed(_) | AppError::BoxAlreadyOpened => {
                StatusCode::CONFLICT
            }
            AppError::BoxNotFound | AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::AuthError(_) | AppError::JwtError(_) => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AppError::AuthError(msg) => {
                log::warn!("Authentication error: {msg}");
                msg.clone()
            }
            AppError::JwtError(err) => {
                log::warn!("Invalid token: {err}");
                "Invalid access token".to_string()
            }
            AppError::NotFound(msg) => msg.clone(),
            AppError::PrizeSelectionFailed(reason) => {
                log::warn!("Prize selection failed: {reason}");
                "Prize selection failed, please try again".to_string()
            }
            AppError::DatabaseError(err) => {
                log::error!("Database error: {err}");
                "Database error".to_string()
            }
            AppError::InternalError(_) => {
                log::error!("Internal error: {self}");
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };

        HttpResponse::build(self.status_code()).json(json!({
            "success": false,
            "error": {
                "code": self.code(),
                "message": message,
                "retryable": self.is_retryable()
            }
        }))
    }
}
