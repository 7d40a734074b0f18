use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 盒子状态: available -> opened (终态, 不可逆)
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "snake_case")]
pub enum BoxStatus {
    #[sea_orm(string_value = "available")]
    Available,
    #[sea_orm(string_value = "opened")]
    Opened,
}

impl std::fmt::Display for BoxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BoxStatus::Available => write!(f, "available"),
            BoxStatus::Opened => write!(f, "opened"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "mystery_boxes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub campaign_id: i64,
    /// 活动内编号, 从 1 开始
    pub box_number: i32,
    pub status: BoxStatus,
    /// 预分配奖品, 开盒时不读取
    pub prize_id: Option<i64>,
    pub opened_by: Option<i64>,
    pub opened_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Model {
    pub fn is_opened(&self) -> bool {
        self.status == BoxStatus::Opened
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
