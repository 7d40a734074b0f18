use super::PrizeType;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 开盒记录实体 (只追加, 不更新不删除)
/// - box_number / prize_name / prize_tier / prize_type 为开盒时的快照, 统计与成就只读这张表
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "box_open_records")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub store_id: i64,
    pub campaign_id: i64,
    pub box_id: i64,
    pub box_number: i32,
    pub prize_id: i64,
    pub prize_name: String,
    pub prize_tier: String,
    pub prize_type: PrizeType,
    pub opened_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
