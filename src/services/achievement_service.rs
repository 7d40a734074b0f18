use crate::entities::{
    PrizeType, achievement_progress_entity as progress_entity, box_open_record_entity as records,
    campaign_entity as campaigns,
};
use crate::error::AppResult;
use crate::models::{AchievementStatusResponse, StatsSnapshot};
use crate::services::achievement_catalog::{ACHIEVEMENTS, AchievementDef};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use std::collections::{BTreeMap, HashMap, HashSet};

/// 根据开盒记录计算门店统计快照
///
/// - streak: 以 `today` 结尾、每天至少一次开盒的连续天数 (UTC 日历日), 今天没有开盒则为 0
/// - total_prizes_won: 不含“谢谢参与”类奖品
/// - rooms_visited: 开过盒的不同 (活动, 房间) 数, 房间大小取各自活动的配置, 缺省为 `room_size`
pub fn compute_stats(
    opens: &[records::Model],
    today: NaiveDate,
    room_sizes: &HashMap<i64, i64>,
    room_size: i64,
) -> StatsSnapshot {
    let room_size = room_size.max(1);
    let total = opens.len() as i64;
    let won = opens
        .iter()
        .filter(|r| r.prize_type != PrizeType::NoPrize)
        .count() as i64;

    let mut prizes_by_tier: BTreeMap<String, i64> = BTreeMap::new();
    for r in opens {
        *prizes_by_tier.entry(r.prize_tier.clone()).or_default() += 1;
    }

    let win_rate = if total == 0 {
        0.0
    } else {
        (won as f64 / total as f64 * 1000.0).round() / 10.0
    };

    let rooms: HashSet<(i64, i64)> = opens
        .iter()
        .map(|r| {
            let size = room_sizes
                .get(&r.campaign_id)
                .copied()
                .unwrap_or(room_size)
                .max(1);
            (r.campaign_id, (i64::from(r.box_number) - 1).max(0) / size + 1)
        })
        .collect();

    let days: HashSet<NaiveDate> = opens.iter().map(|r| r.opened_at.date_naive()).collect();
    let mut streak = 0;
    let mut day = today;
    while days.contains(&day) {
        streak += 1;
        match day.pred_opt() {
            Some(prev) => day = prev,
            None => break,
        }
    }

    StatsSnapshot {
        total_boxes_opened: total,
        total_prizes_won: won,
        streak,
        prizes_by_tier,
        win_rate,
        rooms_visited: rooms.len() as i64,
        room_size,
    }
}

/// 单条成就本次评估需要的写操作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressChange {
    /// 新建记录, unlocked 为 true 时同时写入 unlocked_at
    Create { progress: i64, unlocked: bool },
    /// 已有记录首次解锁
    Unlock { progress: i64 },
    /// 仅更新进度
    Progress(i64),
    Unchanged,
}

pub fn plan_change(
    def: &AchievementDef,
    stats: &StatsSnapshot,
    existing: Option<&progress_entity::Model>,
) -> ProgressChange {
    let progress = def.progress(stats);
    match (def.is_satisfied(stats), existing) {
        (true, None) => ProgressChange::Create {
            progress: def.requirement,
            unlocked: true,
        },
        (true, Some(rec)) if !rec.is_unlocked() => ProgressChange::Unlock {
            progress: rec.progress.max(def.requirement),
        },
        (true, Some(_)) => ProgressChange::Unchanged,
        // 已解锁的记录进度不回退
        (false, Some(rec)) if !rec.is_unlocked() && rec.progress != progress => {
            ProgressChange::Progress(progress)
        }
        (false, None) if progress > 0 => ProgressChange::Create {
            progress,
            unlocked: false,
        },
        (false, _) => ProgressChange::Unchanged,
    }
}

#[derive(Clone)]
pub struct AchievementService {
    pool: DatabaseConnection,
}

impl AchievementService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// 门店的统计快照, 覆盖该门店在所有活动中的开盒记录
    ///
    /// `room_size_of` 给出每个活动的房间大小, `room_size` 为快照中展示的当前活动房间大小。
    pub async fn stats_for(
        &self,
        store_id: i64,
        room_size: i64,
        room_size_of: impl Fn(&campaigns::Model) -> i64,
        now: DateTime<Utc>,
    ) -> AppResult<StatsSnapshot> {
        let opens = records::Entity::find()
            .filter(records::Column::StoreId.eq(store_id))
            .order_by_asc(records::Column::OpenedAt)
            .all(&self.pool)
            .await?;

        let campaign_ids: HashSet<i64> = opens.iter().map(|r| r.campaign_id).collect();
        let room_sizes: HashMap<i64, i64> = campaigns::Entity::find()
            .filter(campaigns::Column::Id.is_in(campaign_ids))
            .all(&self.pool)
            .await?
            .iter()
            .map(|c| (c.id, room_size_of(c)))
            .collect();

        Ok(compute_stats(&opens, now.date_naive(), &room_sizes, room_size))
    }

    async fn load_progress(
        &self,
        store_id: i64,
    ) -> AppResult<HashMap<String, progress_entity::Model>> {
        let rows = progress_entity::Entity::find()
            .filter(progress_entity::Column::StoreId.eq(store_id))
            .all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| (r.achievement_code.clone(), r))
            .collect())
    }

    /// 评估全部成就并持久化进度, 返回每个成就的当前状态
    ///
    /// 同一快照重复评估不会产生任何写入; unlocked_at 只在首次解锁时写入。
    pub async fn evaluate(
        &self,
        store_id: i64,
        stats: &StatsSnapshot,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<AchievementStatusResponse>> {
        let existing = self.load_progress(store_id).await?;
        let mut changed = false;

        for def in ACHIEVEMENTS {
            let change = plan_change(def, stats, existing.get(def.code));
            match change {
                ProgressChange::Unchanged => continue,
                ProgressChange::Create { progress, unlocked } => {
                    // 并发评估时由唯一索引兜底, 冲突方不写入
                    progress_entity::Entity::insert(progress_entity::ActiveModel {
                        store_id: Set(store_id),
                        achievement_code: Set(def.code.to_string()),
                        progress: Set(progress),
                        unlocked_at: Set(unlocked.then_some(now)),
                        created_at: Set(now),
                        updated_at: Set(now),
                        ..Default::default()
                    })
                    .on_conflict(
                        OnConflict::columns([
                            progress_entity::Column::StoreId,
                            progress_entity::Column::AchievementCode,
                        ])
                        .do_nothing()
                        .to_owned(),
                    )
                    .exec_without_returning(&self.pool)
                    .await?;
                    if unlocked {
                        log::info!("Achievement {} unlocked for store {store_id}", def.code);
                    }
                }
                ProgressChange::Unlock { progress } => {
                    let res = progress_entity::Entity::update_many()
                        .col_expr(progress_entity::Column::Progress, Expr::value(progress))
                        .col_expr(progress_entity::Column::UnlockedAt, Expr::value(now))
                        .col_expr(progress_entity::Column::UpdatedAt, Expr::value(now))
                        .filter(progress_entity::Column::StoreId.eq(store_id))
                        .filter(progress_entity::Column::AchievementCode.eq(def.code))
                        .filter(progress_entity::Column::UnlockedAt.is_null())
                        .exec(&self.pool)
                        .await?;
                    if res.rows_affected == 1 {
                        log::info!("Achievement {} unlocked for store {store_id}", def.code);
                    }
                }
                ProgressChange::Progress(progress) => {
                    progress_entity::Entity::update_many()
                        .col_expr(progress_entity::Column::Progress, Expr::value(progress))
                        .col_expr(progress_entity::Column::UpdatedAt, Expr::value(now))
                        .filter(progress_entity::Column::StoreId.eq(store_id))
                        .filter(progress_entity::Column::AchievementCode.eq(def.code))
                        .exec(&self.pool)
                        .await?;
                }
            }
            changed = true;
        }

        let current = if changed {
            self.load_progress(store_id).await?
        } else {
            existing
        };

        Ok(ACHIEVEMENTS
            .iter()
            .map(|def| {
                let rec = current.get(def.code);
                AchievementStatusResponse {
                    code: def.code.to_string(),
                    name: def.name.to_string(),
                    description: def.description.to_string(),
                    tier: def.tier.as_str().to_string(),
                    requirement: def.requirement,
                    progress: rec.map(|r| r.progress).unwrap_or(0),
                    unlocked: rec.is_some_and(|r| r.is_unlocked()),
                    unlocked_at: rec.and_then(|r| r.unlocked_at),
                }
            })
            .collect())
    }
}
