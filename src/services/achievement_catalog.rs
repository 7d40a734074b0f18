//! 成就目录（静态, 代码定义）

use crate::models::StatsSnapshot;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AchievementTier {
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl AchievementTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            AchievementTier::Bronze => "bronze",
            AchievementTier::Silver => "silver",
            AchievementTier::Gold => "gold",
            AchievementTier::Platinum => "platinum",
        }
    }
}

/// 进度读取的统计指标
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    BoxesOpened,
    PrizesWon,
    Streak,
    /// 某一档位的中奖次数
    TierCount(&'static str),
    /// 胜率百分比（取整）
    WinRate,
    RoomsVisited,
}

impl Metric {
    pub fn read(&self, stats: &StatsSnapshot) -> i64 {
        match self {
            Metric::BoxesOpened => stats.total_boxes_opened,
            Metric::PrizesWon => stats.total_prizes_won,
            Metric::Streak => stats.streak,
            Metric::TierCount(tier) => stats.prizes_by_tier.get(*tier).copied().unwrap_or(0),
            Metric::WinRate => stats.win_rate.floor() as i64,
            Metric::RoomsVisited => stats.rooms_visited,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AchievementDef {
    pub code: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub tier: AchievementTier,
    pub requirement: i64,
    pub metric: Metric,
    pub predicate: fn(&AchievementDef, &StatsSnapshot) -> bool,
}

impl AchievementDef {
    pub fn is_satisfied(&self, stats: &StatsSnapshot) -> bool {
        (self.predicate)(self, stats)
    }

    pub fn progress(&self, stats: &StatsSnapshot) -> i64 {
        self.metric.read(stats).max(0)
    }
}

/// 指标达到要求即解锁
fn reaches_requirement(def: &AchievementDef, stats: &StatsSnapshot) -> bool {
    def.metric.read(stats) >= def.requirement
}

/// 胜率成就需要至少 10 次开盒, 避免一次中奖就达成
fn win_rate_with_volume(def: &AchievementDef, stats: &StatsSnapshot) -> bool {
    stats.total_boxes_opened >= 10 && stats.win_rate >= def.requirement as f64
}

pub static ACHIEVEMENTS: &[AchievementDef] = &[
    AchievementDef {
        code: "FIRST_BOX",
        name: "First Box",
        description: "Open your first mystery box",
        tier: AchievementTier::Bronze,
        requirement: 1,
        metric: Metric::BoxesOpened,
        predicate: reaches_requirement,
    },
    AchievementDef {
        code: "BOX_10",
        name: "Box Collector",
        description: "Open 10 mystery boxes",
        tier: AchievementTier::Bronze,
        requirement: 10,
        metric: Metric::BoxesOpened,
        predicate: reaches_requirement,
    },
    AchievementDef {
        code: "BOX_50",
        name: "Box Enthusiast",
        description: "Open 50 mystery boxes",
        tier: AchievementTier::Silver,
        requirement: 50,
        metric: Metric::BoxesOpened,
        predicate: reaches_requirement,
    },
    AchievementDef {
        code: "BOX_100",
        name: "Box Master",
        description: "Open 100 mystery boxes",
        tier: AchievementTier::Gold,
        requirement: 100,
        metric: Metric::BoxesOpened,
        predicate: reaches_requirement,
    },
    AchievementDef {
        code: "PRIZE_5",
        name: "Lucky Streak",
        description: "Win 5 prizes",
        tier: AchievementTier::Bronze,
        requirement: 5,
        metric: Metric::PrizesWon,
        predicate: reaches_requirement,
    },
    AchievementDef {
        code: "PRIZE_25",
        name: "Prize Hunter",
        description: "Win 25 prizes",
        tier: AchievementTier::Silver,
        requirement: 25,
        metric: Metric::PrizesWon,
        predicate: reaches_requirement,
    },
    AchievementDef {
        code: "STREAK_3",
        name: "Regular",
        description: "Open boxes 3 days in a row",
        tier: AchievementTier::Bronze,
        requirement: 3,
        metric: Metric::Streak,
        predicate: reaches_requirement,
    },
    AchievementDef {
        code: "STREAK_7",
        name: "Dedicated",
        description: "Open boxes 7 days in a row",
        tier: AchievementTier::Gold,
        requirement: 7,
        metric: Metric::Streak,
        predicate: reaches_requirement,
    },
    AchievementDef {
        code: "TIER_A_3",
        name: "High Roller",
        description: "Win 3 tier A prizes",
        tier: AchievementTier::Silver,
        requirement: 3,
        metric: Metric::TierCount("A"),
        predicate: reaches_requirement,
    },
    AchievementDef {
        code: "JACKPOT_1",
        name: "Jackpot",
        description: "Win a tier S prize",
        tier: AchievementTier::Platinum,
        requirement: 1,
        metric: Metric::TierCount("S"),
        predicate: reaches_requirement,
    },
    AchievementDef {
        code: "WIN_RATE_50",
        name: "Fortune Favored",
        description: "Keep a win rate of 50% or more over at least 10 boxes",
        tier: AchievementTier::Gold,
        requirement: 50,
        metric: Metric::WinRate,
        predicate: win_rate_with_volume,
    },
    AchievementDef {
        code: "ROOMS_3",
        name: "Explorer",
        description: "Open boxes in 3 different rooms",
        tier: AchievementTier::Silver,
        requirement: 3,
        metric: Metric::RoomsVisited,
        predicate: reaches_requirement,
    },
    AchievementDef {
        code: "ROOMS_5",
        name: "Globetrotter",
        description: "Open boxes in 5 different rooms",
        tier: AchievementTier::Gold,
        requirement: 5,
        metric: Metric::RoomsVisited,
        predicate: reaches_requirement,
    },
];

pub fn find(code: &str) -> Option<&'static AchievementDef> {
    ACHIEVEMENTS.iter().find(|a| a.code == code)
}
