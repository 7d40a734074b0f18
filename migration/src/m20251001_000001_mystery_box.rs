use sea_orm_migration::prelude::*;

/// Campaigns (活动)
#[derive(DeriveIden)]
enum Campaigns {
    Table,
    Id,
    Name,
    IsActive,
    StartDate,
    EndDate,
    RoomSize,
    RoomUnlockThreshold,
    CreatedAt,
    UpdatedAt,
}

/// Mystery boxes (盲盒格子)
#[derive(DeriveIden)]
enum MysteryBoxes {
    Table,
    Id,
    CampaignId,
    BoxNumber,
    Status,
    PrizeId,
    OpenedBy,
    OpenedAt,
    CreatedAt,
}

/// Prizes (奖品池)
#[derive(DeriveIden)]
enum Prizes {
    Table,
    Id,
    CampaignId,
    Name,
    Tier,
    PrizeType,
    ImageUrl,
    BaseProbability,
    StockTotal,
    StockRemaining,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

/// Coupon balances (门店优惠券账户)
#[derive(DeriveIden)]
enum CouponBalances {
    Table,
    Id,
    StoreId,
    CampaignId,
    TotalEarned,
    TotalUsed,
    CreatedAt,
    UpdatedAt,
}

/// Box open records (开盒记录, 只追加)
#[derive(DeriveIden)]
enum BoxOpenRecords {
    Table,
    Id,
    StoreId,
    CampaignId,
    BoxId,
    BoxNumber,
    PrizeId,
    PrizeName,
    PrizeTier,
    PrizeType,
    OpenedAt,
}

/// User prizes (领奖记录)
#[derive(DeriveIden)]
enum UserPrizes {
    Table,
    Id,
    StoreId,
    CampaignId,
    OpenRecordId,
    PrizeId,
    ClaimStatus,
    CreatedAt,
    UpdatedAt,
}

/// Achievement progress (成就进度)
#[derive(DeriveIden)]
enum AchievementProgress {
    Table,
    Id,
    StoreId,
    AchievementCode,
    Progress,
    UnlockedAt,
    CreatedAt,
    UpdatedAt,
}

/// Audit logs (审计日志)
#[derive(DeriveIden)]
enum AuditLogs {
    Table,
    Id,
    ActorType,
    ActorId,
    Action,
    EntityType,
    EntityId,
    CampaignId,
    Details,
    CreatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

/// 外键全部写在建表语句内（SQLite 不支持 ALTER TABLE ADD CONSTRAINT）
#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Campaigns::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Campaigns::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Campaigns::Name).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Campaigns::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Campaigns::StartDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Campaigns::EndDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Campaigns::RoomSize)
                            .integer()
                            .not_null()
                            .default(100),
                    )
                    // NULL = 所有房间始终解锁
                    .col(ColumnDef::new(Campaigns::RoomUnlockThreshold).integer().null())
                    .col(
                        ColumnDef::new(Campaigns::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Campaigns::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Prizes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Prizes::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Prizes::CampaignId).big_integer().not_null())
                    .col(ColumnDef::new(Prizes::Name).string_len(255).not_null())
                    .col(ColumnDef::new(Prizes::Tier).string_len(8).not_null())
                    .col(
                        ColumnDef::new(Prizes::PrizeType)
                            .string_len(16)
                            .not_null()
                            .default("physical"),
                    )
                    .col(ColumnDef::new(Prizes::ImageUrl).string_len(1024).null())
                    .col(
                        ColumnDef::new(Prizes::BaseProbability)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(Prizes::StockTotal)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Prizes::StockRemaining)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Prizes::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Prizes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Prizes::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_prizes_campaign")
                            .from(Prizes::Table, Prizes::CampaignId)
                            .to(Campaigns::Table, Campaigns::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_prizes_campaign")
                    .table(Prizes::Table)
                    .col(Prizes::CampaignId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MysteryBoxes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MysteryBoxes::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(MysteryBoxes::CampaignId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(MysteryBoxes::BoxNumber).integer().not_null())
                    .col(
                        ColumnDef::new(MysteryBoxes::Status)
                            .string_len(16)
                            .not_null()
                            .default("available"),
                    )
                    // 预分配奖品（开盒流程不读取）
                    .col(ColumnDef::new(MysteryBoxes::PrizeId).big_integer().null())
                    .col(ColumnDef::new(MysteryBoxes::OpenedBy).big_integer().null())
                    .col(
                        ColumnDef::new(MysteryBoxes::OpenedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(MysteryBoxes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_mystery_boxes_campaign")
                            .from(MysteryBoxes::Table, MysteryBoxes::CampaignId)
                            .to(Campaigns::Table, Campaigns::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_mystery_boxes_campaign_number_unique")
                    .table(MysteryBoxes::Table)
                    .col(MysteryBoxes::CampaignId)
                    .col(MysteryBoxes::BoxNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CouponBalances::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CouponBalances::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CouponBalances::StoreId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CouponBalances::CampaignId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CouponBalances::TotalEarned)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(CouponBalances::TotalUsed)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(CouponBalances::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(CouponBalances::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // 每个门店每个活动一条账户
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_coupon_balances_store_campaign_unique")
                    .table(CouponBalances::Table)
                    .col(CouponBalances::StoreId)
                    .col(CouponBalances::CampaignId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_coupon_balances_campaign")
                    .table(CouponBalances::Table)
                    .col(CouponBalances::CampaignId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BoxOpenRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BoxOpenRecords::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(BoxOpenRecords::StoreId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BoxOpenRecords::CampaignId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(BoxOpenRecords::BoxId).big_integer().not_null())
                    .col(ColumnDef::new(BoxOpenRecords::BoxNumber).integer().not_null())
                    .col(
                        ColumnDef::new(BoxOpenRecords::PrizeId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BoxOpenRecords::PrizeName)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(BoxOpenRecords::PrizeTier).string_len(8).not_null())
                    .col(
                        ColumnDef::new(BoxOpenRecords::PrizeType)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BoxOpenRecords::OpenedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_box_open_records_box")
                            .from(BoxOpenRecords::Table, BoxOpenRecords::BoxId)
                            .to(MysteryBoxes::Table, MysteryBoxes::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_box_open_records_prize")
                            .from(BoxOpenRecords::Table, BoxOpenRecords::PrizeId)
                            .to(Prizes::Table, Prizes::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // 一个盒子最多一条开盒记录
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_box_open_records_box_unique")
                    .table(BoxOpenRecords::Table)
                    .col(BoxOpenRecords::BoxId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_box_open_records_store_campaign")
                    .table(BoxOpenRecords::Table)
                    .col(BoxOpenRecords::StoreId)
                    .col(BoxOpenRecords::CampaignId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UserPrizes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserPrizes::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UserPrizes::StoreId).big_integer().not_null())
                    .col(ColumnDef::new(UserPrizes::CampaignId).big_integer().not_null())
                    .col(
                        ColumnDef::new(UserPrizes::OpenRecordId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(UserPrizes::PrizeId).big_integer().not_null())
                    .col(
                        ColumnDef::new(UserPrizes::ClaimStatus)
                            .string_len(16)
                            .not_null()
                            .default("unclaimed"),
                    )
                    .col(
                        ColumnDef::new(UserPrizes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(UserPrizes::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_prizes_open_record")
                            .from(UserPrizes::Table, UserPrizes::OpenRecordId)
                            .to(BoxOpenRecords::Table, BoxOpenRecords::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AchievementProgress::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AchievementProgress::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AchievementProgress::StoreId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AchievementProgress::AchievementCode)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AchievementProgress::Progress)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(AchievementProgress::UnlockedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(AchievementProgress::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(AchievementProgress::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_achievement_progress_store_code_unique")
                    .table(AchievementProgress::Table)
                    .col(AchievementProgress::StoreId)
                    .col(AchievementProgress::AchievementCode)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AuditLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AuditLogs::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AuditLogs::ActorType).string_len(32).not_null())
                    .col(ColumnDef::new(AuditLogs::ActorId).big_integer().not_null())
                    .col(ColumnDef::new(AuditLogs::Action).string_len(64).not_null())
                    .col(ColumnDef::new(AuditLogs::EntityType).string_len(32).not_null())
                    .col(ColumnDef::new(AuditLogs::EntityId).big_integer().not_null())
                    .col(ColumnDef::new(AuditLogs::CampaignId).big_integer().null())
                    .col(ColumnDef::new(AuditLogs::Details).json().null())
                    .col(
                        ColumnDef::new(AuditLogs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 删除顺序：依赖方在前
        manager
            .drop_table(Table::drop().if_exists().table(AuditLogs::Table).to_owned())
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .if_exists()
                    .table(AchievementProgress::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(UserPrizes::Table).to_owned())
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .if_exists()
                    .table(BoxOpenRecords::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .if_exists()
                    .table(CouponBalances::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(MysteryBoxes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(Prizes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(Campaigns::Table).to_owned())
            .await?;

        Ok(())
    }
}
