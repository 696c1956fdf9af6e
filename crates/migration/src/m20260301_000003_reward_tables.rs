use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RewardTiers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RewardTiers::TierNumber)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RewardTiers::RequiredVerified)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RewardTiers::RewardTitle).string().not_null())
                    .col(
                        ColumnDef::new(RewardTiers::RewardDescription)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RewardTiers::RequiresActivation)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RewardUnlocks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RewardUnlocks::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RewardUnlocks::WaitlistUserId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RewardUnlocks::TierNumber)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RewardUnlocks::Status).string().not_null())
                    .col(ColumnDef::new(RewardUnlocks::UnlockedAt).big_integer())
                    .col(ColumnDef::new(RewardUnlocks::PayableAt).big_integer())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reward_unlocks_user_tier")
                    .table(RewardUnlocks::Table)
                    .col(RewardUnlocks::WaitlistUserId)
                    .col(RewardUnlocks::TierNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Reference tier ladder: 2/4/6/8 verified referrals.
        let seed = Query::insert()
            .into_table(RewardTiers::Table)
            .columns([
                RewardTiers::TierNumber,
                RewardTiers::RequiredVerified,
                RewardTiers::RewardTitle,
                RewardTiers::RewardDescription,
                RewardTiers::RequiresActivation,
            ])
            .values_panic([
                1.into(),
                2.into(),
                "Founding Squad Badge".into(),
                "Exclusive founding-member badge on your Vantage profile at launch.".into(),
                false.into(),
            ])
            .values_panic([
                2.into(),
                4.into(),
                "One Month of Vantage Pro".into(),
                "Thirty days of Vantage Pro insights, free, when the app goes live.".into(),
                false.into(),
            ])
            .values_panic([
                3.into(),
                6.into(),
                "Limited Merch Drop".into(),
                "Early-supporter merch pack, shipped after launch.".into(),
                true.into(),
            ])
            .values_panic([
                4.into(),
                8.into(),
                "$50 Bet Credit".into(),
                "Fifty dollars of free bet credit, payable once your squad activates.".into(),
                true.into(),
            ])
            .to_owned();

        manager.exec_stmt(seed).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RewardUnlocks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RewardTiers::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum RewardTiers {
    Table,
    TierNumber,
    RequiredVerified,
    RewardTitle,
    RewardDescription,
    RequiresActivation,
}

#[derive(DeriveIden)]
enum RewardUnlocks {
    Table,
    Id,
    WaitlistUserId,
    TierNumber,
    Status,
    UnlockedAt,
    PayableAt,
}
