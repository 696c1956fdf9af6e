use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(WaitlistUsers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WaitlistUsers::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(WaitlistUsers::Email).string().not_null())
                    .col(ColumnDef::new(WaitlistUsers::Status).string().not_null())
                    .col(ColumnDef::new(WaitlistUsers::VerifiedAt).big_integer())
                    .col(ColumnDef::new(WaitlistUsers::IpFirst).string().not_null())
                    .col(ColumnDef::new(WaitlistUsers::UserAgentFirst).string())
                    .col(
                        ColumnDef::new(WaitlistUsers::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // The engine's lookup-before-insert is only an optimization; this
        // unique index is the actual duplicate-email guard under races.
        manager
            .create_index(
                Index::create()
                    .name("idx_waitlist_users_email")
                    .table(WaitlistUsers::Table)
                    .col(WaitlistUsers::Email)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Squads::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Squads::Id).string().not_null().primary_key())
                    .col(
                        ColumnDef::new(Squads::OwnerWaitlistUserId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Squads::ShareCode).string().not_null())
                    .col(ColumnDef::new(Squads::CreatedAt).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_squads_owner")
                    .table(Squads::Table)
                    .col(Squads::OwnerWaitlistUserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_squads_share_code")
                    .table(Squads::Table)
                    .col(Squads::ShareCode)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Referrals::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Referrals::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Referrals::SquadId).string().not_null())
                    .col(
                        ColumnDef::new(Referrals::InviterWaitlistUserId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Referrals::InviteeWaitlistUserId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Referrals::Status).string().not_null())
                    .col(ColumnDef::new(Referrals::CreatedAt).big_integer().not_null())
                    .col(ColumnDef::new(Referrals::VerifiedAt).big_integer())
                    .to_owned(),
            )
            .await?;

        // A user can be invited into only one squad at a time.
        manager
            .create_index(
                Index::create()
                    .name("idx_referrals_invitee")
                    .table(Referrals::Table)
                    .col(Referrals::InviteeWaitlistUserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_referrals_inviter")
                    .table(Referrals::Table)
                    .col(Referrals::InviterWaitlistUserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Referrals::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Squads::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(WaitlistUsers::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum WaitlistUsers {
    Table,
    Id,
    Email,
    Status,
    VerifiedAt,
    IpFirst,
    UserAgentFirst,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Squads {
    Table,
    Id,
    OwnerWaitlistUserId,
    ShareCode,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Referrals {
    Table,
    Id,
    SquadId,
    InviterWaitlistUserId,
    InviteeWaitlistUserId,
    Status,
    CreatedAt,
    VerifiedAt,
}
