pub use sea_orm_migration::prelude::*;

mod m20260301_000001_waitlist_tables;
mod m20260301_000002_verification_tokens;
mod m20260301_000003_reward_tables;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_waitlist_tables::Migration),
            Box::new(m20260301_000002_verification_tokens::Migration),
            Box::new(m20260301_000003_reward_tables::Migration),
        ]
    }
}
