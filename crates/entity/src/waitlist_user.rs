use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A waitlist participant, keyed by normalized (lowercased, trimmed) email.
///
/// Exactly one row exists per normalized email; the unique index on `email`
/// is the source of truth for that, the engine's lookup-before-insert is only
/// an optimization.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "waitlist_users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(unique)]
    pub email: String,

    pub status: UserStatus,

    /// Unix timestamp (seconds). Set once, when the verification token is redeemed.
    pub verified_at: Option<i64>,

    /// IP that submitted the first join for this email.
    pub ip_first: String,

    pub user_agent_first: Option<String>,

    /// Unix timestamp (seconds).
    pub created_at: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "VERIFIED")]
    Verified,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
