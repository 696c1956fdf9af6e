use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Per-inviter, per-tier unlock state. Absence of a row means LOCKED.
///
/// Status only ever moves forward (LOCKED < UNLOCKED < PAYABLE < PAID);
/// the recompute never downgrades a row even if referrals are later removed.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "reward_unlocks")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub waitlist_user_id: String,

    pub tier_number: i32,

    pub status: RewardStatus,

    /// Unix timestamp (seconds).
    pub unlocked_at: Option<i64>,

    /// Unix timestamp (seconds).
    pub payable_at: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RewardStatus {
    /// Normally implied by row absence; kept so the lattice is total.
    #[sea_orm(string_value = "LOCKED")]
    Locked,
    #[sea_orm(string_value = "UNLOCKED")]
    Unlocked,
    #[sea_orm(string_value = "PAYABLE")]
    Payable,
    #[sea_orm(string_value = "PAID")]
    Paid,
}

impl RewardStatus {
    /// Position in the monotonic lattice. Transitions must never decrease this.
    pub fn rank(&self) -> u8 {
        match self {
            RewardStatus::Locked => 0,
            RewardStatus::Unlocked => 1,
            RewardStatus::Payable => 2,
            RewardStatus::Paid => 3,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
