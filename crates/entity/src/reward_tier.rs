use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Reference data: a reward milestone unlocked at N verified referrals.
/// Seeded by migration, never written by the endpoints.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "reward_tiers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub tier_number: i32,

    pub required_verified: i32,

    pub reward_title: String,

    pub reward_description: String,

    /// Display hint: the reward is only fulfilled once referrals activate.
    pub requires_activation: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
