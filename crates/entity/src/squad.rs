use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A referral room owned by one waitlist user.
///
/// The `share_code` is the only external handle for joining or inspecting a
/// squad. Squads are created lazily on the owner's first join and never
/// deleted afterwards.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "squads")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(unique)]
    pub owner_waitlist_user_id: String,

    /// 8-char URL-safe code, globally unique.
    #[sea_orm(unique)]
    pub share_code: String,

    /// Unix timestamp (seconds).
    pub created_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
