use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Links an invitee to the squad (and owner) whose share code they joined with.
///
/// A user can be the invitee of at most one referral at a time (unique index
/// on `invitee_waitlist_user_id`). Inviter and invitee are never the same user.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "referrals")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub squad_id: String,

    pub inviter_waitlist_user_id: String,

    #[sea_orm(unique)]
    pub invitee_waitlist_user_id: String,

    pub status: ReferralStatus,

    /// Unix timestamp (seconds).
    pub created_at: i64,

    /// Unix timestamp (seconds). Set when the invitee's email is verified.
    pub verified_at: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferralStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    /// The invitee redeemed their email verification token.
    #[sea_orm(string_value = "VERIFIED")]
    Verified,
    /// Post-launch: the invitee created a real app account. Written by an
    /// external process, consumed here by the tier recompute.
    #[sea_orm(string_value = "ACTIVATED")]
    Activated,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
