use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Email-ownership verification tokens.
///
/// Only the SHA-256 hash of the token is persisted; the raw token exists in
/// the outbound email link and the inbound confirm request, nowhere else.
/// Issuing a new token marks all prior unused tokens for the user as used,
/// so at most one token per user is live at a time.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "email_verification_tokens")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub waitlist_user_id: String,

    /// SHA-256 hex digest of the raw token.
    #[sea_orm(unique)]
    pub token_hash: String,

    /// Unix timestamp (seconds), 24 hours from issuance. A token is valid
    /// strictly before this instant.
    pub expires_at: i64,

    /// Unix timestamp (seconds). Set on redemption or supersession.
    pub used_at: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
