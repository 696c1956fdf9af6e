use std::sync::Arc;

use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use tracing::warn;

use entity::email_verification_token;
use entity::referral::{self, ReferralStatus};
use entity::reward_unlock::{self, RewardStatus};
use entity::reward_tier;
use entity::squad;
use entity::waitlist_user::{self, UserStatus};
use entity::{EmailVerificationToken, Referral, RewardTier, RewardUnlock, Squad, WaitlistUser};

use crate::error::ApiError;
use crate::mailer::Mailer;
use crate::rate_limit::RateLimiter;
use crate::rewards::recompute_tier_unlocks;
use crate::util::{
    generate_share_code, generate_verification_token, hash_token, is_valid_email, normalize_email,
    now_ts, uuid_v4,
};

/// Room capacity counts the owner, so an inviter holds at most 7 referrals.
pub const ROOM_CAPACITY: u64 = 8;
pub const MAX_REFERRALS: u64 = ROOM_CAPACITY - 1;

const TOKEN_TTL_SECS: i64 = 24 * 60 * 60;
const SHARE_CODE_ATTEMPTS: u32 = 10;

/// The waitlist & squad engine. Holds no business state between requests;
/// every operation reads what it needs fresh and runs its writes inside one
/// database transaction. The only in-process mutable state is the rate
/// limiter's counters.
pub struct Engine {
    db: DatabaseConnection,
    mailer: Arc<dyn Mailer>,
    limiter: RateLimiter,
    base_url: String,
}

#[derive(Debug)]
pub struct JoinOutcome {
    /// The room the caller should land on: the inviter's room for referral
    /// joins, their own otherwise.
    pub share_code: String,
    pub already_verified: bool,
}

#[derive(Debug)]
pub enum ConfirmOutcome {
    Verified { share_code: Option<String> },
    /// Stale or duplicate link: not an error, the user is simply sent on to
    /// their squad page again.
    AlreadyUsed { share_code: Option<String> },
    Invalid,
    Expired,
}

#[derive(Debug)]
pub enum ChangeEmailTarget {
    Owner,
    Member(String),
}

#[derive(Debug, Serialize)]
pub struct SquadView {
    pub share_code: String,
    pub owner_status: UserStatus,
    pub verified_count: u64,
    pub activated_count: u64,
    pub tiers: Vec<TierView>,
    pub joined_at: i64,
}

#[derive(Debug, Serialize)]
pub struct TierView {
    pub tier_number: i32,
    pub required_verified: i32,
    pub reward_title: String,
    pub reward_description: String,
    pub requires_activation: bool,
    pub status: RewardStatus,
    pub unlocked_at: Option<i64>,
}

impl Engine {
    pub fn new(
        db: DatabaseConnection,
        mailer: Arc<dyn Mailer>,
        limiter: RateLimiter,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            db,
            mailer,
            limiter,
            base_url: base_url.into(),
        }
    }

    /// Join the waitlist, optionally into an inviter's room. Idempotent on
    /// retry with the same email: the same share code comes back and no
    /// duplicate rows are created.
    pub async fn join(
        &self,
        email: &str,
        referral_code: Option<&str>,
        ip: &str,
        user_agent: Option<&str>,
    ) -> Result<JoinOutcome, ApiError> {
        if !self.limiter.allow(&format!("join:ip:{ip}"), 5, 60_000) {
            return Err(ApiError::RateLimited);
        }

        let email = normalize_email(email);
        if !is_valid_email(&email) {
            return Err(ApiError::InvalidInput("Please enter a valid email address."));
        }

        if !self.limiter.allow(&format!("join:email:{email}"), 3, 60_000) {
            return Err(ApiError::RateLimited);
        }

        let txn = self.db.begin().await?;

        let user = self.find_or_create_user(&txn, &email, ip, user_agent).await?;

        // Re-submission by an already-verified user is a safe no-op.
        if user.status == UserStatus::Verified {
            let own = self.ensure_squad(&txn, &user.id).await?;
            txn.commit().await?;
            return Ok(JoinOutcome {
                share_code: own.share_code,
                already_verified: true,
            });
        }

        let own = self.ensure_squad(&txn, &user.id).await?;
        let mut landing_code = own.share_code.clone();

        let referral_code = referral_code.map(str::trim).filter(|c| !c.is_empty());
        if let Some(code) = referral_code {
            let Some(room) = Squad::find()
                .filter(squad::Column::ShareCode.eq(code))
                .one(&txn)
                .await?
            else {
                return Err(ApiError::NotFound("Squad not found."));
            };

            // Self-referrals are silently ignored.
            if room.owner_waitlist_user_id != user.id {
                let existing = Referral::find()
                    .filter(referral::Column::InviteeWaitlistUserId.eq(&user.id))
                    .one(&txn)
                    .await?;

                match existing {
                    Some(r) if r.squad_id == room.id => {
                        // Already in this room.
                        landing_code = room.share_code.clone();
                    }
                    Some(r) => {
                        // Invited into a different squad earlier: they stay
                        // where they are, and land back on that room.
                        if let Some(home) = Squad::find_by_id(r.squad_id).one(&txn).await? {
                            landing_code = home.share_code;
                        }
                    }
                    None => {
                        let seated = Referral::find()
                            .filter(referral::Column::SquadId.eq(&room.id))
                            .count(&txn)
                            .await?;
                        if seated >= MAX_REFERRALS {
                            return Err(ApiError::RoomFull);
                        }

                        referral::ActiveModel {
                            id: Set(uuid_v4()),
                            squad_id: Set(room.id.clone()),
                            inviter_waitlist_user_id: Set(room.owner_waitlist_user_id.clone()),
                            invitee_waitlist_user_id: Set(user.id.clone()),
                            status: Set(ReferralStatus::Pending),
                            created_at: Set(now_ts()),
                            verified_at: Set(None),
                        }
                        .insert(&txn)
                        .await?;

                        landing_code = room.share_code.clone();
                    }
                }
            }
        }

        let raw_token = self.issue_token(&txn, &user.id).await?;
        txn.commit().await?;

        self.dispatch_verification(&email, &raw_token).await;

        Ok(JoinOutcome {
            share_code: landing_code,
            already_verified: false,
        })
    }

    /// Redeem a verification token. Double redemption is safe: the second
    /// attempt takes the already-used path without touching state.
    pub async fn confirm(&self, raw_token: &str) -> Result<ConfirmOutcome, ApiError> {
        let token_hash = hash_token(raw_token);

        let txn = self.db.begin().await?;

        let Some(token) = EmailVerificationToken::find()
            .filter(email_verification_token::Column::TokenHash.eq(&token_hash))
            .one(&txn)
            .await?
        else {
            return Ok(ConfirmOutcome::Invalid);
        };

        if token.used_at.is_some() {
            let share_code = squad_code_for(&txn, &token.waitlist_user_id).await?;
            return Ok(ConfirmOutcome::AlreadyUsed { share_code });
        }

        let now = now_ts();
        // Validity is exclusive of the expiry instant.
        if now >= token.expires_at {
            return Ok(ConfirmOutcome::Expired);
        }

        let user_id = token.waitlist_user_id.clone();

        let mut token_active: email_verification_token::ActiveModel = token.into();
        token_active.used_at = Set(Some(now));
        token_active.update(&txn).await?;

        let mut verified_email: Option<String> = None;
        if let Some(user) = WaitlistUser::find_by_id(user_id.clone()).one(&txn).await? {
            verified_email = Some(user.email.clone());
            // PENDING -> VERIFIED happens at most once; VERIFIED is terminal.
            if user.status == UserStatus::Pending {
                let mut active: waitlist_user::ActiveModel = user.into();
                active.status = Set(UserStatus::Verified);
                active.verified_at = Set(Some(now));
                active.update(&txn).await?;
            }
        }

        if let Some(r) = Referral::find()
            .filter(referral::Column::InviteeWaitlistUserId.eq(&user_id))
            .one(&txn)
            .await?
        {
            // Guarded so an externally ACTIVATED referral is never regressed.
            if r.status == ReferralStatus::Pending {
                let inviter_id = r.inviter_waitlist_user_id.clone();
                let mut active: referral::ActiveModel = r.into();
                active.status = Set(ReferralStatus::Verified);
                active.verified_at = Set(Some(now));
                active.update(&txn).await?;

                recompute_tier_unlocks(&txn, &inviter_id).await?;
            }
        }

        let share_code = squad_code_for(&txn, &user_id).await?;
        txn.commit().await?;

        if let (Some(email), Some(code)) = (verified_email, share_code.as_deref()) {
            self.dispatch_welcome(&email, code).await;
        }

        Ok(ConfirmOutcome::Verified { share_code })
    }

    /// Re-send the verification email. Unknown or already-verified addresses
    /// return success silently: this endpoint must not reveal whether an
    /// email exists to an unauthenticated caller.
    pub async fn resend(&self, email: &str, ip: &str) -> Result<(), ApiError> {
        let email = normalize_email(email);
        if !is_valid_email(&email) {
            return Err(ApiError::InvalidInput("Invalid email address."));
        }

        if !self.limiter.allow(&format!("resend:email:{email}"), 1, 60_000) {
            return Err(ApiError::RateLimited);
        }
        if !self
            .limiter
            .allow(&format!("resend:email:hr:{email}"), 3, 3_600_000)
        {
            return Err(ApiError::RateLimited);
        }
        if !self.limiter.allow(&format!("resend:ip:{ip}"), 5, 60_000) {
            return Err(ApiError::RateLimited);
        }

        let Some(user) = WaitlistUser::find()
            .filter(waitlist_user::Column::Email.eq(&email))
            .one(&self.db)
            .await?
        else {
            return Ok(());
        };
        if user.status == UserStatus::Verified {
            return Ok(());
        }

        let txn = self.db.begin().await?;
        let raw_token = self.issue_token(&txn, &user.id).await?;
        txn.commit().await?;

        self.dispatch_verification(&email, &raw_token).await;
        Ok(())
    }

    /// Change the squad owner's email, or a member's, while still unverified.
    /// Identity is continuous through the change: the user id, squad, and any
    /// referral rows are preserved, only the email field moves.
    pub async fn change_email(
        &self,
        share_code: &str,
        new_email: &str,
        target: ChangeEmailTarget,
        ip: &str,
    ) -> Result<String, ApiError> {
        if !self.limiter.allow(&format!("change-email:ip:{ip}"), 3, 60_000) {
            return Err(ApiError::RateLimited);
        }

        let new_email = normalize_email(new_email);
        if !is_valid_email(&new_email) {
            return Err(ApiError::InvalidInput("Please enter a valid email address."));
        }

        if !self
            .limiter
            .allow(&format!("change-email:email:{new_email}"), 2, 60_000)
        {
            return Err(ApiError::RateLimited);
        }

        let txn = self.db.begin().await?;

        let Some(squad) = Squad::find()
            .filter(squad::Column::ShareCode.eq(share_code))
            .one(&txn)
            .await?
        else {
            return Err(ApiError::NotFound("Squad not found."));
        };

        let target_user = match target {
            ChangeEmailTarget::Owner => {
                WaitlistUser::find_by_id(squad.owner_waitlist_user_id.clone())
                    .one(&txn)
                    .await?
                    .ok_or(ApiError::NotFound("User not found."))?
            }
            ChangeEmailTarget::Member(member_id) => {
                // You may only edit members of your own squad.
                let membership = Referral::find()
                    .filter(referral::Column::SquadId.eq(&squad.id))
                    .filter(referral::Column::InviteeWaitlistUserId.eq(&member_id))
                    .one(&txn)
                    .await?
                    .ok_or(ApiError::NotSquadMember)?;
                WaitlistUser::find_by_id(membership.invitee_waitlist_user_id.clone())
                    .one(&txn)
                    .await?
                    .ok_or(ApiError::NotFound("User not found."))?
            }
        };

        // A verified identity is immutable through this path.
        if target_user.status == UserStatus::Verified {
            return Err(ApiError::AlreadyVerified);
        }

        if target_user.email == new_email {
            return Ok(squad.share_code);
        }

        if let Some(dupe) = WaitlistUser::find()
            .filter(waitlist_user::Column::Email.eq(&new_email))
            .one(&txn)
            .await?
        {
            if dupe.status == UserStatus::Verified {
                return Err(ApiError::EmailTaken);
            }
            // An unverified duplicate is reclaimable: drop it outright so the
            // address frees up for the target.
            EmailVerificationToken::delete_many()
                .filter(email_verification_token::Column::WaitlistUserId.eq(&dupe.id))
                .exec(&txn)
                .await?;
            Squad::delete_many()
                .filter(squad::Column::OwnerWaitlistUserId.eq(&dupe.id))
                .exec(&txn)
                .await?;
            Referral::delete_many()
                .filter(referral::Column::InviteeWaitlistUserId.eq(&dupe.id))
                .exec(&txn)
                .await?;
            WaitlistUser::delete_by_id(dupe.id.clone()).exec(&txn).await?;
        }

        let target_id = target_user.id.clone();
        let mut active: waitlist_user::ActiveModel = target_user.into();
        active.email = Set(new_email.clone());
        active.update(&txn).await?;

        let raw_token = self.issue_token(&txn, &target_id).await?;
        txn.commit().await?;

        self.dispatch_verification(&new_email, &raw_token).await;

        Ok(squad.share_code)
    }

    /// Remove a member from a room. Pure referral-row deletion: users, squads
    /// and already-unlocked reward tiers all survive membership removal.
    pub async fn leave(
        &self,
        room_share_code: &str,
        member_id: &str,
        ip: &str,
    ) -> Result<(), ApiError> {
        if !self.limiter.allow(&format!("leave:ip:{ip}"), 10, 60_000) {
            return Err(ApiError::RateLimited);
        }

        let Some(squad) = Squad::find()
            .filter(squad::Column::ShareCode.eq(room_share_code))
            .one(&self.db)
            .await?
        else {
            return Err(ApiError::NotFound("Room not found."));
        };

        // No-op when the member was never in the room.
        Referral::delete_many()
            .filter(referral::Column::SquadId.eq(&squad.id))
            .filter(referral::Column::InviteeWaitlistUserId.eq(member_id))
            .exec(&self.db)
            .await?;

        Ok(())
    }

    /// Read a squad's progress. Counts only, no member identities: share
    /// codes are public, so this deliberately exposes nothing personal to
    /// whoever holds one.
    pub async fn get_squad(&self, share_code: &str, ip: &str) -> Result<SquadView, ApiError> {
        if !self.limiter.allow(&format!("squad:ip:{ip}"), 30, 60_000) {
            return Err(ApiError::RateLimited);
        }

        let share_code = share_code.trim();
        if share_code.is_empty() {
            return Err(ApiError::InvalidInput("Invalid share code."));
        }

        let Some(squad) = Squad::find()
            .filter(squad::Column::ShareCode.eq(share_code))
            .one(&self.db)
            .await?
        else {
            return Err(ApiError::NotFound("Squad not found."));
        };

        let owner = WaitlistUser::find_by_id(squad.owner_waitlist_user_id.clone())
            .one(&self.db)
            .await?
            .ok_or(ApiError::NotFound("Squad not found."))?;

        let verified_count = Referral::find()
            .filter(referral::Column::InviterWaitlistUserId.eq(&owner.id))
            .filter(
                referral::Column::Status
                    .is_in([ReferralStatus::Verified, ReferralStatus::Activated]),
            )
            .count(&self.db)
            .await?;

        let activated_count = Referral::find()
            .filter(referral::Column::InviterWaitlistUserId.eq(&owner.id))
            .filter(referral::Column::Status.eq(ReferralStatus::Activated))
            .count(&self.db)
            .await?;

        let tiers = RewardTier::find()
            .order_by_asc(reward_tier::Column::TierNumber)
            .all(&self.db)
            .await?;

        let unlocks = RewardUnlock::find()
            .filter(reward_unlock::Column::WaitlistUserId.eq(&owner.id))
            .all(&self.db)
            .await?;

        let tier_views = tiers
            .into_iter()
            .map(|tier| {
                let unlock = unlocks.iter().find(|u| u.tier_number == tier.tier_number);
                TierView {
                    tier_number: tier.tier_number,
                    required_verified: tier.required_verified,
                    reward_title: tier.reward_title,
                    reward_description: tier.reward_description,
                    requires_activation: tier.requires_activation,
                    status: unlock
                        .map(|u| u.status.clone())
                        .unwrap_or(RewardStatus::Locked),
                    unlocked_at: unlock.and_then(|u| u.unlocked_at),
                }
            })
            .collect();

        Ok(SquadView {
            share_code: squad.share_code,
            owner_status: owner.status,
            verified_count,
            activated_count,
            tiers: tier_views,
            joined_at: squad.created_at,
        })
    }

    async fn find_or_create_user<C: ConnectionTrait>(
        &self,
        db: &C,
        email: &str,
        ip: &str,
        user_agent: Option<&str>,
    ) -> Result<waitlist_user::Model, ApiError> {
        if let Some(user) = WaitlistUser::find()
            .filter(waitlist_user::Column::Email.eq(email))
            .one(db)
            .await?
        {
            return Ok(user);
        }

        let inserted = waitlist_user::ActiveModel {
            id: Set(uuid_v4()),
            email: Set(email.to_string()),
            status: Set(UserStatus::Pending),
            verified_at: Set(None),
            ip_first: Set(ip.to_string()),
            user_agent_first: Set(user_agent.map(|s| s.to_string())),
            created_at: Set(now_ts()),
        }
        .insert(db)
        .await;

        match inserted {
            Ok(user) => Ok(user),
            Err(insert_err) => {
                // Lost an insert race: the unique email index is the source
                // of truth, so re-read and proceed as "found".
                match WaitlistUser::find()
                    .filter(waitlist_user::Column::Email.eq(email))
                    .one(db)
                    .await?
                {
                    Some(user) => Ok(user),
                    None => Err(insert_err.into()),
                }
            }
        }
    }

    async fn ensure_squad<C: ConnectionTrait>(
        &self,
        db: &C,
        owner_id: &str,
    ) -> Result<squad::Model, ApiError> {
        if let Some(existing) = Squad::find()
            .filter(squad::Column::OwnerWaitlistUserId.eq(owner_id))
            .one(db)
            .await?
        {
            return Ok(existing);
        }

        for _ in 0..SHARE_CODE_ATTEMPTS {
            let code = generate_share_code();

            // Pre-check is an optimization; the unique index decides.
            let collision = Squad::find()
                .filter(squad::Column::ShareCode.eq(&code))
                .one(db)
                .await?;
            if collision.is_some() {
                continue;
            }

            let inserted = squad::ActiveModel {
                id: Set(uuid_v4()),
                owner_waitlist_user_id: Set(owner_id.to_string()),
                share_code: Set(code),
                created_at: Set(now_ts()),
            }
            .insert(db)
            .await;

            match inserted {
                Ok(squad) => return Ok(squad),
                Err(_) => {
                    // Either the code or the owner constraint fired. If a
                    // concurrent join created this owner's squad, use it.
                    if let Some(existing) = Squad::find()
                        .filter(squad::Column::OwnerWaitlistUserId.eq(owner_id))
                        .one(db)
                        .await?
                    {
                        return Ok(existing);
                    }
                }
            }
        }

        Err(ApiError::ShareCodeExhausted)
    }

    /// Supersede all live tokens for the user and mint a fresh one with a
    /// 24-hour expiry. Returns the raw token; only its hash hits storage.
    async fn issue_token<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: &str,
    ) -> Result<String, DbErr> {
        let now = now_ts();

        EmailVerificationToken::update_many()
            .col_expr(email_verification_token::Column::UsedAt, Expr::value(now))
            .filter(email_verification_token::Column::WaitlistUserId.eq(user_id))
            .filter(email_verification_token::Column::UsedAt.is_null())
            .exec(db)
            .await?;

        let raw_token = generate_verification_token();

        email_verification_token::ActiveModel {
            id: Set(uuid_v4()),
            waitlist_user_id: Set(user_id.to_string()),
            token_hash: Set(hash_token(&raw_token)),
            expires_at: Set(now + TOKEN_TTL_SECS),
            used_at: Set(None),
        }
        .insert(db)
        .await?;

        Ok(raw_token)
    }

    async fn dispatch_verification(&self, email: &str, raw_token: &str) {
        let verify_url = format!("{}/waitlist/confirm?token={raw_token}", self.base_url);
        let to_name = email.split('@').next().unwrap_or(email);
        if let Err(e) = self
            .mailer
            .send_verification_email(email, to_name, &verify_url)
            .await
        {
            warn!("Verification email to {email} failed: {e}");
        }
    }

    async fn dispatch_welcome(&self, email: &str, share_code: &str) {
        let squad_url = format!("{}/squad/{share_code}", self.base_url);
        let to_name = email.split('@').next().unwrap_or(email);
        if let Err(e) = self
            .mailer
            .send_welcome_email(email, to_name, &squad_url)
            .await
        {
            warn!("Welcome email to {email} failed: {e}");
        }
    }
}

async fn squad_code_for<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
) -> Result<Option<String>, DbErr> {
    Ok(Squad::find()
        .filter(squad::Column::OwnerWaitlistUserId.eq(user_id))
        .one(db)
        .await?
        .map(|s| s.share_code))
}
