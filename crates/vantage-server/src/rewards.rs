use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};

use entity::referral::{self, ReferralStatus};
use entity::reward_unlock::{self, RewardStatus};
use entity::{Referral, RewardTier, RewardUnlock, reward_tier};

use crate::util::{now_ts, uuid_v4};

/// Re-derives an inviter's reward unlocks from their current referral rows.
///
/// Deliberately not an incremental counter: the whole state is recomputed from
/// scratch so the operation is idempotent and safe to re-run after a partial
/// failure. Statuses only ever move forward along
/// LOCKED < UNLOCKED < PAYABLE < PAID; nothing here downgrades a row, even
/// when referrals have since been removed.
pub async fn recompute_tier_unlocks<C: ConnectionTrait>(
    db: &C,
    inviter_id: &str,
) -> Result<(), DbErr> {
    let verified_count = Referral::find()
        .filter(referral::Column::InviterWaitlistUserId.eq(inviter_id))
        .filter(
            referral::Column::Status
                .is_in([ReferralStatus::Verified, ReferralStatus::Activated]),
        )
        .count(db)
        .await?;

    let activated_count = Referral::find()
        .filter(referral::Column::InviterWaitlistUserId.eq(inviter_id))
        .filter(referral::Column::Status.eq(ReferralStatus::Activated))
        .count(db)
        .await?;

    let tiers = RewardTier::find()
        .order_by_asc(reward_tier::Column::TierNumber)
        .all(db)
        .await?;

    let now = now_ts();

    // Every tier is evaluated independently; no early exit.
    for tier in tiers {
        let required = tier.required_verified.max(0) as u64;
        let should_unlock = verified_count >= required;
        let should_be_payable = activated_count >= required;

        let existing = RewardUnlock::find()
            .filter(reward_unlock::Column::WaitlistUserId.eq(inviter_id))
            .filter(reward_unlock::Column::TierNumber.eq(tier.tier_number))
            .one(db)
            .await?;

        match existing {
            None => {
                // Absence means LOCKED; only materialize a row on unlock.
                if should_unlock {
                    let status = if should_be_payable {
                        RewardStatus::Payable
                    } else {
                        RewardStatus::Unlocked
                    };
                    reward_unlock::ActiveModel {
                        id: Set(uuid_v4()),
                        waitlist_user_id: Set(inviter_id.to_string()),
                        tier_number: Set(tier.tier_number),
                        status: Set(status),
                        unlocked_at: Set(Some(now)),
                        payable_at: Set(should_be_payable.then_some(now)),
                    }
                    .insert(db)
                    .await?;
                }
            }
            Some(row) => {
                let target = if should_be_payable {
                    RewardStatus::Payable
                } else if should_unlock {
                    RewardStatus::Unlocked
                } else {
                    RewardStatus::Locked
                };

                // Rank comparison is the monotonicity guard: a row only moves
                // up the lattice. PAID in particular outranks every target
                // here and stays owned by the (out-of-scope) payout process.
                if target.rank() > row.status.rank() {
                    let from_locked = row.status == RewardStatus::Locked;
                    let reaches_payable = target == RewardStatus::Payable;
                    let mut active: reward_unlock::ActiveModel = row.into();
                    active.status = Set(target);
                    if from_locked {
                        active.unlocked_at = Set(Some(now));
                    }
                    if reaches_payable {
                        active.payable_at = Set(Some(now));
                    }
                    active.update(db).await?;
                }
            }
        }
    }

    Ok(())
}
