pub mod waitlist_user;
pub mod squad;
pub mod referral;
pub mod email_verification_token;
pub mod reward_tier;
pub mod reward_unlock;

pub use waitlist_user::Entity as WaitlistUser;
pub use squad::Entity as Squad;
pub use referral::Entity as Referral;
pub use email_verification_token::Entity as EmailVerificationToken;
pub use reward_tier::Entity as RewardTier;
pub use reward_unlock::Entity as RewardUnlock;
