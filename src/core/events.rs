//! Events the engine hands back to its caller.
//!
//! The engine never sends notifications itself; operation outcomes carry
//! these events and a separate delivery component turns them into
//! user-visible messages.

/// A state change worth telling the user about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// A discount token was redeemed and the wallet credited
    TokenRedeemed {
        /// Redeeming user
        user_id: String,
        /// Consumed token
        token_id: String,
        /// Points credited
        value: i64,
    },
    /// A card was durably bound to a user
    CardBound {
        /// Owning user
        user_id: String,
        /// Bound card
        card_id: String,
    },
    /// An activity claim succeeded
    ActivityRewarded {
        /// Claiming user
        user_id: String,
        /// Claimed rule
        rule_code: String,
        /// Points credited
        points: i64,
    },
    /// A referral edge activated and both sides were paid
    ReferralRewarded {
        /// Inviting user
        referrer_id: String,
        /// Invited user
        referee_id: String,
        /// Points credited to the referrer
        bonus_inviter: i64,
        /// Points credited to the referee
        bonus_invitee: i64,
    },
    /// Anti-fraud blocked a referral activation; the edge is terminal
    ReferralRejected {
        /// Inviting user
        referrer_id: String,
        /// Invited user
        referee_id: String,
        /// Which check fired
        reason: String,
    },
    /// A cascade payout reached an ancestor referrer
    BonusCascaded {
        /// Ancestor who received the payout
        referrer_id: String,
        /// Referee whose activity triggered it
        referee_id: String,
        /// Cascade depth, 1 through 3
        level: i32,
        /// Points credited
        amount: i64,
    },
}
