//! Unified error type for the reward engine.
//!
//! Every engine operation returns `Result<T>`; expected, recoverable-by-caller
//! outcomes (validation, policy, referral integrity, concurrency) are variants
//! of [`Error`] and never panic. Only infrastructure failure (store unreachable,
//! broken configuration) is surfaced separately so callers can apply their own
//! retry policy. [`Error::code`] yields the stable wire code front ends map to
//! localized messages; the engine itself only emits codes plus context.

use thiserror::Error;

/// All expected engine outcomes plus infrastructure failures.
#[derive(Debug, Error)]
pub enum Error {
    // --- validation ---
    /// Token is unknown or its signature does not match its metadata.
    #[error("invalid or unknown discount token")]
    InvalidToken,

    /// Card bind signature does not verify against the service secret.
    #[error("card bind signature mismatch")]
    InvalidSignature,

    /// Token TTL elapsed before redemption.
    #[error("token expired at {expires_at}")]
    Expired {
        /// The expiry instant that has passed.
        expires_at: chrono::DateTime<chrono::Utc>,
    },

    /// One-time bind token was already consumed.
    #[error("bind token already used")]
    TokenUsed,

    /// Card is actively bound to a different user.
    #[error("card {card_id} is already linked to another user")]
    AlreadyLinked {
        /// Card that holds an active binding.
        card_id: String,
    },

    /// Ledger entries must move a non-zero number of points.
    #[error("ledger amount must be non-zero")]
    ZeroAmount,

    // --- policy ---
    /// Rule was claimed again before its cooldown elapsed.
    #[error("cooldown active, retry in {retry_after_seconds}s")]
    CooldownActive {
        /// Seconds remaining until the rule can be claimed again.
        retry_after_seconds: i64,
    },

    /// Rule is inactive or outside its start/end window.
    #[error("rule {code} is disabled or outside its active window")]
    RuleDisabled {
        /// The rule code that was claimed.
        code: String,
    },

    /// Rule requires a location and the claim carried none.
    #[error("rule requires a location")]
    GeoRequired,

    /// Claim location is outside the rule's geofence.
    #[error("location is {distance_m:.0}m from the target, allowed radius {radius_m:.0}m")]
    OutOfCoverage {
        /// Distance from the rule's reference point in meters.
        distance_m: f64,
        /// Allowed radius in meters.
        radius_m: f64,
    },

    /// A daily cap (rule claims or referral activations) is exhausted.
    #[error("daily cap of {cap} reached")]
    DailyCapExceeded {
        /// The configured cap that was hit.
        cap: i64,
    },

    /// A spend would drive the wallet balance below zero.
    #[error("insufficient balance: have {balance}, need {required}")]
    InsufficientBalance {
        /// Current wallet balance.
        balance: i64,
        /// Points the operation tried to debit.
        required: i64,
    },

    // --- referral integrity ---
    /// A user tried to attach to their own referral code.
    #[error("self-invite is forbidden")]
    SelfInviteForbidden,

    /// The referee already has a referrer; first write wins.
    #[error("referee is already attached to a referrer")]
    AlreadyAttached,

    /// Anti-fraud checks blocked referral activation.
    #[error("referral rejected by anti-fraud checks: {reason}")]
    AntiFraudRejected {
        /// Which check fired (shared fingerprint, shared card).
        reason: String,
    },

    // --- concurrency ---
    /// A concurrent redeem consumed the token first.
    #[error("token was already redeemed")]
    AlreadyRedeemed,

    /// Write conflict on a contended row; the caller may retry.
    #[error("write conflict, safe to retry")]
    Conflict,

    // --- lookups ---
    /// No user row for the supplied identity.
    #[error("user {user_id} not found")]
    UserNotFound {
        /// The missing user id.
        user_id: String,
    },

    /// No wallet row for the user (provisioning bug).
    #[error("wallet for user {user_id} not found")]
    WalletNotFound {
        /// The user whose wallet is missing.
        user_id: String,
    },

    /// No activity rule with the supplied code.
    #[error("activity rule {code} not found")]
    RuleNotFound {
        /// The unknown rule code.
        code: String,
    },

    /// No referral code row matches the supplied code.
    #[error("referral code {code} not found")]
    CodeNotFound {
        /// The unknown referral code.
        code: String,
    },

    // --- infrastructure ---
    /// Underlying store failure; logged and retried by the caller's policy.
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Broken or missing configuration.
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable description of what is misconfigured.
        message: String,
    },

    /// I/O error reading configuration files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Required environment variable is missing or invalid.
    #[error("environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),
}

impl Error {
    /// Stable wire code for the front-end result vocabulary.
    ///
    /// Front ends map each code to one localized message; the engine never
    /// produces user-facing text itself.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidToken => "InvalidToken",
            Self::InvalidSignature => "InvalidSignature",
            Self::Expired { .. } => "Expired",
            Self::TokenUsed => "TokenUsed",
            Self::AlreadyLinked { .. } => "AlreadyLinked",
            Self::ZeroAmount => "ZeroAmount",
            Self::CooldownActive { .. } => "CooldownActive",
            Self::RuleDisabled { .. } => "RuleDisabled",
            Self::GeoRequired => "GeoRequired",
            Self::OutOfCoverage { .. } => "OutOfCoverage",
            Self::DailyCapExceeded { .. } => "DailyCapExceeded",
            Self::InsufficientBalance { .. } => "InsufficientBalance",
            Self::SelfInviteForbidden => "SelfInviteForbidden",
            Self::AlreadyAttached => "AlreadyAttached",
            Self::AntiFraudRejected { .. } => "AntiFraudRejected",
            Self::AlreadyRedeemed => "AlreadyRedeemed",
            Self::Conflict => "Conflict",
            Self::UserNotFound { .. } => "UserNotFound",
            Self::WalletNotFound { .. } => "WalletNotFound",
            Self::RuleNotFound { .. } => "RuleNotFound",
            Self::CodeNotFound { .. } => "CodeNotFound",
            Self::Database(_) => "Internal",
            Self::Config { .. } => "Internal",
            Self::Io(_) => "Internal",
            Self::EnvVar(_) => "Internal",
        }
    }

    /// Whether the caller may safely retry the operation as-is.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict | Self::Database(_))
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
