//! Discount token entity - Short-lived, single-use redemption credentials.
//!
//! The `token_id` is an unguessable nonce that is never reused; `signature`
//! is the HMAC binding the token to its metadata and expiry. `used` flips
//! false to true exactly once, enforced by a conditional update so that of N
//! concurrent redeemers exactly one wins.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Discount token database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "discount_tokens")]
pub struct Model {
    /// One-time nonce identifying the token
    #[sea_orm(primary_key, auto_increment = false)]
    pub token_id: String,
    /// Listing or partner offer this token was issued for
    pub listing_id: String,
    /// Points credited to the redeemer on success
    pub value: i64,
    /// HMAC-SHA256 over the token metadata and expiry
    pub signature: String,
    /// When the token was issued
    pub issued_at: DateTimeUtc,
    /// Fixed-TTL expiry, checked lazily at redeem time
    pub expires_at: DateTimeUtc,
    /// Whether the token has been consumed
    pub used: bool,
    /// When the token was consumed
    pub used_at: Option<DateTimeUtc>,
    /// User who redeemed the token
    pub redeemed_by: Option<String>,
}

/// `DiscountToken` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
