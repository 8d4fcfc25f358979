//! Card bind token entity - One-time signed deep-link credentials.
//!
//! No expiry: physical cards outlive short TTLs. Exactly one
//! successful bind per token, enforced the same way as discount tokens.
//! `used_by` records who consumed the token; the referral anti-fraud gate
//! uses that trail to detect a referrer and referee binding the same card.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Card bind token database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "card_bind_tokens")]
pub struct Model {
    /// One-time nonce identifying the token
    #[sea_orm(primary_key, auto_increment = false)]
    pub token_id: String,
    /// Card this token can bind
    pub card_id: String,
    /// HMAC-SHA256 over `(card_id, token_id)`
    pub signature: String,
    /// When the token was issued
    pub issued_at: DateTimeUtc,
    /// Whether the token has been consumed
    pub used: bool,
    /// When the token was consumed
    pub used_at: Option<DateTimeUtc>,
    /// User who consumed the token
    pub used_by: Option<String>,
}

/// `CardBindToken` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
