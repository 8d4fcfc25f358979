//! Referral bonus entity - One row per cascaded payout.
//!
//! The unique index on `(source_ledger_entry_id, referrer_id, level)` makes
//! the cascade idempotent: replaying the same triggering entry can never
//! credit an ancestor twice for the same level.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Referral bonus database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "referral_bonuses")]
pub struct Model {
    /// Unique identifier for the bonus row
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Ancestor referrer receiving the bonus
    pub referrer_id: String,
    /// Referee whose activity triggered the cascade
    pub referee_id: String,
    /// Cascade depth, 1 through 3
    pub level: i32,
    /// Points credited to the referrer
    pub amount: i64,
    /// The ledger entry that triggered this payout
    pub source_ledger_entry_id: i64,
    /// When the bonus was paid
    pub created_at: DateTimeUtc,
}

/// `ReferralBonus` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
