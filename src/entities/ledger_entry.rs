//! Ledger entry entity - The append-only log of signed point movements.
//!
//! Rows are immutable once inserted; corrections are new offsetting entries,
//! never updates or deletes. `reason` is a closed enum so that adding a new
//! movement kind is a data change, not a branch scattered across call sites.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Why a ledger entry moved points.
#[derive(Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum LedgerReason {
    /// Rule-gated activity reward
    #[sea_orm(string_value = "activity")]
    Activity,
    /// Referral activation bonus or cascade payout
    #[sea_orm(string_value = "referral_bonus")]
    ReferralBonus,
    /// Discount token redemption credit
    #[sea_orm(string_value = "redemption")]
    Redemption,
    /// User-initiated spend (debit)
    #[sea_orm(string_value = "spend")]
    Spend,
    /// Operator adjustment
    #[sea_orm(string_value = "manual")]
    Manual,
}

/// Ledger entry database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ledger_entries")]
pub struct Model {
    /// Unique identifier for the entry
    #[sea_orm(primary_key)]
    pub id: i64,
    /// User whose wallet this entry affects
    pub user_id: String,
    /// Signed point movement, never zero
    pub amount: i64,
    /// What produced this entry
    pub reason: LedgerReason,
    /// Identifier of the originating claim (token id, rule code, edge id, ...)
    pub reference_id: String,
    /// When the entry was appended
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `LedgerEntry` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each entry belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
