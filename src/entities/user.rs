//! User entity - The stable identity the auth layer hands us.
//!
//! The engine trusts the verified `id` supplied by the identity collaborator
//! and never re-authenticates. Each user owns exactly one wallet, created
//! together with the user at zero balance. The optional `contact_fingerprint`
//! is the verified-contact hash the referral anti-fraud gate compares.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Verified external identity (primary key, supplied by the auth layer)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Display name shown by front ends
    pub display_name: String,
    /// Language preference (BCP 47 tag, e.g. `"en"`, `"ru"`)
    pub language: String,
    /// Hash of the user's verified contact, used by referral anti-fraud
    pub contact_fingerprint: Option<String>,
    /// When the user was registered
    pub created_at: DateTimeUtc,
}

/// Defines relationships between User and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each user owns exactly one wallet
    #[sea_orm(has_one = "super::wallet::Entity")]
    Wallet,
    /// One user has many ledger entries
    #[sea_orm(has_many = "super::ledger_entry::Entity")]
    LedgerEntries,
}

impl Related<super::wallet::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Wallet.def()
    }
}

impl Related<super::ledger_entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LedgerEntries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
