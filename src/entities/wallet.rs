//! Wallet entity - Denormalized per-user balance derived from the ledger.
//!
//! `balance` must equal the sum of the user's ledger entries at all times;
//! the two are only ever written inside the same transaction, and periodic
//! reconciliation reports any divergence as a bug. `lifetime_points` counts
//! credits only and drives tier progression.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Wallet database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "wallets")]
pub struct Model {
    /// Unique identifier for the wallet
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning user; exactly one wallet per user
    #[sea_orm(unique)]
    pub user_id: String,
    /// Current spendable balance, never negative
    pub balance: i64,
    /// Total points ever credited, never decreases
    pub lifetime_points: i64,
    /// Tier name computed from `lifetime_points` and the configured thresholds
    pub tier: String,
    /// Last balance-affecting write
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Wallet and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each wallet belongs to one user
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
