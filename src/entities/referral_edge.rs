//! Referral edge entity - A directed referrer-to-referee relationship.
//!
//! A referee has at most one referrer (unique `referee_id`, first write
//! wins). The lifecycle moves forward only: `pending` to `activated` to
//! `rewarded`, or `pending` to `rejected` when anti-fraud fires. A rejected
//! edge is terminal.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a referral edge.
#[derive(Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum ReferralStatus {
    /// Attached, activation criteria not yet met
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Activation criteria met and anti-fraud passed
    #[sea_orm(string_value = "activated")]
    Activated,
    /// Activation bonuses paid out
    #[sea_orm(string_value = "rewarded")]
    Rewarded,
    /// Blocked by anti-fraud; terminal
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

/// Referral edge database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "referral_edges")]
pub struct Model {
    /// Unique identifier for the edge
    #[sea_orm(primary_key)]
    pub id: i64,
    /// The inviting user
    pub referrer_id: String,
    /// The invited user; at most one referrer per referee
    #[sea_orm(unique)]
    pub referee_id: String,
    /// Current lifecycle state
    pub status: ReferralStatus,
    /// When the edge was created (deep-link attach)
    pub created_at: DateTimeUtc,
    /// When activation criteria were met
    pub activated_at: Option<DateTimeUtc>,
}

/// `ReferralEdge` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
