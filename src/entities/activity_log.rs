//! Activity log entity - One row per successful claim.
//!
//! Rows accumulate and are read-only after insert. Cooldown and daily caps
//! are enforced by querying the most recent rows, not by a uniqueness
//! constraint, because the window slides with time.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Activity log database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "activity_logs")]
pub struct Model {
    /// Unique identifier for the log row
    #[sea_orm(primary_key)]
    pub id: i64,
    /// User who claimed
    pub user_id: String,
    /// Rule that was claimed
    pub rule_code: String,
    /// When the claim succeeded
    pub occurred_at: DateTimeUtc,
    /// Claim latitude, when the rule is geofenced
    pub latitude: Option<f64>,
    /// Claim longitude, when the rule is geofenced
    pub longitude: Option<f64>,
}

/// `ActivityLog` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
