//! Activity rule entity - Configuration for a rewardable action.
//!
//! A rule names the points it grants and the gates a claim must pass:
//! cooldown, optional geofence, optional daily cap, and an active window.
//! Rules are seeded from `config.toml` and toggled by operators.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Activity rule database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "activity_rules")]
pub struct Model {
    /// Unique identifier for the rule
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Stable rule code claims refer to (e.g. `"checkin"`)
    #[sea_orm(unique)]
    pub code: String,
    /// Points awarded per successful claim
    pub points: i64,
    /// Minimum seconds between successful claims per user
    pub cooldown_seconds: i64,
    /// Whether the claim must carry a location inside the geofence
    pub geo_required: bool,
    /// Geofence center latitude
    pub latitude: Option<f64>,
    /// Geofence center longitude
    pub longitude: Option<f64>,
    /// Geofence radius in meters
    pub radius_m: Option<f64>,
    /// Maximum successful claims per user per UTC day, None = uncapped
    pub daily_cap: Option<i64>,
    /// Operator kill switch
    pub active: bool,
    /// Start of the rule's active window
    pub start_at: Option<DateTimeUtc>,
    /// End of the rule's active window
    pub end_at: Option<DateTimeUtc>,
}

/// Defines relationships between `ActivityRule` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
