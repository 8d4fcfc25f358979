//! Reward policy configuration loading from config.toml
//!
//! All reward policy lives here and is passed into the engines at
//! construction: tier thresholds, token TTL, activity rule definitions, and
//! the referral policy (activation mode, bonuses, cascade rates, caps).
//! Nothing reads ambient global state, so behavior is deterministic and
//! testable per instance.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// How a pending referral edge becomes eligible for activation.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActivationMode {
    /// Activate once the referee's lifetime points reach `activation_min_points`
    PointsThreshold,
    /// Activate on the referee's first successful token redemption
    FirstRedemption,
}

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize, Clone)]
pub struct RewardsConfig {
    /// Fixed TTL for issued discount tokens, in hours
    pub token_ttl_hours: i64,
    /// Activity rule that pays the card-bind reward, if any.
    /// The binding flow delegates here so the points policy lives in one place.
    #[serde(default)]
    pub card_bind_rule: Option<String>,
    /// Tier ladder, lowest threshold first
    pub tiers: Vec<TierConfig>,
    /// Referral engine policy
    pub referral: ReferralConfig,
    /// Activity rules to seed into the database
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

/// One rung of the tier ladder
#[derive(Debug, Deserialize, Clone)]
pub struct TierConfig {
    /// Tier name stored on the wallet (e.g. `"bronze"`)
    pub name: String,
    /// Lifetime points required to reach this tier
    pub min_lifetime_points: i64,
}

/// Referral policy, passed to `ReferralEngine::new`
#[derive(Debug, Deserialize, Clone)]
pub struct ReferralConfig {
    /// Named activation policy
    pub activation_mode: ActivationMode,
    /// Lifetime points threshold for `points_threshold` mode
    pub activation_min_points: i64,
    /// Points credited to the referrer on activation
    pub bonus_inviter: i64,
    /// Points credited to the referee on activation
    pub bonus_invitee: i64,
    /// Cascade rates in basis points per level (index 0 = level 1), up to 3 levels
    pub cascade_level_bps: Vec<u32>,
    /// Maximum referral activations per referrer per UTC day
    pub daily_activation_cap: i64,
    /// Whether the anti-fraud gate runs before activation
    #[serde(default = "default_true")]
    pub anti_fraud: bool,
}

/// Configuration for a single activity rule
#[derive(Debug, Deserialize, Clone)]
pub struct RuleConfig {
    /// Stable rule code (e.g. `"checkin"`)
    pub code: String,
    /// Points per successful claim
    pub points: i64,
    /// Seconds between successful claims per user
    #[serde(default)]
    pub cooldown_seconds: i64,
    /// Whether the claim must carry an in-fence location
    #[serde(default)]
    pub geo_required: bool,
    /// Geofence center latitude
    pub latitude: Option<f64>,
    /// Geofence center longitude
    pub longitude: Option<f64>,
    /// Geofence radius in meters
    pub radius_m: Option<f64>,
    /// Successful claims per user per UTC day
    pub daily_cap: Option<i64>,
    /// Whether the rule starts enabled
    #[serde(default = "default_true")]
    pub active: bool,
}

const fn default_true() -> bool {
    true
}

impl RewardsConfig {
    /// Tier name for a given lifetime point total.
    ///
    /// Returns the highest tier whose threshold the total meets; the ladder
    /// is validated non-empty with a zero-threshold base rung.
    #[must_use]
    pub fn tier_for(&self, lifetime_points: i64) -> &str {
        self.tiers
            .iter()
            .filter(|t| lifetime_points >= t.min_lifetime_points)
            .max_by_key(|t| t.min_lifetime_points)
            .map_or("", |t| t.name.as_str())
    }

    /// Validates cross-field invariants the type system cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.token_ttl_hours <= 0 {
            return Err(Error::Config {
                message: "token_ttl_hours must be positive".to_string(),
            });
        }
        if self.tiers.is_empty() {
            return Err(Error::Config {
                message: "at least one tier must be configured".to_string(),
            });
        }
        if !self.tiers.iter().any(|t| t.min_lifetime_points == 0) {
            return Err(Error::Config {
                message: "the tier ladder needs a rung at 0 lifetime points".to_string(),
            });
        }
        if self.referral.cascade_level_bps.len() > 3 {
            return Err(Error::Config {
                message: "cascade_level_bps supports at most 3 levels".to_string(),
            });
        }
        Ok(())
    }
}

/// Loads reward configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - Required fields are missing or cross-field validation fails
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<RewardsConfig> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    let config: RewardsConfig = toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;
    config.validate()?;
    Ok(config)
}

/// Loads reward configuration from the default location (./config.toml)
pub fn load_default_config() -> Result<RewardsConfig> {
    load_config("config.toml")
}
