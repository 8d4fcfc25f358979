//! Shared test utilities for the reward engine.
//!
//! This module provides common helper functions for setting up test databases
//! and building reward policy instances with sensible defaults.

use crate::{
    config::rewards::{
        ActivationMode, ReferralConfig, RewardsConfig, RuleConfig, TierConfig,
    },
    errors::Result,
};
use sea_orm::DatabaseConnection;

/// Signing secret shared by token tests.
pub const TEST_SECRET: &str = "test-signing-secret";

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// A reward policy with the defaults the tests assume:
/// bronze/silver tiers at 0/1000, threshold activation at 100 points,
/// 50/25 activation bonuses, 10%/5%/2% cascade, cap 20, anti-fraud on.
pub fn test_rewards_config() -> RewardsConfig {
    RewardsConfig {
        token_ttl_hours: 24,
        card_bind_rule: None,
        tiers: vec![
            TierConfig {
                name: "bronze".to_string(),
                min_lifetime_points: 0,
            },
            TierConfig {
                name: "silver".to_string(),
                min_lifetime_points: 1000,
            },
        ],
        referral: ReferralConfig {
            activation_mode: ActivationMode::PointsThreshold,
            activation_min_points: 100,
            bonus_inviter: 50,
            bonus_invitee: 25,
            cascade_level_bps: vec![1000, 500, 200],
            daily_activation_cap: 20,
            anti_fraud: true,
        },
        rules: Vec::new(),
    }
}

/// A rule configuration with no geofence, no daily cap, and the given
/// code, points, and cooldown.
pub fn rule_config(code: &str, points: i64, cooldown_seconds: i64) -> RuleConfig {
    RuleConfig {
        code: code.to_string(),
        points,
        cooldown_seconds,
        geo_required: false,
        latitude: None,
        longitude: None,
        radius_m: None,
        daily_cap: None,
        active: true,
    }
}

/// Sets up a database with one registered user.
/// Returns (db, config) for common test scenarios.
pub async fn setup_with_user(user_id: &str) -> Result<(DatabaseConnection, RewardsConfig)> {
    let db = setup_test_db().await?;
    let cfg = test_rewards_config();
    crate::core::user::register(&db, &cfg, user_id, "Test User", "en", None).await?;
    Ok((db, cfg))
}
