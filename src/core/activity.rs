//! Activity reward engine - evaluates claims against the rule catalog.
//!
//! A claim passes the rule's gates in order (active window, geofence,
//! cooldown, daily cap) and then inserts the activity log row and the ledger
//! entry inside one transaction. The gate reads and the writes run on the
//! same transaction, scoped to one `(user, rule)` pair, so N concurrent
//! claims of the same rule produce at most one success per cooldown window.

use crate::{
    config::rewards::{RewardsConfig, RuleConfig},
    core::events::EngineEvent,
    core::referral::ReferralEngine,
    entities::{ActivityLog, ActivityRule, LedgerReason, activity_log, activity_rule, ledger_entry},
    errors::{Error, Result},
};
use chrono::{NaiveTime, Utc};
use sea_orm::{
    DatabaseConnection, PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*,
};
use tracing::{debug, info};

/// Caller-supplied claim context (location, when the rule is geofenced).
#[derive(Debug, Clone, Default)]
pub struct ClaimContext {
    /// Claim latitude in degrees
    pub latitude: Option<f64>,
    /// Claim longitude in degrees
    pub longitude: Option<f64>,
}

/// Successful claim: points awarded plus the ledger entry that recorded them.
#[derive(Debug, Clone)]
pub struct ClaimOutcome {
    /// Points credited to the claimer
    pub points_awarded: i64,
    /// The ledger entry appended for this claim
    pub entry: ledger_entry::Model,
    /// Events for the notification component
    pub events: Vec<EngineEvent>,
}

/// Evaluates a claim and awards points in one atomic unit.
///
/// On success the referral engine, when supplied, is notified so the entry
/// can activate a pending edge or cascade bonuses upstream; referral events
/// are merged into the outcome.
pub async fn claim(
    db: &DatabaseConnection,
    cfg: &RewardsConfig,
    user_id: &str,
    rule_code: &str,
    context: &ClaimContext,
    referral: Option<&ReferralEngine>,
) -> Result<ClaimOutcome> {
    let txn = db.begin().await?;
    let (entry, points) = claim_in(&txn, cfg, user_id, rule_code, context).await?;
    txn.commit().await?;

    info!(user_id, rule_code, points, "Activity claim rewarded");
    let mut events = vec![EngineEvent::ActivityRewarded {
        user_id: user_id.to_string(),
        rule_code: rule_code.to_string(),
        points,
    }];
    if let Some(engine) = referral {
        events.extend(engine.on_ledger_event(db, &entry).await?);
    }

    Ok(ClaimOutcome {
        points_awarded: points,
        entry,
        events,
    })
}

/// Claim evaluation and writes on the caller's transaction.
///
/// Split out so the card binding flow can fold its delegated reward into its
/// own atomic unit.
pub(crate) async fn claim_in<C>(
    conn: &C,
    cfg: &RewardsConfig,
    user_id: &str,
    rule_code: &str,
    context: &ClaimContext,
) -> Result<(ledger_entry::Model, i64)>
where
    C: ConnectionTrait,
{
    let now = Utc::now();
    let rule = get_rule(conn, rule_code)
        .await?
        .ok_or_else(|| Error::RuleNotFound {
            code: rule_code.to_string(),
        })?;

    // 1. active flag and window
    let in_window = rule.start_at.is_none_or(|s| now >= s) && rule.end_at.is_none_or(|e| now <= e);
    if !rule.active || !in_window {
        return Err(Error::RuleDisabled {
            code: rule_code.to_string(),
        });
    }

    // 2. geofence
    if rule.geo_required {
        let (Some(lat), Some(lon)) = (context.latitude, context.longitude) else {
            return Err(Error::GeoRequired);
        };
        let (Some(rule_lat), Some(rule_lon), Some(radius_m)) =
            (rule.latitude, rule.longitude, rule.radius_m)
        else {
            return Err(Error::Config {
                message: format!("rule {rule_code} requires geo but has no fence configured"),
            });
        };
        let distance_m = haversine_m(lat, lon, rule_lat, rule_lon);
        if distance_m > radius_m {
            return Err(Error::OutOfCoverage {
                distance_m,
                radius_m,
            });
        }
    }

    // 3. cooldown against the most recent successful claim
    if rule.cooldown_seconds > 0 {
        let last = ActivityLog::find()
            .filter(activity_log::Column::UserId.eq(user_id))
            .filter(activity_log::Column::RuleCode.eq(rule_code))
            .order_by_desc(activity_log::Column::OccurredAt)
            .one(conn)
            .await?;
        if let Some(last) = last {
            let elapsed = (now - last.occurred_at).num_seconds();
            if elapsed < rule.cooldown_seconds {
                return Err(Error::CooldownActive {
                    retry_after_seconds: rule.cooldown_seconds - elapsed,
                });
            }
        }
    }

    // 4. daily cap over today's successful claims (UTC day)
    if let Some(cap) = rule.daily_cap {
        let day_start = now.date_naive().and_time(NaiveTime::MIN).and_utc();
        let today = ActivityLog::find()
            .filter(activity_log::Column::UserId.eq(user_id))
            .filter(activity_log::Column::RuleCode.eq(rule_code))
            .filter(activity_log::Column::OccurredAt.gte(day_start))
            .count(conn)
            .await?;
        if i64::try_from(today).unwrap_or(i64::MAX) >= cap {
            return Err(Error::DailyCapExceeded { cap });
        }
    }

    // 5. log row and ledger entry, same transaction
    let log = activity_log::ActiveModel {
        user_id: Set(user_id.to_string()),
        rule_code: Set(rule_code.to_string()),
        occurred_at: Set(now),
        latitude: Set(context.latitude),
        longitude: Set(context.longitude),
        ..Default::default()
    }
    .insert(conn)
    .await?;

    let entry = crate::core::ledger::append_in(
        conn,
        cfg,
        user_id,
        rule.points,
        LedgerReason::Activity,
        &log.id.to_string(),
    )
    .await?;

    Ok((entry, rule.points))
}

/// Rule lookup by its stable code.
pub async fn get_rule<C>(conn: &C, code: &str) -> Result<Option<activity_rule::Model>>
where
    C: ConnectionTrait,
{
    ActivityRule::find()
        .filter(activity_rule::Column::Code.eq(code))
        .one(conn)
        .await
        .map_err(Into::into)
}

/// Creates or updates a rule from its configuration entry.
///
/// Seeding is idempotent: re-running with the same config leaves the catalog
/// unchanged, and operators can adjust points or gates in config.toml and
/// re-seed.
pub async fn upsert_rule(
    db: &DatabaseConnection,
    rule: &RuleConfig,
) -> Result<activity_rule::Model> {
    let existing = get_rule(db, &rule.code).await?;

    let mut active: activity_rule::ActiveModel = match existing {
        Some(model) => model.into(),
        None => activity_rule::ActiveModel {
            code: Set(rule.code.clone()),
            ..Default::default()
        },
    };
    active.points = Set(rule.points);
    active.cooldown_seconds = Set(rule.cooldown_seconds);
    active.geo_required = Set(rule.geo_required);
    active.latitude = Set(rule.latitude);
    active.longitude = Set(rule.longitude);
    active.radius_m = Set(rule.radius_m);
    active.daily_cap = Set(rule.daily_cap);
    active.active = Set(rule.active);
    active.start_at = Set(None);
    active.end_at = Set(None);

    let model = if active.id.is_not_set() {
        active.insert(db).await?
    } else {
        active.update(db).await?
    };
    debug!(code = %model.code, points = model.points, "Upserted activity rule");
    Ok(model)
}

/// Great-circle distance between two coordinates, in meters.
#[must_use]
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    const EARTH_RADIUS_M: f64 = 6_371_000.0;

    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().asin()
}
