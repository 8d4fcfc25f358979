//! Referral engine - graph, activation state machine, and bonus cascade.
//!
//! Edges move forward only: `pending` to `activated` to `rewarded`, or
//! `pending` to `rejected` when anti-fraud fires. Activation policy is
//! explicit configuration passed in at construction, never ambient state.
//! The other engines notify this one after their ledger-affecting commits;
//! activation rejection or delay never undoes the triggering operation.

use crate::{
    config::rewards::{ActivationMode, RewardsConfig},
    core::events::EngineEvent,
    entities::{
        CardBindToken, LedgerEntry, ReferralBonus, ReferralCode, ReferralEdge, ReferralStatus,
        card_bind_token, ledger_entry, referral_bonus, referral_code, referral_edge,
    },
    errors::{Error, Result},
};
use crate::entities::LedgerReason;
use chrono::{NaiveTime, Utc};
use sea_orm::{
    ActiveEnum, DatabaseConnection, PaginatorTrait, Set, TransactionTrait, prelude::*,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Referral status view returned to the front end for `my-status`.
#[derive(Debug, Clone)]
pub struct ReferralStatusView {
    /// The user's own invite code, if one was generated
    pub code: Option<String>,
    /// The edge where this user is the referee, if attached
    pub edge: Option<referral_edge::Model>,
    /// Edges where this user is the referrer
    pub invited: Vec<referral_edge::Model>,
    /// Total cascade points this user has received as an ancestor
    pub cascade_total: i64,
}

/// The referral engine. Holds the reward policy it was constructed with.
#[derive(Debug, Clone)]
pub struct ReferralEngine {
    cfg: RewardsConfig,
}

impl ReferralEngine {
    /// Builds an engine around an explicit policy instance.
    #[must_use]
    pub const fn new(cfg: RewardsConfig) -> Self {
        Self { cfg }
    }

    /// Create-or-get the user's immutable referral code.
    ///
    /// Safe under concurrent calls: the unique `user_id` column makes the
    /// first insert win, and the loser returns the winner's row.
    pub async fn code_for(
        &self,
        db: &DatabaseConnection,
        user_id: &str,
    ) -> Result<referral_code::Model> {
        if let Some(existing) = ReferralCode::find()
            .filter(referral_code::Column::UserId.eq(user_id))
            .one(db)
            .await?
        {
            return Ok(existing);
        }

        let code = format!("R{}", &Uuid::new_v4().simple().to_string()[..9]).to_uppercase();
        let inserted = referral_code::ActiveModel {
            code: Set(code),
            user_id: Set(user_id.to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await;

        match inserted {
            Ok(model) => Ok(model),
            // lost the create race; the winner's row is the user's code
            Err(_) => ReferralCode::find()
                .filter(referral_code::Column::UserId.eq(user_id))
                .one(db)
                .await?
                .ok_or(Error::Conflict),
        }
    }

    /// Attaches a referee to the referrer owning `code`.
    ///
    /// A referee has at most one referrer; the first attach wins and every
    /// later one fails `AlreadyAttached`, including concurrent ones that
    /// race past the existence check into the unique index.
    pub async fn attach(
        &self,
        db: &DatabaseConnection,
        referee_id: &str,
        code: &str,
    ) -> Result<referral_edge::Model> {
        let owner = ReferralCode::find()
            .filter(referral_code::Column::Code.eq(code))
            .one(db)
            .await?
            .ok_or_else(|| Error::CodeNotFound {
                code: code.to_string(),
            })?;

        if owner.user_id == referee_id {
            return Err(Error::SelfInviteForbidden);
        }

        let existing = ReferralEdge::find()
            .filter(referral_edge::Column::RefereeId.eq(referee_id))
            .one(db)
            .await?;
        if existing.is_some() {
            return Err(Error::AlreadyAttached);
        }

        let inserted = referral_edge::ActiveModel {
            referrer_id: Set(owner.user_id.clone()),
            referee_id: Set(referee_id.to_string()),
            status: Set(ReferralStatus::Pending),
            created_at: Set(Utc::now()),
            activated_at: Set(None),
            ..Default::default()
        }
        .insert(db)
        .await;

        match inserted {
            Ok(edge) => {
                info!(
                    referrer_id = %owner.user_id,
                    referee_id, "Referral edge attached"
                );
                Ok(edge)
            }
            Err(err) => {
                // unique referee_id: a concurrent attach won the race
                let taken = ReferralEdge::find()
                    .filter(referral_edge::Column::RefereeId.eq(referee_id))
                    .one(db)
                    .await?;
                if taken.is_some() {
                    Err(Error::AlreadyAttached)
                } else {
                    Err(err.into())
                }
            }
        }
    }

    /// Referral view for the front-end `my-status` contract.
    pub async fn my_status(
        &self,
        db: &DatabaseConnection,
        user_id: &str,
    ) -> Result<ReferralStatusView> {
        let code = ReferralCode::find()
            .filter(referral_code::Column::UserId.eq(user_id))
            .one(db)
            .await?
            .map(|c| c.code);
        let edge = ReferralEdge::find()
            .filter(referral_edge::Column::RefereeId.eq(user_id))
            .one(db)
            .await?;
        let invited = ReferralEdge::find()
            .filter(referral_edge::Column::ReferrerId.eq(user_id))
            .all(db)
            .await?;
        let cascade_total = ReferralBonus::find()
            .filter(referral_bonus::Column::ReferrerId.eq(user_id))
            .all(db)
            .await?
            .iter()
            .map(|b| b.amount)
            .sum();

        Ok(ReferralStatusView {
            code,
            edge,
            invited,
            cascade_total,
        })
    }

    /// Reacts to a freshly committed ledger entry for `entry.user_id`.
    ///
    /// Runs the activation check for the referee's pending edge and the
    /// multi-level cascade for reward-eligible entries. Policy outcomes that
    /// merely delay or reject activation (`DailyCapExceeded`,
    /// `AntiFraudRejected`) are absorbed here: the triggering operation
    /// already committed and must stand.
    pub async fn on_ledger_event(
        &self,
        db: &DatabaseConnection,
        entry: &ledger_entry::Model,
    ) -> Result<Vec<EngineEvent>> {
        let mut events = Vec::new();

        // cascade first: eligibility is judged against the edge states that
        // existed when the entry was created, so the entry that triggers
        // activation below does not also cascade
        if entry.amount > 0
            && matches!(
                entry.reason,
                LedgerReason::Activity | LedgerReason::Redemption
            )
        {
            events.extend(self.cascade(db, entry).await?);
        }

        match self.try_activate(db, &entry.user_id).await {
            Ok(activation_events) => events.extend(activation_events),
            Err(Error::DailyCapExceeded { cap }) => {
                debug!(
                    referee_id = %entry.user_id,
                    cap, "Referral activation delayed by daily cap"
                );
            }
            Err(Error::AntiFraudRejected { reason }) => {
                if let Some(edge) = ReferralEdge::find()
                    .filter(referral_edge::Column::RefereeId.eq(entry.user_id.as_str()))
                    .one(db)
                    .await?
                {
                    events.push(EngineEvent::ReferralRejected {
                        referrer_id: edge.referrer_id,
                        referee_id: edge.referee_id,
                        reason,
                    });
                }
            }
            Err(err) => return Err(err),
        }

        Ok(events)
    }

    /// Activates and rewards the referee's pending edge if it qualifies.
    ///
    /// Typed outcomes: `AntiFraudRejected` marks the edge rejected
    /// (terminal), `DailyCapExceeded` leaves it pending until the cap
    /// resets. An edge that does not exist or does not yet qualify is
    /// simply `Ok(vec![])`.
    pub async fn try_activate(
        &self,
        db: &DatabaseConnection,
        referee_id: &str,
    ) -> Result<Vec<EngineEvent>> {
        let policy = &self.cfg.referral;

        let Some(edge) = ReferralEdge::find()
            .filter(referral_edge::Column::RefereeId.eq(referee_id))
            .filter(referral_edge::Column::Status.eq(ReferralStatus::Pending))
            .one(db)
            .await?
        else {
            return Ok(Vec::new());
        };

        if !self.activation_criteria_met(db, referee_id).await? {
            return Ok(Vec::new());
        }

        if policy.anti_fraud
            && let Some(reason) = self.fraud_signal(db, &edge).await?
        {
            let mut active: referral_edge::ActiveModel = edge.clone().into();
            active.status = Set(ReferralStatus::Rejected);
            active.update(db).await?;
            warn!(
                referrer_id = %edge.referrer_id,
                referee_id, reason, "Referral edge rejected by anti-fraud gate"
            );
            return Err(Error::AntiFraudRejected {
                reason: reason.to_string(),
            });
        }

        // activations per referrer per UTC day; exceeding delays, never drops
        let day_start = Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc();
        let activated_today = ReferralEdge::find()
            .filter(referral_edge::Column::ReferrerId.eq(edge.referrer_id.as_str()))
            .filter(referral_edge::Column::Status.is_in([
                ReferralStatus::Activated,
                ReferralStatus::Rewarded,
            ]))
            .filter(referral_edge::Column::ActivatedAt.gte(day_start))
            .count(db)
            .await?;
        if i64::try_from(activated_today).unwrap_or(i64::MAX) >= policy.daily_activation_cap {
            return Err(Error::DailyCapExceeded {
                cap: policy.daily_activation_cap,
            });
        }

        self.reward_edge(db, &edge).await
    }

    /// Pays both sides of an activated edge in one atomic unit.
    async fn reward_edge(
        &self,
        db: &DatabaseConnection,
        edge: &referral_edge::Model,
    ) -> Result<Vec<EngineEvent>> {
        use sea_orm::sea_query::Expr;

        let policy = &self.cfg.referral;
        let txn = db.begin().await?;

        // claim the pending edge; a concurrent activation wins at most once
        let claimed = ReferralEdge::update_many()
            .col_expr(
                referral_edge::Column::Status,
                Expr::value(ReferralStatus::Activated.to_value()),
            )
            .filter(referral_edge::Column::Id.eq(edge.id))
            .filter(referral_edge::Column::Status.eq(ReferralStatus::Pending))
            .exec(&txn)
            .await?;
        if claimed.rows_affected == 0 {
            return Ok(Vec::new());
        }

        let reference = format!("referral_edge:{}", edge.id);
        if policy.bonus_inviter != 0 {
            crate::core::ledger::append_in(
                &txn,
                &self.cfg,
                &edge.referrer_id,
                policy.bonus_inviter,
                LedgerReason::ReferralBonus,
                &reference,
            )
            .await?;
        }
        if policy.bonus_invitee != 0 {
            crate::core::ledger::append_in(
                &txn,
                &self.cfg,
                &edge.referee_id,
                policy.bonus_invitee,
                LedgerReason::ReferralBonus,
                &reference,
            )
            .await?;
        }

        let refreshed = ReferralEdge::find_by_id(edge.id)
            .one(&txn)
            .await?
            .ok_or(Error::Conflict)?;
        let mut active: referral_edge::ActiveModel = refreshed.into();
        active.status = Set(ReferralStatus::Rewarded);
        active.activated_at = Set(Some(Utc::now()));
        active.update(&txn).await?;

        txn.commit().await?;
        info!(
            referrer_id = %edge.referrer_id,
            referee_id = %edge.referee_id,
            "Referral edge activated and rewarded"
        );

        Ok(vec![EngineEvent::ReferralRewarded {
            referrer_id: edge.referrer_id.clone(),
            referee_id: edge.referee_id.clone(),
            bonus_inviter: policy.bonus_inviter,
            bonus_invitee: policy.bonus_invitee,
        }])
    }

    /// Whether the referee has met the configured activation criteria.
    async fn activation_criteria_met(
        &self,
        db: &DatabaseConnection,
        referee_id: &str,
    ) -> Result<bool> {
        match self.cfg.referral.activation_mode {
            ActivationMode::PointsThreshold => {
                let wallet = crate::core::user::wallet_of(db, referee_id).await?;
                Ok(wallet.lifetime_points >= self.cfg.referral.activation_min_points)
            }
            ActivationMode::FirstRedemption => {
                let redeemed = LedgerEntry::find()
                    .filter(ledger_entry::Column::UserId.eq(referee_id))
                    .filter(ledger_entry::Column::Reason.eq(LedgerReason::Redemption))
                    .count(db)
                    .await?;
                Ok(redeemed > 0)
            }
        }
    }

    /// Anti-fraud gate: shared verified contact or shared bound card.
    async fn fraud_signal(
        &self,
        db: &DatabaseConnection,
        edge: &referral_edge::Model,
    ) -> Result<Option<&'static str>> {
        let referrer = crate::entities::User::find_by_id(&edge.referrer_id)
            .one(db)
            .await?;
        let referee = crate::entities::User::find_by_id(&edge.referee_id)
            .one(db)
            .await?;
        if let (Some(referrer), Some(referee)) = (referrer, referee)
            && referrer.contact_fingerprint.is_some()
            && referrer.contact_fingerprint == referee.contact_fingerprint
        {
            return Ok(Some("shared_contact_fingerprint"));
        }

        let referrer_cards: Vec<String> = CardBindToken::find()
            .filter(card_bind_token::Column::UsedBy.eq(edge.referrer_id.as_str()))
            .all(db)
            .await?
            .into_iter()
            .map(|t| t.card_id)
            .collect();
        if !referrer_cards.is_empty() {
            let shared = CardBindToken::find()
                .filter(card_bind_token::Column::UsedBy.eq(edge.referee_id.as_str()))
                .filter(card_bind_token::Column::CardId.is_in(referrer_cards))
                .count(db)
                .await?;
            if shared > 0 {
                return Ok(Some("shared_card"));
            }
        }

        Ok(None)
    }

    /// Walks up to 3 ancestor levels and pays level-specific bonuses.
    ///
    /// Only edges whose activation predates the triggering entry carry the
    /// cascade, so a given entry pays the same ancestors no matter when or
    /// how often it is replayed. Idempotent per `(source entry, ancestor,
    /// level)`: a replayed trigger finds the existing bonus row and pays
    /// nothing, with the unique index backing the in-transaction check
    /// against races.
    async fn cascade(
        &self,
        db: &DatabaseConnection,
        entry: &ledger_entry::Model,
    ) -> Result<Vec<EngineEvent>> {
        let rates = &self.cfg.referral.cascade_level_bps;
        if rates.is_empty() {
            return Ok(Vec::new());
        }

        let txn = db.begin().await?;
        let mut events = Vec::new();
        let mut current = entry.user_id.clone();
        let mut visited = vec![current.clone()];

        for (idx, &rate_bps) in rates.iter().take(3).enumerate() {
            let level = i32::try_from(idx).unwrap_or(2) + 1;
            let Some(edge) = ReferralEdge::find()
                .filter(referral_edge::Column::RefereeId.eq(current.as_str()))
                .filter(referral_edge::Column::Status.is_in([
                    ReferralStatus::Activated,
                    ReferralStatus::Rewarded,
                ]))
                .filter(referral_edge::Column::ActivatedAt.lte(entry.created_at))
                .one(&txn)
                .await?
            else {
                break;
            };

            let referrer = edge.referrer_id.clone();
            if visited.contains(&referrer) {
                // referral cycle; stop walking rather than pay in circles
                break;
            }
            visited.push(referrer.clone());

            let amount = entry.amount * i64::from(rate_bps) / 10_000;
            if amount > 0 {
                let already_paid = ReferralBonus::find()
                    .filter(referral_bonus::Column::SourceLedgerEntryId.eq(entry.id))
                    .filter(referral_bonus::Column::ReferrerId.eq(referrer.as_str()))
                    .filter(referral_bonus::Column::Level.eq(level))
                    .one(&txn)
                    .await?;
                if already_paid.is_none() {
                    referral_bonus::ActiveModel {
                        referrer_id: Set(referrer.clone()),
                        referee_id: Set(entry.user_id.clone()),
                        level: Set(level),
                        amount: Set(amount),
                        source_ledger_entry_id: Set(entry.id),
                        created_at: Set(Utc::now()),
                        ..Default::default()
                    }
                    .insert(&txn)
                    .await?;
                    crate::core::ledger::append_in(
                        &txn,
                        &self.cfg,
                        &referrer,
                        amount,
                        LedgerReason::ReferralBonus,
                        &entry.id.to_string(),
                    )
                    .await?;
                    events.push(EngineEvent::BonusCascaded {
                        referrer_id: referrer.clone(),
                        referee_id: entry.user_id.clone(),
                        level,
                        amount,
                    });
                }
            }

            current = referrer;
        }

        txn.commit().await?;
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::{ledger, user};
    use crate::test_utils::{setup_test_db, test_rewards_config};

    async fn engine_and_db() -> Result<(DatabaseConnection, ReferralEngine)> {
        let db = setup_test_db().await?;
        Ok((db, ReferralEngine::new(test_rewards_config())))
    }

    async fn register(db: &DatabaseConnection, id: &str) -> Result<()> {
        user::register(db, &test_rewards_config(), id, id, "en", None).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_code_for_is_stable() -> Result<()> {
        let (db, engine) = engine_and_db().await?;
        register(&db, "u1").await?;

        let first = engine.code_for(&db, "u1").await?;
        let second = engine.code_for(&db, "u1").await?;
        assert_eq!(first.code, second.code);
        assert!(first.code.starts_with('R'));

        Ok(())
    }

    #[tokio::test]
    async fn test_self_invite_forbidden_creates_no_edge() -> Result<()> {
        let (db, engine) = engine_and_db().await?;
        register(&db, "u1").await?;
        let code = engine.code_for(&db, "u1").await?;

        let result = engine.attach(&db, "u1", &code.code).await;
        assert!(matches!(result.unwrap_err(), Error::SelfInviteForbidden));
        assert_eq!(ReferralEdge::find().all(&db).await?.len(), 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_attach_unknown_code() -> Result<()> {
        let (db, engine) = engine_and_db().await?;
        register(&db, "u1").await?;

        let result = engine.attach(&db, "u1", "RDOESNOTEX").await;
        assert!(matches!(result.unwrap_err(), Error::CodeNotFound { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_attach_first_write_wins() -> Result<()> {
        let (db, engine) = engine_and_db().await?;
        for id in ["r1", "r2", "e1"] {
            register(&db, id).await?;
        }
        let code1 = engine.code_for(&db, "r1").await?;
        let code2 = engine.code_for(&db, "r2").await?;

        let edge = engine.attach(&db, "e1", &code1.code).await?;
        assert_eq!(edge.status, ReferralStatus::Pending);
        assert_eq!(edge.referrer_id, "r1");

        let second = engine.attach(&db, "e1", &code2.code).await;
        assert!(matches!(second.unwrap_err(), Error::AlreadyAttached));

        Ok(())
    }

    #[tokio::test]
    async fn test_threshold_activation_rewards_both_sides_once() -> Result<()> {
        let (db, engine) = engine_and_db().await?;
        let cfg = test_rewards_config();
        register(&db, "r1").await?;
        register(&db, "e1").await?;
        let code = engine.code_for(&db, "r1").await?;
        engine.attach(&db, "e1", &code.code).await?;

        // below the 100-point threshold: nothing happens
        let entry = ledger::append(&db, &cfg, "e1", 60, LedgerReason::Activity, "log:1").await?;
        let events = engine.on_ledger_event(&db, &entry).await?;
        assert!(events.is_empty());
        assert_eq!(
            engine.my_status(&db, "e1").await?.edge.unwrap().status,
            ReferralStatus::Pending
        );

        // crossing the threshold activates and pays both sides
        let entry = ledger::append(&db, &cfg, "e1", 40, LedgerReason::Activity, "log:2").await?;
        let events = engine.on_ledger_event(&db, &entry).await?;
        assert!(events.iter().any(|e| matches!(
            e,
            EngineEvent::ReferralRewarded { bonus_inviter: 50, bonus_invitee: 25, .. }
        )));

        let edge = engine.my_status(&db, "e1").await?.edge.unwrap();
        assert_eq!(edge.status, ReferralStatus::Rewarded);
        assert!(edge.activated_at.is_some());

        // referrer got the inviter bonus; referee got activity + invitee bonus
        assert_eq!(ledger::balance(&db, "r1").await?.balance, 50);
        assert_eq!(ledger::balance(&db, "e1").await?.balance, 60 + 40 + 25);

        // replaying the trigger pays nothing further
        let replay = engine.on_ledger_event(&db, &entry).await?;
        assert!(replay.is_empty());
        assert_eq!(ledger::balance(&db, "r1").await?.balance, 50);

        Ok(())
    }

    #[tokio::test]
    async fn test_first_redemption_activation_mode() -> Result<()> {
        let db = setup_test_db().await?;
        let mut cfg = test_rewards_config();
        cfg.referral.activation_mode = ActivationMode::FirstRedemption;
        let engine = ReferralEngine::new(cfg.clone());

        register(&db, "r1").await?;
        register(&db, "e1").await?;
        let code = engine.code_for(&db, "r1").await?;
        engine.attach(&db, "e1", &code.code).await?;

        // plenty of activity points, but no redemption yet
        let entry = ledger::append(&db, &cfg, "e1", 500, LedgerReason::Activity, "log:1").await?;
        engine.on_ledger_event(&db, &entry).await?;
        assert_eq!(
            engine.my_status(&db, "e1").await?.edge.unwrap().status,
            ReferralStatus::Pending
        );

        let entry =
            ledger::append(&db, &cfg, "e1", 10, LedgerReason::Redemption, "tok-1").await?;
        engine.on_ledger_event(&db, &entry).await?;
        assert_eq!(
            engine.my_status(&db, "e1").await?.edge.unwrap().status,
            ReferralStatus::Rewarded
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_anti_fraud_shared_fingerprint_rejects_edge() -> Result<()> {
        let (db, engine) = engine_and_db().await?;
        let cfg = test_rewards_config();
        user::register(&db, &cfg, "r1", "r1", "en", Some("fp-1".to_string())).await?;
        user::register(&db, &cfg, "e1", "e1", "en", Some("fp-1".to_string())).await?;
        let code = engine.code_for(&db, "r1").await?;
        engine.attach(&db, "e1", &code.code).await?;

        ledger::append(&db, &cfg, "e1", 200, LedgerReason::Activity, "log:1").await?;
        let result = engine.try_activate(&db, "e1").await;
        assert!(matches!(
            result.unwrap_err(),
            Error::AntiFraudRejected { reason } if reason == "shared_contact_fingerprint"
        ));

        // the edge is terminally rejected and no bonuses were paid
        let edge = engine.my_status(&db, "e1").await?.edge.unwrap();
        assert_eq!(edge.status, ReferralStatus::Rejected);
        assert_eq!(ledger::balance(&db, "r1").await?.balance, 0);

        // later events do not resurrect it
        let entry = ledger::append(&db, &cfg, "e1", 50, LedgerReason::Activity, "log:2").await?;
        let events = engine.on_ledger_event(&db, &entry).await?;
        assert!(!events.iter().any(|e| matches!(e, EngineEvent::ReferralRewarded { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_daily_activation_cap_delays() -> Result<()> {
        let db = setup_test_db().await?;
        let mut cfg = test_rewards_config();
        cfg.referral.daily_activation_cap = 1;
        let engine = ReferralEngine::new(cfg.clone());

        for id in ["r1", "e1", "e2"] {
            register(&db, id).await?;
        }
        let code = engine.code_for(&db, "r1").await?;
        engine.attach(&db, "e1", &code.code).await?;
        engine.attach(&db, "e2", &code.code).await?;

        ledger::append(&db, &cfg, "e1", 150, LedgerReason::Activity, "log:1").await?;
        engine.try_activate(&db, "e1").await?;

        ledger::append(&db, &cfg, "e2", 150, LedgerReason::Activity, "log:2").await?;
        let delayed = engine.try_activate(&db, "e2").await;
        assert!(matches!(
            delayed.unwrap_err(),
            Error::DailyCapExceeded { cap: 1 }
        ));

        // delayed, not dropped: the edge is still pending
        assert_eq!(
            engine.my_status(&db, "e2").await?.edge.unwrap().status,
            ReferralStatus::Pending
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_cascade_pays_each_level_once() -> Result<()> {
        let (db, engine) = engine_and_db().await?;
        let cfg = test_rewards_config();
        for id in ["a", "b", "c"] {
            register(&db, id).await?;
        }
        // a refers b, b refers c
        let code_a = engine.code_for(&db, "a").await?;
        let code_b = engine.code_for(&db, "b").await?;
        engine.attach(&db, "b", &code_a.code).await?;
        engine.attach(&db, "c", &code_b.code).await?;

        // activate both edges by crossing the threshold
        let entry = ledger::append(&db, &cfg, "b", 150, LedgerReason::Activity, "log:1").await?;
        engine.on_ledger_event(&db, &entry).await?;
        let entry = ledger::append(&db, &cfg, "c", 150, LedgerReason::Activity, "log:2").await?;
        engine.on_ledger_event(&db, &entry).await?;

        let balance_a = ledger::balance(&db, "a").await?.balance;
        let balance_b = ledger::balance(&db, "b").await?.balance;

        // c earns 1000: b gets 10% at level 1, a gets 5% at level 2
        let trigger =
            ledger::append(&db, &cfg, "c", 1000, LedgerReason::Activity, "log:3").await?;
        let events = engine.on_ledger_event(&db, &trigger).await?;
        let cascades: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, EngineEvent::BonusCascaded { .. }))
            .collect();
        assert_eq!(cascades.len(), 2);

        assert_eq!(ledger::balance(&db, "b").await?.balance, balance_b + 100);
        assert_eq!(ledger::balance(&db, "a").await?.balance, balance_a + 50);

        // replaying the same trigger is a no-op per (source, referrer, level)
        let replay = engine.on_ledger_event(&db, &trigger).await?;
        assert!(!replay.iter().any(|e| matches!(e, EngineEvent::BonusCascaded { .. })));
        assert_eq!(ledger::balance(&db, "b").await?.balance, balance_b + 100);
        assert_eq!(ledger::balance(&db, "a").await?.balance, balance_a + 50);
        assert_eq!(ReferralBonus::find().all(&db).await?.len(), 2);

        Ok(())
    }

    #[tokio::test]
    async fn test_cascade_skips_pending_edges() -> Result<()> {
        let (db, engine) = engine_and_db().await?;
        let cfg = test_rewards_config();
        register(&db, "r1").await?;
        register(&db, "e1").await?;
        let code = engine.code_for(&db, "r1").await?;
        engine.attach(&db, "e1", &code.code).await?;

        // edge still pending: a small earn cascades nothing
        let entry = ledger::append(&db, &cfg, "e1", 50, LedgerReason::Activity, "log:1").await?;
        let events = engine.on_ledger_event(&db, &entry).await?;
        assert!(events.is_empty());
        assert_eq!(ReferralBonus::find().all(&db).await?.len(), 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_spend_entries_do_not_cascade() -> Result<()> {
        let (db, engine) = engine_and_db().await?;
        let cfg = test_rewards_config();
        register(&db, "r1").await?;
        register(&db, "e1").await?;
        let code = engine.code_for(&db, "r1").await?;
        engine.attach(&db, "e1", &code.code).await?;

        let entry = ledger::append(&db, &cfg, "e1", 150, LedgerReason::Activity, "log:1").await?;
        engine.on_ledger_event(&db, &entry).await?;
        let rewarded_balance = ledger::balance(&db, "r1").await?.balance;

        let spend = ledger::append(&db, &cfg, "e1", -100, LedgerReason::Spend, "order").await?;
        let events = engine.on_ledger_event(&db, &spend).await?;
        assert!(events.is_empty());
        assert_eq!(ledger::balance(&db, "r1").await?.balance, rewarded_balance);

        Ok(())
    }
}
