//! Card binding service - one-time signed deep-links to durable bindings.
//!
//! Bind tokens carry no expiry: physical cards outlive short TTLs.
//! Consuming the token, persisting the binding, and paying the optional bind
//! reward happen in one transaction; any failure rolls all of it back, so a
//! token is never burned without its binding. The points policy for the
//! reward lives in the activity rule catalog, not here.

use crate::{
    config::rewards::RewardsConfig,
    core::activity::ClaimContext,
    core::events::EngineEvent,
    core::referral::ReferralEngine,
    entities::{CardBindToken, CardBinding, card_bind_token, card_binding},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{DatabaseConnection, Set, TransactionTrait, prelude::*};
use tracing::{debug, info};
use uuid::Uuid;

/// What gets embedded into the printed/mailed deep-link.
#[derive(Debug, Clone)]
pub struct IssuedBindToken {
    /// One-time token identifier
    pub token_id: String,
    /// Card the token can bind
    pub card_id: String,
    /// HMAC over `(card_id, token_id)`
    pub signature: String,
}

/// Successful bind.
#[derive(Debug, Clone)]
pub struct BindOutcome {
    /// The durable card-to-user association
    pub binding: card_binding::Model,
    /// Points paid by the configured bind reward rule, if any
    pub reward_points: Option<i64>,
    /// Events for the notification component
    pub events: Vec<EngineEvent>,
}

fn bind_payload(card_id: &str, token_id: &str) -> String {
    format!("{card_id}|{token_id}")
}

/// Issues a one-time bind token for a card.
pub async fn issue_bind_token(
    db: &DatabaseConnection,
    secret: &str,
    card_id: &str,
) -> Result<IssuedBindToken> {
    let token_id = Uuid::new_v4().simple().to_string();
    let signature = crate::core::signing::sign(secret, &bind_payload(card_id, &token_id));

    card_bind_token::ActiveModel {
        token_id: Set(token_id.clone()),
        card_id: Set(card_id.to_string()),
        signature: Set(signature.clone()),
        issued_at: Set(Utc::now()),
        used: Set(false),
        used_at: Set(None),
        used_by: Set(None),
    }
    .insert(db)
    .await?;

    info!(card_id, "Issued card bind token");
    Ok(IssuedBindToken {
        token_id,
        card_id: card_id.to_string(),
        signature,
    })
}

/// Converts a one-time signed deep-link into a durable card binding.
///
/// Exactly one of N concurrent bind attempts for the same token succeeds.
/// Re-binding a card the caller already owns is idempotent on the binding
/// (though it still consumes the presented token). The bind reward, when
/// `card_bind_rule` is configured, is delegated to the activity engine
/// inside the same transaction; reward policy refusals (cooldown, cap,
/// missing rule) skip the reward without failing the bind.
pub async fn bind(
    db: &DatabaseConnection,
    cfg: &RewardsConfig,
    secret: &str,
    card_id: &str,
    token_id: &str,
    signature: &str,
    user_id: &str,
    referral: Option<&ReferralEngine>,
) -> Result<BindOutcome> {
    use sea_orm::sea_query::Expr;

    let token = CardBindToken::find_by_id(token_id)
        .one(db)
        .await?
        .ok_or(Error::InvalidSignature)?;
    if token.card_id != card_id
        || !crate::core::signing::verify(secret, &bind_payload(card_id, token_id), signature)
    {
        return Err(Error::InvalidSignature);
    }

    let now = Utc::now();
    let txn = db.begin().await?;

    // one-time consumption; the conditional update picks the single winner
    let consumed = CardBindToken::update_many()
        .col_expr(card_bind_token::Column::Used, Expr::value(true))
        .filter(card_bind_token::Column::TokenId.eq(token_id))
        .filter(card_bind_token::Column::Used.eq(false))
        .exec(&txn)
        .await?;
    if consumed.rows_affected == 0 {
        return Err(Error::TokenUsed);
    }

    let claimed = CardBindToken::find_by_id(token_id)
        .one(&txn)
        .await?
        .ok_or(Error::Conflict)?;
    let mut active: card_bind_token::ActiveModel = claimed.into();
    active.used_at = Set(Some(now));
    active.used_by = Set(Some(user_id.to_string()));
    active.update(&txn).await?;

    let existing = CardBinding::find()
        .filter(card_binding::Column::CardId.eq(card_id))
        .one(&txn)
        .await?;
    let binding = match existing {
        Some(binding) if binding.user_id == user_id => binding,
        Some(binding) => {
            // rolls back the token consumption along with everything else
            drop(txn);
            return Err(Error::AlreadyLinked {
                card_id: binding.card_id,
            });
        }
        None => {
            card_binding::ActiveModel {
                card_id: Set(card_id.to_string()),
                user_id: Set(user_id.to_string()),
                bound_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await?
        }
    };

    let reward = match &cfg.card_bind_rule {
        Some(rule_code) => {
            match crate::core::activity::claim_in(
                &txn,
                cfg,
                user_id,
                rule_code,
                &ClaimContext::default(),
            )
            .await
            {
                Ok((entry, points)) => Some((entry, points)),
                Err(
                    Error::RuleNotFound { .. }
                    | Error::RuleDisabled { .. }
                    | Error::CooldownActive { .. }
                    | Error::DailyCapExceeded { .. }
                    | Error::GeoRequired
                    | Error::OutOfCoverage { .. },
                ) => {
                    debug!(user_id, card_id, "Bind reward skipped by rule policy");
                    None
                }
                Err(err) => return Err(err),
            }
        }
        None => None,
    };

    txn.commit().await?;
    info!(user_id, card_id, "Card bound");

    let mut events = vec![EngineEvent::CardBound {
        user_id: user_id.to_string(),
        card_id: card_id.to_string(),
    }];
    let mut reward_points = None;
    if let Some((entry, points)) = reward {
        reward_points = Some(points);
        events.push(EngineEvent::ActivityRewarded {
            user_id: user_id.to_string(),
            rule_code: cfg.card_bind_rule.clone().unwrap_or_default(),
            points,
        });
        if let Some(engine) = referral {
            events.extend(engine.on_ledger_event(db, &entry).await?);
        }
    }

    Ok(BindOutcome {
        binding,
        reward_points,
        events,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::{activity, ledger, user};
    use crate::test_utils::{TEST_SECRET, rule_config, setup_with_user};

    #[tokio::test]
    async fn test_bind_happy_path() -> Result<()> {
        let (db, cfg) = setup_with_user("u1").await?;

        let token = issue_bind_token(&db, TEST_SECRET, "card-7").await?;
        let outcome = bind(
            &db,
            &cfg,
            TEST_SECRET,
            "card-7",
            &token.token_id,
            &token.signature,
            "u1",
            None,
        )
        .await?;

        assert_eq!(outcome.binding.card_id, "card-7");
        assert_eq!(outcome.binding.user_id, "u1");
        assert_eq!(outcome.reward_points, None);

        let row = CardBindToken::find_by_id(&token.token_id)
            .one(&db)
            .await?
            .unwrap();
        assert!(row.used);
        assert_eq!(row.used_by.as_deref(), Some("u1"));

        Ok(())
    }

    #[tokio::test]
    async fn test_bind_token_single_use() -> Result<()> {
        let (db, cfg) = setup_with_user("u1").await?;
        user::register(&db, &cfg, "u2", "Bob", "en", None).await?;

        let token = issue_bind_token(&db, TEST_SECRET, "card-7").await?;
        bind(
            &db,
            &cfg,
            TEST_SECRET,
            "card-7",
            &token.token_id,
            &token.signature,
            "u1",
            None,
        )
        .await?;

        let second = bind(
            &db,
            &cfg,
            TEST_SECRET,
            "card-7",
            &token.token_id,
            &token.signature,
            "u2",
            None,
        )
        .await;
        assert!(matches!(second.unwrap_err(), Error::TokenUsed));

        Ok(())
    }

    #[tokio::test]
    async fn test_bind_rejects_tampered_signature() -> Result<()> {
        let (db, cfg) = setup_with_user("u1").await?;
        let token = issue_bind_token(&db, TEST_SECRET, "card-7").await?;

        // signature for a different card
        let result = bind(
            &db,
            &cfg,
            TEST_SECRET,
            "card-8",
            &token.token_id,
            &token.signature,
            "u1",
            None,
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::InvalidSignature));

        // token survives the failed attempt
        let row = CardBindToken::find_by_id(&token.token_id)
            .one(&db)
            .await?
            .unwrap();
        assert!(!row.used);

        Ok(())
    }

    #[tokio::test]
    async fn test_bind_card_linked_to_other_user() -> Result<()> {
        let (db, cfg) = setup_with_user("u1").await?;
        user::register(&db, &cfg, "u2", "Bob", "en", None).await?;

        let first = issue_bind_token(&db, TEST_SECRET, "card-7").await?;
        bind(
            &db,
            &cfg,
            TEST_SECRET,
            "card-7",
            &first.token_id,
            &first.signature,
            "u1",
            None,
        )
        .await?;

        let second = issue_bind_token(&db, TEST_SECRET, "card-7").await?;
        let result = bind(
            &db,
            &cfg,
            TEST_SECRET,
            "card-7",
            &second.token_id,
            &second.signature,
            "u2",
            None,
        )
        .await;
        assert!(matches!(
            result.unwrap_err(),
            Error::AlreadyLinked { card_id } if card_id == "card-7"
        ));

        // the failed bind rolled back: the second token is still unused
        let row = CardBindToken::find_by_id(&second.token_id)
            .one(&db)
            .await?
            .unwrap();
        assert!(!row.used);

        Ok(())
    }

    #[tokio::test]
    async fn test_rebind_same_user_keeps_single_binding() -> Result<()> {
        let (db, cfg) = setup_with_user("u1").await?;

        let first = issue_bind_token(&db, TEST_SECRET, "card-7").await?;
        let initial = bind(
            &db,
            &cfg,
            TEST_SECRET,
            "card-7",
            &first.token_id,
            &first.signature,
            "u1",
            None,
        )
        .await?;

        let second = issue_bind_token(&db, TEST_SECRET, "card-7").await?;
        let again = bind(
            &db,
            &cfg,
            TEST_SECRET,
            "card-7",
            &second.token_id,
            &second.signature,
            "u1",
            None,
        )
        .await?;

        assert_eq!(initial.binding.id, again.binding.id);
        assert_eq!(CardBinding::find().all(&db).await?.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_bind_reward_delegates_to_rule() -> Result<()> {
        let (db, mut cfg) = setup_with_user("u1").await?;
        cfg.card_bind_rule = Some("card_bind".to_string());
        activity::upsert_rule(&db, &rule_config("card_bind", 15, 0)).await?;

        let token = issue_bind_token(&db, TEST_SECRET, "card-7").await?;
        let outcome = bind(
            &db,
            &cfg,
            TEST_SECRET,
            "card-7",
            &token.token_id,
            &token.signature,
            "u1",
            None,
        )
        .await?;

        assert_eq!(outcome.reward_points, Some(15));
        assert_eq!(ledger::balance(&db, "u1").await?.balance, 15);

        Ok(())
    }

    #[tokio::test]
    async fn test_bind_reward_skipped_when_rule_missing() -> Result<()> {
        let (db, mut cfg) = setup_with_user("u1").await?;
        cfg.card_bind_rule = Some("card_bind".to_string());
        // rule never seeded

        let token = issue_bind_token(&db, TEST_SECRET, "card-7").await?;
        let outcome = bind(
            &db,
            &cfg,
            TEST_SECRET,
            "card-7",
            &token.token_id,
            &token.signature,
            "u1",
            None,
        )
        .await?;

        // the bind itself stands, just without points
        assert_eq!(outcome.reward_points, None);
        assert_eq!(ledger::balance(&db, "u1").await?.balance, 0);

        Ok(())
    }
}
