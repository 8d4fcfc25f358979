//! Redemption engine - issues and atomically consumes discount tokens.
//!
//! A token is an unguessable nonce plus an HMAC binding it to its listing,
//! value, and expiry. Redemption flips `used` with a conditional UPDATE and
//! appends the crediting ledger entry in the same transaction, so of N
//! concurrent redeemers exactly one succeeds and the token can never end up
//! consumed without its ledger entry (or the other way around). Expiry is
//! evaluated lazily at redeem time; there is no sweeper.

use crate::{
    config::rewards::RewardsConfig,
    core::events::EngineEvent,
    core::referral::ReferralEngine,
    entities::{DiscountToken, LedgerReason, discount_token, ledger_entry},
    errors::{Error, Result},
};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{DatabaseConnection, Set, TransactionTrait, prelude::*};
use tracing::info;
use uuid::Uuid;

/// What the partner surface hands to the user: identifier plus signature.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// One-time token identifier
    pub token_id: String,
    /// HMAC over the token metadata
    pub signature: String,
    /// Listing the token belongs to
    pub listing_id: String,
    /// Points credited on redemption
    pub value: i64,
    /// When the token stops being redeemable
    pub expires_at: DateTime<Utc>,
}

/// Successful redemption.
#[derive(Debug, Clone)]
pub struct RedemptionOutcome {
    /// Points credited to the redeemer
    pub value: i64,
    /// The ledger entry appended for this redemption
    pub entry: ledger_entry::Model,
    /// Events for the notification component
    pub events: Vec<EngineEvent>,
}

/// Canonical signed form of a token's metadata.
fn token_payload(token_id: &str, listing_id: &str, value: i64, expires_at: DateTime<Utc>) -> String {
    format!("{token_id}|{listing_id}|{value}|{}", expires_at.timestamp())
}

/// Issues a discount token with the configured fixed TTL.
///
/// The plaintext identifier is a fresh v4 UUID and is never reused; the
/// signature binds it to the listing, value, and expiry so none of them can
/// be swapped later.
pub async fn issue(
    db: &DatabaseConnection,
    secret: &str,
    listing_id: &str,
    value: i64,
    ttl_hours: i64,
) -> Result<IssuedToken> {
    if value <= 0 {
        return Err(Error::ZeroAmount);
    }

    let now = Utc::now();
    let expires_at = now + Duration::hours(ttl_hours);
    let token_id = Uuid::new_v4().simple().to_string();
    let signature = crate::core::signing::sign(
        secret,
        &token_payload(&token_id, listing_id, value, expires_at),
    );

    discount_token::ActiveModel {
        token_id: Set(token_id.clone()),
        listing_id: Set(listing_id.to_string()),
        value: Set(value),
        signature: Set(signature.clone()),
        issued_at: Set(now),
        expires_at: Set(expires_at),
        used: Set(false),
        used_at: Set(None),
        redeemed_by: Set(None),
    }
    .insert(db)
    .await?;

    info!(listing_id, value, "Issued discount token");
    Ok(IssuedToken {
        token_id,
        signature,
        listing_id: listing_id.to_string(),
        value,
        expires_at,
    })
}

/// Redeems a token for the calling user.
///
/// Order of checks: signature, expiry, then the atomic consume-and-credit.
/// Unknown identifiers and signature mismatches both report `InvalidToken`
/// so probing cannot tell them apart. When the referral engine is supplied,
/// a successful redemption is reported to it (redemption may be the
/// configured activation trigger) and its events are merged into the outcome.
pub async fn redeem(
    db: &DatabaseConnection,
    cfg: &RewardsConfig,
    secret: &str,
    token_id: &str,
    signature: &str,
    user_id: &str,
    referral: Option<&ReferralEngine>,
) -> Result<RedemptionOutcome> {
    use sea_orm::sea_query::Expr;

    let token = DiscountToken::find_by_id(token_id)
        .one(db)
        .await?
        .ok_or(Error::InvalidToken)?;

    let payload = token_payload(
        &token.token_id,
        &token.listing_id,
        token.value,
        token.expires_at,
    );
    if !crate::core::signing::verify(secret, &payload, signature) {
        return Err(Error::InvalidToken);
    }

    let now = Utc::now();
    if now > token.expires_at {
        return Err(Error::Expired {
            expires_at: token.expires_at,
        });
    }

    let txn = db.begin().await?;

    // exactly one of N concurrent redeemers flips the flag
    let consumed = DiscountToken::update_many()
        .col_expr(discount_token::Column::Used, Expr::value(true))
        .filter(discount_token::Column::TokenId.eq(token_id))
        .filter(discount_token::Column::Used.eq(false))
        .exec(&txn)
        .await?;
    if consumed.rows_affected == 0 {
        return Err(Error::AlreadyRedeemed);
    }

    let claimed = DiscountToken::find_by_id(token_id)
        .one(&txn)
        .await?
        .ok_or(Error::Conflict)?;
    let mut active: discount_token::ActiveModel = claimed.into();
    active.used_at = Set(Some(now));
    active.redeemed_by = Set(Some(user_id.to_string()));
    active.update(&txn).await?;

    let entry = crate::core::ledger::append_in(
        &txn,
        cfg,
        user_id,
        token.value,
        LedgerReason::Redemption,
        token_id,
    )
    .await?;

    txn.commit().await?;
    info!(user_id, token_id, value = token.value, "Token redeemed");

    let mut events = vec![EngineEvent::TokenRedeemed {
        user_id: user_id.to_string(),
        token_id: token_id.to_string(),
        value: token.value,
    }];
    if let Some(engine) = referral {
        events.extend(engine.on_ledger_event(db, &entry).await?);
    }

    Ok(RedemptionOutcome {
        value: token.value,
        entry,
        events,
    })
}
