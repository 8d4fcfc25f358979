//! User and wallet provisioning.
//!
//! A wallet is created together with its user at zero balance, inside one
//! transaction, so every verified identity the auth layer hands us has
//! exactly one wallet before any balance-affecting operation runs.

use crate::{
    config::rewards::RewardsConfig,
    entities::{User, Wallet, user, wallet},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{DatabaseConnection, Set, TransactionTrait, prelude::*};
use tracing::info;

/// Registers a user and their zero-balance wallet.
///
/// Idempotent: registering an already-known id returns the existing rows
/// untouched, so callers may safely retry.
pub async fn register(
    db: &DatabaseConnection,
    cfg: &RewardsConfig,
    user_id: &str,
    display_name: &str,
    language: &str,
    contact_fingerprint: Option<String>,
) -> Result<(user::Model, wallet::Model)> {
    let txn = db.begin().await?;

    if let Some(existing) = User::find_by_id(user_id).one(&txn).await? {
        let wallet = wallet_of(&txn, user_id).await?;
        txn.commit().await?;
        return Ok((existing, wallet));
    }

    let now = Utc::now();
    let user = user::ActiveModel {
        id: Set(user_id.to_string()),
        display_name: Set(display_name.to_string()),
        language: Set(language.to_string()),
        contact_fingerprint: Set(contact_fingerprint),
        created_at: Set(now),
    }
    .insert(&txn)
    .await?;

    let wallet = wallet::ActiveModel {
        user_id: Set(user_id.to_string()),
        balance: Set(0),
        lifetime_points: Set(0),
        tier: Set(cfg.tier_for(0).to_string()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    info!(user_id, "Registered user with zero-balance wallet");
    Ok((user, wallet))
}

/// Fetches a user together with their wallet.
pub async fn get_profile(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<(user::Model, wallet::Model)> {
    let user = User::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::UserNotFound {
            user_id: user_id.to_string(),
        })?;
    let wallet = wallet_of(db, user_id).await?;
    Ok((user, wallet))
}

/// Wallet row for a user, or `WalletNotFound` if provisioning was skipped.
pub(crate) async fn wallet_of<C>(conn: &C, user_id: &str) -> Result<wallet::Model>
where
    C: ConnectionTrait,
{
    Wallet::find()
        .filter(wallet::Column::UserId.eq(user_id))
        .one(conn)
        .await?
        .ok_or_else(|| Error::WalletNotFound {
            user_id: user_id.to_string(),
        })
}
