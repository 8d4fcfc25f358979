//! Ledger store and wallet balance cache - the single source of truth for balances.
//!
//! Every balance-affecting operation in the engine funnels through [`append_in`]:
//! one transaction that inserts the immutable ledger row and updates the cached
//! wallet balance. The negative-balance check for debits is part of the same
//! conditional UPDATE that applies the delta, so there is no check-then-act
//! window. Appends for different users touch different wallet rows and never
//! contend with each other.

use crate::{
    config::rewards::RewardsConfig,
    entities::{LedgerEntry, LedgerReason, Wallet, ledger_entry, wallet},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::sea_query::ExprTrait;
use sea_orm::{DatabaseConnection, QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*};
use tracing::{debug, warn};

/// Appends a ledger entry and updates the wallet inside its own transaction.
///
/// Rejects `amount == 0`. Debits that would drive the balance negative fail
/// with `InsufficientBalance` and leave no trace. For composing with other
/// writes (token consumption, activity logs) use [`append_in`] on an open
/// transaction instead.
pub async fn append(
    db: &DatabaseConnection,
    cfg: &RewardsConfig,
    user_id: &str,
    amount: i64,
    reason: LedgerReason,
    reference_id: &str,
) -> Result<ledger_entry::Model> {
    let txn = db.begin().await?;
    let entry = append_in(&txn, cfg, user_id, amount, reason, reference_id).await?;
    txn.commit().await?;
    Ok(entry)
}

/// Appends a ledger entry and updates the wallet on the caller's connection.
///
/// The wallet delta is one conditional UPDATE: for debits the statement only
/// matches when `balance + amount >= 0`, so the balance check and the write
/// are a single atomic step serialized on the wallet row. Credits also
/// accumulate `lifetime_points` and may promote the wallet's tier.
pub async fn append_in<C>(
    conn: &C,
    cfg: &RewardsConfig,
    user_id: &str,
    amount: i64,
    reason: LedgerReason,
    reference_id: &str,
) -> Result<ledger_entry::Model>
where
    C: ConnectionTrait,
{
    use sea_orm::sea_query::Expr;

    if amount == 0 {
        return Err(Error::ZeroAmount);
    }

    let mut update = Wallet::update_many()
        .col_expr(
            wallet::Column::Balance,
            Expr::col(wallet::Column::Balance).add(amount),
        )
        .filter(wallet::Column::UserId.eq(user_id));

    if amount > 0 {
        update = update.col_expr(
            wallet::Column::LifetimePoints,
            Expr::col(wallet::Column::LifetimePoints).add(amount),
        );
    } else {
        // the guard makes the overdraft check part of the write itself
        update = update.filter(Expr::col(wallet::Column::Balance).add(amount).gte(0));
    }

    let updated = update.exec(conn).await?;
    if updated.rows_affected == 0 {
        let wallet = crate::core::user::wallet_of(conn, user_id).await?;
        return Err(Error::InsufficientBalance {
            balance: wallet.balance,
            required: -amount,
        });
    }

    // refresh tier and timestamp from the post-update totals, same transaction
    let wallet = crate::core::user::wallet_of(conn, user_id).await?;
    let tier = cfg.tier_for(wallet.lifetime_points).to_string();
    let mut active: wallet::ActiveModel = wallet.into();
    active.tier = Set(tier);
    active.updated_at = Set(Utc::now());
    active.update(conn).await?;

    let entry = ledger_entry::ActiveModel {
        user_id: Set(user_id.to_string()),
        amount: Set(amount),
        reason: Set(reason),
        reference_id: Set(reference_id.to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(conn)
    .await?;

    debug!(
        user_id,
        amount,
        reference_id,
        entry_id = entry.id,
        "Appended ledger entry"
    );
    Ok(entry)
}

/// Current wallet snapshot for display. Read-your-writes, not serializable.
pub async fn balance(db: &DatabaseConnection, user_id: &str) -> Result<wallet::Model> {
    crate::core::user::wallet_of(db, user_id).await
}

/// Most recent ledger entries for a user, newest first.
pub async fn history(
    db: &DatabaseConnection,
    user_id: &str,
    limit: u64,
) -> Result<Vec<ledger_entry::Model>> {
    LedgerEntry::find()
        .filter(ledger_entry::Column::UserId.eq(user_id))
        .order_by_desc(ledger_entry::Column::CreatedAt)
        .order_by_desc(ledger_entry::Column::Id)
        .limit(limit)
        .all(db)
        .await
        .map_err(Into::into)
}

/// One wallet whose cached balance disagrees with its ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Divergence {
    /// Wallet owner
    pub user_id: String,
    /// What the wallet row says
    pub cached_balance: i64,
    /// What the ledger says
    pub ledger_sum: i64,
}

/// Result of a reconciliation pass over all wallets.
#[derive(Debug, Clone)]
pub struct ReconciliationReport {
    /// Wallets compared against their ledger
    pub wallets_checked: usize,
    /// Wallets where cache and ledger disagree; any entry here is a bug
    pub divergences: Vec<Divergence>,
}

/// Compares every cached balance against the sum of that user's ledger.
///
/// Detection only: divergences are reported and logged, never auto-repaired,
/// because a divergence means a write path broke its transaction contract
/// and the ledger is the side to trust.
pub async fn reconcile(db: &DatabaseConnection) -> Result<ReconciliationReport> {
    let wallets = Wallet::find().all(db).await?;
    let mut divergences = Vec::new();

    for wallet in &wallets {
        let entries = LedgerEntry::find()
            .filter(ledger_entry::Column::UserId.eq(wallet.user_id.as_str()))
            .all(db)
            .await?;
        let ledger_sum: i64 = entries.iter().map(|e| e.amount).sum();

        if ledger_sum != wallet.balance {
            warn!(
                user_id = %wallet.user_id,
                cached = wallet.balance,
                ledger = ledger_sum,
                "Wallet balance diverges from ledger"
            );
            divergences.push(Divergence {
                user_id: wallet.user_id.clone(),
                cached_balance: wallet.balance,
                ledger_sum,
            });
        }
    }

    Ok(ReconciliationReport {
        wallets_checked: wallets.len(),
        divergences,
    })
}
