//! Database configuration module for the reward engine.
//!
//! Handles `SQLite` connection setup and table creation using `SeaORM`.
//! Tables are generated from the entity definitions via
//! `Schema::create_table_from_entity` so the schema always matches the Rust
//! structs, plus one explicit composite unique index that the entity macros
//! cannot express: the cascade idempotency key on `referral_bonuses`.

use crate::entities::{
    ActivityLog, ActivityRule, CardBindToken, CardBinding, DiscountToken, LedgerEntry,
    ReferralBonus, ReferralCode, ReferralEdge, User, Wallet, referral_bonus,
};
use crate::errors::Result;
use sea_orm::sea_query::Index;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};

/// Gets the database URL from environment variable or returns default `SQLite` path.
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://data/loyalty.sqlite".to_string())
}

/// Establishes a connection to the `SQLite` database using the `DATABASE_URL`
/// environment variable, falling back to a default local `SQLite` file.
pub async fn create_connection() -> Result<DatabaseConnection> {
    Database::connect(get_database_url()).await.map_err(Into::into)
}

/// Creates all tables and indexes from the entity definitions.
///
/// Safe to call on an existing database: every statement carries
/// `IF NOT EXISTS`, so the ops binary can run it at each startup.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut statements = vec![
        schema.create_table_from_entity(User),
        schema.create_table_from_entity(Wallet),
        schema.create_table_from_entity(LedgerEntry),
        schema.create_table_from_entity(DiscountToken),
        schema.create_table_from_entity(CardBindToken),
        schema.create_table_from_entity(CardBinding),
        schema.create_table_from_entity(ActivityRule),
        schema.create_table_from_entity(ActivityLog),
        schema.create_table_from_entity(ReferralCode),
        schema.create_table_from_entity(ReferralEdge),
        schema.create_table_from_entity(ReferralBonus),
    ];

    for table in &mut statements {
        table.if_not_exists();
        db.execute(builder.build(&*table)).await?;
    }

    // Cascade idempotency: at most one payout per (source entry, ancestor, level)
    let bonus_idx = Index::create()
        .name("uq_referral_bonus_source_referrer_level")
        .table(ReferralBonus)
        .col(referral_bonus::Column::SourceLedgerEntryId)
        .col(referral_bonus::Column::ReferrerId)
        .col(referral_bonus::Column::Level)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(builder.build(&bonus_idx)).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{
        ledger_entry::Model as LedgerEntryModel, referral_edge::Model as ReferralEdgeModel,
        wallet::Model as WalletModel,
    };
    use sea_orm::{EntityTrait, QuerySelect};

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        // Test that tables exist by querying them
        let _: Vec<WalletModel> = Wallet::find().limit(1).all(&db).await?;
        let _: Vec<LedgerEntryModel> = LedgerEntry::find().limit(1).all(&db).await?;
        let _: Vec<ReferralEdgeModel> = ReferralEdge::find().limit(1).all(&db).await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_create_tables_is_idempotent() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;
        Ok(())
    }
}
