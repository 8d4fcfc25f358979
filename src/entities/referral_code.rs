//! Referral code entity - One immutable invite code per user.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Referral code database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "referral_codes")]
pub struct Model {
    /// Unique identifier for the row
    #[sea_orm(primary_key)]
    pub id: i64,
    /// The shareable invite code, immutable once generated
    #[sea_orm(unique)]
    pub code: String,
    /// Owning user; one code per user
    #[sea_orm(unique)]
    pub user_id: String,
    /// When the code was generated
    pub created_at: DateTimeUtc,
}

/// `ReferralCode` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
