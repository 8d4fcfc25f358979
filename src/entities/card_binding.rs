//! Card binding entity - The durable card-to-user association.
//!
//! At most one active binding per card, enforced by the unique `card_id`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Card binding database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "card_bindings")]
pub struct Model {
    /// Unique identifier for the binding
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Bound card; one active binding per card
    #[sea_orm(unique)]
    pub card_id: String,
    /// Owning user
    pub user_id: String,
    /// When the binding was created
    pub bound_at: DateTimeUtc,
}

/// `CardBinding` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
