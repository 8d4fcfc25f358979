//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod activity_log;
pub mod activity_rule;
pub mod card_bind_token;
pub mod card_binding;
pub mod discount_token;
pub mod ledger_entry;
pub mod referral_bonus;
pub mod referral_code;
pub mod referral_edge;
pub mod user;
pub mod wallet;

// Re-export specific types to avoid conflicts
pub use activity_log::{Column as ActivityLogColumn, Entity as ActivityLog, Model as ActivityLogModel};
pub use activity_rule::{
    Column as ActivityRuleColumn, Entity as ActivityRule, Model as ActivityRuleModel,
};
pub use card_bind_token::{
    Column as CardBindTokenColumn, Entity as CardBindToken, Model as CardBindTokenModel,
};
pub use card_binding::{
    Column as CardBindingColumn, Entity as CardBinding, Model as CardBindingModel,
};
pub use discount_token::{
    Column as DiscountTokenColumn, Entity as DiscountToken, Model as DiscountTokenModel,
};
pub use ledger_entry::{
    Column as LedgerEntryColumn, Entity as LedgerEntry, LedgerReason, Model as LedgerEntryModel,
};
pub use referral_bonus::{
    Column as ReferralBonusColumn, Entity as ReferralBonus, Model as ReferralBonusModel,
};
pub use referral_code::{
    Column as ReferralCodeColumn, Entity as ReferralCode, Model as ReferralCodeModel,
};
pub use referral_edge::{
    Column as ReferralEdgeColumn, Entity as ReferralEdge, Model as ReferralEdgeModel,
    ReferralStatus,
};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
pub use wallet::{Column as WalletColumn, Entity as Wallet, Model as WalletModel};
