//! Core business logic - framework-agnostic engine operations.
//!
//! Each submodule owns one write path of the platform. Every operation is a
//! single request-scoped unit of work: it validates preconditions, performs
//! one atomic read-check-write against the store, and either fully commits
//! or fully rolls back. There is no long-running in-process state; expiry
//! and rule windows are evaluated lazily at request time.

/// Activity reward engine - rule-gated point claims
pub mod activity;
/// Card binding service - one-time deep-link to durable binding
pub mod card;
/// Events emitted for the external notification component
pub mod events;
/// Ledger store and wallet balance cache
pub mod ledger;
/// Discount token issuance and redemption
pub mod redemption;
/// Referral graph, activation state machine, and bonus cascade
pub mod referral;
/// HMAC signatures over token metadata
pub mod signing;
/// User and wallet provisioning
pub mod user;
