// crates/quota-gate-core/src/core/mod.rs
// ============================================================================
// Module: Core Domain Model
// Description: Identifiers, tiers, billing periods, principals, and tokens.
// Purpose: Group the pure data types shared by all Quota Gate components.
// Dependencies: serde, sha2, subtle, rand
// ============================================================================

//! ## Overview
//! Pure domain types with no I/O. Everything here is deterministic and
//! serializable; store implementations and the HTTP surface build on these
//! types without extending them.

pub mod identifiers;
pub mod period;
pub mod principal;
pub mod tier;
pub mod token;
