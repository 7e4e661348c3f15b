//! Clan Domain Types
//!
//! This crate defines the domain types for clans: small, self-governing
//! member groups with one leader and ranked subordinates.
//!
//! # Key Concepts
//!
//! - **Rank**: MEMBER < ELDER < COLEADER < LEADER. Each rank holds every
//!   permission of the rank below it plus its own.
//! - **Clan**: a validated name, exactly one leader, and three disjoint rank
//!   buckets. All mutation goes through operations that either succeed fully
//!   or leave the clan untouched.
//! - **Lifecycle events**: named transitions (CREATE, JOIN, LEAVE, KICK,
//!   DISBAND, PROMOTE, DEMOTE, CORONATE) plus option events, dispatched in
//!   phases MODEL → INTEGRATION → SESSION → COSMETIC.
//! - **Clan records**: the serializable shape handed to persistence.
//!
//! # Architecture
//!
//! This is a pure types crate with no locking and no I/O. Shared state,
//! dispatch and timers live in `clan-runtime`.

#![deny(unsafe_code)]

mod clan;
mod errors;
mod event;
mod ids;
mod options;
mod rank;
mod record;

pub use clan::*;
pub use errors::*;
pub use event::*;
pub use ids::*;
pub use options::*;
pub use rank::*;
pub use record::*;
