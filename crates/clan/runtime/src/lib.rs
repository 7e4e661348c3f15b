//! Clan Runtime
//!
//! Shared, session-scoped state for clans and the machinery that changes it:
//!
//! - [`EventBus`]: phased dispatch (MODEL → INTEGRATION → SESSION → COSMETIC)
//!   of lifecycle and option events, fail-fast on the first listener error.
//! - [`ClanRegistry`]: every clan in the session, unique by name, with no
//!   player in two clans. Supplies the MODEL-phase listeners.
//! - [`SessionManager`]: confirmation timers keyed by `(event, key)` that
//!   gate destructive commands behind a bounded re-confirmation window.
//! - [`ClanCoordinator`]: command-facing facade tying the three together.
//!
//! All three shared components are `Send + Sync` and meant to be held in an
//! `Arc`, one instance per session.

#![deny(unsafe_code)]

pub mod config;
pub mod coordinator;
pub mod event_bus;
pub mod registry;
pub mod session;
pub mod telemetry;
pub mod timer;

pub use config::{ClanConfig, LoggingConfig, SessionConfig};
pub use coordinator::{ClanCoordinator, CommandOutcome};
pub use event_bus::{
    EventBus, LifecycleContext, LifecycleListener, Listener, OptionContext, OptionListener,
};
pub use registry::ClanRegistry;
pub use session::{SessionManager, TimerKey};
pub use telemetry::init_tracing;
pub use timer::ConfirmTimer;
