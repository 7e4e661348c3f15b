//! Lifecycle and option events, and the phases they are dispatched in

use crate::ClanOption;
use serde::{Deserialize, Serialize};

/// A named transition in a clan's life
///
/// Every lifecycle event carries `(clan, agent, target)`. For CORONATE the
/// pair is `(old leader, new leader)`; for CREATE, LEAVE and DISBAND agent
/// and target are normally the same player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleEvent {
    Create,
    Coronate,
    Join,
    Leave,
    Kick,
    Disband,
    Promote,
    Demote,
}

impl LifecycleEvent {
    pub const ALL: [LifecycleEvent; 8] = [
        LifecycleEvent::Create,
        LifecycleEvent::Coronate,
        LifecycleEvent::Join,
        LifecycleEvent::Leave,
        LifecycleEvent::Kick,
        LifecycleEvent::Disband,
        LifecycleEvent::Promote,
        LifecycleEvent::Demote,
    ];
}

impl std::fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            LifecycleEvent::Create => "CREATE",
            LifecycleEvent::Coronate => "CORONATE",
            LifecycleEvent::Join => "JOIN",
            LifecycleEvent::Leave => "LEAVE",
            LifecycleEvent::Kick => "KICK",
            LifecycleEvent::Disband => "DISBAND",
            LifecycleEvent::Promote => "PROMOTE",
            LifecycleEvent::Demote => "DEMOTE",
        };
        f.write_str(label)
    }
}

/// An option change, carrying `(clan, agent, new value)`
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OptionEvent {
    SetColor,
    SetPrefix,
}

impl OptionEvent {
    pub const ALL: [OptionEvent; 2] = [OptionEvent::SetColor, OptionEvent::SetPrefix];

    /// The clan option this event writes
    pub fn option(self) -> ClanOption {
        match self {
            OptionEvent::SetColor => ClanOption::Color,
            OptionEvent::SetPrefix => ClanOption::Prefix,
        }
    }

    pub fn for_option(option: ClanOption) -> Self {
        match option {
            ClanOption::Color => OptionEvent::SetColor,
            ClanOption::Prefix => OptionEvent::SetPrefix,
        }
    }
}

impl std::fmt::Display for OptionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptionEvent::SetColor => f.write_str("SET_COLOR"),
            OptionEvent::SetPrefix => f.write_str("SET_PREFIX"),
        }
    }
}

/// Dispatch phase. Listeners of an earlier phase always run before any
/// listener of a later phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    /// Mutates clan and registry state; the only phase allowed to
    /// reject an event on domain grounds
    Model,
    /// Mirrors committed state into external systems
    Integration,
    /// Session bookkeeping such as consumed invitations
    Session,
    /// User-visible messaging
    Cosmetic,
}

impl Phase {
    /// Dispatch order
    pub const ORDER: [Phase; 4] = [
        Phase::Model,
        Phase::Integration,
        Phase::Session,
        Phase::Cosmetic,
    ];
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Phase::Model => "MODEL",
            Phase::Integration => "INTEGRATION",
            Phase::Session => "SESSION",
            Phase::Cosmetic => "COSMETIC",
        };
        f.write_str(label)
    }
}
