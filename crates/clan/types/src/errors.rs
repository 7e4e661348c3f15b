//! Error types for the clan layer

use crate::{ClanName, ClanOption, LifecycleEvent, MemberId, Permission, Rank};

/// Errors that can occur in clan operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClanError {
    // --- Clan mutation failures ---
    #[error("Already a clanmate: {0}")]
    AlreadyMember(MemberId),

    #[error("Not a clanmate: {0}")]
    NotMember(MemberId),

    #[error("The leader cannot leave; transfer leadership first: {0}")]
    LeaderCannotLeave(MemberId),

    #[error("Already at the highest promotable rank: {0}")]
    AtMaxPromotableRank(MemberId),

    #[error("The leader cannot be promoted: {0}")]
    CannotPromoteLeader(MemberId),

    #[error("Already at the lowest rank, remove instead: {0}")]
    AtMinDemotableRank(MemberId),

    #[error("The leader cannot be demoted: {0}")]
    CannotDemoteLeader(MemberId),

    #[error("Only a co-leader can be crowned: {0}")]
    MustBeCoLeaderToCrown(MemberId),

    #[error("Invalid value for {option}: {value:?}")]
    InvalidOptionValue { option: ClanOption, value: String },

    // --- Invariant violations ---
    #[error("Invalid clan name: {0:?}")]
    InvalidClanName(String),

    #[error("Member appears in more than one rank bucket: {0}")]
    DuplicateMembership(MemberId),

    #[error("Clan name already taken: {0}")]
    DuplicateClanName(ClanName),

    #[error("{member} already belongs to clan {clan}")]
    AlreadyInClan { member: MemberId, clan: ClanName },

    // --- Event preconditions ---
    #[error("Clan not registered: {0}")]
    ClanNotRegistered(ClanName),

    #[error("{agent} is not the leader of {clan}")]
    NotLeader { agent: MemberId, clan: ClanName },

    #[error("{agent} is not a clanmate of {clan}")]
    NotClanmate { agent: MemberId, clan: ClanName },

    #[error("Insufficient rank: {agent} ({agent_rank}) does not outrank {target} ({target_rank})")]
    InsufficientRank {
        agent: MemberId,
        agent_rank: Rank,
        target: MemberId,
        target_rank: Rank,
    },

    #[error("The creator {agent} must be the leader of the new clan {clan}")]
    CreatorMustBeLeader { agent: MemberId, clan: ClanName },

    #[error("Listener {listener} rejected {event}: {reason}")]
    Listener {
        listener: String,
        event: String,
        reason: String,
    },

    // --- Confirmation protocol misuse ---
    #[error("No confirmation timer registered for {event} {key}")]
    TimerNotRegistered { event: LifecycleEvent, key: String },

    #[error("Confirmation timer has not been started")]
    TimerNotStarted,

    // --- Command layer rejections ---
    #[error("{member} lacks permission {permission}")]
    MissingPermission {
        member: MemberId,
        permission: Permission,
    },

    #[error("{0} is not in any clan")]
    NotInAnyClan(MemberId),

    #[error("Nothing to confirm for {event} {key}")]
    NoPendingConfirmation { event: LifecycleEvent, key: String },
}

/// Result type alias for clan operations
pub type ClanResult<T> = Result<T, ClanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listener_error_names_listener_and_event() {
        let err = ClanError::Listener {
            listener: "chat-bridge".into(),
            event: LifecycleEvent::Kick.to_string(),
            reason: "bridge offline".into(),
        };
        assert_eq!(
            err.to_string(),
            "Listener chat-bridge rejected KICK: bridge offline"
        );
    }
}
