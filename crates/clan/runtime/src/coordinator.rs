//! Clan coordinator: the command-facing entry point
//!
//! Performs the authorization checks a command layer owes the core
//! (permission, rank, "which clan am I in"), runs the two-step
//! confirmation protocol for destructive actions, and fires events on the
//! bus. Parsing arguments and wording replies stay with the caller.

use crate::config::SessionConfig;
use crate::event_bus::EventBus;
use crate::registry::ClanRegistry;
use crate::session::{SessionManager, TimerKey};
use chrono::Duration;
use clan_types::{
    Clan, ClanError, ClanName, ClanOption, ClanResult, LifecycleEvent, MemberId, OptionEvent,
    Permission, Rank,
};
use std::sync::Arc;
use tracing::debug;

/// What a command call achieved
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandOutcome {
    /// A confirmation window was opened; repeat the call within it
    AwaitingConfirmation { window_secs: i64 },
    /// The event fired and state is committed
    Completed,
}

/// Entry point for clan commands, wired to one session's bus, registry and
/// confirmation timers
pub struct ClanCoordinator {
    bus: Arc<EventBus>,
    registry: Arc<ClanRegistry>,
    session: Arc<SessionManager>,
    config: SessionConfig,
}

impl ClanCoordinator {
    /// Wire existing components. Listeners are expected to be installed.
    pub fn new(
        bus: Arc<EventBus>,
        registry: Arc<ClanRegistry>,
        session: Arc<SessionManager>,
        config: SessionConfig,
    ) -> Self {
        Self {
            bus,
            registry,
            session,
            config,
        }
    }

    /// Build a fresh session around a registry and install the registry's
    /// MODEL listeners and the session's SESSION listeners
    pub fn bootstrap(registry: ClanRegistry, config: SessionConfig) -> Self {
        let bus = Arc::new(EventBus::new());
        let registry = Arc::new(registry);
        let session = Arc::new(SessionManager::new());
        registry.install(&bus);
        session.install(&bus);
        Self::new(bus, registry, session, config)
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn registry(&self) -> &Arc<ClanRegistry> {
        &self.registry
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    /// Found a new clan led by `leader`
    pub fn create(&self, leader: &MemberId, name: &str) -> ClanResult<Clan> {
        if let Some(current) = self.registry.clan_of(leader) {
            return Err(ClanError::AlreadyInClan {
                member: leader.clone(),
                clan: current.name().clone(),
            });
        }
        let clan = Clan::found(name, leader.clone())?;
        self.bus
            .fire_event(LifecycleEvent::Create, &clan, leader, leader)?;
        Ok(clan)
    }

    /// Open an invitation for `invitee` to join the agent's clan
    pub fn invite(&self, agent: &MemberId, invitee: &MemberId) -> ClanResult<CommandOutcome> {
        let clan = self.clan_of(agent)?;
        require_permission(&clan, agent, Permission::Invite)?;
        if let Some(current) = self.registry.clan_of(invitee) {
            return Err(ClanError::AlreadyInClan {
                member: invitee.clone(),
                clan: current.name().clone(),
            });
        }

        let key = TimerKey::Invitation {
            invitee: invitee.clone(),
            clan: clan.name().clone(),
        };
        let window = self.open_window(LifecycleEvent::Join, key)?;
        Ok(CommandOutcome::AwaitingConfirmation {
            window_secs: window.num_seconds(),
        })
    }

    /// Accept an open invitation. Fails if none is open or it expired.
    pub fn accept_invitation(
        &self,
        invitee: &MemberId,
        clan_name: &ClanName,
    ) -> ClanResult<CommandOutcome> {
        let key = TimerKey::Invitation {
            invitee: invitee.clone(),
            clan: clan_name.clone(),
        };
        if !self.session.is_in_bounds(LifecycleEvent::Join, &key) {
            return Err(ClanError::NoPendingConfirmation {
                event: LifecycleEvent::Join,
                key: key.to_string(),
            });
        }
        let clan = self
            .registry
            .get(clan_name)
            .ok_or_else(|| ClanError::ClanNotRegistered(clan_name.clone()))?;
        self.bus
            .fire_event(LifecycleEvent::Join, &clan, invitee, invitee)?;
        Ok(CommandOutcome::Completed)
    }

    /// Leave the current clan (two-step)
    pub fn leave(&self, member: &MemberId) -> ClanResult<CommandOutcome> {
        let clan = self.clan_of(member)?;
        if clan.is_leader(member) {
            return Err(ClanError::LeaderCannotLeave(member.clone()));
        }
        self.two_step(
            LifecycleEvent::Leave,
            TimerKey::Member(member.clone()),
            &clan,
            member,
            member,
        )
    }

    /// Remove a lower-ranked clanmate (two-step)
    pub fn kick(&self, agent: &MemberId, target: &MemberId) -> ClanResult<CommandOutcome> {
        let clan = self.clan_of(agent)?;
        let agent_rank = require_permission(&clan, agent, Permission::Kick)?;
        let target_rank = clan.rank_of(target).map_err(|_| ClanError::NotClanmate {
            agent: target.clone(),
            clan: clan.name().clone(),
        })?;
        if !agent_rank.outranks(target_rank) {
            return Err(ClanError::InsufficientRank {
                agent: agent.clone(),
                agent_rank,
                target: target.clone(),
                target_rank,
            });
        }
        self.two_step(
            LifecycleEvent::Kick,
            TimerKey::Pair(agent.clone(), target.clone()),
            &clan,
            agent,
            target,
        )
    }

    /// Dissolve the agent's clan (two-step)
    pub fn disband(&self, agent: &MemberId) -> ClanResult<CommandOutcome> {
        let clan = self.clan_of(agent)?;
        require_permission(&clan, agent, Permission::Disband)?;
        self.two_step(
            LifecycleEvent::Disband,
            TimerKey::Clan(clan.name().clone()),
            &clan,
            agent,
            agent,
        )
    }

    /// Hand leadership to a co-leader (two-step)
    pub fn coronate(&self, agent: &MemberId, target: &MemberId) -> ClanResult<CommandOutcome> {
        let clan = self.clan_of(agent)?;
        if !clan.is_leader(agent) {
            return Err(ClanError::NotLeader {
                agent: agent.clone(),
                clan: clan.name().clone(),
            });
        }
        if clan.rank_of(target).ok() != Some(Rank::CoLeader) {
            return Err(ClanError::MustBeCoLeaderToCrown(target.clone()));
        }
        self.two_step(
            LifecycleEvent::Coronate,
            TimerKey::Pair(agent.clone(), target.clone()),
            &clan,
            agent,
            target,
        )
    }

    pub fn promote(&self, agent: &MemberId, target: &MemberId) -> ClanResult<CommandOutcome> {
        let clan = self.clan_of(agent)?;
        self.bus
            .fire_event(LifecycleEvent::Promote, &clan, agent, target)?;
        Ok(CommandOutcome::Completed)
    }

    pub fn demote(&self, agent: &MemberId, target: &MemberId) -> ClanResult<CommandOutcome> {
        let clan = self.clan_of(agent)?;
        self.bus
            .fire_event(LifecycleEvent::Demote, &clan, agent, target)?;
        Ok(CommandOutcome::Completed)
    }

    /// Change a clan option of the agent's clan
    pub fn set_option(
        &self,
        agent: &MemberId,
        option: ClanOption,
        value: &str,
    ) -> ClanResult<CommandOutcome> {
        let clan = self.clan_of(agent)?;
        require_permission(&clan, agent, Permission::Set)?;
        if !option.validate(value) {
            return Err(ClanError::InvalidOptionValue {
                option,
                value: value.to_string(),
            });
        }
        self.bus
            .fire_option_event(OptionEvent::for_option(option), &clan, agent, value)?;
        Ok(CommandOutcome::Completed)
    }

    fn clan_of(&self, member: &MemberId) -> ClanResult<Clan> {
        self.registry
            .clan_of(member)
            .ok_or_else(|| ClanError::NotInAnyClan(member.clone()))
    }

    /// Fire if an unexpired confirmation is open for the key, otherwise
    /// (re)open one
    fn two_step(
        &self,
        event: LifecycleEvent,
        key: TimerKey,
        clan: &Clan,
        agent: &MemberId,
        target: &MemberId,
    ) -> ClanResult<CommandOutcome> {
        if self.session.is_in_bounds(event, &key) {
            self.session.deregister(event, &key);
            debug!(%event, %key, "Confirmation accepted");
            self.bus.fire_event(event, clan, agent, target)?;
            return Ok(CommandOutcome::Completed);
        }

        let window = self.open_window(event, key)?;
        Ok(CommandOutcome::AwaitingConfirmation {
            window_secs: window.num_seconds(),
        })
    }

    /// Register (if needed) and restart the timer for the key
    fn open_window(&self, event: LifecycleEvent, key: TimerKey) -> ClanResult<Duration> {
        let window = self.config.window(event).unwrap_or_else(Duration::zero);
        self.session.register(event, key.clone(), window);
        self.session.start(event, &key)?;
        Ok(window)
    }
}

/// Rank of `member` in `clan`, failing unless it grants `permission`
fn require_permission(clan: &Clan, member: &MemberId, permission: Permission) -> ClanResult<Rank> {
    let rank = clan.rank_of(member)?;
    if !rank.has_permission(permission) {
        return Err(ClanError::MissingPermission {
            member: member.clone(),
            permission,
        });
    }
    Ok(rank)
}
