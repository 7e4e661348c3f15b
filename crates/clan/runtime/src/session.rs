//! Session manager: confirmation timers keyed by `(event, key)`
//!
//! Destructive commands run in two calls. The first registers and starts a
//! timer for the action; the confirming call only goes ahead while
//! [`SessionManager::is_in_bounds`] holds. The table lives for one session
//! and is never persisted.

use crate::event_bus::{EventBus, LifecycleContext, LifecycleListener, Listener};
use crate::timer::ConfirmTimer;
use chrono::{DateTime, Duration, Utc};
use clan_types::{ClanError, ClanName, ClanResult, LifecycleEvent, MemberId, Phase};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// What a confirmation timer is bound to. The shape depends on the event:
/// LEAVE uses the leaving player, DISBAND the clan, KICK and CORONATE the
/// `(agent, target)` pair, and JOIN invitations the `(invitee, clan)` pair.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TimerKey {
    Member(MemberId),
    Clan(ClanName),
    Pair(MemberId, MemberId),
    Invitation { invitee: MemberId, clan: ClanName },
}

impl std::fmt::Display for TimerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimerKey::Member(id) => write!(f, "member:{}", id),
            TimerKey::Clan(name) => write!(f, "clan:{}", name),
            TimerKey::Pair(agent, target) => write!(f, "pair:{}->{}", agent, target),
            TimerKey::Invitation { invitee, clan } => write!(f, "invite:{}@{}", invitee, clan),
        }
    }
}

/// Session-scoped table of confirmation timers
pub struct SessionManager {
    timers: Mutex<HashMap<(LifecycleEvent, TimerKey), ConfirmTimer>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            timers: Mutex::new(HashMap::new()),
        }
    }

    /// Create an unstarted timer for the key. Returns `false` and leaves
    /// the existing timer alone if one is already registered.
    pub fn register(&self, event: LifecycleEvent, key: TimerKey, duration: Duration) -> bool {
        let mut timers = self.timers.lock();
        if timers.contains_key(&(event, key.clone())) {
            return false;
        }
        debug!(%event, %key, secs = duration.num_seconds(), "Confirmation timer registered");
        timers.insert((event, key), ConfirmTimer::new(duration));
        true
    }

    /// Remove the timer for the key. Returns `false` if there was none.
    pub fn deregister(&self, event: LifecycleEvent, key: &TimerKey) -> bool {
        let removed = self
            .timers
            .lock()
            .remove(&(event, key.clone()))
            .is_some();
        if removed {
            debug!(%event, %key, "Confirmation timer deregistered");
        }
        removed
    }

    pub fn is_registered(&self, event: LifecycleEvent, key: &TimerKey) -> bool {
        self.timers.lock().contains_key(&(event, key.clone()))
    }

    /// Reset and start the timer for the key
    pub fn start(&self, event: LifecycleEvent, key: &TimerKey) -> ClanResult<()> {
        let mut timers = self.timers.lock();
        let timer = timers
            .get_mut(&(event, key.clone()))
            .ok_or_else(|| ClanError::TimerNotRegistered {
                event,
                key: key.to_string(),
            })?;
        timer.reset();
        timer.start();
        debug!(%event, %key, deadline = ?timer.deadline(), "Confirmation timer started");
        Ok(())
    }

    /// Deadline of the timer for the key, if registered and started
    pub fn deadline(&self, event: LifecycleEvent, key: &TimerKey) -> Option<DateTime<Utc>> {
        self.timers
            .lock()
            .get(&(event, key.clone()))
            .and_then(ConfirmTimer::deadline)
    }

    /// True only for a registered, started, unexpired timer. Every other
    /// case is `false`, never an error.
    pub fn is_in_bounds(&self, event: LifecycleEvent, key: &TimerKey) -> bool {
        self.timers
            .lock()
            .get(&(event, key.clone()))
            .and_then(|timer| timer.in_bounds().ok())
            .unwrap_or(false)
    }

    /// Number of registered timers
    pub fn len(&self) -> usize {
        self.timers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.lock().is_empty()
    }

    /// Listener that consumes a JOIN invitation once the join happens
    pub fn invitation_listener(self: &Arc<Self>) -> Arc<dyn LifecycleListener> {
        Arc::new(InvitationConsumer {
            session: Arc::clone(self),
        })
    }

    /// Register the session's listeners on a bus (SESSION phase)
    pub fn install(self: &Arc<Self>, bus: &EventBus) {
        bus.register(
            LifecycleEvent::Join,
            Phase::Session,
            self.invitation_listener(),
        );
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

struct InvitationConsumer {
    session: Arc<SessionManager>,
}

impl Listener for InvitationConsumer {
    fn id(&self) -> &str {
        "session.consume-invitation"
    }
}

impl LifecycleListener for InvitationConsumer {
    fn on_lifecycle(&self, ctx: &LifecycleContext<'_>) -> ClanResult<()> {
        let key = TimerKey::Invitation {
            invitee: ctx.target.clone(),
            clan: ctx.clan.name().clone(),
        };
        self.session.deregister(LifecycleEvent::Join, &key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clan_types::Clan;

    fn leave_key() -> TimerKey {
        TimerKey::Member(MemberId::new("p"))
    }

    #[test]
    fn test_register_is_idempotent() {
        let session = SessionManager::new();
        assert!(session.register(LifecycleEvent::Leave, leave_key(), Duration::seconds(10)));
        assert!(!session.register(LifecycleEvent::Leave, leave_key(), Duration::seconds(99)));
        assert!(session.is_registered(LifecycleEvent::Leave, &leave_key()));
        assert!(!session.is_registered(LifecycleEvent::Kick, &leave_key()));
        assert_eq!(session.len(), 1);
    }

    #[test]
    fn test_deregister() {
        let session = SessionManager::new();
        assert!(!session.deregister(LifecycleEvent::Leave, &leave_key()));
        session.register(LifecycleEvent::Leave, leave_key(), Duration::seconds(10));
        assert!(session.deregister(LifecycleEvent::Leave, &leave_key()));
        assert!(session.is_empty());
    }

    #[test]
    fn test_start_unregistered_is_an_error() {
        let session = SessionManager::new();
        let err = session
            .start(LifecycleEvent::Disband, &leave_key())
            .unwrap_err();
        assert!(matches!(
            err,
            ClanError::TimerNotRegistered {
                event: LifecycleEvent::Disband,
                ..
            }
        ));
    }

    #[test]
    fn test_in_bounds_gate() {
        let session = SessionManager::new();
        // Not registered
        assert!(!session.is_in_bounds(LifecycleEvent::Leave, &leave_key()));

        // Registered, not started
        session.register(LifecycleEvent::Leave, leave_key(), Duration::seconds(60));
        assert!(!session.is_in_bounds(LifecycleEvent::Leave, &leave_key()));

        session.start(LifecycleEvent::Leave, &leave_key()).unwrap();
        assert!(session.is_in_bounds(LifecycleEvent::Leave, &leave_key()));
    }

    #[test]
    fn test_restart_moves_deadline() {
        let session = SessionManager::new();
        session.register(LifecycleEvent::Leave, leave_key(), Duration::seconds(60));
        assert_eq!(session.deadline(LifecycleEvent::Leave, &leave_key()), None);

        session.start(LifecycleEvent::Leave, &leave_key()).unwrap();
        let first = session
            .deadline(LifecycleEvent::Leave, &leave_key())
            .unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));

        session.start(LifecycleEvent::Leave, &leave_key()).unwrap();
        let second = session
            .deadline(LifecycleEvent::Leave, &leave_key())
            .unwrap();
        assert!(second > first);
        assert!(session.is_in_bounds(LifecycleEvent::Leave, &leave_key()));
        assert_eq!(session.len(), 1);
    }

    #[test]
    fn test_zero_window_never_in_bounds() {
        let session = SessionManager::new();
        let key = TimerKey::Invitation {
            invitee: MemberId::new("p"),
            clan: ClanName::parse("Alpha").unwrap(),
        };
        session.register(LifecycleEvent::Join, key.clone(), Duration::zero());
        session.start(LifecycleEvent::Join, &key).unwrap();
        assert!(!session.is_in_bounds(LifecycleEvent::Join, &key));
    }

    #[test]
    fn test_keys_are_distinct_per_event() {
        let session = SessionManager::new();
        let pair = TimerKey::Pair(MemberId::new("a"), MemberId::new("b"));
        session.register(LifecycleEvent::Kick, pair.clone(), Duration::seconds(60));
        session.start(LifecycleEvent::Kick, &pair).unwrap();

        assert!(session.is_in_bounds(LifecycleEvent::Kick, &pair));
        assert!(!session.is_in_bounds(LifecycleEvent::Coronate, &pair));
        let reversed = TimerKey::Pair(MemberId::new("b"), MemberId::new("a"));
        assert!(!session.is_in_bounds(LifecycleEvent::Kick, &reversed));
    }

    #[test]
    fn test_join_consumes_invitation() {
        let session = Arc::new(SessionManager::new());
        let bus = EventBus::new();
        session.install(&bus);

        let clan = Clan::found("Alpha", MemberId::new("l")).unwrap();
        let invitee = MemberId::new("p");
        let key = TimerKey::Invitation {
            invitee: invitee.clone(),
            clan: clan.name().clone(),
        };
        session.register(LifecycleEvent::Join, key.clone(), Duration::seconds(60));
        session.start(LifecycleEvent::Join, &key).unwrap();

        bus.fire_event(LifecycleEvent::Join, &clan, &invitee, &invitee)
            .unwrap();
        assert!(!session.is_registered(LifecycleEvent::Join, &key));
    }
}
