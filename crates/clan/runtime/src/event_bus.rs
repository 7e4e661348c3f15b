//! Phased event bus for clan lifecycle and option events
//!
//! Listeners are registered per `(event, phase)`. Dispatch walks the phases
//! in [`Phase::ORDER`] and stops at the first listener error: nothing in a
//! later phase runs, and what already ran is not rolled back.

use clan_types::{Clan, ClanResult, LifecycleEvent, MemberId, OptionEvent, Phase};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Common identity of every listener. Two listeners with the same id are
/// considered the same listener.
pub trait Listener: Send + Sync {
    fn id(&self) -> &str;
}

/// Payload of a lifecycle event
#[derive(Clone, Copy, Debug)]
pub struct LifecycleContext<'a> {
    pub event: LifecycleEvent,
    /// The clan as the caller saw it when firing. Listeners after the MODEL
    /// phase read committed state from the registry.
    pub clan: &'a Clan,
    pub agent: &'a MemberId,
    pub target: &'a MemberId,
}

/// Payload of an option event
#[derive(Clone, Copy, Debug)]
pub struct OptionContext<'a> {
    pub event: OptionEvent,
    pub clan: &'a Clan,
    pub agent: &'a MemberId,
    pub value: &'a str,
}

/// Reacts to lifecycle events
pub trait LifecycleListener: Listener {
    fn on_lifecycle(&self, ctx: &LifecycleContext<'_>) -> ClanResult<()>;
}

/// Reacts to option events
pub trait OptionListener: Listener {
    fn on_option(&self, ctx: &OptionContext<'_>) -> ClanResult<()>;
}

struct ListenerTable<E, L: ?Sized> {
    buckets: RwLock<HashMap<(E, Phase), Vec<Arc<L>>>>,
}

impl<E, L> ListenerTable<E, L>
where
    E: Copy + Eq + Hash,
    L: Listener + ?Sized,
{
    fn new() -> Self {
        Self {
            buckets: RwLock::new(HashMap::new()),
        }
    }

    fn register(&self, event: E, phase: Phase, listener: Arc<L>) -> bool {
        let mut buckets = self.buckets.write();
        let bucket = buckets.entry((event, phase)).or_default();
        if bucket.iter().any(|l| l.id() == listener.id()) {
            return false;
        }
        bucket.push(listener);
        true
    }

    fn unregister(&self, event: E, phase: Phase, id: &str) -> bool {
        let mut buckets = self.buckets.write();
        match buckets.get_mut(&(event, phase)) {
            Some(bucket) => {
                let before = bucket.len();
                bucket.retain(|l| l.id() != id);
                bucket.len() < before
            }
            None => false,
        }
    }

    /// Copy of one bucket, so listeners run without the table lock held
    fn snapshot(&self, event: E, phase: Phase) -> Vec<Arc<L>> {
        self.buckets
            .read()
            .get(&(event, phase))
            .cloned()
            .unwrap_or_default()
    }

    fn count(&self, event: E, phase: Phase) -> usize {
        self.buckets
            .read()
            .get(&(event, phase))
            .map_or(0, Vec::len)
    }
}

/// Event bus for clan lifecycle and option events
///
/// # Concurrency
///
/// Share as `Arc<EventBus>`. Registration only takes the table lock.
/// Each `fire_*` call holds the dispatch lock for its whole run, so the
/// phases of two events never interleave. A listener must not fire another
/// event from inside its handler.
///
/// Listeners may register and unregister during dispatch. Each phase runs on
/// a snapshot of its bucket taken when the phase starts.
pub struct EventBus {
    lifecycle: ListenerTable<LifecycleEvent, dyn LifecycleListener>,
    options: ListenerTable<OptionEvent, dyn OptionListener>,
    dispatch: Mutex<()>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            lifecycle: ListenerTable::new(),
            options: ListenerTable::new(),
            dispatch: Mutex::new(()),
        }
    }

    /// Register a lifecycle listener. Returns `false` if a listener with the
    /// same id is already in that `(event, phase)` bucket.
    pub fn register(
        &self,
        event: LifecycleEvent,
        phase: Phase,
        listener: Arc<dyn LifecycleListener>,
    ) -> bool {
        let id = listener.id().to_string();
        let added = self.lifecycle.register(event, phase, listener);
        debug!(%event, %phase, listener = %id, added, "Lifecycle listener registration");
        added
    }

    /// Register an option listener. Same duplicate rule as [`EventBus::register`].
    pub fn register_option(
        &self,
        event: OptionEvent,
        phase: Phase,
        listener: Arc<dyn OptionListener>,
    ) -> bool {
        let id = listener.id().to_string();
        let added = self.options.register(event, phase, listener);
        debug!(%event, %phase, listener = %id, added, "Option listener registration");
        added
    }

    pub fn unregister(&self, event: LifecycleEvent, phase: Phase, id: &str) -> bool {
        self.lifecycle.unregister(event, phase, id)
    }

    pub fn unregister_option(&self, event: OptionEvent, phase: Phase, id: &str) -> bool {
        self.options.unregister(event, phase, id)
    }

    pub fn listener_count(&self, event: LifecycleEvent, phase: Phase) -> usize {
        self.lifecycle.count(event, phase)
    }

    pub fn option_listener_count(&self, event: OptionEvent, phase: Phase) -> usize {
        self.options.count(event, phase)
    }

    /// Dispatch a lifecycle event through every phase in order.
    ///
    /// The first listener error aborts the dispatch and is returned as-is.
    pub fn fire_event(
        &self,
        event: LifecycleEvent,
        clan: &Clan,
        agent: &MemberId,
        target: &MemberId,
    ) -> ClanResult<()> {
        let _dispatch = self.dispatch.lock();
        let ctx = LifecycleContext {
            event,
            clan,
            agent,
            target,
        };

        for phase in Phase::ORDER {
            for listener in self.lifecycle.snapshot(event, phase) {
                if let Err(err) = listener.on_lifecycle(&ctx) {
                    warn!(
                        %event,
                        %phase,
                        listener = listener.id(),
                        clan = %clan.name(),
                        error = %err,
                        "Lifecycle dispatch aborted"
                    );
                    return Err(err);
                }
            }
        }

        info!(
            %event,
            clan = %clan.name(),
            agent = %agent,
            target = %target,
            "Lifecycle event dispatched"
        );
        Ok(())
    }

    /// Dispatch an option event through every phase in order
    pub fn fire_option_event(
        &self,
        event: OptionEvent,
        clan: &Clan,
        agent: &MemberId,
        value: &str,
    ) -> ClanResult<()> {
        let _dispatch = self.dispatch.lock();
        let ctx = OptionContext {
            event,
            clan,
            agent,
            value,
        };

        for phase in Phase::ORDER {
            for listener in self.options.snapshot(event, phase) {
                if let Err(err) = listener.on_option(&ctx) {
                    warn!(
                        %event,
                        %phase,
                        listener = listener.id(),
                        clan = %clan.name(),
                        error = %err,
                        "Option dispatch aborted"
                    );
                    return Err(err);
                }
            }
        }

        info!(%event, clan = %clan.name(), agent = %agent, value, "Option event dispatched");
        Ok(())
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
