//! Clan registry: every clan in a session, and the MODEL-phase listeners
//! that mutate it
//!
//! The registry enforces two invariants on every insertion: clan names are
//! unique, and no player is a clanmate of more than one clan. The MODEL
//! listeners re-check each event's preconditions under the registry's
//! write lock before touching state, whatever the command layer already
//! checked.

use crate::event_bus::{
    EventBus, LifecycleContext, LifecycleListener, Listener, OptionContext, OptionListener,
};
use clan_types::{
    Clan, ClanError, ClanName, ClanRecord, ClanResult, LifecycleEvent, MemberId, OptionEvent,
    Phase, Rank,
};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// The set of all clans in a session, unique by name
pub struct ClanRegistry {
    clans: RwLock<BTreeMap<ClanName, Clan>>,
}

impl ClanRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            clans: RwLock::new(BTreeMap::new()),
        }
    }

    /// Build a registry from existing clans, enforcing both invariants
    pub fn from_clans(clans: impl IntoIterator<Item = Clan>) -> ClanResult<Self> {
        let mut map = BTreeMap::new();
        for clan in clans {
            check_insertable(&map, &clan)?;
            map.insert(clan.name().clone(), clan);
        }
        Ok(Self {
            clans: RwLock::new(map),
        })
    }

    /// Build a registry from persisted records
    pub fn from_records(records: impl IntoIterator<Item = ClanRecord>) -> ClanResult<Self> {
        let clans = records
            .into_iter()
            .map(Clan::try_from)
            .collect::<ClanResult<Vec<_>>>()?;
        let registry = Self::from_clans(clans)?;
        info!(clans = registry.len(), "Clan registry loaded");
        Ok(registry)
    }

    /// Snapshot every clan as a record, sorted by name
    pub fn to_records(&self) -> Vec<ClanRecord> {
        self.clans.read().values().map(ClanRecord::from).collect()
    }

    /// Add a clan. Fails on a taken name or on any clanmate who already
    /// belongs to another clan; nothing is inserted in that case.
    pub fn insert(&self, clan: Clan) -> ClanResult<()> {
        let mut clans = self.clans.write();
        check_insertable(&clans, &clan)?;
        info!(clan = %clan.name(), leader = %clan.leader(), "Clan registered");
        clans.insert(clan.name().clone(), clan);
        Ok(())
    }

    /// Remove a clan by name
    pub fn remove(&self, name: &ClanName) -> ClanResult<Clan> {
        let removed = self
            .clans
            .write()
            .remove(name)
            .ok_or_else(|| ClanError::ClanNotRegistered(name.clone()))?;
        info!(clan = %name, "Clan removed");
        Ok(removed)
    }

    pub fn get(&self, name: &ClanName) -> Option<Clan> {
        self.clans.read().get(name).cloned()
    }

    pub fn contains(&self, name: &ClanName) -> bool {
        self.clans.read().contains_key(name)
    }

    /// The clan a player belongs to, if any
    pub fn clan_of(&self, member: &MemberId) -> Option<Clan> {
        find_clan_of(&self.clans.read(), member).cloned()
    }

    pub fn is_clanmate_anywhere(&self, member: &MemberId) -> bool {
        find_clan_of(&self.clans.read(), member).is_some()
    }

    /// All clans, sorted by name
    pub fn clans(&self) -> Vec<Clan> {
        self.clans.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.clans.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.clans.read().is_empty()
    }

    /// The MODEL-phase listener for each lifecycle event
    pub fn model_listeners(self: &Arc<Self>) -> Vec<(LifecycleEvent, Arc<dyn LifecycleListener>)> {
        LifecycleEvent::ALL
            .into_iter()
            .map(|event| (event, self.model_listener(event)))
            .collect()
    }

    /// The MODEL-phase listener for one lifecycle event
    pub fn model_listener(self: &Arc<Self>, event: LifecycleEvent) -> Arc<dyn LifecycleListener> {
        let registry = Arc::clone(self);
        match event {
            LifecycleEvent::Create => Arc::new(CreateListener { registry }),
            LifecycleEvent::Disband => Arc::new(DisbandListener { registry }),
            LifecycleEvent::Join => Arc::new(JoinListener { registry }),
            LifecycleEvent::Leave => Arc::new(LeaveListener { registry }),
            LifecycleEvent::Kick => Arc::new(KickListener { registry }),
            LifecycleEvent::Promote => Arc::new(RankChangeListener {
                registry,
                direction: RankChange::Promote,
            }),
            LifecycleEvent::Demote => Arc::new(RankChangeListener {
                registry,
                direction: RankChange::Demote,
            }),
            LifecycleEvent::Coronate => Arc::new(CoronateListener { registry }),
        }
    }

    /// The MODEL-phase listener for option events
    pub fn option_listener(self: &Arc<Self>) -> Arc<dyn OptionListener> {
        Arc::new(SetOptionListener {
            registry: Arc::clone(self),
        })
    }

    /// Register every MODEL-phase listener on a bus
    pub fn install(self: &Arc<Self>, bus: &EventBus) {
        for (event, listener) in self.model_listeners() {
            bus.register(event, Phase::Model, listener);
        }
        for event in OptionEvent::ALL {
            bus.register_option(event, Phase::Model, self.option_listener());
        }
    }

    /// Run `f` on a registered clan under the write lock
    fn with_registered<R>(
        &self,
        name: &ClanName,
        f: impl FnOnce(&mut Clan) -> ClanResult<R>,
    ) -> ClanResult<R> {
        let mut clans = self.clans.write();
        let clan = clans
            .get_mut(name)
            .ok_or_else(|| ClanError::ClanNotRegistered(name.clone()))?;
        f(clan)
    }
}

impl Default for ClanRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ClanRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClanRegistry")
            .field("clans", &self.clans.read().keys().collect::<Vec<_>>())
            .finish()
    }
}

fn find_clan_of<'a>(clans: &'a BTreeMap<ClanName, Clan>, member: &MemberId) -> Option<&'a Clan> {
    clans.values().find(|clan| clan.is_clanmate(member))
}

fn check_insertable(clans: &BTreeMap<ClanName, Clan>, clan: &Clan) -> ClanResult<()> {
    if clans.contains_key(clan.name()) {
        return Err(ClanError::DuplicateClanName(clan.name().clone()));
    }
    for mate in clan.clanmates() {
        if let Some(other) = find_clan_of(clans, mate) {
            return Err(ClanError::AlreadyInClan {
                member: mate.clone(),
                clan: other.name().clone(),
            });
        }
    }
    Ok(())
}

/// Rank of `who` in `clan`, reported as "not a clanmate of this clan"
fn rank_in(clan: &Clan, who: &MemberId) -> ClanResult<Rank> {
    clan.rank_of(who).map_err(|_| ClanError::NotClanmate {
        agent: who.clone(),
        clan: clan.name().clone(),
    })
}

/// Fails unless `agent` strictly outranks `target` in `clan`
fn require_outranks(clan: &Clan, agent: &MemberId, target: &MemberId) -> ClanResult<()> {
    let agent_rank = rank_in(clan, agent)?;
    let target_rank = rank_in(clan, target)?;
    if !agent_rank.outranks(target_rank) {
        return Err(ClanError::InsufficientRank {
            agent: agent.clone(),
            agent_rank,
            target: target.clone(),
            target_rank,
        });
    }
    Ok(())
}

struct CreateListener {
    registry: Arc<ClanRegistry>,
}

impl Listener for CreateListener {
    fn id(&self) -> &str {
        "clan-registry.create"
    }
}

impl LifecycleListener for CreateListener {
    fn on_lifecycle(&self, ctx: &LifecycleContext<'_>) -> ClanResult<()> {
        if !ctx.clan.is_leader(ctx.agent) {
            return Err(ClanError::CreatorMustBeLeader {
                agent: ctx.agent.clone(),
                clan: ctx.clan.name().clone(),
            });
        }
        self.registry.insert(ctx.clan.clone())
    }
}

struct DisbandListener {
    registry: Arc<ClanRegistry>,
}

impl Listener for DisbandListener {
    fn id(&self) -> &str {
        "clan-registry.disband"
    }
}

impl LifecycleListener for DisbandListener {
    fn on_lifecycle(&self, ctx: &LifecycleContext<'_>) -> ClanResult<()> {
        let name = ctx.clan.name();
        let mut clans = self.registry.clans.write();
        let clan = clans
            .get(name)
            .ok_or_else(|| ClanError::ClanNotRegistered(name.clone()))?;
        if !clan.is_leader(ctx.agent) {
            return Err(ClanError::NotLeader {
                agent: ctx.agent.clone(),
                clan: name.clone(),
            });
        }
        clans.remove(name);
        info!(clan = %name, agent = %ctx.agent, "Clan disbanded");
        Ok(())
    }
}

struct JoinListener {
    registry: Arc<ClanRegistry>,
}

impl Listener for JoinListener {
    fn id(&self) -> &str {
        "clan-registry.join"
    }
}

impl LifecycleListener for JoinListener {
    fn on_lifecycle(&self, ctx: &LifecycleContext<'_>) -> ClanResult<()> {
        let name = ctx.clan.name();
        let mut clans = self.registry.clans.write();
        if !clans.contains_key(name) {
            return Err(ClanError::ClanNotRegistered(name.clone()));
        }
        if let Some(current) = find_clan_of(&clans, ctx.target) {
            return Err(ClanError::AlreadyInClan {
                member: ctx.target.clone(),
                clan: current.name().clone(),
            });
        }
        if let Some(clan) = clans.get_mut(name) {
            clan.join(ctx.target.clone())?;
        }
        info!(clan = %name, member = %ctx.target, "Member joined clan");
        Ok(())
    }
}

struct LeaveListener {
    registry: Arc<ClanRegistry>,
}

impl Listener for LeaveListener {
    fn id(&self) -> &str {
        "clan-registry.leave"
    }
}

impl LifecycleListener for LeaveListener {
    fn on_lifecycle(&self, ctx: &LifecycleContext<'_>) -> ClanResult<()> {
        self.registry
            .with_registered(ctx.clan.name(), |clan| clan.leave(ctx.target))?;
        info!(clan = %ctx.clan.name(), member = %ctx.target, "Member left clan");
        Ok(())
    }
}

struct KickListener {
    registry: Arc<ClanRegistry>,
}

impl Listener for KickListener {
    fn id(&self) -> &str {
        "clan-registry.kick"
    }
}

impl LifecycleListener for KickListener {
    fn on_lifecycle(&self, ctx: &LifecycleContext<'_>) -> ClanResult<()> {
        self.registry.with_registered(ctx.clan.name(), |clan| {
            require_outranks(clan, ctx.agent, ctx.target)?;
            clan.leave(ctx.target)
        })?;
        info!(
            clan = %ctx.clan.name(),
            agent = %ctx.agent,
            member = %ctx.target,
            "Member kicked from clan"
        );
        Ok(())
    }
}

#[derive(Clone, Copy, Debug)]
enum RankChange {
    Promote,
    Demote,
}

struct RankChangeListener {
    registry: Arc<ClanRegistry>,
    direction: RankChange,
}

impl Listener for RankChangeListener {
    fn id(&self) -> &str {
        match self.direction {
            RankChange::Promote => "clan-registry.promote",
            RankChange::Demote => "clan-registry.demote",
        }
    }
}

impl LifecycleListener for RankChangeListener {
    fn on_lifecycle(&self, ctx: &LifecycleContext<'_>) -> ClanResult<()> {
        let rank = self.registry.with_registered(ctx.clan.name(), |clan| {
            require_outranks(clan, ctx.agent, ctx.target)?;
            match self.direction {
                RankChange::Promote => clan.promote(ctx.target),
                RankChange::Demote => clan.demote(ctx.target),
            }
        })?;
        info!(
            clan = %ctx.clan.name(),
            agent = %ctx.agent,
            member = %ctx.target,
            %rank,
            direction = ?self.direction,
            "Member rank changed"
        );
        Ok(())
    }
}

struct CoronateListener {
    registry: Arc<ClanRegistry>,
}

impl Listener for CoronateListener {
    fn id(&self) -> &str {
        "clan-registry.coronate"
    }
}

impl LifecycleListener for CoronateListener {
    fn on_lifecycle(&self, ctx: &LifecycleContext<'_>) -> ClanResult<()> {
        self.registry.with_registered(ctx.clan.name(), |clan| {
            if !clan.is_leader(ctx.agent) {
                return Err(ClanError::NotLeader {
                    agent: ctx.agent.clone(),
                    clan: clan.name().clone(),
                });
            }
            clan.crown(ctx.target)
        })?;
        info!(
            clan = %ctx.clan.name(),
            old_leader = %ctx.agent,
            new_leader = %ctx.target,
            "Clan leadership transferred"
        );
        Ok(())
    }
}

struct SetOptionListener {
    registry: Arc<ClanRegistry>,
}

impl Listener for SetOptionListener {
    fn id(&self) -> &str {
        "clan-registry.set-option"
    }
}

impl OptionListener for SetOptionListener {
    fn on_option(&self, ctx: &OptionContext<'_>) -> ClanResult<()> {
        let option = ctx.event.option();
        self.registry
            .with_registered(ctx.clan.name(), |clan| clan.set_option(option, ctx.value))?;
        info!(clan = %ctx.clan.name(), %option, value = ctx.value, "Clan option set");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> MemberId {
        MemberId::new(s)
    }

    fn name(s: &str) -> ClanName {
        ClanName::parse(s).unwrap()
    }

    /// Bus with the registry's listeners installed, plus "Alpha" led by `l`
    /// with co-leader `c`, elder `e` and member `m`
    fn setup() -> (Arc<ClanRegistry>, EventBus, Clan) {
        let registry = Arc::new(ClanRegistry::new());
        let bus = EventBus::new();
        registry.install(&bus);

        let mut alpha = Clan::found("Alpha", id("l")).unwrap();
        for mate in ["c", "e", "m"] {
            alpha.join(id(mate)).unwrap();
        }
        alpha.promote(&id("c")).unwrap();
        alpha.promote(&id("c")).unwrap();
        alpha.promote(&id("e")).unwrap();
        registry.insert(alpha.clone()).unwrap();
        (registry, bus, alpha)
    }

    fn rank(registry: &ClanRegistry, who: &str) -> ClanResult<Rank> {
        registry.get(&name("Alpha")).unwrap().rank_of(&id(who))
    }

    #[test]
    fn test_install_registers_one_model_listener_per_event() {
        let (_, bus, _) = setup();
        for event in LifecycleEvent::ALL {
            assert_eq!(bus.listener_count(event, Phase::Model), 1, "{event}");
        }
        for event in OptionEvent::ALL {
            assert_eq!(bus.option_listener_count(event, Phase::Model), 1);
        }
    }

    #[test]
    fn test_insert_rejects_duplicate_name() {
        let (registry, _, _) = setup();
        let copy = Clan::found("Alpha", id("other")).unwrap();
        assert_eq!(
            registry.insert(copy),
            Err(ClanError::DuplicateClanName(name("Alpha")))
        );
    }

    #[test]
    fn test_insert_rejects_shared_member() {
        let (registry, _, _) = setup();
        let mut beta = Clan::found("Beta", id("b")).unwrap();
        beta.join(id("m")).unwrap();
        assert_eq!(
            registry.insert(beta),
            Err(ClanError::AlreadyInClan {
                member: id("m"),
                clan: name("Alpha"),
            })
        );
        assert!(!registry.contains(&name("Beta")));
    }

    #[test]
    fn test_create_event() {
        let (registry, bus, _) = setup();
        let beta = Clan::found("Beta", id("b")).unwrap();

        bus.fire_event(LifecycleEvent::Create, &beta, &id("b"), &id("b"))
            .unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.get(&name("Beta")).unwrap().rank_of(&id("b")),
            Ok(Rank::Leader)
        );
    }

    #[test]
    fn test_create_requires_agent_to_lead() {
        let (registry, bus, _) = setup();
        let beta = Clan::found("Beta", id("b")).unwrap();

        let err = bus
            .fire_event(LifecycleEvent::Create, &beta, &id("x"), &id("x"))
            .unwrap_err();
        assert!(matches!(err, ClanError::CreatorMustBeLeader { .. }));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_disband_event() {
        let (registry, bus, alpha) = setup();

        let err = bus
            .fire_event(LifecycleEvent::Disband, &alpha, &id("c"), &id("c"))
            .unwrap_err();
        assert!(matches!(err, ClanError::NotLeader { .. }));
        assert!(registry.contains(&name("Alpha")));

        bus.fire_event(LifecycleEvent::Disband, &alpha, &id("l"), &id("l"))
            .unwrap();
        assert!(registry.is_empty());

        let err = bus
            .fire_event(LifecycleEvent::Disband, &alpha, &id("l"), &id("l"))
            .unwrap_err();
        assert_eq!(err, ClanError::ClanNotRegistered(name("Alpha")));
    }

    #[test]
    fn test_join_event() {
        let (registry, bus, alpha) = setup();
        bus.fire_event(LifecycleEvent::Join, &alpha, &id("n"), &id("n"))
            .unwrap();
        assert_eq!(rank(&registry, "n"), Ok(Rank::Member));

        let err = bus
            .fire_event(LifecycleEvent::Join, &alpha, &id("n"), &id("n"))
            .unwrap_err();
        assert!(matches!(err, ClanError::AlreadyInClan { .. }));
    }

    #[test]
    fn test_join_rejects_member_of_other_clan() {
        let (registry, bus, _) = setup();
        let beta = Clan::found("Beta", id("b")).unwrap();
        registry.insert(beta.clone()).unwrap();

        let err = bus
            .fire_event(LifecycleEvent::Join, &beta, &id("m"), &id("m"))
            .unwrap_err();
        assert_eq!(
            err,
            ClanError::AlreadyInClan {
                member: id("m"),
                clan: name("Alpha"),
            }
        );
        assert_eq!(registry.get(&name("Beta")).unwrap().size(), 1);
    }

    #[test]
    fn test_join_unregistered_clan() {
        let (_, bus, _) = setup();
        let ghost = Clan::found("Ghost", id("g")).unwrap();
        let err = bus
            .fire_event(LifecycleEvent::Join, &ghost, &id("n"), &id("n"))
            .unwrap_err();
        assert_eq!(err, ClanError::ClanNotRegistered(name("Ghost")));
    }

    #[test]
    fn test_leave_event() {
        let (registry, bus, alpha) = setup();
        bus.fire_event(LifecycleEvent::Leave, &alpha, &id("e"), &id("e"))
            .unwrap();
        assert_eq!(rank(&registry, "e"), Err(ClanError::NotMember(id("e"))));

        let err = bus
            .fire_event(LifecycleEvent::Leave, &alpha, &id("l"), &id("l"))
            .unwrap_err();
        assert_eq!(err, ClanError::LeaderCannotLeave(id("l")));
    }

    #[test]
    fn test_kick_requires_outranking() {
        let (registry, bus, alpha) = setup();

        // Elder kicks member
        bus.fire_event(LifecycleEvent::Kick, &alpha, &id("e"), &id("m"))
            .unwrap();
        assert!(rank(&registry, "m").is_err());

        // Elder cannot kick co-leader
        let err = bus
            .fire_event(LifecycleEvent::Kick, &alpha, &id("e"), &id("c"))
            .unwrap_err();
        assert!(matches!(err, ClanError::InsufficientRank { .. }));
        assert_eq!(rank(&registry, "c"), Ok(Rank::CoLeader));
    }

    #[test]
    fn test_promote_and_demote_events() {
        let (registry, bus, alpha) = setup();

        bus.fire_event(LifecycleEvent::Promote, &alpha, &id("c"), &id("m"))
            .unwrap();
        assert_eq!(rank(&registry, "m"), Ok(Rank::Elder));

        // Equal ranks: no authority
        let err = bus
            .fire_event(LifecycleEvent::Demote, &alpha, &id("e"), &id("m"))
            .unwrap_err();
        assert!(matches!(err, ClanError::InsufficientRank { .. }));

        bus.fire_event(LifecycleEvent::Demote, &alpha, &id("l"), &id("c"))
            .unwrap();
        assert_eq!(rank(&registry, "c"), Ok(Rank::Elder));

        let err = bus
            .fire_event(LifecycleEvent::Promote, &alpha, &id("outsider"), &id("m"))
            .unwrap_err();
        assert!(matches!(err, ClanError::NotClanmate { .. }));
    }

    #[test]
    fn test_coronate_event() {
        let (registry, bus, alpha) = setup();

        let err = bus
            .fire_event(LifecycleEvent::Coronate, &alpha, &id("c"), &id("c"))
            .unwrap_err();
        assert!(matches!(err, ClanError::NotLeader { .. }));

        let err = bus
            .fire_event(LifecycleEvent::Coronate, &alpha, &id("l"), &id("e"))
            .unwrap_err();
        assert_eq!(err, ClanError::MustBeCoLeaderToCrown(id("e")));

        bus.fire_event(LifecycleEvent::Coronate, &alpha, &id("l"), &id("c"))
            .unwrap();
        let clan = registry.get(&name("Alpha")).unwrap();
        assert_eq!(clan.leader(), &id("c"));
        assert_eq!(clan.rank_of(&id("l")), Ok(Rank::CoLeader));
    }

    #[test]
    fn test_option_event() {
        let (registry, bus, alpha) = setup();
        bus.fire_option_event(OptionEvent::SetPrefix, &alpha, &id("l"), "ALF")
            .unwrap();
        let clan = registry.get(&name("Alpha")).unwrap();
        assert_eq!(clan.option(clan_types::ClanOption::Prefix), "ALF");

        let err = bus
            .fire_option_event(OptionEvent::SetColor, &alpha, &id("l"), "plaid")
            .unwrap_err();
        assert!(matches!(err, ClanError::InvalidOptionValue { .. }));
    }

    #[test]
    fn test_records_roundtrip() {
        let (registry, _, _) = setup();
        let records = registry.to_records();
        let restored = ClanRegistry::from_records(records.clone()).unwrap();
        assert_eq!(restored.to_records(), records);
        assert_eq!(restored.clan_of(&id("e")).unwrap().name(), &name("Alpha"));
        assert!(restored.is_clanmate_anywhere(&id("l")));
        assert!(!restored.is_clanmate_anywhere(&id("nobody")));
    }
}
