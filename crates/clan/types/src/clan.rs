//! A single clan: name, leader, rank buckets and options
//!
//! The rank buckets are disjoint and never contain the leader, so every
//! clanmate has exactly one rank. Each mutating operation validates first
//! and only then touches state, so a failed call leaves the clan unchanged.

use crate::{ClanError, ClanName, ClanOption, ClanResult, MemberId, Rank};
use std::collections::{BTreeMap, BTreeSet};

/// One clan's membership and settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Clan {
    name: ClanName,
    leader: MemberId,
    co_leaders: BTreeSet<MemberId>,
    elders: BTreeSet<MemberId>,
    members: BTreeSet<MemberId>,
    options: BTreeMap<ClanOption, String>,
}

impl Clan {
    /// Create a clan with only a leader
    pub fn new(name: ClanName, leader: MemberId) -> Self {
        Self {
            name,
            leader,
            co_leaders: BTreeSet::new(),
            elders: BTreeSet::new(),
            members: BTreeSet::new(),
            options: BTreeMap::new(),
        }
    }

    /// Parse the name and create a clan with only a leader
    pub fn found(name: &str, leader: MemberId) -> ClanResult<Self> {
        Ok(Self::new(ClanName::parse(name)?, leader))
    }

    /// Rebuild a clan with pre-populated buckets, e.g. from storage.
    ///
    /// Fails if any identifier appears twice across the leader and the
    /// three buckets, or if any option value is invalid.
    pub fn from_parts(
        name: ClanName,
        leader: MemberId,
        co_leaders: BTreeSet<MemberId>,
        elders: BTreeSet<MemberId>,
        members: BTreeSet<MemberId>,
        options: BTreeMap<ClanOption, String>,
    ) -> ClanResult<Self> {
        let mut seen = BTreeSet::new();
        seen.insert(&leader);
        for id in co_leaders.iter().chain(&elders).chain(&members) {
            if !seen.insert(id) {
                return Err(ClanError::DuplicateMembership(id.clone()));
            }
        }

        let options = options
            .into_iter()
            .map(|(option, value)| match option.normalize(&value) {
                Some(stored) => Ok((option, stored)),
                None => Err(ClanError::InvalidOptionValue { option, value }),
            })
            .collect::<ClanResult<BTreeMap<_, _>>>()?;

        Ok(Self {
            name,
            leader,
            co_leaders,
            elders,
            members,
            options,
        })
    }

    pub fn name(&self) -> &ClanName {
        &self.name
    }

    pub fn leader(&self) -> &MemberId {
        &self.leader
    }

    pub fn co_leaders(&self) -> &BTreeSet<MemberId> {
        &self.co_leaders
    }

    pub fn elders(&self) -> &BTreeSet<MemberId> {
        &self.elders
    }

    pub fn members(&self) -> &BTreeSet<MemberId> {
        &self.members
    }

    /// Explicitly set options (defaults are not included)
    pub fn options(&self) -> &BTreeMap<ClanOption, String> {
        &self.options
    }

    /// Every clanmate, leader first, then by descending rank
    pub fn clanmates(&self) -> Vec<&MemberId> {
        std::iter::once(&self.leader)
            .chain(&self.co_leaders)
            .chain(&self.elders)
            .chain(&self.members)
            .collect()
    }

    pub fn size(&self) -> usize {
        1 + self.co_leaders.len() + self.elders.len() + self.members.len()
    }

    pub fn is_clanmate(&self, id: &MemberId) -> bool {
        self.rank_of(id).is_ok()
    }

    pub fn is_leader(&self, id: &MemberId) -> bool {
        self.leader == *id
    }

    /// The rank of a clanmate
    pub fn rank_of(&self, id: &MemberId) -> ClanResult<Rank> {
        if self.leader == *id {
            Ok(Rank::Leader)
        } else if self.co_leaders.contains(id) {
            Ok(Rank::CoLeader)
        } else if self.elders.contains(id) {
            Ok(Rank::Elder)
        } else if self.members.contains(id) {
            Ok(Rank::Member)
        } else {
            Err(ClanError::NotMember(id.clone()))
        }
    }

    /// Add a new clanmate at the lowest rank
    pub fn join(&mut self, id: MemberId) -> ClanResult<()> {
        if self.is_clanmate(&id) {
            return Err(ClanError::AlreadyMember(id));
        }
        self.members.insert(id);
        Ok(())
    }

    /// Remove a clanmate. The leader has to hand over leadership first.
    pub fn leave(&mut self, id: &MemberId) -> ClanResult<()> {
        match self.rank_of(id)? {
            Rank::Leader => Err(ClanError::LeaderCannotLeave(id.clone())),
            rank => {
                self.bucket_mut(rank).remove(id);
                Ok(())
            }
        }
    }

    /// Move a clanmate one rank up, returning the new rank
    pub fn promote(&mut self, id: &MemberId) -> ClanResult<Rank> {
        let current = self.rank_of(id)?;
        let next = match current {
            Rank::Leader => return Err(ClanError::CannotPromoteLeader(id.clone())),
            Rank::CoLeader => return Err(ClanError::AtMaxPromotableRank(id.clone())),
            Rank::Member | Rank::Elder => current.next_up().unwrap_or(current),
        };
        self.move_between(id, current, next);
        Ok(next)
    }

    /// Move a clanmate one rank down, returning the new rank
    pub fn demote(&mut self, id: &MemberId) -> ClanResult<Rank> {
        let current = self.rank_of(id)?;
        let next = match current {
            Rank::Leader => return Err(ClanError::CannotDemoteLeader(id.clone())),
            Rank::Member => return Err(ClanError::AtMinDemotableRank(id.clone())),
            Rank::CoLeader | Rank::Elder => current.next_down().unwrap_or(current),
        };
        self.move_between(id, current, next);
        Ok(next)
    }

    /// Hand leadership to a co-leader. The old leader becomes a co-leader.
    pub fn crown(&mut self, new_leader: &MemberId) -> ClanResult<()> {
        if !self.co_leaders.contains(new_leader) {
            return Err(ClanError::MustBeCoLeaderToCrown(new_leader.clone()));
        }
        self.co_leaders.remove(new_leader);
        let old = std::mem::replace(&mut self.leader, new_leader.clone());
        self.co_leaders.insert(old);
        Ok(())
    }

    /// Validate and store an option value in its canonical form
    pub fn set_option(&mut self, option: ClanOption, value: impl Into<String>) -> ClanResult<()> {
        let value = value.into();
        let stored = option
            .normalize(&value)
            .ok_or(ClanError::InvalidOptionValue { option, value })?;
        self.options.insert(option, stored);
        Ok(())
    }

    /// The stored value, or the per-clan default if never set
    pub fn option(&self, option: ClanOption) -> String {
        self.options
            .get(&option)
            .cloned()
            .unwrap_or_else(|| option.default_for(&self.name))
    }

    fn bucket_mut(&mut self, rank: Rank) -> &mut BTreeSet<MemberId> {
        match rank {
            Rank::CoLeader => &mut self.co_leaders,
            Rank::Elder => &mut self.elders,
            // The leader has no bucket; callers never pass it.
            Rank::Member | Rank::Leader => &mut self.members,
        }
    }

    fn move_between(&mut self, id: &MemberId, from: Rank, to: Rank) {
        if self.bucket_mut(from).remove(id) {
            self.bucket_mut(to).insert(id.clone());
        }
    }
}
