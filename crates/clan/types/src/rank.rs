//! Rank model: the four ranks of a clan and what each may do
//!
//! Permissions accumulate monotonically: every rank holds all permissions
//! of the rank below it plus its own additions.

use serde::{Deserialize, Serialize};

/// Rank of a clanmate, ordered from lowest to highest
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Rank {
    Member,
    Elder,
    CoLeader,
    Leader,
}

impl Rank {
    /// All ranks in ascending order
    pub const ALL: [Rank; 4] = [Rank::Member, Rank::Elder, Rank::CoLeader, Rank::Leader];

    /// Permissions held at this rank
    pub fn permissions(self) -> &'static [Permission] {
        permissions_of(self)
    }

    /// Check whether this rank holds a permission
    pub fn has_permission(self, permission: Permission) -> bool {
        has_permission(self, permission)
    }

    /// Strict comparison used for authority checks
    pub fn outranks(self, other: Rank) -> bool {
        self > other
    }

    /// The rank a promotion moves to. Leadership is only reachable by
    /// coronation, so `CoLeader` and `Leader` have no promotion target.
    pub fn next_up(self) -> Option<Rank> {
        match self {
            Rank::Member => Some(Rank::Elder),
            Rank::Elder => Some(Rank::CoLeader),
            Rank::CoLeader | Rank::Leader => None,
        }
    }

    /// The rank a demotion moves to. Members are removed, not demoted.
    pub fn next_down(self) -> Option<Rank> {
        match self {
            Rank::CoLeader => Some(Rank::Elder),
            Rank::Elder => Some(Rank::Member),
            Rank::Member | Rank::Leader => None,
        }
    }
}

impl std::fmt::Display for Rank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Rank::Member => "MEMBER",
            Rank::Elder => "ELDER",
            Rank::CoLeader => "COLEADER",
            Rank::Leader => "LEADER",
        };
        f.write_str(label)
    }
}

/// An action a rank may be allowed to take
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    /// Invite players into the clan
    Invite,
    /// Remove lower-ranked clanmates
    Kick,
    /// Change clan options
    Set,
    /// Dissolve the clan
    Disband,
}

impl Permission {
    pub const ALL: [Permission; 4] = [
        Permission::Invite,
        Permission::Kick,
        Permission::Set,
        Permission::Disband,
    ];
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Permission::Invite => "INVITE",
            Permission::Kick => "KICK",
            Permission::Set => "SET",
            Permission::Disband => "DISBAND",
        };
        f.write_str(label)
    }
}

const MEMBER_PERMISSIONS: &[Permission] = &[];
const ELDER_PERMISSIONS: &[Permission] = &[Permission::Invite, Permission::Kick];
const COLEADER_PERMISSIONS: &[Permission] =
    &[Permission::Invite, Permission::Kick, Permission::Set];
const LEADER_PERMISSIONS: &[Permission] = &[
    Permission::Invite,
    Permission::Kick,
    Permission::Set,
    Permission::Disband,
];

/// Look up the full permission set of a rank
pub fn permissions_of(rank: Rank) -> &'static [Permission] {
    match rank {
        Rank::Member => MEMBER_PERMISSIONS,
        Rank::Elder => ELDER_PERMISSIONS,
        Rank::CoLeader => COLEADER_PERMISSIONS,
        Rank::Leader => LEADER_PERMISSIONS,
    }
}

/// Check whether a rank holds a permission
pub fn has_permission(rank: Rank, permission: Permission) -> bool {
    permissions_of(rank).contains(&permission)
}
