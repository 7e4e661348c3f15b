//! Serializable clan records exchanged with persistence

use crate::{Clan, ClanError, ClanName, ClanOption, MemberId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Storage shape of one clan
///
/// Records are plain data; converting one into a [`Clan`] re-validates
/// every clan invariant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClanRecord {
    pub name: ClanName,
    pub leader: MemberId,
    #[serde(default)]
    pub members: BTreeSet<MemberId>,
    #[serde(default)]
    pub elders: BTreeSet<MemberId>,
    #[serde(default)]
    pub co_leaders: BTreeSet<MemberId>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<ClanOption, String>,
}

impl From<&Clan> for ClanRecord {
    fn from(clan: &Clan) -> Self {
        Self {
            name: clan.name().clone(),
            leader: clan.leader().clone(),
            members: clan.members().clone(),
            elders: clan.elders().clone(),
            co_leaders: clan.co_leaders().clone(),
            options: clan.options().clone(),
        }
    }
}

impl TryFrom<ClanRecord> for Clan {
    type Error = ClanError;

    fn try_from(record: ClanRecord) -> Result<Self, Self::Error> {
        Clan::from_parts(
            record.name,
            record.leader,
            record.co_leaders,
            record.elders,
            record.members,
            record.options,
        )
    }
}
