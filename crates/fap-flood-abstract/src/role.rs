use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Behavioral classification of a client, fixed for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClientRole {
    /// Floods the uplink of its serving cell during the attack window.
    Attacker,
    /// Legitimate client near the attacked local cells; expected to show
    /// measurable degradation.
    ImpactedLegitimate,
    /// Legitimate client served by a macro cell, away from the attack.
    OtherLegitimate,
}

/// The role-to-client-id partition. Built once at configuration time;
/// read-only afterwards. Sets are kept as `BTreeSet` so membership tests
/// stay cheap for larger populations and iteration order is stable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolePlan {
    attackers: BTreeSet<u32>,
    impacted: BTreeSet<u32>,
    other: BTreeSet<u32>,
}

impl RolePlan {
    pub fn new(
        attackers: impl IntoIterator<Item = u32>,
        impacted: impl IntoIterator<Item = u32>,
        other: impl IntoIterator<Item = u32>,
    ) -> Self {
        Self {
            attackers: attackers.into_iter().collect(),
            impacted: impacted.into_iter().collect(),
            other: other.into_iter().collect(),
        }
    }

    /// Role of a client index, tested in the fixed precedence order
    /// Attacker -> ImpactedLegitimate -> OtherLegitimate. With a valid
    /// partition the order is irrelevant; a violated partition is a
    /// configuration bug caught by [`RolePlan::validate`], never a silent
    /// merge here.
    pub fn role_of(&self, client: u32) -> Option<ClientRole> {
        if self.attackers.contains(&client) {
            Some(ClientRole::Attacker)
        } else if self.impacted.contains(&client) {
            Some(ClientRole::ImpactedLegitimate)
        } else if self.other.contains(&client) {
            Some(ClientRole::OtherLegitimate)
        } else {
            None
        }
    }

    pub fn attackers(&self) -> impl Iterator<Item = u32> + '_ {
        self.attackers.iter().copied()
    }

    /// Every client id in `0..num_clients` must belong to exactly one role
    /// set, and no set may reference an id outside that range.
    pub fn validate(&self, num_clients: u32) -> Result<(), ConfigError> {
        for &id in self.attackers.iter().chain(&self.impacted).chain(&self.other) {
            if id >= num_clients {
                return Err(ConfigError::RoleOutOfRange(id, num_clients));
            }
        }
        for id in 0..num_clients {
            let hits = [
                self.attackers.contains(&id),
                self.impacted.contains(&id),
                self.other.contains(&id),
            ]
            .iter()
            .filter(|&&m| m)
            .count();
            match hits {
                0 => return Err(ConfigError::RoleUnassigned(id)),
                1 => {}
                _ => return Err(ConfigError::RoleOverlap(id)),
            }
        }
        Ok(())
    }
}
