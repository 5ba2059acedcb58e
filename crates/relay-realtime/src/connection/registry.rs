//! Identity registry: which identities are online, and through which connections.
//!
//! A single [`RwLock`] guards both indexes, so every operation observes and
//! leaves a consistent state: an identity is present exactly when it owns at
//! least one connection, and a connection is owned by at most one identity.
//! The lock is only held for map/set mutation; callers send after the
//! operation has returned its owned result.

use std::collections::{BTreeSet, HashMap, HashSet};

use parking_lot::RwLock;
use tracing::{debug, warn};

use relay_core::types::{ConnectionId, Identity};

/// How a registry mutation changed one identity's membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipChange {
    /// The identity went from zero connections to one.
    CameOnline,
    /// The identity gained a connection while already online.
    Joined,
    /// The identity lost a connection and is still online.
    Left,
    /// The identity's last connection went away.
    WentOffline,
    /// Nothing changed (duplicate register, unknown deregister, or a
    /// connection already bound to another identity).
    Unchanged,
}

impl MembershipChange {
    /// Whether the online set itself changed.
    pub fn is_transition(self) -> bool {
        matches!(self, Self::CameOnline | Self::WentOffline)
    }

    /// Whether any connection was added or removed.
    pub fn is_mutation(self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

#[derive(Debug, Default)]
struct Entries {
    /// Identity → live connections. Never holds an empty set.
    by_identity: HashMap<Identity, HashSet<ConnectionId>>,
    /// Connection → owning identity.
    owner: HashMap<ConnectionId, Identity>,
}

/// Maps each online identity to the set of connections it holds.
#[derive(Debug, Default)]
pub struct IdentityRegistry {
    entries: RwLock<Entries>,
}

impl IdentityRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `conn_id` to `identity`'s connection set, creating the entry if
    /// absent. Registering the same pair twice is absorbed.
    pub fn register(&self, identity: &Identity, conn_id: ConnectionId) -> MembershipChange {
        let mut entries = self.entries.write();

        if let Some(owner) = entries.owner.get(&conn_id) {
            if owner != identity {
                warn!(
                    conn_id = %conn_id,
                    identity = %identity,
                    owner = %owner,
                    "Connection already bound to another identity, ignoring register"
                );
            }
            return MembershipChange::Unchanged;
        }

        entries.owner.insert(conn_id, identity.clone());
        let set = entries.by_identity.entry(identity.clone()).or_default();
        set.insert(conn_id);
        let change = if set.len() == 1 {
            MembershipChange::CameOnline
        } else {
            MembershipChange::Joined
        };

        debug!(conn_id = %conn_id, identity = %identity, ?change, "Registered connection");
        change
    }

    /// Removes `conn_id` from `identity`'s set, dropping the entry once it is
    /// empty. Unknown pairs are a no-op.
    pub fn deregister(&self, identity: &Identity, conn_id: ConnectionId) -> MembershipChange {
        let mut entries = self.entries.write();

        match entries.owner.get(&conn_id) {
            Some(owner) if owner == identity => {}
            _ => return MembershipChange::Unchanged,
        }
        entries.owner.remove(&conn_id);

        let now_empty = match entries.by_identity.get_mut(identity) {
            Some(set) => {
                set.remove(&conn_id);
                set.is_empty()
            }
            None => return MembershipChange::Unchanged,
        };

        let change = if now_empty {
            entries.by_identity.remove(identity);
            MembershipChange::WentOffline
        } else {
            MembershipChange::Left
        };

        debug!(conn_id = %conn_id, identity = %identity, ?change, "Deregistered connection");
        change
    }

    /// Returns the live connections of `identity`, empty if it is offline.
    pub fn connections_for(&self, identity: &Identity) -> HashSet<ConnectionId> {
        self.entries
            .read()
            .by_identity
            .get(identity)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns every identity with at least one live connection, taken under
    /// one read lock.
    pub fn snapshot_identities(&self) -> BTreeSet<Identity> {
        self.entries.read().by_identity.keys().cloned().collect()
    }

    /// Whether `identity` has at least one live connection.
    pub fn is_online(&self, identity: &Identity) -> bool {
        self.entries.read().by_identity.contains_key(identity)
    }

    /// Number of online identities.
    pub fn identity_count(&self) -> usize {
        self.entries.read().by_identity.len()
    }

    /// Number of registered connections.
    pub fn connection_count(&self) -> usize {
        self.entries.read().owner.len()
    }
}
