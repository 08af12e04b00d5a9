use bytes::Bytes;
use zeroize::Zeroizing;

use crate::key_schedule::MASTER_SECRET_SIZE;

struct SessionEntry {
    id: Bytes,
    /// Present once the handshake that created the session derived it.
    master_secret: Option<Zeroizing<[u8; MASTER_SECRET_SIZE]>>,
}

/// Bounded set of resumable sessions keyed by session id, shared by every
/// connection of a context. Eviction is least-recently-used.
pub struct SessionCache {
    /// Most recently used first.
    entries: Vec<SessionEntry>,
    max_sessions: usize,
}

impl SessionCache {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            entries: vec![],
            max_sessions,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, id: &[u8]) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    /// Locates the entry for `id` or installs a new one, evicting the least
    /// recently used entry when full. Returns the stored master secret when
    /// the session was already known and completed.
    pub fn update(&mut self, id: &[u8]) -> Option<[u8; MASTER_SECRET_SIZE]> {
        if self.max_sessions == 0 {
            return None;
        }

        if let Some(pos) = self.entries.iter().position(|e| e.id == id) {
            let entry = self.entries.remove(pos);
            let master = entry.master_secret.as_ref().map(|m| **m);
            self.entries.insert(0, entry);
            return master;
        }

        if self.entries.len() >= self.max_sessions {
            self.entries.pop();
        }

        self.entries.insert(
            0,
            SessionEntry {
                id: Bytes::copy_from_slice(id),
                master_secret: None,
            },
        );

        None
    }

    /// Records the master secret derived for `id`.
    pub fn store_master(&mut self, id: &[u8], master: &[u8; MASTER_SECRET_SIZE]) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.id == id) {
            entry.master_secret = Some(Zeroizing::new(*master));
        }
    }

    /// Drops the entry for `id` entirely. Used when a connection dies so
    /// badly that even the failure alert could not be delivered.
    pub fn remove(&mut self, id: &[u8]) {
        self.entries.retain(|e| e.id != id);
    }
}
