//! Profile lookup cache (`spec.md` §4.4 step 7: "Profile lookups are
//! cached with 5-minute TTL"; candidate lists themselves are never
//! cached, per the same sentence, since freshness matters more there
//! than the 30 s figure in §5's general resource table — the two
//! numbers disagree and the operation-level spec wins).

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use datecore::models::Profile;

const DEFAULT_TTL: Duration = Duration::from_secs(300);

struct Entry {
    profile: Profile,
    inserted_at: Instant,
}

/// Bounded-by-TTL cache of `user_id -> Profile`, guarded by a plain
/// `RwLock` since the critical section is pure map access, never I/O.
pub struct ProfileCache {
    entries: RwLock<HashMap<i64, Entry>>,
    ttl: Duration,
}

impl ProfileCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl: DEFAULT_TTL,
        }
    }

    pub fn get(&self, user_id: i64) -> Option<Profile> {
        let entries = self.entries.read().expect("profile cache lock poisoned");
        let entry = entries.get(&user_id)?;
        if entry.inserted_at.elapsed() > self.ttl {
            return None;
        }
        Some(entry.profile.clone())
    }

    pub fn put(&self, user_id: i64, profile: Profile) {
        let mut entries = self.entries.write().expect("profile cache lock poisoned");
        entries.insert(
            user_id,
            Entry {
                profile,
                inserted_at: Instant::now(),
            },
        );
    }
}

impl Default for ProfileCache {
    fn default() -> Self {
        Self::new()
    }
}
