use dashmap::DashMap;
use sandwich_model::Snowflake;
use std::time::{Duration, Instant};

/// Discriminates the two event families that race against each other on a
/// membership change: a `GUILD_MEMBER_ADD` can arrive after its own
/// `GUILD_MEMBER_REMOVE` has already landed (or vice versa) when a bot
/// rejoins a guild quickly, and the opposite pending key must be cleared on
/// success rather than left to expire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DedupeKind {
    MemberAdd,
    MemberRemove,
}

impl DedupeKind {
    fn opposite(self) -> Self {
        match self {
            DedupeKind::MemberAdd => DedupeKind::MemberRemove,
            DedupeKind::MemberRemove => DedupeKind::MemberAdd,
        }
    }
}

type DedupeKey = (DedupeKind, Snowflake, Snowflake);

/// Short-TTL dedupe store for `GUILD_MEMBER_ADD`/`GUILD_MEMBER_REMOVE`
/// pairs. A key is `(kind, guild_id, user_id)`.
pub struct DedupeStore {
    entries: DashMap<DedupeKey, Instant, ahash::RandomState>,
    ttl: Duration,
}

impl DedupeStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::with_hasher(ahash::RandomState::new()),
            ttl,
        }
    }

    /// Records `kind` for `(guild_id, user_id)` and clears the opposite
    /// pending key. Returns `true` if this event should be treated as a
    /// genuine transition (not a duplicate already seen within the TTL).
    pub fn observe(&self, kind: DedupeKind, guild_id: Snowflake, user_id: Snowflake) -> bool {
        self.entries.remove(&(kind.opposite(), guild_id, user_id));

        let key = (kind, guild_id, user_id);
        if let Some(seen) = self.entries.get(&key) {
            if seen.elapsed() < self.ttl {
                return false;
            }
        }
        self.entries.insert(key, Instant::now());
        true
    }

    pub fn sweep(&self) {
        let ttl = self.ttl;
        self.entries.retain(|_, seen_at| seen_at.elapsed() < ttl);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_observation_is_not_a_duplicate() {
        let store = DedupeStore::new(Duration::from_secs(5));
        assert!(store.observe(DedupeKind::MemberAdd, Snowflake::new(1), Snowflake::new(2)));
    }

    #[test]
    fn repeated_observation_within_ttl_is_deduped() {
        let store = DedupeStore::new(Duration::from_secs(5));
        let (guild, user) = (Snowflake::new(1), Snowflake::new(2));
        assert!(store.observe(DedupeKind::MemberAdd, guild, user));
        assert!(!store.observe(DedupeKind::MemberAdd, guild, user));
    }

    #[test]
    fn opposite_kind_clears_pending_key() {
        let store = DedupeStore::new(Duration::from_secs(5));
        let (guild, user) = (Snowflake::new(1), Snowflake::new(2));
        assert!(store.observe(DedupeKind::MemberAdd, guild, user));
        assert!(store.observe(DedupeKind::MemberRemove, guild, user));
        // MemberAdd's pending key was cleared by the REMOVE, so a fresh ADD
        // is once again a genuine transition.
        assert!(store.observe(DedupeKind::MemberAdd, guild, user));
    }
}
