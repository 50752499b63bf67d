//! Member-chunking bookkeeping (`RequestGuildMembers` / `GUILD_MEMBERS_CHUNK`).

use sandwich_model::{GuildMember, Snowflake};
use std::time::Instant;

/// Per-guild chunk state registered when a chunk request is sent.
pub struct GuildChunks {
    pub chunk_count: i32,
    pub chunks_received: i32,
    pub complete: bool,
    pub completed_at: Option<Instant>,
    mode: ChunkMode,
}

enum ChunkMode {
    /// Count-only: the caller just wants to know when chunking finishes.
    Partial,
    /// Every received chunk's members are forwarded on this channel.
    Push(flume::Sender<Vec<GuildMember<'static>>>),
}

impl GuildChunks {
    pub fn partial() -> Self {
        Self {
            chunk_count: 0,
            chunks_received: 0,
            complete: false,
            completed_at: None,
            mode: ChunkMode::Partial,
        }
    }

    pub fn push(channel: flume::Sender<Vec<GuildMember<'static>>>) -> Self {
        Self {
            chunk_count: 0,
            chunks_received: 0,
            complete: false,
            completed_at: None,
            mode: ChunkMode::Push(channel),
        }
    }

    /// Record one `GUILD_MEMBERS_CHUNK` event. Marks `complete` once every
    /// expected chunk has arrived.
    pub fn observe_chunk(&mut self, chunk_count: i32, members: Vec<GuildMember<'static>>) {
        self.chunk_count = chunk_count;
        self.chunks_received += 1;

        if let ChunkMode::Push(channel) = &self.mode {
            let _ = channel.send(members);
        }

        if self.chunks_received >= self.chunk_count {
            self.complete = true;
            self.completed_at = Some(Instant::now());
        }
    }
}

/// Tracks in-flight chunk requests keyed by guild, and owns the `nonce`
/// generator used to correlate requests with their responses.
#[derive(Default)]
pub struct ChunkRegistry {
    in_flight: dashmap::DashMap<Snowflake, GuildChunks, ahash::RandomState>,
}

impl ChunkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, guild_id: Snowflake, chunks: GuildChunks) {
        self.in_flight.insert(guild_id, chunks);
    }

    pub fn observe(&self, guild_id: Snowflake, chunk_count: i32, members: Vec<GuildMember<'static>>) {
        if let Some(mut entry) = self.in_flight.get_mut(&guild_id) {
            entry.observe_chunk(chunk_count, members);
        }
    }

    pub fn is_complete(&self, guild_id: Snowflake) -> bool {
        self.in_flight.get(&guild_id).map(|e| e.complete).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sandwich_model::User;

    fn member() -> GuildMember<'static> {
        GuildMember {
            user: Some(User {
                id: Snowflake::new(1),
                username: "a".into(),
                discriminator: "0".into(),
                global_name: None,
                avatar: None,
                bot: false,
                system: false,
                banner: None,
                accent_color: None,
                public_flags: None,
            }),
            nick: None,
            avatar: None,
            roles: Default::default(),
            joined_at: "".into(),
            premium_since: None,
            deaf: false,
            mute: false,
            flags: 0,
            pending: false,
            communication_disabled_until: None,
        }
    }

    #[test]
    fn partial_chunk_completes_after_expected_count() {
        let mut chunks = GuildChunks::partial();
        chunks.observe_chunk(2, vec![member()]);
        assert!(!chunks.complete);
        chunks.observe_chunk(2, vec![member()]);
        assert!(chunks.complete);
        assert!(chunks.completed_at.is_some());
    }

    #[test]
    fn push_mode_forwards_every_chunk() {
        let (tx, rx) = flume::unbounded();
        let mut chunks = GuildChunks::push(tx);
        chunks.observe_chunk(1, vec![member()]);
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn registry_tracks_completion_by_guild() {
        let registry = ChunkRegistry::new();
        let guild_id = Snowflake::new(10);
        registry.register(guild_id, GuildChunks::partial());
        assert!(!registry.is_complete(guild_id));
        registry.observe(guild_id, 1, vec![member()]);
        assert!(registry.is_complete(guild_id));
    }
}
