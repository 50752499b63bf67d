use dashmap::DashMap;
use sandwich_model::{Channel, Snowflake};
use std::time::{Duration, Instant};

struct DmEntry {
    channel: Channel<'static>,
    expires_at: Instant,
}

/// DM and group-DM channels, keyed by **recipient user ID** rather than
/// channel ID — a DM channel has no guild to scope it by, and the bot only
/// ever looks one up by "who am I talking to". Entries carry a TTL that is
/// extended on every successful read.
pub struct DmChannels {
    entries: DashMap<Snowflake, DmEntry, ahash::RandomState>,
    ttl: Duration,
}

impl DmChannels {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::with_hasher(ahash::RandomState::new()),
            ttl,
        }
    }

    pub fn set(&self, recipient_id: Snowflake, channel: Channel<'static>) {
        self.entries.insert(
            recipient_id,
            DmEntry {
                channel,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Looks up the DM channel for `recipient_id`, extending its TTL on a
    /// hit and evicting it if already expired.
    pub fn get(&self, recipient_id: Snowflake) -> Option<Channel<'static>> {
        let expired = match self.entries.get(&recipient_id) {
            Some(entry) => Instant::now() > entry.expires_at,
            None => return None,
        };
        if expired {
            self.entries.remove(&recipient_id);
            return None;
        }
        let mut entry = self.entries.get_mut(&recipient_id)?;
        entry.expires_at = Instant::now() + self.ttl;
        Some(entry.channel.clone())
    }

    pub fn remove(&self, recipient_id: Snowflake) {
        self.entries.remove(&recipient_id);
    }

    pub fn sweep(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.expires_at > now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sandwich_model::channel::CHANNEL_TYPE_DM;

    fn dm_channel(id: u64) -> Channel<'static> {
        Channel {
            id: Snowflake::new(id),
            channel_type: CHANNEL_TYPE_DM,
            guild_id: None,
            position: None,
            name: None,
            topic: None,
            nsfw: false,
            last_message_id: None,
            bitrate: None,
            user_limit: None,
            rate_limit_per_user: None,
            recipients: Vec::new(),
            parent_id: None,
            last_pin_timestamp: None,
            member_count: None,
            flags: 0,
        }
    }

    #[test]
    fn get_returns_none_for_unknown_recipient() {
        let dms = DmChannels::new(Duration::from_secs(60));
        assert!(dms.get(Snowflake::new(1)).is_none());
    }

    #[test]
    fn get_extends_ttl_on_read() {
        let dms = DmChannels::new(Duration::from_millis(50));
        let recipient = Snowflake::new(42);
        dms.set(recipient, dm_channel(100));
        std::thread::sleep(Duration::from_millis(30));
        // A read before expiry should bump the TTL forward.
        assert!(dms.get(recipient).is_some());
        std::thread::sleep(Duration::from_millis(30));
        assert!(dms.get(recipient).is_some());
    }

    #[test]
    fn expired_entry_is_evicted() {
        let dms = DmChannels::new(Duration::from_millis(10));
        let recipient = Snowflake::new(7);
        dms.set(recipient, dm_channel(1));
        std::thread::sleep(Duration::from_millis(30));
        assert!(dms.get(recipient).is_none());
    }
}
