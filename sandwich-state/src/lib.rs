//! Concurrent state cache shared by every shard a manager owns.
//!
//! Guild sub-entities (members, channels, roles, voice states) are stored in
//! per-guild nested maps rather than flattened global maps, so a guild
//! delete is a single top-level removal instead of a scan. Emoji lists are
//! the one flat, wholesale-replaced exception, and DM channels are indexed
//! by recipient user ID since they have no guild to scope them by.

pub mod dedupe;
pub mod dm;
pub mod error;
pub mod guild;
pub mod mutuals;

pub use dedupe::{DedupeKind, DedupeStore};
pub use dm::DmChannels;
pub use error::StateError;
pub use mutuals::Mutuals;

use dashmap::DashMap;
use parking_lot::RwLock;
use sandwich_model::{Channel, Emoji, Guild, GuildMember, Role, Snowflake, User, VoiceState};
use std::time::Duration;

type Map<K, V> = DashMap<K, V, ahash::RandomState>;

fn new_map<K: std::hash::Hash + Eq, V>() -> Map<K, V> {
    DashMap::with_hasher(ahash::RandomState::new())
}

/// Which entity families get cached at all. A manager with `cache_members =
/// false`, for instance, still dispatches `GUILD_MEMBER_*` events downstream,
/// it just never retains the member state — matching the upstream
/// `CacheUsers`/`CacheMembers`-style toggles.
#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    pub cache_guilds: bool,
    pub cache_channels: bool,
    pub cache_users: bool,
    pub cache_members: bool,
    pub cache_roles: bool,
    pub cache_emojis: bool,
    pub cache_voice_states: bool,
    pub store_mutuals: bool,
    pub dedupe_ttl: Duration,
    pub dm_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_guilds: true,
            cache_channels: true,
            cache_users: true,
            cache_members: true,
            cache_roles: true,
            cache_emojis: true,
            cache_voice_states: true,
            store_mutuals: false,
            dedupe_ttl: Duration::from_secs(5),
            dm_ttl: Duration::from_secs(600),
        }
    }
}

pub struct SandwichState {
    config: CacheConfig,
    bot_user_id: RwLock<Option<Snowflake>>,

    guilds: Map<Snowflake, Guild<'static>>,
    guild_members: Map<Snowflake, Map<Snowflake, GuildMember<'static>>>,
    guild_channels: Map<Snowflake, Map<Snowflake, Channel<'static>>>,
    guild_roles: Map<Snowflake, Map<Snowflake, Role<'static>>>,
    guild_emojis: Map<Snowflake, Vec<Emoji<'static>>>,
    guild_voice_states: Map<Snowflake, Map<Snowflake, VoiceState<'static>>>,

    users: Map<Snowflake, User<'static>>,
    pub dm_channels: DmChannels,
    pub mutuals: Mutuals,
    pub dedupe: DedupeStore,
}

impl SandwichState {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            dm_channels: DmChannels::new(config.dm_ttl),
            mutuals: Mutuals::new(config.store_mutuals),
            dedupe: DedupeStore::new(config.dedupe_ttl),
            config,
            bot_user_id: RwLock::new(None),
            guilds: new_map(),
            guild_members: new_map(),
            guild_channels: new_map(),
            guild_roles: new_map(),
            guild_emojis: new_map(),
            guild_voice_states: new_map(),
            users: new_map(),
        }
    }

    pub fn set_bot_user_id(&self, id: Snowflake) {
        *self.bot_user_id.write() = Some(id);
    }

    fn is_bot_user(&self, id: Snowflake) -> bool {
        *self.bot_user_id.read() == Some(id)
    }

    // ---- guilds ----------------------------------------------------

    /// Stores a guild, fanning its sub-collections out to the per-guild
    /// maps first and clearing them from the struct before it lands in the
    /// top-level map. If the guild is not being cached, the sub-collections
    /// are still fanned out — callers that disable `cache_guilds` but want
    /// member/channel lookups to keep working rely on this.
    pub fn set_guild(&self, mut incoming: Guild<'static>) {
        let guild_id = incoming.id;

        for role in incoming.roles.drain(..) {
            if self.config.cache_roles {
                self.guild_roles
                    .entry(guild_id)
                    .or_insert_with(new_map)
                    .insert(role.id, role);
            }
        }
        for channel in incoming.channels.drain(..) {
            if self.config.cache_channels {
                self.guild_channels
                    .entry(guild_id)
                    .or_insert_with(new_map)
                    .insert(channel.id, channel);
            }
        }
        for member in incoming.members.drain(..) {
            let user_id = member.user.as_ref().map(|u| u.id);
            if let Some(user) = member.user.clone() {
                self.set_user(user);
            }
            if self.config.cache_members {
                if let Some(user_id) = user_id {
                    self.guild_members
                        .entry(guild_id)
                        .or_insert_with(new_map)
                        .insert(user_id, member);
                }
            }
        }
        for voice_state in incoming.voice_states.drain(..) {
            if self.config.cache_voice_states {
                self.guild_voice_states
                    .entry(guild_id)
                    .or_insert_with(new_map)
                    .insert(voice_state.user_id, voice_state);
            }
        }
        if self.config.cache_emojis {
            self.guild_emojis
                .insert(guild_id, std::mem::take(&mut incoming.emojis));
        } else {
            incoming.emojis.clear();
        }

        guild::clear_sub_collections(&mut incoming);

        if self.config.cache_guilds {
            self.guilds.insert(guild_id, incoming);
        }
    }

    /// Reassembles a guild from the top-level map and its sub-maps. Returns
    /// `None` if the guild itself isn't known, even if sub-maps for it still
    /// have entries (a guild must be stored before it's considered present).
    pub fn get_guild(&self, guild_id: Snowflake) -> Option<Guild<'static>> {
        let mut guild = self.guilds.get(&guild_id)?.clone();

        if let Some(roles) = self.guild_roles.get(&guild_id) {
            guild.roles = roles.iter().map(|r| r.value().clone()).collect();
        }
        if let Some(channels) = self.guild_channels.get(&guild_id) {
            guild.channels = channels.iter().map(|c| c.value().clone()).collect();
        }
        if let Some(members) = self.guild_members.get(&guild_id) {
            guild.members = members.iter().map(|m| m.value().clone()).collect();
        }
        if let Some(voice_states) = self.guild_voice_states.get(&guild_id) {
            guild.voice_states = voice_states.iter().map(|v| v.value().clone()).collect();
        }
        if let Some(emojis) = self.guild_emojis.get(&guild_id) {
            guild.emojis = emojis.clone();
        }

        Some(guild)
    }

    /// Returns the top-level guild entry without reassembling sub-collections
    /// from the per-guild maps. Used by the `GUILD_UPDATE` merge, which only
    /// needs the scalar fields (`member_count`, `large`, `joined_at`,
    /// `stage_instances`) an update payload can leave absent — reassembling
    /// the full guild would do the sub-map scan for nothing.
    pub fn get_guild_bare(&self, guild_id: Snowflake) -> Option<Guild<'static>> {
        self.guilds.get(&guild_id).map(|g| g.clone())
    }

    /// Adds `delta` to a guild's cached `member_count`, saturating at zero.
    /// Used by the membership dedupe handlers, which track join/leave deltas
    /// independently of whatever full member list `GUILD_CREATE` last saw.
    pub fn adjust_member_count(&self, guild_id: Snowflake, delta: i64) {
        if let Some(mut guild) = self.guilds.get_mut(&guild_id) {
            guild.member_count = guild.member_count.saturating_add_signed(delta);
        }
    }

    /// Replaces a guild's sticker list in place. Stickers live directly on
    /// the stored `Guild` rather than a sub-map, so `GUILD_STICKERS_UPDATE`
    /// cannot go through `set_guild` without also re-triggering the
    /// wholesale emoji replace that call does — this mutates only the one
    /// field.
    pub fn set_guild_stickers(&self, guild_id: Snowflake, stickers: Vec<sandwich_model::Sticker<'static>>) {
        if let Some(mut guild) = self.guilds.get_mut(&guild_id) {
            guild.stickers = stickers;
        }
    }

    /// Removes a guild and every sub-map tied to it, including voice states.
    /// Upstream leaves voice states behind on guild removal; this cache does
    /// not, since there is no later point they become reachable again.
    pub fn remove_guild(&self, guild_id: Snowflake) {
        self.guilds.remove(&guild_id);
        self.guild_roles.remove(&guild_id);
        self.guild_channels.remove(&guild_id);
        self.guild_members.remove(&guild_id);
        self.guild_emojis.remove(&guild_id);
        self.guild_voice_states.remove(&guild_id);
        self.mutuals.remove_guild(guild_id);
    }

    // ---- members -----------------------------------------------------

    pub fn set_guild_member(&self, guild_id: Snowflake, member: GuildMember<'static>) {
        let user_id = member.user.as_ref().map(|u| u.id);
        if let Some(user) = member.user.clone() {
            self.set_user(user);
        }
        let Some(user_id) = user_id else { return };

        if self.config.store_mutuals {
            self.mutuals.add(user_id, guild_id);
        }

        if !self.config.cache_members && !self.is_bot_user(user_id) {
            return;
        }
        self.guild_members
            .entry(guild_id)
            .or_insert_with(new_map)
            .insert(user_id, member);
    }

    /// Stores a member bypassing the `cache_members`/`cache_users` flags.
    /// `GUILD_MEMBERS_CHUNK` forces both on regardless of configuration —
    /// a chunk was explicitly requested, so the caller wants the members it
    /// paid the round-trip for, not whatever the manager's ambient caching
    /// policy would otherwise allow.
    pub fn set_guild_member_forced(&self, guild_id: Snowflake, member: GuildMember<'static>) {
        let user_id = member.user.as_ref().map(|u| u.id);
        if let Some(user) = member.user.clone() {
            self.users.insert(user.id, user);
        }
        if self.config.store_mutuals {
            if let Some(user_id) = user_id {
                self.mutuals.add(user_id, guild_id);
            }
        }
        let Some(user_id) = user_id else { return };
        self.guild_members
            .entry(guild_id)
            .or_insert_with(new_map)
            .insert(user_id, member);
    }

    pub fn get_guild_member(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
    ) -> Option<GuildMember<'static>> {
        self.guild_members
            .get(&guild_id)?
            .get(&user_id)
            .map(|m| m.value().clone())
    }

    pub fn remove_guild_member(&self, guild_id: Snowflake, user_id: Snowflake) {
        if let Some(members) = self.guild_members.get(&guild_id) {
            members.remove(&user_id);
        }
    }

    // ---- users ---------------------------------------------------------

    /// The bot's own user is always retained, regardless of `cache_users`.
    pub fn set_user(&self, user: User<'static>) {
        if self.config.cache_users || self.is_bot_user(user.id) {
            self.users.insert(user.id, user);
        }
    }

    pub fn get_user(&self, user_id: Snowflake) -> Option<User<'static>> {
        self.users.get(&user_id).map(|u| u.value().clone())
    }

    // ---- channels --------------------------------------------------------

    pub fn set_guild_channel(&self, guild_id: Snowflake, channel: Channel<'static>) {
        if !self.config.cache_channels {
            return;
        }
        self.guild_channels
            .entry(guild_id)
            .or_insert_with(new_map)
            .insert(channel.id, channel);
    }

    pub fn get_guild_channel(
        &self,
        guild_id: Snowflake,
        channel_id: Snowflake,
    ) -> Option<Channel<'static>> {
        self.guild_channels
            .get(&guild_id)?
            .get(&channel_id)
            .map(|c| c.value().clone())
    }

    pub fn remove_guild_channel(&self, guild_id: Snowflake, channel_id: Snowflake) {
        if let Some(channels) = self.guild_channels.get(&guild_id) {
            channels.remove(&channel_id);
        }
    }

    // ---- roles ----------------------------------------------------------

    pub fn set_guild_role(&self, guild_id: Snowflake, role: Role<'static>) {
        if !self.config.cache_roles {
            return;
        }
        self.guild_roles
            .entry(guild_id)
            .or_insert_with(new_map)
            .insert(role.id, role);
    }

    pub fn remove_guild_role(&self, guild_id: Snowflake, role_id: Snowflake) {
        if let Some(roles) = self.guild_roles.get(&guild_id) {
            roles.remove(&role_id);
        }
    }

    /// Returns every cached role for a guild, defensively back-filling
    /// `role.id` from the map key for any entry that was partially decoded
    /// with a zero ID. This is a normalization guard, not a correctness
    /// requirement the rest of the cache depends on.
    pub fn get_all_guild_roles(&self, guild_id: Snowflake) -> Vec<Role<'static>> {
        let Some(roles) = self.guild_roles.get(&guild_id) else {
            return Vec::new();
        };
        roles
            .iter()
            .map(|entry| {
                let mut role = entry.value().clone();
                if role.id.is_nil() {
                    role.id = *entry.key();
                }
                role
            })
            .collect()
    }

    // ---- emojis -----------------------------------------------------------

    /// Emojis are replaced wholesale on every `GUILD_EMOJIS_UPDATE` — there
    /// is no per-emoji upsert.
    pub fn set_guild_emojis(&self, guild_id: Snowflake, emojis: Vec<Emoji<'static>>) {
        if !self.config.cache_emojis {
            return;
        }
        self.guild_emojis.insert(guild_id, emojis);
    }

    pub fn get_guild_emojis(&self, guild_id: Snowflake) -> Vec<Emoji<'static>> {
        self.guild_emojis
            .get(&guild_id)
            .map(|e| e.clone())
            .unwrap_or_default()
    }

    // ---- voice states ----------------------------------------------------

    /// Counts members currently in `channel_id` via a linear scan of the
    /// guild's voice-state map. Cheap relative to the rate voice-state
    /// updates actually occur at.
    pub fn count_members_for_voice_channel(
        &self,
        guild_id: Snowflake,
        channel_id: Snowflake,
    ) -> u32 {
        let Some(voice_states) = self.guild_voice_states.get(&guild_id) else {
            return 0;
        };
        voice_states
            .iter()
            .filter(|entry| entry.value().channel_id == Some(channel_id))
            .count() as u32
    }

    /// Upserts a voice state and recomputes `member_count` on the vacated
    /// channel (if the user moved from one voice channel to another) and the
    /// entered channel, writing each recomputed count back onto the stored
    /// `Channel`. `channel_id == None` means the user left voice entirely
    /// and is handled identically to `remove_voice_state`.
    pub fn update_voice_state(&self, guild_id: Snowflake, voice_state: VoiceState<'static>) {
        let Some(new_channel_id) = voice_state.channel_id else {
            self.remove_voice_state(guild_id, voice_state.user_id);
            return;
        };

        let previous_channel_id = self
            .guild_voice_states
            .get(&guild_id)
            .and_then(|states| states.get(&voice_state.user_id).map(|v| v.channel_id))
            .flatten();

        self.guild_voice_states
            .entry(guild_id)
            .or_insert_with(new_map)
            .insert(voice_state.user_id, voice_state);

        if let Some(previous_channel_id) = previous_channel_id {
            if previous_channel_id != new_channel_id {
                self.recompute_voice_member_count(guild_id, previous_channel_id);
            }
        }
        self.recompute_voice_member_count(guild_id, new_channel_id);
    }

    pub fn remove_voice_state(&self, guild_id: Snowflake, user_id: Snowflake) {
        let vacated_channel = self
            .guild_voice_states
            .get(&guild_id)
            .and_then(|states| states.get(&user_id).map(|v| v.channel_id))
            .flatten();

        if let Some(states) = self.guild_voice_states.get(&guild_id) {
            states.remove(&user_id);
        }

        if let Some(vacated_channel) = vacated_channel {
            self.recompute_voice_member_count(guild_id, vacated_channel);
        }
    }

    fn recompute_voice_member_count(&self, guild_id: Snowflake, channel_id: Snowflake) {
        let count = self.count_members_for_voice_channel(guild_id, channel_id);
        if let Some(channels) = self.guild_channels.get(&guild_id) {
            if let Some(mut channel) = channels.get_mut(&channel_id) {
                channel.member_count = Some(count);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sandwich_model::channel::CHANNEL_TYPE_DM;
    use sandwich_model::{SandwichStr, User};

    fn voice_channel(id: u64, guild_id: u64) -> Channel<'static> {
        Channel {
            id: Snowflake::new(id),
            channel_type: 2,
            guild_id: Some(Snowflake::new(guild_id)),
            position: None,
            name: None,
            topic: None,
            nsfw: false,
            last_message_id: None,
            bitrate: Some(64000),
            user_limit: None,
            rate_limit_per_user: None,
            recipients: Vec::new(),
            parent_id: None,
            last_pin_timestamp: None,
            member_count: Some(0),
            flags: 0,
        }
    }

    fn voice_state(guild_id: u64, channel_id: Option<u64>, user_id: u64) -> VoiceState<'static> {
        VoiceState {
            guild_id: Some(Snowflake::new(guild_id)),
            channel_id: channel_id.map(Snowflake::new),
            user_id: Snowflake::new(user_id),
            member: None,
            session_id: SandwichStr::Borrowed("session"),
            deaf: false,
            mute: false,
            self_deaf: false,
            self_mute: false,
            self_video: false,
            suppress: false,
            request_to_speak_timestamp: None,
        }
    }

    fn user(id: u64) -> User<'static> {
        User {
            id: Snowflake::new(id),
            username: SandwichStr::Borrowed("user"),
            discriminator: SandwichStr::Borrowed("0"),
            global_name: None,
            avatar: None,
            bot: false,
            system: false,
            banner: None,
            accent_color: None,
            public_flags: None,
        }
    }

    fn bare_guild(id: u64) -> Guild<'static> {
        Guild {
            id: Snowflake::new(id),
            name: SandwichStr::Borrowed("guild"),
            icon: None,
            owner_id: Snowflake::new(1),
            afk_channel_id: None,
            afk_timeout: 0,
            verification_level: 0,
            roles: Vec::new(),
            emojis: Vec::new(),
            features: Vec::new(),
            system_channel_id: None,
            rules_channel_id: None,
            max_members: None,
            premium_tier: 0,
            premium_subscription_count: None,
            preferred_locale: None,
            nsfw_level: 0,
            stickers: Vec::new(),
            premium_progress_bar_enabled: false,
            member_count: 0,
            large: false,
            joined_at: None,
            unavailable: false,
            channels: Vec::new(),
            members: Vec::new(),
            voice_states: Vec::new(),
            stage_instances: None,
        }
    }

    #[test]
    fn set_guild_stores_with_empty_sub_collections() {
        let state = SandwichState::new(CacheConfig::default());
        let mut guild = bare_guild(1);
        guild.channels.push(voice_channel(10, 1));
        state.set_guild(guild);

        let stored = state.guilds.get(&Snowflake::new(1)).unwrap();
        assert!(stored.channels.is_empty());
        assert!(state.get_guild_channel(Snowflake::new(1), Snowflake::new(10)).is_some());
    }

    #[test]
    fn get_guild_reassembles_sub_collections() {
        let state = SandwichState::new(CacheConfig::default());
        state.set_guild(bare_guild(1));
        state.set_guild_channel(Snowflake::new(1), voice_channel(10, 1));

        let guild = state.get_guild(Snowflake::new(1)).unwrap();
        assert_eq!(guild.channels.len(), 1);
    }

    #[test]
    fn remove_guild_clears_voice_states_too() {
        let state = SandwichState::new(CacheConfig::default());
        state.set_guild(bare_guild(1));
        state.update_voice_state(Snowflake::new(1), voice_state(1, Some(10), 100));
        state.remove_guild(Snowflake::new(1));
        assert_eq!(state.count_members_for_voice_channel(Snowflake::new(1), Snowflake::new(10)), 0);
    }

    #[test]
    fn voice_state_move_recomputes_both_channels() {
        let state = SandwichState::new(CacheConfig::default());
        state.set_guild(bare_guild(1));
        state.set_guild_channel(Snowflake::new(1), voice_channel(10, 1));
        state.set_guild_channel(Snowflake::new(1), voice_channel(20, 1));

        state.update_voice_state(Snowflake::new(1), voice_state(1, Some(10), 100));
        assert_eq!(
            state.get_guild_channel(Snowflake::new(1), Snowflake::new(10)).unwrap().member_count,
            Some(1)
        );

        state.update_voice_state(Snowflake::new(1), voice_state(1, Some(20), 100));
        assert_eq!(
            state.get_guild_channel(Snowflake::new(1), Snowflake::new(10)).unwrap().member_count,
            Some(0)
        );
        assert_eq!(
            state.get_guild_channel(Snowflake::new(1), Snowflake::new(20)).unwrap().member_count,
            Some(1)
        );
    }

    #[test]
    fn bot_user_is_cached_even_when_cache_users_disabled() {
        let mut config = CacheConfig::default();
        config.cache_users = false;
        let state = SandwichState::new(config);
        state.set_bot_user_id(Snowflake::new(99));

        state.set_user(user(99));
        state.set_user(user(1));

        assert!(state.get_user(Snowflake::new(99)).is_some());
        assert!(state.get_user(Snowflake::new(1)).is_none());
    }

    #[test]
    fn get_all_guild_roles_backfills_zero_id_from_key() {
        let state = SandwichState::new(CacheConfig::default());
        state.set_guild(bare_guild(1));
        let mut role = sandwich_model::Role {
            id: Snowflake::new(55),
            name: SandwichStr::Borrowed("role"),
            color: 0,
            hoist: false,
            icon: None,
            unicode_emoji: None,
            position: 0,
            permissions: SandwichStr::Borrowed("0"),
            managed: false,
            mentionable: false,
            flags: 0,
        };
        state.set_guild_role(Snowflake::new(1), role.clone());
        role.id = Snowflake::default();
        state
            .guild_roles
            .get(&Snowflake::new(1))
            .unwrap()
            .insert(Snowflake::new(55), role);

        let roles = state.get_all_guild_roles(Snowflake::new(1));
        assert_eq!(roles[0].id, Snowflake::new(55));
    }

    #[test]
    fn channel_type_dm_constant_is_stable() {
        assert_eq!(CHANNEL_TYPE_DM, 1);
    }
}
