use dashmap::DashSet;
use dashmap::DashMap;
use sandwich_model::Snowflake;

/// `user_id -> set<guild_id>` reverse index, populated only when mutual-guild
/// tracking is enabled. Lets a caller answer "which guilds do we share with
/// this user" without scanning every guild's member map.
pub struct Mutuals {
    enabled: bool,
    by_user: DashMap<Snowflake, DashSet<Snowflake, ahash::RandomState>, ahash::RandomState>,
}

impl Mutuals {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            by_user: DashMap::with_hasher(ahash::RandomState::new()),
        }
    }

    pub fn add(&self, user_id: Snowflake, guild_id: Snowflake) {
        if !self.enabled {
            return;
        }
        self.by_user
            .entry(user_id)
            .or_insert_with(|| DashSet::with_hasher(ahash::RandomState::new()))
            .insert(guild_id);
    }

    pub fn remove(&self, user_id: Snowflake, guild_id: Snowflake) {
        if let Some(set) = self.by_user.get(&user_id) {
            set.remove(&guild_id);
        }
    }

    pub fn remove_guild(&self, guild_id: Snowflake) {
        self.by_user.retain(|_, set| {
            set.remove(&guild_id);
            !set.is_empty()
        });
    }

    pub fn get(&self, user_id: Snowflake) -> Vec<Snowflake> {
        self.by_user
            .get(&user_id)
            .map(|set| set.iter().map(|g| *g).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_tracking_records_nothing() {
        let mutuals = Mutuals::new(false);
        mutuals.add(Snowflake::new(1), Snowflake::new(2));
        assert!(mutuals.get(Snowflake::new(1)).is_empty());
    }

    #[test]
    fn tracks_multiple_guilds_per_user() {
        let mutuals = Mutuals::new(true);
        let user = Snowflake::new(1);
        mutuals.add(user, Snowflake::new(10));
        mutuals.add(user, Snowflake::new(11));
        let mut guilds = mutuals.get(user);
        guilds.sort();
        assert_eq!(guilds, vec![Snowflake::new(10), Snowflake::new(11)]);
    }

    #[test]
    fn remove_guild_prunes_empty_users() {
        let mutuals = Mutuals::new(true);
        let user = Snowflake::new(1);
        mutuals.add(user, Snowflake::new(10));
        mutuals.remove_guild(Snowflake::new(10));
        assert!(mutuals.get(user).is_empty());
    }
}
