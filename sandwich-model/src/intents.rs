//! Gateway intent bitflags.
//!
//! This is the exact fifteen-bit set the wire protocol documents for this
//! system; unlike a general-purpose Discord client library, the multiplexer
//! doesn't speculatively carry bits for event categories it has no dispatch
//! handler for.

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Intents: u32 {
        const GUILDS                    = 1 << 0;
        const GUILD_MEMBERS              = 1 << 1;
        const GUILD_BANS                 = 1 << 2;
        const GUILD_EMOJIS               = 1 << 3;
        const GUILD_INTEGRATIONS         = 1 << 4;
        const GUILD_WEBHOOKS             = 1 << 5;
        const GUILD_INVITES              = 1 << 6;
        const GUILD_VOICE_STATES         = 1 << 7;
        const GUILD_PRESENCES            = 1 << 8;
        const GUILD_MESSAGES             = 1 << 9;
        const GUILD_MESSAGE_REACTIONS    = 1 << 10;
        const GUILD_MESSAGE_TYPING       = 1 << 11;
        const DIRECT_MESSAGES            = 1 << 12;
        const DIRECT_MESSAGE_REACTIONS   = 1 << 13;
        const DIRECT_MESSAGE_TYPING      = 1 << 14;
    }
}

impl Intents {
    pub const NON_PRIVILEGED: Intents = Intents::all().difference(
        Intents::GUILD_MEMBERS.union(Intents::GUILD_PRESENCES),
    );
    pub const PRIVILEGED: Intents = Intents::GUILD_MEMBERS.union(Intents::GUILD_PRESENCES);
}

impl Default for Intents {
    fn default() -> Self {
        Intents::NON_PRIVILEGED
    }
}

impl Serialize for Intents {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u32(self.bits())
    }
}

impl<'de> Deserialize<'de> for Intents {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = u32::deserialize(deserializer)?;
        Ok(Intents::from_bits_truncate(bits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn privileged_intents_are_disjoint_from_default() {
        assert!(!Intents::default().contains(Intents::GUILD_MEMBERS));
        assert!(!Intents::default().contains(Intents::GUILD_PRESENCES));
    }

    #[test]
    fn round_trips_through_bits() {
        let intents = Intents::GUILDS | Intents::GUILD_MESSAGES;
        let json = crate::json::to_string(&intents).unwrap();
        let back: Intents = crate::json::from_str(&json).unwrap();
        assert_eq!(intents, back);
    }

    #[test]
    fn unknown_bits_are_truncated_not_rejected() {
        let intents: Intents = crate::json::from_str("4294967295").unwrap();
        assert_eq!(intents, Intents::all());
    }
}
