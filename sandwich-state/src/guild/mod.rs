pub mod member;

use sandwich_model::Guild;

/// Clears the sub-collections a stored `Guild` must never carry (roles,
/// channels, members, voice states) before it is inserted into the top-level
/// guild map. The authoritative data for those lives in the per-guild
/// sub-maps owned by `SandwichState`. Stickers are left untouched — unlike
/// the others, they are embedded directly on the stored guild.
pub fn clear_sub_collections(guild: &mut Guild<'static>) {
    guild.roles.clear();
    guild.channels.clear();
    guild.members.clear();
    guild.voice_states.clear();
    guild.emojis.clear();
}
