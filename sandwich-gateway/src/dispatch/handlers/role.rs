use super::parse;
use crate::dispatch::{DispatchContext, HandlerOutcome};
use crate::error::GatewayError;
use sandwich_model::{
    GuildEmojisUpdateEvent, GuildRoleDeleteEvent, GuildRoleEvent, GuildStickersUpdateEvent,
};
use serde_json::value::RawValue;

pub fn on_create_or_update(
    ctx: &DispatchContext,
    data: &RawValue,
) -> Result<HandlerOutcome, GatewayError> {
    let event: GuildRoleEvent<'_> = parse(data)?;
    ctx.state
        .set_guild_role(event.guild_id, event.role.into_owned());
    Ok(HandlerOutcome::routed())
}

pub fn on_delete(ctx: &DispatchContext, data: &RawValue) -> Result<HandlerOutcome, GatewayError> {
    let event: GuildRoleDeleteEvent = parse(data)?;
    ctx.state.remove_guild_role(event.guild_id, event.role_id);
    Ok(HandlerOutcome::routed())
}

pub fn on_emojis_update(
    ctx: &DispatchContext,
    data: &RawValue,
) -> Result<HandlerOutcome, GatewayError> {
    let event: GuildEmojisUpdateEvent<'_> = parse(data)?;
    let emojis = event
        .emojis
        .into_iter()
        .map(sandwich_model::Emoji::into_owned)
        .collect();
    ctx.state.set_guild_emojis(event.guild_id, emojis);
    Ok(HandlerOutcome::routed())
}

/// Stickers live directly on the stored `Guild`, not a sub-map — this goes
/// through [`sandwich_state::SandwichState::set_guild_stickers`] rather than
/// `set_guild`, which would also wipe the emoji sub-map via its wholesale
/// replace.
pub fn on_stickers_update(
    ctx: &DispatchContext,
    data: &RawValue,
) -> Result<HandlerOutcome, GatewayError> {
    let event: GuildStickersUpdateEvent<'_> = parse(data)?;
    let stickers = event
        .stickers
        .into_iter()
        .map(sandwich_model::Sticker::into_owned)
        .collect();
    ctx.state.set_guild_stickers(event.guild_id, stickers);
    Ok(HandlerOutcome::routed())
}
