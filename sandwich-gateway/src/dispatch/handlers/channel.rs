use super::parse;
use crate::dispatch::{DispatchContext, HandlerOutcome};
use crate::error::GatewayError;
use sandwich_model::{Channel, ChannelPinsUpdateEvent, Snowflake};
use serde_json::value::RawValue;

/// The non-bot recipient of a DM/group-DM channel, used as the key into
/// `dm_channels` (which has no concept of a channel's own ID).
fn dm_recipient(channel: &Channel<'_>) -> Option<Snowflake> {
    channel.recipients.first().map(|u| u.id)
}

pub fn on_create(ctx: &DispatchContext, data: &RawValue) -> Result<HandlerOutcome, GatewayError> {
    let channel: Channel<'_> = parse(data)?;
    let channel = channel.into_owned();

    match channel.guild_id {
        Some(guild_id) => ctx.state.set_guild_channel(guild_id, channel),
        None if channel.is_dm() => {
            if let Some(recipient) = dm_recipient(&channel) {
                ctx.state.dm_channels.set(recipient, channel);
            }
        }
        None => {}
    }

    Ok(HandlerOutcome::routed())
}

pub fn on_update(ctx: &DispatchContext, data: &RawValue) -> Result<HandlerOutcome, GatewayError> {
    let channel: Channel<'_> = parse(data)?;
    let channel = channel.into_owned();

    let before = match channel.guild_id {
        Some(guild_id) => ctx.state.get_guild_channel(guild_id, channel.id),
        None => channel
            .recipients
            .first()
            .and_then(|u| ctx.state.dm_channels.get(u.id)),
    };

    match channel.guild_id {
        Some(guild_id) => ctx.state.set_guild_channel(guild_id, channel),
        None if channel.is_dm() => {
            if let Some(recipient) = dm_recipient(&channel) {
                ctx.state.dm_channels.set(recipient, channel);
            }
        }
        None => {}
    }

    let extras = match before {
        Some(before) => serde_json::json!({ "before": before }),
        None => serde_json::json!({}),
    };
    Ok(HandlerOutcome::with_extras(extras))
}

pub fn on_delete(ctx: &DispatchContext, data: &RawValue) -> Result<HandlerOutcome, GatewayError> {
    let channel: Channel<'_> = parse(data)?;
    let channel = channel.into_owned();

    match channel.guild_id {
        Some(guild_id) => ctx.state.remove_guild_channel(guild_id, channel.id),
        None => {
            if let Some(recipient) = dm_recipient(&channel) {
                ctx.state.dm_channels.remove(recipient);
            }
        }
    }

    Ok(HandlerOutcome::routed())
}

pub fn on_pins_update(
    _ctx: &DispatchContext,
    data: &RawValue,
) -> Result<HandlerOutcome, GatewayError> {
    let _event: ChannelPinsUpdateEvent = parse(data)?;
    Ok(HandlerOutcome::routed())
}
