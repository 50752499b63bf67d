use super::parse;
use crate::dispatch::{DispatchContext, HandlerOutcome};
use crate::error::GatewayError;
use sandwich_model::{Guild, UnavailableGuild};
use serde_json::value::RawValue;

pub fn on_create(ctx: &DispatchContext, data: &RawValue) -> Result<HandlerOutcome, GatewayError> {
    let guild: Guild<'_> = parse(data)?;
    let guild = guild.into_owned();
    let id = guild.id;

    let was_lazy = ctx.lazy.remove(&id).is_some();
    let was_unavailable = ctx.unavailable.remove(&id).is_some();
    ctx.guilds.insert(id);

    ctx.state.set_guild(guild);

    Ok(HandlerOutcome::with_extras(serde_json::json!({
        "lazy": was_lazy,
        "unavailable": was_unavailable,
    })))
}

/// `GUILD_UPDATE` carries the full guild object, including current
/// `roles`/`emojis`/`stickers` — those apply as sent. `member_count`,
/// `large`, `joined_at` and `stage_instances` are never part of this
/// payload (Discord only sends them on `GUILD_CREATE`), so they're carried
/// forward from the cached entry rather than overwritten with defaults.
pub fn on_update(ctx: &DispatchContext, data: &RawValue) -> Result<HandlerOutcome, GatewayError> {
    let incoming: Guild<'_> = parse(data)?;
    let mut incoming = incoming.into_owned();
    let id = incoming.id;

    let before = ctx.state.get_guild_bare(id);
    if let Some(before) = &before {
        if incoming.member_count == 0 {
            incoming.member_count = before.member_count;
        }
        incoming.large = before.large;
        incoming.joined_at = before.joined_at.clone();
        incoming.stage_instances = before.stage_instances.clone();
    }

    ctx.state.set_guild(incoming);

    let extras = match before {
        Some(before) => serde_json::json!({ "before": before }),
        None => serde_json::json!({}),
    };
    Ok(HandlerOutcome::with_extras(extras))
}

/// Upstream's documented (if surprising) behavior: a non-unavailable
/// `GUILD_DELETE` only drops the guild from the owning shard group's
/// ownership set. The global cache entry is left in place — a kicked bot
/// that rejoins shortly after benefits from the warm cache, and nothing
/// else in this system depends on the entry disappearing promptly.
pub fn on_delete(ctx: &DispatchContext, data: &RawValue) -> Result<HandlerOutcome, GatewayError> {
    let unavailable_guild: UnavailableGuild = parse(data)?;
    let id = unavailable_guild.id;
    let before = ctx.state.get_guild(id);

    if unavailable_guild.unavailable {
        ctx.unavailable.insert(id);
    } else {
        ctx.guilds.remove(&id);
    }

    let extras = match before {
        Some(before) => serde_json::json!({ "before": before }),
        None => serde_json::json!({}),
    };
    Ok(HandlerOutcome::with_extras(extras))
}
