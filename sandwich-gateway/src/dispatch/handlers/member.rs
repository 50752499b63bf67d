use super::parse;
use crate::dispatch::{DispatchContext, HandlerOutcome};
use crate::error::GatewayError;
use sandwich_model::{GuildMemberAddEvent, GuildMemberRemoveEvent, GuildMembersChunkEvent};
use sandwich_state::DedupeKind;
use serde_json::value::RawValue;

/// Discord can double-deliver membership events across shards during a
/// reshard, so every ADD/REMOVE is deduplicated on `(guild_id, user_id)`
/// before it touches `member_count` at all — see [`sandwich_state::DedupeStore`].
pub fn on_add(ctx: &DispatchContext, data: &RawValue) -> Result<HandlerOutcome, GatewayError> {
    let event: GuildMemberAddEvent<'_> = parse(data)?;
    let user_id = event.user.id;

    if !ctx.state.dedupe.observe(DedupeKind::MemberAdd, event.guild_id, user_id) {
        return Ok(HandlerOutcome::dropped());
    }

    // `member` is flattened alongside the sibling `user` field, so the
    // collision leaves `member.user` unset on the wire — fill it in from
    // the field that actually carries it before storing.
    let mut member = event.member.into_owned();
    member.user = Some(event.user.into_owned());
    ctx.state.set_guild_member(event.guild_id, member);
    ctx.state.adjust_member_count(event.guild_id, 1);

    Ok(HandlerOutcome::routed())
}

pub fn on_remove(ctx: &DispatchContext, data: &RawValue) -> Result<HandlerOutcome, GatewayError> {
    let event: GuildMemberRemoveEvent<'_> = parse(data)?;

    if !ctx
        .state
        .dedupe
        .observe(DedupeKind::MemberRemove, event.guild_id, event.user.id)
    {
        return Ok(HandlerOutcome::dropped());
    }

    ctx.state.remove_guild_member(event.guild_id, event.user.id);
    ctx.state.adjust_member_count(event.guild_id, -1);

    Ok(HandlerOutcome::routed())
}

pub fn on_update(ctx: &DispatchContext, data: &RawValue) -> Result<HandlerOutcome, GatewayError> {
    let event: sandwich_model::GuildMemberUpdateEvent<'_> = parse(data)?;
    let before = ctx.state.get_guild_member(event.guild_id, event.user.id);

    if let Some(mut member) = before.clone() {
        member.nick = event.nick.map(|s| s.into_owned().into());
        member.avatar = event.avatar.map(|s| s.into_owned().into());
        member.roles = event.roles.into_iter().collect();
        member.deaf = event.deaf.unwrap_or(member.deaf);
        member.mute = event.mute.unwrap_or(member.mute);
        member.pending = event.pending;
        member.communication_disabled_until = event
            .communication_disabled_until
            .map(|s| s.into_owned().into());
        ctx.state.set_guild_member(event.guild_id, member);
    }

    let extras = match before {
        Some(before) => serde_json::json!({ "before": before }),
        None => serde_json::json!({}),
    };
    Ok(HandlerOutcome::with_extras(extras))
}

/// `GUILD_MEMBERS_CHUNK` forces member/user caching on regardless of the
/// manager's configured policy, since a chunk was explicitly requested —
/// see [`sandwich_state::SandwichState::set_guild_member_forced`].
pub fn on_chunk(ctx: &DispatchContext, data: &RawValue) -> Result<HandlerOutcome, GatewayError> {
    let event: GuildMembersChunkEvent<'_> = parse(data)?;
    let members: Vec<_> = event
        .members
        .into_iter()
        .map(sandwich_model::GuildMember::into_owned)
        .collect();

    for member in members.clone() {
        ctx.state.set_guild_member_forced(event.guild_id, member);
    }

    ctx.chunking.observe(event.guild_id, event.chunk_count, members);

    Ok(HandlerOutcome::routed())
}
