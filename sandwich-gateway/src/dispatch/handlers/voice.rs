use super::parse;
use crate::dispatch::{DispatchContext, HandlerOutcome};
use crate::error::GatewayError;
use sandwich_model::VoiceState;
use serde_json::value::RawValue;

/// `channel_id == None` means the user left voice. Both that and the
/// upsert case, including the before/after channel `member_count`
/// recompute, are handled by
/// [`sandwich_state::SandwichState::update_voice_state`] — this handler is
/// just the wire-to-cache boundary.
pub fn on_state_update(
    ctx: &DispatchContext,
    data: &RawValue,
) -> Result<HandlerOutcome, GatewayError> {
    let voice_state: VoiceState<'_> = parse(data)?;
    let voice_state = voice_state.into_owned();
    let Some(guild_id) = voice_state.guild_id else {
        // Voice states outside a guild (e.g. a future DM call feature)
        // have nowhere in this cache to live.
        return Ok(HandlerOutcome::routed());
    };

    ctx.state.update_voice_state(guild_id, voice_state);
    Ok(HandlerOutcome::routed())
}
