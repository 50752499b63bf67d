use super::parse;
use crate::dispatch::{DispatchContext, HandlerOutcome};
use crate::error::GatewayError;
use sandwich_model::{Snowflake, User};
use serde::Deserialize;
use serde_json::value::RawValue;

/// `USER_UPDATE` is global-routed: every downstream consumer sees it
/// regardless of guild, since a user isn't scoped to one.
pub fn on_user_update(
    ctx: &DispatchContext,
    data: &RawValue,
) -> Result<HandlerOutcome, GatewayError> {
    let user: User<'_> = parse(data)?;
    ctx.state.set_user(user.into_owned());
    Ok(HandlerOutcome::routed())
}

/// Message/typing/invite/presence/reaction/entitlement families: no state
/// mutation, the raw payload already carries whatever `guild_id` a consumer
/// needs to route on.
pub fn route_by_guild(
    _ctx: &DispatchContext,
    _data: &RawValue,
) -> Result<HandlerOutcome, GatewayError> {
    Ok(HandlerOutcome::routed())
}

#[derive(Deserialize, Default)]
struct WildcardShape {
    #[serde(default)]
    guild_id: Option<Snowflake>,
    #[serde(default)]
    user_id: Option<Snowflake>,
}

/// Fallback for any event name not in the table: best-effort extraction of
/// `{guild_id, user_id}` so an unrecognized (likely newer-than-this-build)
/// event still routes sensibly instead of being silently dropped.
pub fn wildcard(_ctx: &DispatchContext, data: &RawValue) -> Result<HandlerOutcome, GatewayError> {
    let shape: WildcardShape = serde_json::from_str(data.get()).unwrap_or_default();
    Ok(HandlerOutcome::with_extras(serde_json::json!({
        "globally_routed": shape.guild_id.is_none(),
        "user_id": shape.user_id,
    })))
}
