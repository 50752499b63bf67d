use crate::member::GuildMember;
use crate::snowflake::Snowflake;
use crate::string::SandwichStr;
use serde::{Deserialize, Serialize};

/// A voice state. `channel_id == None` means "left voice" and is the
/// deletion trigger in the state cache; the wire form uses a nullable
/// snowflake to mean the same thing.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VoiceState<'a> {
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    #[serde(default)]
    pub channel_id: Option<Snowflake>,
    pub user_id: Snowflake,
    #[serde(default)]
    pub member: Option<GuildMember<'a>>,
    pub session_id: SandwichStr<'a>,
    #[serde(default)]
    pub deaf: bool,
    #[serde(default)]
    pub mute: bool,
    #[serde(default)]
    pub self_deaf: bool,
    #[serde(default)]
    pub self_mute: bool,
    #[serde(default)]
    pub self_video: bool,
    #[serde(default)]
    pub suppress: bool,
    #[serde(default)]
    pub request_to_speak_timestamp: Option<SandwichStr<'a>>,
}

impl VoiceState<'_> {
    pub fn into_owned(self) -> VoiceState<'static> {
        VoiceState {
            guild_id: self.guild_id,
            channel_id: self.channel_id,
            user_id: self.user_id,
            member: self.member.map(GuildMember::into_owned),
            session_id: self.session_id.into_owned().into(),
            deaf: self.deaf,
            mute: self.mute,
            self_deaf: self.self_deaf,
            self_mute: self.self_mute,
            self_video: self.self_video,
            suppress: self.suppress,
            request_to_speak_timestamp: self
                .request_to_speak_timestamp
                .map(|s| s.into_owned().into()),
        }
    }
}
