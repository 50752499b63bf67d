//! Gateway wire payloads: the outer `{op, s, t, d}` envelope and the typed
//! bodies this system sends (Identify, Resume, Heartbeat, RequestGuildMembers,
//! PresenceUpdate).

use crate::opcode::OpCode;
use sandwich_model::Intents;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// The outer envelope for every frame exchanged with the gateway. `d` is
/// generic because its shape depends on `op`; dispatch frames decode it a
/// second time (by `t`) while retaining the raw bytes for passthrough.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayPayload<D> {
    pub op: OpCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<D>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
}

impl<D: Serialize> GatewayPayload<D> {
    pub fn new(op: OpCode, data: D) -> Self {
        Self {
            op,
            d: Some(data),
            s: None,
            t: None,
        }
    }
}

/// Raw envelope used for the first pass of decoding: `d` is kept as a raw
/// JSON slice so it can be forwarded verbatim downstream without a
/// re-serialization round trip.
#[derive(Debug, Deserialize)]
pub struct RawGatewayPayload<'a> {
    pub op: OpCode,
    #[serde(borrow)]
    pub d: Option<&'a serde_json::value::RawValue>,
    pub s: Option<u64>,
    pub t: Option<String>,
}

/// Op 10, received immediately after the WebSocket handshake.
#[derive(Debug, Clone, Deserialize)]
pub struct HelloPayload {
    pub heartbeat_interval: u64,
}

/// Op 2, sent to start a fresh session.
#[derive(Debug, Clone, Serialize)]
pub struct IdentifyPayload<'a> {
    pub token: Cow<'a, str>,
    pub intents: Intents,
    pub properties: ConnectionProperties<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compress: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub large_threshold: Option<u8>,
    /// `[shard_id, shard_count]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shard: Option<[u32; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence: Option<PresenceUpdate>,
}

impl<'a> IdentifyPayload<'a> {
    pub fn new(token: impl Into<Cow<'a, str>>, intents: Intents) -> Self {
        Self {
            token: token.into(),
            intents,
            properties: ConnectionProperties::default(),
            compress: None,
            large_threshold: Some(250),
            shard: None,
            presence: None,
        }
    }

    pub fn with_shard(mut self, shard_id: u32, shard_count: u32) -> Self {
        self.shard = Some([shard_id, shard_count]);
        self
    }

    pub fn with_presence(mut self, presence: PresenceUpdate) -> Self {
        self.presence = Some(presence);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectionProperties<'a> {
    #[serde(rename = "$os")]
    pub os: Cow<'a, str>,
    #[serde(rename = "$browser")]
    pub browser: Cow<'a, str>,
    #[serde(rename = "$device")]
    pub device: Cow<'a, str>,
}

impl<'a> Default for ConnectionProperties<'a> {
    fn default() -> Self {
        Self {
            os: Cow::Owned(std::env::consts::OS.to_string()),
            browser: Cow::Borrowed("sandwich"),
            device: Cow::Borrowed("sandwich"),
        }
    }
}

/// Op 3 payload, also embedded as the optional initial presence on Identify.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PresenceUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since: Option<u64>,
    pub activities: Vec<Activity>,
    pub status: Status,
    pub afk: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub name: String,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum ActivityType {
    Playing = 0,
    Streaming = 1,
    Listening = 2,
    Watching = 3,
    Custom = 4,
    Competing = 5,
}

use serde_repr::{Deserialize_repr, Serialize_repr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Online,
    Dnd,
    Idle,
    Invisible,
    Offline,
}

/// Op 6, sent to resume a previous session.
#[derive(Debug, Clone, Serialize)]
pub struct ResumePayload<'a> {
    pub token: Cow<'a, str>,
    pub session_id: Cow<'a, str>,
    pub seq: u64,
}

/// Op 8, one per guild during `ChunkAllGuilds`.
#[derive(Debug, Clone, Serialize)]
pub struct RequestGuildMembersPayload<'a> {
    pub guild_id: sandwich_model::Snowflake,
    #[serde(default)]
    pub query: Cow<'a, str>,
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presences: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_ids: Option<Vec<sandwich_model::Snowflake>>,
    pub nonce: String,
}

/// The Heartbeat payload body is just the last observed sequence (or
/// `null`); building it as a typed envelope avoids a manual format string.
pub fn heartbeat_payload(sequence: Option<u64>) -> GatewayPayload<Option<u64>> {
    GatewayPayload {
        op: OpCode::Heartbeat,
        d: Some(sequence),
        s: None,
        t: None,
    }
}

/// Identifies which shard produced a published payload, attached so a
/// downstream consumer reading off a shared channel can tell sessions apart.
#[derive(Debug, Clone, Serialize)]
pub struct ShardMetadata {
    pub shard_id: u32,
    pub shard_count: u32,
    pub manager: String,
}

/// The envelope handed to a [`sandwich_producer::Producer`] once a dispatch
/// frame clears the publish gate: the original op/sequence/event name, the
/// raw `d` forwarded verbatim, whatever `extras` the state handler attached,
/// and a trace map recording when each pipeline stage touched the frame.
#[derive(Debug, Clone, Serialize)]
pub struct SandwichPayload<'a> {
    pub op: OpCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub t: Option<&'a str>,
    #[serde(borrow)]
    pub d: &'a serde_json::value::RawValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extras: Option<serde_json::Value>,
    pub trace: std::collections::HashMap<String, u128>,
    pub metadata: ShardMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hello_payload_parses_heartbeat_interval() {
        let json = r#"{"heartbeat_interval": 41250}"#;
        let payload: HelloPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.heartbeat_interval, 41250);
    }

    #[test]
    fn identify_payload_serializes_shard_and_token() {
        let identify = IdentifyPayload::new("test_token", Intents::GUILDS | Intents::GUILD_MESSAGES)
            .with_shard(0, 1);
        let json = serde_json::to_string(&identify).unwrap();
        assert!(json.contains("test_token"));
        assert!(json.contains("\"shard\":[0,1]"));
    }

    #[test]
    fn heartbeat_payload_encodes_null_sequence() {
        let payload = heartbeat_payload(None);
        let json = serde_json::to_string(&payload).unwrap();
        assert_eq!(json, r#"{"op":1,"d":null}"#);
    }

    #[test]
    fn heartbeat_payload_encodes_present_sequence() {
        let payload = heartbeat_payload(Some(42));
        let json = serde_json::to_string(&payload).unwrap();
        assert_eq!(json, r#"{"op":1,"d":42}"#);
    }
}
