//! Discord Gateway operation codes.

use serde_repr::{Deserialize_repr, Serialize_repr};

/// See: <https://discord.com/developers/docs/topics/opcodes-and-status-codes#gateway-gateway-opcodes>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum OpCode {
    /// An event was dispatched. Receive only.
    Dispatch = 0,
    /// Keep the connection alive. Send and receive.
    Heartbeat = 1,
    /// Start a new session. Send only.
    Identify = 2,
    /// Update the client's presence. Send only.
    PresenceUpdate = 3,
    /// Join/leave/move between voice channels. Send only.
    VoiceStateUpdate = 4,
    /// Resume a previous session. Send only.
    Resume = 6,
    /// Server requested a reconnect. Receive only.
    Reconnect = 7,
    /// Request guild member chunks. Send only.
    RequestGuildMembers = 8,
    /// Session has been invalidated. Receive only.
    InvalidSession = 9,
    /// Sent after connecting, contains the heartbeat interval. Receive only.
    Hello = 10,
    /// Acknowledgment of a heartbeat. Receive only.
    HeartbeatAck = 11,
    /// Request soundboard sounds. Send only.
    RequestSoundboardSounds = 31,
}

impl OpCode {
    pub const fn is_receive_only(self) -> bool {
        matches!(
            self,
            OpCode::Dispatch
                | OpCode::Reconnect
                | OpCode::InvalidSession
                | OpCode::Hello
                | OpCode::HeartbeatAck
        )
    }

    pub const fn is_send_only(self) -> bool {
        matches!(
            self,
            OpCode::Identify
                | OpCode::PresenceUpdate
                | OpCode::VoiceStateUpdate
                | OpCode::Resume
                | OpCode::RequestGuildMembers
                | OpCode::RequestSoundboardSounds
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_round_trips_through_json() {
        let json = serde_json::to_string(&OpCode::Hello).unwrap();
        assert_eq!(json, "10");
        let opcode: OpCode = serde_json::from_str("10").unwrap();
        assert_eq!(opcode, OpCode::Hello);
    }

    #[test]
    fn opcode_direction_classification() {
        assert!(OpCode::Dispatch.is_receive_only());
        assert!(OpCode::Identify.is_send_only());
        assert!(!OpCode::Heartbeat.is_receive_only());
        assert!(!OpCode::Heartbeat.is_send_only());
    }
}
