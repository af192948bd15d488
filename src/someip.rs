use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// Fixed SOME/IP header size: four big-endian 32-bit words.
pub const HEADER_SIZE: usize = 16;

/// Byte count of the last two header words, included in the `length` field.
const LENGTH_BASE: u32 = 8;

/// Decoded payload of a [`SomeIpMessage`].
///
/// Payloads are UTF-8 text (JSON detection events) in practice. A payload
/// that is not valid UTF-8 is kept verbatim under the `Undecodable` sentinel
/// instead of failing the decode; the message is still enqueued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessagePayload {
    Text(String),
    Undecodable(Vec<u8>),
}

impl MessagePayload {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            MessagePayload::Text(s) => s.as_bytes(),
            MessagePayload::Undecodable(b) => b,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessagePayload::Text(s) => Some(s),
            MessagePayload::Undecodable(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

/// One framed application-level message (object-detection event).
///
/// Immutable once decoded; owned by the shared inbox until the simulation
/// core consumes it exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SomeIpMessage {
    pub service_id: u16,
    pub method_id: u16,
    /// `8 + payload byte length`, as carried on the wire.
    pub length: u32,
    pub client_id: u16,
    pub session_id: u16,
    pub protocol_version: u8,
    pub interface_version: u8,
    pub message_type: u8,
    pub return_code: u8,
    pub payload: MessagePayload,
}

impl SomeIpMessage {
    /// Builds a message with `length` derived from the payload.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        service_id: u16,
        method_id: u16,
        client_id: u16,
        session_id: u16,
        protocol_version: u8,
        interface_version: u8,
        message_type: u8,
        return_code: u8,
        payload: MessagePayload,
    ) -> Self {
        let length = LENGTH_BASE + payload.len() as u32;
        Self {
            service_id,
            method_id,
            length,
            client_id,
            session_id,
            protocol_version,
            interface_version,
            message_type,
            return_code,
            payload,
        }
    }

    /// Serializes header and payload into wire form.
    ///
    /// Header layout (big-endian words): `message_id`, `length`,
    /// `client_session_id`, `version_type_code`.
    pub fn encode(&self) -> Vec<u8> {
        let payload = self.payload.as_bytes();
        let message_id = u32::from(self.service_id) << 16 | u32::from(self.method_id);
        let length = LENGTH_BASE + payload.len() as u32;
        let client_session_id = u32::from(self.client_id) << 16 | u32::from(self.session_id);
        let version_type_code = u32::from(self.protocol_version) << 24
            | u32::from(self.interface_version) << 16
            | u32::from(self.message_type) << 8
            | u32::from(self.return_code);

        let mut packet = Vec::with_capacity(HEADER_SIZE + payload.len());
        packet.extend_from_slice(&message_id.to_be_bytes());
        packet.extend_from_slice(&length.to_be_bytes());
        packet.extend_from_slice(&client_session_id.to_be_bytes());
        packet.extend_from_slice(&version_type_code.to_be_bytes());
        packet.extend_from_slice(payload);
        packet
    }

    /// Deserializes a datagram.
    ///
    /// Fails only on a truncated header; payload content never fails the
    /// decode (invalid UTF-8 becomes [`MessagePayload::Undecodable`]).
    pub fn decode(data: &[u8]) -> Result<Self, SimError> {
        if data.len() < HEADER_SIZE {
            return Err(SimError::MalformedFrame(data.len()));
        }

        let word = |i: usize| {
            u32::from_be_bytes([data[i], data[i + 1], data[i + 2], data[i + 3]])
        };
        let message_id = word(0);
        let length = word(4);
        let client_session_id = word(8);
        let version_type_code = word(12);

        let payload = match std::str::from_utf8(&data[HEADER_SIZE..]) {
            Ok(text) => MessagePayload::Text(text.to_owned()),
            Err(_) => MessagePayload::Undecodable(data[HEADER_SIZE..].to_vec()),
        };

        Ok(Self {
            service_id: (message_id >> 16) as u16,
            method_id: (message_id & 0xFFFF) as u16,
            length,
            client_id: (client_session_id >> 16) as u16,
            session_id: (client_session_id & 0xFFFF) as u16,
            protocol_version: (version_type_code >> 24) as u8,
            interface_version: (version_type_code >> 16 & 0xFF) as u8,
            message_type: (version_type_code >> 8 & 0xFF) as u8,
            return_code: (version_type_code & 0xFF) as u8,
            payload,
        })
    }
}
