//! Length-prefixed framing and payload encoding.
//!
//! A frame is a 4-byte big-endian payload length followed by the payload.
//! Stream sockets may split or coalesce writes, so readers always consume
//! exactly one length header and then exactly that many payload bytes.

use crate::protocol::{ClientEnvelope, Intent, ServerEnvelope, ServerMessage, PROTOCOL_VERSION};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::io;
use std::str::FromStr;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest payload a peer may announce. Snapshots of two full-board snakes
/// stay well below this.
pub const MAX_FRAME_LEN: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("announced frame of {0} bytes exceeds the frame size limit")]
    FrameTooLarge(usize),

    #[error("invalid json payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid bincode payload: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("unsupported protocol version {0}")]
    UnsupportedVersion(u8),
}

impl CodecError {
    /// Transport failures leave the stream unusable; anything else only
    /// spoils the current payload.
    pub fn is_transport(&self) -> bool {
        matches!(self, CodecError::Io(_) | CodecError::FrameTooLarge(_))
    }
}

/// Payload encoding used inside frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WireFormat {
    #[default]
    Json,
    Bincode,
}

impl WireFormat {
    pub fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        match self {
            WireFormat::Json => Ok(serde_json::to_vec(value)?),
            WireFormat::Bincode => Ok(bincode::serialize(value)?),
        }
    }

    pub fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CodecError> {
        match self {
            WireFormat::Json => Ok(serde_json::from_slice(bytes)?),
            WireFormat::Bincode => Ok(bincode::deserialize(bytes)?),
        }
    }
}

impl FromStr for WireFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(WireFormat::Json),
            "bincode" => Ok(WireFormat::Bincode),
            other => Err(format!("unknown wire format '{}', expected json or bincode", other)),
        }
    }
}

impl fmt::Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireFormat::Json => write!(f, "json"),
            WireFormat::Bincode => write!(f, "bincode"),
        }
    }
}

pub fn encode_server(format: WireFormat, msg: ServerMessage) -> Result<Vec<u8>, CodecError> {
    format.encode(&ServerEnvelope {
        v: PROTOCOL_VERSION,
        msg,
    })
}

pub fn decode_server(format: WireFormat, bytes: &[u8]) -> Result<ServerMessage, CodecError> {
    let env: ServerEnvelope = format.decode(bytes)?;
    if env.v != PROTOCOL_VERSION {
        return Err(CodecError::UnsupportedVersion(env.v));
    }
    Ok(env.msg)
}

pub fn encode_client(format: WireFormat, intent: Intent) -> Result<Vec<u8>, CodecError> {
    format.encode(&ClientEnvelope {
        v: PROTOCOL_VERSION,
        intent,
    })
}

pub fn decode_client(format: WireFormat, bytes: &[u8]) -> Result<Intent, CodecError> {
    let env: ClientEnvelope = format.decode(bytes)?;
    if env.v != PROTOCOL_VERSION {
        return Err(CodecError::UnsupportedVersion(env.v));
    }
    Ok(env.intent)
}

/// Prefixes `payload` with its length, ready to be written in one go.
pub fn frame(payload: &[u8]) -> Result<Vec<u8>, CodecError> {
    if payload.len() > MAX_FRAME_LEN {
        return Err(CodecError::FrameTooLarge(payload.len()));
    }
    let mut buf = Vec::with_capacity(4 + payload.len());
    buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    buf.extend_from_slice(payload);
    Ok(buf)
}

pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), CodecError>
where
    W: AsyncWrite + Unpin,
{
    let buf = frame(payload)?;
    writer.write_all(&buf).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one frame. `Ok(None)` means the peer closed the stream cleanly
/// between frames; EOF inside a frame is an error.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Vec<u8>>, CodecError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 4];
    if reader.read(&mut header[..1]).await? == 0 {
        return Ok(None);
    }
    reader.read_exact(&mut header[1..]).await?;

    let len = u32::from_be_bytes(header) as usize;
    if len > MAX_FRAME_LEN {
        return Err(CodecError::FrameTooLarge(len));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(Some(payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Direction, Position, TickSnapshot, Vector};
    use std::collections::BTreeMap;
    use tokio_test::io::Builder;

    fn sample_snapshot() -> ServerMessage {
        ServerMessage::TickSnapshot(TickSnapshot {
            state: BTreeMap::new(),
            food: Position::new(200, 300),
            powerup: Some(Position::new(20, 20)),
            fog_powerup: None,
            game_over: true,
        })
    }

    #[tokio::test]
    async fn test_read_frame_reassembles_fragments() {
        let mut mock = Builder::new()
            .read(&[0, 0])
            .read(&[0, 5, b'h'])
            .read(&[b'e', b'l'])
            .read(&[b'l', b'o'])
            .build();

        let payload = read_frame(&mut mock).await.unwrap();
        assert_eq!(payload.as_deref(), Some(&b"hello"[..]));
        assert!(read_frame(&mut mock).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_frame_splits_coalesced_frames() {
        let mut bytes = frame(b"ab").unwrap();
        bytes.extend(frame(b"cde").unwrap());
        let mut mock = Builder::new().read(&bytes).build();

        assert_eq!(read_frame(&mut mock).await.unwrap().unwrap(), b"ab");
        assert_eq!(read_frame(&mut mock).await.unwrap().unwrap(), b"cde");
        assert!(read_frame(&mut mock).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_frame_eof_inside_frame_is_error() {
        let mut mock = Builder::new().read(&[0, 0, 0, 9, 1, 2]).build();
        let err = read_frame(&mut mock).await.unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_read_frame_rejects_oversized_frame() {
        let len = (MAX_FRAME_LEN as u32 + 1).to_be_bytes();
        let mut mock = Builder::new().read(&len).build();
        match read_frame(&mut mock).await {
            Err(CodecError::FrameTooLarge(n)) => assert_eq!(n, MAX_FRAME_LEN + 1),
            other => panic!("expected FrameTooLarge, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_write_frame_prefixes_big_endian_length() {
        let mut mock = Builder::new().write(&[0, 0, 0, 3, b'a', b'b', b'c']).build();
        write_frame(&mut mock, b"abc").await.unwrap();
    }

    #[test]
    fn test_server_message_in_both_formats() {
        for format in [WireFormat::Json, WireFormat::Bincode] {
            let bytes = encode_server(format, sample_snapshot()).unwrap();
            assert_eq!(decode_server(format, &bytes).unwrap(), sample_snapshot());
        }
    }

    #[test]
    fn test_client_intent_in_both_formats() {
        for format in [WireFormat::Json, WireFormat::Bincode] {
            let intent = Intent::move_towards(Direction::Left);
            let bytes = encode_client(format, intent).unwrap();
            assert_eq!(decode_client(format, &bytes).unwrap(), intent);
        }
    }

    #[test]
    fn test_json_intent_envelope_from_foreign_client() {
        let raw = br#"{"v":1,"intent":{"action":"move","direction":[0,1]}}"#;
        let intent = decode_client(WireFormat::Json, raw).unwrap();
        assert_eq!(intent.direction, Some(Vector::new(0, 1)));
    }

    #[test]
    fn test_version_mismatch_is_protocol_error() {
        let raw = br#"{"v":7,"intent":{"action":"restart"}}"#;
        let err = decode_client(WireFormat::Json, raw).unwrap_err();
        assert!(matches!(err, CodecError::UnsupportedVersion(7)));
        assert!(!err.is_transport());
    }

    #[test]
    fn test_garbage_payload_is_protocol_error() {
        for format in [WireFormat::Json, WireFormat::Bincode] {
            let err = decode_client(format, &[0xFF]).unwrap_err();
            assert!(!err.is_transport());
        }
    }

    #[test]
    fn test_wire_format_parsing() {
        assert_eq!("json".parse::<WireFormat>(), Ok(WireFormat::Json));
        assert_eq!("BINCODE".parse::<WireFormat>(), Ok(WireFormat::Bincode));
        assert!("pickle".parse::<WireFormat>().is_err());
        assert_eq!(WireFormat::Bincode.to_string(), "bincode");
    }
}
