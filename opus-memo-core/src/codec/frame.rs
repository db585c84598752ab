use std::fmt;
use std::sync::Arc;

use crate::models::error::AudioError;

/// Bytes of the little-endian payload length that precedes every packet.
pub const FRAME_HEADER_LEN: usize = 2;

/// One compressed frame: the encoder output for exactly one raw block.
///
/// Layout:
/// ```text
/// [2-byte LE payload length] [Opus packet]
/// ```
///
/// The length prefix lets the decoder tell a truncated frame from a short
/// packet. The layout is internal and never persisted. Cloning is cheap;
/// the bytes are shared.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CompressedFrame {
    bytes: Arc<[u8]>,
}

impl CompressedFrame {
    /// Wrap a codec packet.
    pub fn from_packet(packet: &[u8]) -> Result<Self, AudioError> {
        let len = u16::try_from(packet.len()).map_err(|_| {
            AudioError::CodecFailed(format!("packet too large: {} bytes", packet.len()))
        })?;
        let mut bytes = Vec::with_capacity(FRAME_HEADER_LEN + packet.len());
        bytes.extend_from_slice(&len.to_le_bytes());
        bytes.extend_from_slice(packet);
        Ok(Self { bytes: bytes.into() })
    }

    /// Take raw frame bytes as-is. Validation happens at decode time.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes: bytes.into() }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The codec packet, after checking the length prefix.
    pub fn packet(&self) -> Result<&[u8], AudioError> {
        if self.bytes.len() < FRAME_HEADER_LEN {
            return Err(AudioError::CorruptFrame(format!(
                "frame shorter than header: {} bytes",
                self.bytes.len()
            )));
        }
        let declared = u16::from_le_bytes([self.bytes[0], self.bytes[1]]) as usize;
        let payload = &self.bytes[FRAME_HEADER_LEN..];
        if payload.len() != declared {
            return Err(AudioError::CorruptFrame(format!(
                "payload is {} bytes, header declares {}",
                payload.len(),
                declared
            )));
        }
        if payload.is_empty() {
            return Err(AudioError::CorruptFrame("empty packet".into()));
        }
        Ok(payload)
    }
}

impl fmt::Debug for CompressedFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompressedFrame")
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packet_round_trip() {
        let frame = CompressedFrame::from_packet(&[0xAB, 0xCD, 0xEF]).unwrap();
        assert_eq!(frame.len(), 5);
        assert_eq!(&frame.as_bytes()[..2], &[3, 0]);
        assert_eq!(frame.packet().unwrap(), &[0xAB, 0xCD, 0xEF]);
    }

    #[test]
    fn truncated_frame_is_corrupt() {
        let frame = CompressedFrame::from_packet(&[1, 2, 3, 4]).unwrap();
        let truncated = CompressedFrame::from_bytes(frame.as_bytes()[..4].to_vec());
        assert!(matches!(truncated.packet(), Err(AudioError::CorruptFrame(_))));
    }

    #[test]
    fn header_only_and_empty_frames_are_corrupt() {
        assert!(CompressedFrame::from_bytes(vec![]).packet().is_err());
        assert!(CompressedFrame::from_bytes(vec![7]).packet().is_err());
        assert!(CompressedFrame::from_bytes(vec![0, 0]).packet().is_err());
    }

    #[test]
    fn oversized_packet_is_rejected() {
        let packet = vec![0u8; u16::MAX as usize + 1];
        assert!(matches!(
            CompressedFrame::from_packet(&packet),
            Err(AudioError::CodecFailed(_))
        ));
    }

    #[test]
    fn clones_share_bytes() {
        let frame = CompressedFrame::from_packet(&[9; 16]).unwrap();
        let copy = frame.clone();
        assert_eq!(frame, copy);
        assert_eq!(frame.as_bytes().as_ptr(), copy.as_bytes().as_ptr());
    }
}
