//! Frame encoding/decoding.
//!
//! Every unit on the link is a checksummed, length-prefixed frame:
//!
//! ```text
//! +-----+-----+------+-------------------+----------+
//! | SOF | LEN | KIND | payload[0..LEN-2] | CHECKSUM |
//! +-----+-----+------+-------------------+----------+
//! ```
//!
//! LEN counts KIND, the payload and CHECKSUM. CHECKSUM is the XOR fold of
//! LEN, KIND and the payload seeded with 0xFF.

use crate::protocol::checksum;
use crate::ByteSource;
use std::time::{Duration, Instant};
use zwlink_core::constants::{ACK, MAX_PAYLOAD_LEN, REQUEST, RESPONSE, SOF};
use zwlink_core::{LinkError, Result};

/// Direction marker carried in the KIND byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Host to device (0x00), or an unsolicited callback from the device
    Request,
    /// Reply to a request (0x01)
    Response,
    /// Any other KIND byte, kept as received
    Other(u8),
}

impl FrameKind {
    /// The KIND byte on the wire
    pub fn as_byte(self) -> u8 {
        match self {
            Self::Request => REQUEST,
            Self::Response => RESPONSE,
            Self::Other(b) => b,
        }
    }
}

impl From<u8> for FrameKind {
    fn from(byte: u8) -> Self {
        match byte {
            REQUEST => Self::Request,
            RESPONSE => Self::Response,
            b => Self::Other(b),
        }
    }
}

/// An outbound frame, built fresh for each transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    kind: FrameKind,
    payload: Vec<u8>,
}

impl Frame {
    /// Create a frame, rejecting payloads that overflow the LEN byte
    pub fn new(kind: FrameKind, payload: impl Into<Vec<u8>>) -> Result<Self> {
        let payload = payload.into();
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(LinkError::PayloadTooLarge {
                len: payload.len(),
                max: MAX_PAYLOAD_LEN,
            }
            .into());
        }
        Ok(Self { kind, payload })
    }

    /// Create a request frame
    pub fn request(payload: impl Into<Vec<u8>>) -> Result<Self> {
        Self::new(FrameKind::Request, payload)
    }

    /// Frame kind
    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    /// Command payload
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Value of the LEN byte: payload plus KIND and CHECKSUM
    pub fn len_byte(&self) -> u8 {
        (self.payload.len() + 2) as u8
    }

    /// Checksum over LEN, KIND and the payload
    pub fn checksum(&self) -> u8 {
        let head = checksum(&[self.len_byte(), self.kind.as_byte()]);
        self.payload.iter().fold(head, |acc, b| acc ^ b)
    }

    /// Serialize to wire bytes, SOF included
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.payload.len() + 4);
        buf.push(SOF);
        buf.push(self.len_byte());
        buf.push(self.kind.as_byte());
        buf.extend_from_slice(&self.payload);
        buf.push(self.checksum());
        buf
    }
}

/// Encode `payload` as a frame of the given kind
pub fn encode_frame(kind: FrameKind, payload: &[u8]) -> Result<Vec<u8>> {
    Frame::new(kind, payload).map(|frame| frame.encode())
}

/// A frame received from the link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundFrame {
    /// KIND byte of the frame
    pub kind: FrameKind,
    /// Payload with KIND and CHECKSUM stripped
    pub payload: Vec<u8>,
    /// Whether the checksum verified. Mismatched frames are still delivered.
    pub checksum_valid: bool,
    /// Stray bytes skipped before the SOF
    pub discarded: usize,
}

/// Receive one frame from `source`.
///
/// Bytes ahead of the SOF are discarded and counted. The SOF must arrive
/// within `sof_timeout`; after that every byte must arrive within
/// `byte_timeout`. A completely received frame is always ACKed, even when
/// its checksum fails, because the protocol offers no way to ask for a
/// retransmission of an inbound frame.
pub fn read_frame<S: ByteSource + ?Sized>(
    source: &mut S,
    byte_timeout: Duration,
    sof_timeout: Duration,
) -> Result<InboundFrame> {
    let mut discarded = 0;
    read_frame_counted(source, byte_timeout, sof_timeout, &mut discarded)
}

/// [`read_frame`], adding every skipped pre-SOF byte to `discarded` as it
/// is seen, so the count survives a failed decode.
pub(crate) fn read_frame_counted<S: ByteSource + ?Sized>(
    source: &mut S,
    byte_timeout: Duration,
    sof_timeout: Duration,
    discarded: &mut usize,
) -> Result<InboundFrame> {
    let deadline = Instant::now() + sof_timeout;
    let skipped_before = *discarded;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(timeout(sof_timeout));
        }
        match source.read_byte(remaining)? {
            Some(SOF) => break,
            Some(stray) => {
                *discarded += 1;
                tracing::debug!("Link not in sync, discarding {:02X}", stray);
            }
            None => {
                tracing::debug!("No frame within {}ms", sof_timeout.as_millis());
                return Err(timeout(sof_timeout));
            }
        }
    }

    let len = next_byte(source, byte_timeout)?;
    let mut body = Vec::with_capacity(len as usize);
    for _ in 0..len {
        body.push(next_byte(source, byte_timeout)?);
    }

    let fold = body.iter().fold(checksum(&[len]), |acc, b| acc ^ b);
    let checksum_valid = fold == 0;
    if !checksum_valid {
        tracing::warn!("Inbound frame checksum failed {:02X}", fold);
    }

    source.write(&[ACK])?;

    if len < 2 {
        return Err(LinkError::FrameTooShort { len }.into());
    }

    let kind = FrameKind::from(body[0]);
    let payload = body[1..body.len() - 1].to_vec();
    tracing::trace!("Received {:?} frame {:02X?}", kind, payload);

    Ok(InboundFrame {
        kind,
        payload,
        checksum_valid,
        discarded: *discarded - skipped_before,
    })
}

fn next_byte<S: ByteSource + ?Sized>(source: &mut S, byte_timeout: Duration) -> Result<u8> {
    source.read_byte(byte_timeout)?.ok_or_else(|| {
        tracing::debug!("Frame truncated, no byte within {}ms", byte_timeout.as_millis());
        timeout(byte_timeout)
    })
}

fn timeout(duration: Duration) -> zwlink_core::Error {
    LinkError::Timeout {
        timeout_ms: duration.as_millis() as u64,
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Source that replays a fixed byte sequence and records writes
    struct ReplaySource {
        rx: VecDeque<u8>,
        written: Vec<u8>,
    }

    impl ReplaySource {
        fn new(bytes: &[u8]) -> Self {
            Self {
                rx: bytes.iter().copied().collect(),
                written: Vec::new(),
            }
        }
    }

    impl ByteSource for ReplaySource {
        fn read_byte(&mut self, _timeout: Duration) -> Result<Option<u8>> {
            Ok(self.rx.pop_front())
        }

        fn write(&mut self, data: &[u8]) -> Result<()> {
            self.written.extend_from_slice(data);
            Ok(())
        }

        fn bytes_pending(&mut self) -> Result<usize> {
            Ok(self.rx.len())
        }

        fn purge_input(&mut self) -> Result<()> {
            self.rx.clear();
            Ok(())
        }
    }

    const BYTE: Duration = Duration::from_millis(100);
    const SOF_WAIT: Duration = Duration::from_millis(5000);

    #[test]
    fn test_encode_layout() {
        let encoded = encode_frame(FrameKind::Request, &[0x02]).unwrap();
        assert_eq!(encoded, vec![0x01, 0x03, 0x00, 0x02, 0xFE]);
    }

    #[test]
    fn test_encode_empty_payload() {
        let encoded = encode_frame(FrameKind::Response, &[]).unwrap();
        assert_eq!(encoded, vec![0x01, 0x02, 0x01, 0xFF ^ 0x02 ^ 0x01]);
    }

    #[test]
    fn test_encode_rejects_oversize_payload() {
        assert!(encode_frame(FrameKind::Request, &[0u8; 253]).is_ok());
        let err = encode_frame(FrameKind::Request, &[0u8; 254]).unwrap_err();
        assert!(matches!(
            err,
            zwlink_core::Error::Link(LinkError::PayloadTooLarge { len: 254, max: 253 })
        ));
    }

    #[test]
    fn test_frame_checksum_matches_fold() {
        let frame = Frame::request(vec![0x13, 0x05, 0x01, 0x00, 0x25]).unwrap();
        let wire = frame.encode();
        assert_eq!(checksum(&wire[1..]), 0);
    }

    #[test]
    fn test_read_frame_acks_and_strips() {
        let wire = encode_frame(FrameKind::Response, &[0x15, 0x5A, 0x2D]).unwrap();
        let mut source = ReplaySource::new(&wire);

        let frame = read_frame(&mut source, BYTE, SOF_WAIT).unwrap();
        assert_eq!(frame.kind, FrameKind::Response);
        assert_eq!(frame.payload, vec![0x15, 0x5A, 0x2D]);
        assert!(frame.checksum_valid);
        assert_eq!(frame.discarded, 0);
        assert_eq!(source.written, vec![ACK]);
    }

    #[test]
    fn test_read_frame_skips_stray_bytes() {
        let mut bytes = vec![0x06, 0xAA, 0x15];
        bytes.extend(encode_frame(FrameKind::Response, &[0x3B, 0xA6]).unwrap());
        let mut source = ReplaySource::new(&bytes);

        let frame = read_frame(&mut source, BYTE, SOF_WAIT).unwrap();
        assert_eq!(frame.payload, vec![0x3B, 0xA6]);
        assert_eq!(frame.discarded, 3);
    }

    #[test]
    fn test_read_frame_bad_checksum_still_delivered_and_acked() {
        let mut wire = encode_frame(FrameKind::Response, &[0x07, 0x01]).unwrap();
        let last = wire.len() - 1;
        wire[last] ^= 0x55;
        let mut source = ReplaySource::new(&wire);

        let frame = read_frame(&mut source, BYTE, SOF_WAIT).unwrap();
        assert!(!frame.checksum_valid);
        assert_eq!(frame.payload, vec![0x07, 0x01]);
        assert_eq!(source.written, vec![ACK]);
    }

    #[test]
    fn test_read_frame_no_sof_times_out() {
        let mut source = ReplaySource::new(&[]);
        let err = read_frame(&mut source, BYTE, SOF_WAIT).unwrap_err();
        assert!(matches!(
            err,
            zwlink_core::Error::Link(LinkError::Timeout { timeout_ms: 5000 })
        ));
        assert!(source.written.is_empty());
    }

    #[test]
    fn test_stray_bytes_counted_when_no_sof_follows() {
        let mut source = ReplaySource::new(&[0x42, 0x00, 0x15]);
        let mut discarded = 0;
        let err = read_frame_counted(&mut source, BYTE, SOF_WAIT, &mut discarded).unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(discarded, 3);
    }

    #[test]
    fn test_read_frame_truncated_times_out_without_ack() {
        let wire = encode_frame(FrameKind::Response, &[0x02, 0x05, 0x08]).unwrap();
        let mut source = ReplaySource::new(&wire[..4]);
        let err = read_frame(&mut source, BYTE, SOF_WAIT).unwrap_err();
        assert!(matches!(
            err,
            zwlink_core::Error::Link(LinkError::Timeout { timeout_ms: 100 })
        ));
        assert!(source.written.is_empty());
    }

    #[test]
    fn test_read_frame_too_short() {
        let mut source = ReplaySource::new(&[SOF, 0x01, 0xFE]);
        let err = read_frame(&mut source, BYTE, SOF_WAIT).unwrap_err();
        assert!(matches!(
            err,
            zwlink_core::Error::Link(LinkError::FrameTooShort { len: 1 })
        ));
        assert_eq!(source.written, vec![ACK]);
    }

    #[test]
    fn test_unknown_kind_preserved() {
        let wire = encode_frame(FrameKind::Other(0x42), &[0x01]).unwrap();
        let mut source = ReplaySource::new(&wire);
        let frame = read_frame(&mut source, BYTE, SOF_WAIT).unwrap();
        assert_eq!(frame.kind, FrameKind::Other(0x42));
        assert_eq!(FrameKind::from(0x42).as_byte(), 0x42);
    }
}
