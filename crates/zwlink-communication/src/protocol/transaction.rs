//! Transaction engine
//!
//! Runs one request/reply exchange at a time over a [`ByteSource`]:
//!
//! ```text
//! Idle -> Sending -> AwaitingHandshake -> Acked    -> [AwaitingReply] -> Done
//!                          |          \-> Retrying -> Sending
//!                          \------------> Failed (retries exhausted)
//! ```
//!
//! The wire format carries no transaction id, so the first frame received
//! after a successful handshake is taken as the reply. Only one transaction
//! may be outstanding; every operation takes `&mut self`, which rules out
//! concurrent or pipelined use of a session.

use crate::protocol::frame::{read_frame_counted, Frame, InboundFrame};
use crate::ByteSource;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use zwlink_core::constants::ACK;
use zwlink_core::{Error, LinkError, Result};

/// Result of one transmission attempt or one received frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionOutcome {
    /// The peer answered with ACK
    Acknowledged,
    /// Nothing came back within the handshake timeout
    TimedOut,
    /// NAK, CAN or an unexpected byte came back instead of ACK
    Rejected(u8),
    /// A frame arrived with a bad checksum
    Malformed,
}

/// Timing and retry parameters of a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Maximum gap between bytes inside a frame
    pub byte_timeout: Duration,
    /// Wait for the ACK/NAK/CAN after writing a frame
    pub handshake_timeout: Duration,
    /// Wait for the reply frame after a successful handshake
    pub reply_timeout: Duration,
    /// Pause before each transaction and after a rejected attempt
    pub settle_delay: Duration,
    /// Retransmissions after the first attempt
    pub max_retries: u32,
    /// ACK bytes sent to recover from a lost handshake
    pub ack_probes: u32,
    /// How often `listen` checks its stop flag
    pub listen_poll: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            byte_timeout: Duration::from_millis(100),
            handshake_timeout: Duration::from_millis(500),
            reply_timeout: Duration::from_millis(5000),
            settle_delay: Duration::from_millis(100),
            max_retries: 3,
            ack_probes: 32,
            listen_poll: Duration::from_millis(250),
        }
    }
}

/// Counters kept for the lifetime of a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    /// Frames written, retries included
    pub transmissions: u64,
    /// Attempts answered with ACK
    pub acknowledged: u64,
    /// Attempts that got no handshake byte
    pub timeouts: u64,
    /// Attempts answered with NAK, CAN or garbage
    pub rejections: u64,
    /// Frames received with a bad checksum
    pub malformed: u64,
    /// Stray bytes skipped while looking for a SOF
    pub desync_bytes: u64,
    /// Frames received
    pub frames_received: u64,
}

impl LinkStats {
    /// Count one outcome
    pub fn record(&mut self, outcome: TransactionOutcome) {
        match outcome {
            TransactionOutcome::Acknowledged => self.acknowledged += 1,
            TransactionOutcome::TimedOut => self.timeouts += 1,
            TransactionOutcome::Rejected(_) => self.rejections += 1,
            TransactionOutcome::Malformed => self.malformed += 1,
        }
    }
}

/// A link session owning its byte source.
///
/// The source is released when the session is dropped.
pub struct LinkSession<S: ByteSource> {
    source: S,
    config: SessionConfig,
    stats: LinkStats,
}

impl<S: ByteSource> LinkSession<S> {
    /// Create a session over `source`
    pub fn new(source: S, config: SessionConfig) -> Self {
        Self {
            source,
            config,
            stats: LinkStats::default(),
        }
    }

    /// Session configuration
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Counters accumulated since creation or the last reset
    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    /// Zero all counters
    pub fn reset_stats(&mut self) {
        self.stats = LinkStats::default();
    }

    /// Give back the byte source
    pub fn into_inner(self) -> S {
        self.source
    }

    /// Send a request and wait for its reply payload
    pub fn request(&mut self, payload: &[u8]) -> Result<Vec<u8>> {
        self.execute(payload, true)?
            .ok_or_else(|| Error::other("transaction completed without a reply"))
    }

    /// Send a request that has no reply
    pub fn send(&mut self, payload: &[u8]) -> Result<()> {
        self.execute(payload, false).map(|_| ())
    }

    /// Run one transaction.
    ///
    /// The frame is written at most `max_retries + 1` times. Handshake
    /// timeouts and rejections are retried here; a missing reply after a
    /// successful handshake is not, and surfaces as [`LinkError::NoReply`].
    pub fn execute(&mut self, payload: &[u8], expect_reply: bool) -> Result<Option<Vec<u8>>> {
        let wire = Frame::request(payload)?.encode();
        tracing::trace!("Sending frame {:02X?}", wire);

        self.settle();
        self.flush_stray()?;

        let attempts = self.config.max_retries.saturating_add(1);
        let mut acknowledged = false;
        for attempt in 1..=attempts {
            self.source.write(&wire)?;
            self.stats.transmissions += 1;

            let outcome = self.await_handshake()?;
            self.stats.record(outcome);
            match outcome {
                TransactionOutcome::Acknowledged => {
                    if attempt > 1 {
                        tracing::debug!("Took {} tries", attempt);
                    }
                    acknowledged = true;
                    break;
                }
                TransactionOutcome::TimedOut => {
                    tracing::debug!("No ACK on try #{}", attempt);
                    self.probe_with_acks()?;
                }
                rejected => {
                    tracing::debug!("Not ACKed on try #{}: {:?}", attempt, rejected);
                    self.source.write(&[ACK])?;
                    self.settle();
                    self.drain_input()?;
                }
            }
        }

        if !acknowledged {
            tracing::warn!("Frame not acknowledged after {} tries", attempts);
            return Err(LinkError::NoAcknowledgement { attempts }.into());
        }

        if !expect_reply {
            return Ok(None);
        }

        let reply_timeout = self.config.reply_timeout;
        match self.receive(reply_timeout) {
            Ok(frame) => Ok(Some(frame.payload)),
            Err(Error::Link(LinkError::Timeout { .. }))
            | Err(Error::Link(LinkError::FrameTooShort { .. })) => {
                tracing::debug!("No reply within {}ms", reply_timeout.as_millis());
                Err(LinkError::NoReply {
                    timeout_ms: reply_timeout.as_millis() as u64,
                }
                .into())
            }
            Err(e) => Err(e),
        }
    }

    /// Receive the next inbound frame, waiting at most `timeout` for its SOF
    pub fn receive(&mut self, timeout: Duration) -> Result<InboundFrame> {
        let mut discarded = 0;
        let result =
            read_frame_counted(&mut self.source, self.config.byte_timeout, timeout, &mut discarded);
        self.stats.desync_bytes += discarded as u64;
        let frame = result?;
        self.stats.frames_received += 1;
        if !frame.checksum_valid {
            self.stats.record(TransactionOutcome::Malformed);
        }
        Ok(frame)
    }

    /// Deliver inbound frames to `on_frame` until `stop` is set.
    ///
    /// Waits in slices of `listen_poll` so the flag is checked regularly.
    /// Returns the number of frames delivered.
    pub fn listen<F>(&mut self, stop: &AtomicBool, mut on_frame: F) -> Result<usize>
    where
        F: FnMut(&InboundFrame),
    {
        let mut delivered = 0;
        while !stop.load(Ordering::Relaxed) {
            match self.receive(self.config.listen_poll) {
                Ok(frame) => {
                    on_frame(&frame);
                    delivered += 1;
                }
                Err(Error::Link(LinkError::Timeout { .. }))
                | Err(Error::Link(LinkError::FrameTooShort { .. })) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(delivered)
    }

    fn await_handshake(&mut self) -> Result<TransactionOutcome> {
        Ok(match self.source.read_byte(self.config.handshake_timeout)? {
            Some(ACK) => TransactionOutcome::Acknowledged,
            Some(other) => TransactionOutcome::Rejected(other),
            None => TransactionOutcome::TimedOut,
        })
    }

    /// The peer may have taken a corrupted LEN for a longer frame and still
    /// be waiting for bytes. Feed it ACKs until it answers.
    fn probe_with_acks(&mut self) -> Result<()> {
        for _ in 0..self.config.ack_probes {
            self.source.write(&[ACK])?;
            if self.source.bytes_pending()? > 0 {
                break;
            }
        }
        Ok(())
    }

    /// ACK whatever the peer was in the middle of sending, then throw it away.
    fn flush_stray(&mut self) -> Result<()> {
        if self.source.bytes_pending()? > 0 {
            self.source.write(&[ACK])?;
            self.drain_input()?;
        }
        Ok(())
    }

    fn drain_input(&mut self) -> Result<()> {
        let mut dumped = Vec::new();
        while self.source.bytes_pending()? > 0 {
            match self.source.read_byte(self.config.byte_timeout)? {
                Some(b) => dumped.push(b),
                None => break,
            }
        }
        if !dumped.is_empty() {
            tracing::debug!("Dumping {:02X?}", dumped);
        }
        self.source.purge_input()
    }

    fn settle(&self) {
        if !self.config.settle_delay.is_zero() {
            thread::sleep(self.config.settle_delay);
        }
    }
}
