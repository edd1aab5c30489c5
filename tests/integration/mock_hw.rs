//! Mock adapters for integration tests.
//!
//! Records every port call so tests can assert on the full history
//! without a socket or a flash chip.

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

use thermo_monitor::app::events::OtaEvent;
use thermo_monitor::app::ports::{Clock, EventSink, FlashSink, SinkError, Transport, TransportError};

// ── Manual clock ──────────────────────────────────────────────

/// Clock that only moves when told to. Clones share the same time.
#[derive(Clone, Default)]
pub struct ManualClock(Rc<Cell<u64>>);

#[allow(dead_code)]
impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, ms: u64) {
        self.0.set(self.0.get() + ms);
    }
}

impl Clock for ManualClock {
    fn uptime_ms(&self) -> u64 {
        self.0.get()
    }
}

// ── MockTransport ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Deliver these bytes (split further if the buffer is smaller).
    Data(Vec<u8>),
    /// Report a read timeout after advancing the clock by this much.
    Stall(u64),
    /// Fail the read.
    Fail(TransportError),
}

pub struct MockTransport {
    steps: VecDeque<Step>,
    clock: Option<ManualClock>,
    pub sent: Vec<u8>,
    pub reads: usize,
    pub close_calls: usize,
    pub fail_write: bool,
}

#[allow(dead_code)]
impl MockTransport {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: steps.into(),
            clock: None,
            sent: Vec::new(),
            reads: 0,
            close_calls: 0,
            fail_write: false,
        }
    }

    /// Serve `wire` in pieces of `size` bytes, then close.
    pub fn chunked(wire: &[u8], size: usize) -> Self {
        Self::new(wire.chunks(size).map(|c| Step::Data(c.to_vec())).collect())
    }

    pub fn with_clock(mut self, clock: ManualClock) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn request(&self) -> String {
        String::from_utf8_lossy(&self.sent).into_owned()
    }
}

impl Transport for MockTransport {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        self.reads += 1;
        match self.steps.pop_front() {
            Some(Step::Data(mut bytes)) => {
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                if n < bytes.len() {
                    self.steps.push_front(Step::Data(bytes.split_off(n)));
                }
                Ok(n)
            }
            Some(Step::Stall(ms)) => {
                if let Some(clock) = &self.clock {
                    clock.advance(ms);
                }
                Err(TransportError::TimedOut)
            }
            Some(Step::Fail(e)) => Err(e),
            None => Ok(0),
        }
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), TransportError> {
        if self.fail_write {
            return Err(TransportError::Io);
        }
        self.sent.extend_from_slice(data);
        Ok(())
    }

    fn close(&mut self) {
        self.close_calls += 1;
    }
}

// ── MockFlash ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashCall {
    Begin,
    Write(usize),
    Finish,
    Abort,
}

/// Flash sink with switchable failures.
#[derive(Default)]
pub struct MockFlash {
    pub calls: Vec<FlashCall>,
    pub image: Vec<u8>,
    pub committed: bool,
    pub fail_begin: bool,
    /// Fail the write that would take the image past this many bytes.
    pub fail_write_after: Option<usize>,
    pub fail_finish: bool,
}

#[allow(dead_code)]
impl MockFlash {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, call: FlashCall) -> usize {
        self.calls.iter().filter(|c| **c == call).count()
    }

    pub fn aborts(&self) -> usize {
        self.count(FlashCall::Abort)
    }
}

impl FlashSink for MockFlash {
    type Handle = ();

    fn begin(&mut self) -> Result<(), SinkError> {
        self.calls.push(FlashCall::Begin);
        if self.fail_begin {
            return Err(SinkError::NoPartition);
        }
        Ok(())
    }

    fn write(&mut self, _: &mut (), data: &[u8]) -> Result<(), SinkError> {
        self.calls.push(FlashCall::Write(data.len()));
        if let Some(limit) = self.fail_write_after {
            if self.image.len() + data.len() > limit {
                return Err(SinkError::Flash);
            }
        }
        self.image.extend_from_slice(data);
        Ok(())
    }

    fn finish(&mut self, _: ()) -> Result<(), SinkError> {
        self.calls.push(FlashCall::Finish);
        if self.fail_finish {
            return Err(SinkError::Verify);
        }
        self.committed = true;
        Ok(())
    }

    fn abort(&mut self, _: ()) {
        self.calls.push(FlashCall::Abort);
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<OtaEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn progress(&self) -> Vec<(u32, u32)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                OtaEvent::Progress { written, total } => Some((*written, *total)),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &OtaEvent) {
        self.events.push(*event);
    }
}
