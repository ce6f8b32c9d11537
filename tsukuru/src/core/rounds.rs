//! File-request round accounting.

use super::tools::ProtocolViolation;

/// Counts honored file-request rounds against a hard cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundCounter {
    used: u32,
    cap: u32,
}

impl RoundCounter {
    pub fn new(cap: u32) -> Self {
        Self { used: 0, cap }
    }

    pub fn used(&self) -> u32 {
        self.used
    }

    pub fn cap(&self) -> u32 {
        self.cap
    }

    /// True once no further file requests may be honored.
    pub fn exhausted(&self) -> bool {
        self.used >= self.cap
    }

    /// Record one file-request round, failing if the cap is already reached.
    ///
    /// On failure the counter is left unchanged, so `used() <= cap()` always holds.
    pub fn record_request(&mut self) -> Result<(), ProtocolViolation> {
        if self.exhausted() {
            return Err(ProtocolViolation::RoundCapExceeded { cap: self.cap });
        }
        self.used += 1;
        Ok(())
    }
}
