use serde::{Deserialize, Serialize};

/// Fractional read position into the loaded buffer together with the rate it
/// moves at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransportState {
    position: f64,
    rate: f64,
}

impl Default for TransportState {
    fn default() -> Self {
        Self {
            position: 0.0,
            rate: 1.0,
        }
    }
}

impl TransportState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rate(rate: f64) -> Self {
        Self {
            position: 0.0,
            rate,
        }
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Stores the playback multiplier. Zero pauses, negative values play in
    /// reverse; nothing is clamped.
    pub fn set_rate(&mut self, rate: f64) {
        self.rate = rate;
    }

    /// Moves the read head. Positions outside the buffer are accepted; the
    /// renderer silences such frames and wraps on the next advance.
    pub fn seek(&mut self, position: f64) {
        self.position = position;
    }

    pub fn reset(&mut self) {
        self.position = 0.0;
    }

    /// Advances by one output frame and wraps into `[0, frame_count)`.
    #[inline]
    pub fn advance(&mut self, frame_count: usize) {
        let length = frame_count as f64;
        let next = self.position + self.rate;

        self.position = if !next.is_finite() || next >= length {
            0.0
        } else if next < 0.0 {
            // rem_euclid can round up to `length` for tiny negative inputs
            let wrapped = next.rem_euclid(length);
            if wrapped < length {
                wrapped
            } else {
                0.0
            }
        } else {
            next
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_overrun_wraps_to_start() {
        let mut transport = TransportState::with_rate(1.5);
        transport.seek(3.0);
        transport.advance(4);
        assert_eq!(transport.position(), 0.0);
    }

    #[test]
    fn reverse_wraps_from_the_end() {
        let mut transport = TransportState::with_rate(-1.0);
        transport.advance(4);
        assert_eq!(transport.position(), 3.0);
        transport.advance(4);
        assert_eq!(transport.position(), 2.0);
    }

    #[test]
    fn zero_rate_holds_position() {
        let mut transport = TransportState::with_rate(0.0);
        transport.seek(1.25);
        for _ in 0..16 {
            transport.advance(4);
        }
        assert_eq!(transport.position(), 1.25);
    }

    #[test]
    fn non_finite_rate_restarts_loop() {
        let mut transport = TransportState::with_rate(f64::NAN);
        transport.seek(2.0);
        transport.advance(4);
        assert_eq!(transport.position(), 0.0);
    }

    #[test]
    fn reset_keeps_rate() {
        let mut transport = TransportState::with_rate(0.5);
        transport.advance(8);
        transport.reset();
        assert_eq!(transport.position(), 0.0);
        assert_eq!(transport.rate(), 0.5);
    }
}
