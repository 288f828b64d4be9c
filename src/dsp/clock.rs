//! Sample clock shared by every instrument.

/// Monotonic count of frames rendered since startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleClock {
    sample_rate: u32,
    frames: u64,
}

impl SampleClock {
    pub fn new(sample_rate: u32) -> Self {
        SampleClock {
            sample_rate,
            frames: 0,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Frames rendered so far, and the frame index of the next sample.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn seconds(&self) -> f64 {
        self.frames as f64 / f64::from(self.sample_rate)
    }

    pub fn advance(&mut self, frames: usize) {
        self.frames = self.frames.saturating_add(frames as u64);
    }

    /// Seconds to a whole number of frames, never zero for positive input.
    pub fn seconds_to_frames(seconds: f64, sample_rate: u32) -> u64 {
        let frames = (seconds * f64::from(sample_rate)).round();
        if seconds > 0.0 { frames.max(1.0) as u64 } else { 0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advances_monotonically() {
        let mut clock = SampleClock::new(44_100);
        assert_eq!(clock.frames(), 0);
        clock.advance(512);
        clock.advance(0);
        clock.advance(1024);
        assert_eq!(clock.frames(), 1536);
    }

    #[test]
    fn seconds_follow_frames() {
        let mut clock = SampleClock::new(1000);
        clock.advance(2500);
        assert!((clock.seconds() - 2.5).abs() < 1e-12);
    }

    #[test]
    fn seconds_to_frames_rounds() {
        assert_eq!(SampleClock::seconds_to_frames(0.5, 44_100), 22_050);
        assert_eq!(SampleClock::seconds_to_frames(0.00001, 1000), 1);
        assert_eq!(SampleClock::seconds_to_frames(0.0, 1000), 0);
    }
}
