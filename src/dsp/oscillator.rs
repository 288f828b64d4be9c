//! Sine sources: a free-running oscillator, clock-locked phase, and
//! harmonic partial sets.

use std::f64::consts::TAU;

/// A sine oscillator with its own phase accumulator.
#[derive(Debug, Clone)]
pub struct Oscillator {
    pub frequency: f64,
    phase: f64,
    sample_rate: f64,
}

impl Oscillator {
    pub fn new(sample_rate: f64) -> Self {
        Oscillator {
            frequency: 440.0,
            phase: 0.0,
            sample_rate,
        }
    }

    /// Phase increment per sample.
    fn phase_inc(&self) -> f64 {
        self.frequency / self.sample_rate
    }

    /// Generate the next sample.
    #[inline]
    pub fn next_sample(&mut self) -> f64 {
        let sample = sine(self.phase);
        self.phase += self.phase_inc();
        if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
        }
        sample
    }

    /// Restart from phase zero.
    pub fn reset(&mut self) {
        self.phase = 0.0;
    }
}

/// Sine of a phase measured in cycles.
#[inline]
pub fn sine(phase: f64) -> f64 {
    (TAU * phase).sin()
}

/// Phase in cycles, within [0, 1), of a sine at `frequency` that started at
/// frame zero of the shared clock.
///
/// Whole seconds and the remainder are handled separately so precision holds
/// over days of rendering.
#[inline]
pub fn clock_phase(frequency: f64, frame: u64, sample_rate: u32) -> f64 {
    let rate = u64::from(sample_rate.max(1));
    let whole_seconds = (frame / rate) as f64;
    let remainder = (frame % rate) as f64 / rate as f64;
    ((whole_seconds * frequency).fract() + remainder * frequency).fract()
}

/// One component of a [`Partials`] stack.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Partial {
    pub ratio: f64,
    pub amplitude: f64,
}

/// A stack of harmonically related sines over a base frequency.
#[derive(Debug, Clone)]
pub struct Partials {
    pub base_frequency: f64,
    partials: Vec<Partial>,
}

impl Partials {
    pub fn new(base_frequency: f64, partials: Vec<Partial>) -> Self {
        Partials {
            base_frequency,
            partials,
        }
    }

    /// Sum of all partials `seconds` after their common start.
    #[inline]
    pub fn sample_at(&self, seconds: f64) -> f64 {
        self.partials
            .iter()
            .map(|p| p.amplitude * sine((self.base_frequency * p.ratio * seconds).fract()))
            .sum()
    }

    /// Upper bound on the absolute value of [`Partials::sample_at`].
    pub fn peak(&self) -> f64 {
        self.partials.iter().map(|p| p.amplitude.abs()).sum()
    }
}
