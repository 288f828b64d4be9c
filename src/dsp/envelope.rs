//! Envelopes evaluated from a sample counter.
//!
//! Both shapes are pure functions of "samples since onset", so a note can be
//! restarted at any sample inside a buffer by resetting the counter.

/// Envelope stages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stage {
    Attack,
    Decay,
}

/// Linear 0 to 1 ramp over the attack window, then exponential decay
/// starting from 1 at the end of the attack.
#[derive(Debug, Clone)]
pub struct AttackDecay {
    attack_samples: u64,
    /// Decay time constant in samples.
    decay_tau: f64,
}

impl AttackDecay {
    /// `attack` and `decay_tau` are in seconds.
    pub fn new(attack: f64, decay_tau: f64, sample_rate: f64) -> Self {
        AttackDecay {
            attack_samples: (attack * sample_rate).round() as u64,
            decay_tau: (decay_tau * sample_rate).max(f64::MIN_POSITIVE),
        }
    }

    pub fn attack_samples(&self) -> u64 {
        self.attack_samples
    }

    pub fn stage(&self, n: u64) -> Stage {
        if n < self.attack_samples {
            Stage::Attack
        } else {
            Stage::Decay
        }
    }

    /// Level [0, 1] at `n` samples after onset.
    #[inline]
    pub fn level(&self, n: u64) -> f64 {
        match self.stage(n) {
            Stage::Attack => n as f64 / self.attack_samples as f64,
            Stage::Decay => (-((n - self.attack_samples) as f64) / self.decay_tau).exp(),
        }
    }
}

/// Pure exponential decay from 1.
#[derive(Debug, Clone)]
pub struct ExpDecay {
    /// Time constant in samples.
    tau: f64,
}

impl ExpDecay {
    pub fn new(tau: f64, sample_rate: f64) -> Self {
        ExpDecay {
            tau: (tau * sample_rate).max(f64::MIN_POSITIVE),
        }
    }

    #[inline]
    pub fn level(&self, n: u64) -> f64 {
        (-(n as f64) / self.tau).exp()
    }
}
