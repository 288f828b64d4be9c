//! Flare accent - a one-shot gong triggered by each new solar flare.
//!
//! State machine: Idle -> Sounding -> Idle. A retarget with a new event id
//! arms the gong; its onset is latched at the first frame rendered after
//! that, so the whole decay is sample accurate.

use crate::config::AccentConfig;
use crate::dsp::clock::SampleClock;
use crate::dsp::envelope::ExpDecay;
use crate::dsp::oscillator::{Partial, Partials};
use crate::snapshot::{DataSnapshot, FlareEvent};

use super::Instrument;

/// Ids longer than this still work but reallocate on the audio thread.
const EVENT_ID_CAPACITY: usize = 64;

/// Intensity tier derived from a GOES class label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlareTier {
    /// X class and above.
    High,
    /// M class.
    Mid,
    Low,
}

impl FlareTier {
    /// Classify by the leading letter of the label, e.g. `"X1.0"`.
    pub fn classify(class_type: &str) -> Self {
        match class_type.trim_start().chars().next().map(|c| c.to_ascii_uppercase()) {
            Some(c) if ('X'..='Z').contains(&c) => FlareTier::High,
            Some('M') => FlareTier::Mid,
            _ => FlareTier::Low,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum AccentState {
    Idle,
    /// `onset` is `None` until the first render after the trigger.
    Sounding { onset: Option<u64> },
}

#[derive(Debug, Clone)]
pub struct AccentInstrument {
    gong: Partials,
    envelope: ExpDecay,
    duration_frames: u64,
    sample_rate: f64,
    high_intensity: f64,
    mid_intensity: f64,
    low_intensity: f64,
    state: AccentState,
    intensity: f64,
    last_seen_event_id: Option<String>,
}

impl AccentInstrument {
    pub fn new(config: &AccentConfig, sample_rate: u32) -> Self {
        let rate = f64::from(sample_rate);
        let partials = config
            .partials
            .iter()
            .map(|p| Partial {
                ratio: p.ratio,
                amplitude: p.amplitude,
            })
            .collect();

        AccentInstrument {
            gong: Partials::new(config.base_freq, partials),
            envelope: ExpDecay::new(config.duration / 4.0, rate),
            duration_frames: SampleClock::seconds_to_frames(config.duration, sample_rate),
            sample_rate: rate,
            high_intensity: config.high_intensity,
            mid_intensity: config.mid_intensity,
            low_intensity: config.low_intensity,
            state: AccentState::Idle,
            intensity: 0.0,
            last_seen_event_id: None,
        }
    }

    pub fn is_sounding(&self) -> bool {
        matches!(self.state, AccentState::Sounding { .. })
    }

    /// Frame the current gong started at, once latched.
    pub fn onset_frame(&self) -> Option<u64> {
        match self.state {
            AccentState::Sounding { onset } => onset,
            AccentState::Idle => None,
        }
    }

    pub fn intensity(&self) -> f64 {
        self.intensity
    }

    pub fn last_seen_event_id(&self) -> Option<&str> {
        self.last_seen_event_id.as_deref()
    }

    pub fn duration_frames(&self) -> u64 {
        self.duration_frames
    }

    fn tier_intensity(&self, tier: FlareTier) -> f64 {
        match tier {
            FlareTier::High => self.high_intensity,
            FlareTier::Mid => self.mid_intensity,
            FlareTier::Low => self.low_intensity,
        }
    }

    fn trigger(&mut self, flare: &FlareEvent) {
        // Reuse the id buffer so a retarget on the audio thread stays
        // allocation free
        let id = self
            .last_seen_event_id
            .get_or_insert_with(|| String::with_capacity(EVENT_ID_CAPACITY));
        id.clear();
        id.push_str(&flare.id);

        self.intensity = self.tier_intensity(FlareTier::classify(&flare.class_type));
        self.state = AccentState::Sounding { onset: None };
    }
}

impl Instrument for AccentInstrument {
    fn name(&self) -> &'static str {
        "flare-accent"
    }

    fn retarget(&mut self, snapshot: &DataSnapshot) {
        let Some(flare) = snapshot.latest_flare.as_ref() else {
            return;
        };
        if self.last_seen_event_id.as_deref() != Some(flare.id.as_str()) {
            self.trigger(flare);
        }
    }

    fn render(&mut self, start_frame: u64, out: &mut [f64]) {
        let AccentState::Sounding { onset } = self.state else {
            out.fill(0.0);
            return;
        };
        let onset = onset.unwrap_or(start_frame);
        self.state = AccentState::Sounding { onset: Some(onset) };

        for i in 0..out.len() {
            let elapsed = (start_frame + i as u64).saturating_sub(onset);
            if elapsed > self.duration_frames {
                self.state = AccentState::Idle;
                out[i..].fill(0.0);
                return;
            }
            let seconds = elapsed as f64 / self.sample_rate;
            out[i] = self.gong.sample_at(seconds) * self.envelope.level(elapsed) * self.intensity;
        }
    }
}
