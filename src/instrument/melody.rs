//! CME melody - a step sequencer whose pitches come from a series of
//! coronal mass ejection speeds.

use crate::config::MelodyConfig;
use crate::dsp::clock::SampleClock;
use crate::dsp::envelope::AttackDecay;
use crate::dsp::oscillator::Oscillator;
use crate::snapshot::DataSnapshot;

use super::Instrument;

#[derive(Debug, Clone)]
pub struct MelodyInstrument {
    scale: Vec<f64>,
    sequence: Vec<f64>,
    length: usize,
    speed_min: f64,
    speed_max: f64,
    gain: f64,
    note_frames: u64,
    envelope: AttackDecay,
    oscillator: Oscillator,
    step_index: usize,
    /// Frame at which the next step begins. Latched on the first render.
    step_deadline: Option<u64>,
    samples_since_step_start: u64,
}

impl MelodyInstrument {
    pub fn new(config: &MelodyConfig, sample_rate: u32) -> Self {
        let rate = f64::from(sample_rate);
        let scale = config.scale.clone();
        let calm = scale.first().copied().unwrap_or(0.0);
        let mut oscillator = Oscillator::new(rate);
        oscillator.frequency = calm;

        MelodyInstrument {
            sequence: vec![calm; config.sequence_length.max(1)],
            length: config.sequence_length.max(1),
            scale,
            speed_min: config.speed_min,
            speed_max: config.speed_max,
            gain: config.gain,
            note_frames: SampleClock::seconds_to_frames(config.note_duration, sample_rate).max(1),
            envelope: AttackDecay::new(config.attack, config.note_duration - config.attack, rate),
            oscillator,
            step_index: 0,
            step_deadline: None,
            samples_since_step_start: 0,
        }
    }

    /// Scale index for a speed: normalised into [0, 1] against the configured
    /// bounds, then floored onto the scale.
    pub fn scale_index(&self, speed: f64) -> usize {
        let top = self.scale.len().saturating_sub(1);
        let norm = ((speed - self.speed_min) / (self.speed_max - self.speed_min)).clamp(0.0, 1.0);
        if norm.is_nan() {
            return 0;
        }
        ((norm * top as f64).floor() as usize).min(top)
    }

    pub fn sequence(&self) -> &[f64] {
        &self.sequence
    }

    pub fn scale(&self) -> &[f64] {
        &self.scale
    }

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    pub fn current_frequency(&self) -> f64 {
        self.sequence[self.step_index]
    }

    /// Rewrite the sequence in place, cycling `series` until all L slots are
    /// filled.
    fn set_sequence(&mut self, series: &[f64]) {
        if series.is_empty() {
            let calm = self.scale[0];
            self.sequence.fill(calm);
            return;
        }
        for slot in 0..self.sequence.len() {
            let index = self.scale_index(series[slot % series.len()]);
            self.sequence[slot] = self.scale[index];
        }
    }

    fn advance_step(&mut self, frame: u64) {
        self.step_index = (self.step_index + 1) % self.sequence.len();
        self.samples_since_step_start = 0;
        self.oscillator.frequency = self.sequence[self.step_index];
        self.oscillator.reset();
        let deadline = self.step_deadline.unwrap_or(frame);
        // Resync when the clock jumped past a whole note
        self.step_deadline = Some(if frame >= deadline + self.note_frames {
            frame + self.note_frames
        } else {
            deadline + self.note_frames
        });
    }
}

impl Instrument for MelodyInstrument {
    fn name(&self) -> &'static str {
        "cme-melody"
    }

    fn retarget(&mut self, snapshot: &DataSnapshot) {
        let Some(series) = snapshot.cme_speed_series.as_deref() else {
            return;
        };
        if self.scale.is_empty() {
            return;
        }
        self.set_sequence(series);
        debug_assert_eq!(self.sequence.len(), self.length);
    }

    fn render(&mut self, start_frame: u64, out: &mut [f64]) {
        if self.scale.is_empty() {
            out.fill(0.0);
            return;
        }
        if self.step_deadline.is_none() {
            self.step_deadline = Some(start_frame + self.note_frames);
        }
        // A retarget between cycles retunes the sounding step
        self.oscillator.frequency = self.sequence[self.step_index];

        for (i, sample) in out.iter_mut().enumerate() {
            let frame = start_frame + i as u64;
            if self.step_deadline.is_some_and(|d| frame >= d) {
                self.advance_step(frame);
            }
            let env = self.envelope.level(self.samples_since_step_start);
            *sample = self.oscillator.next_sample() * env * self.gain;
            self.samples_since_step_start += 1;
        }
    }
}
