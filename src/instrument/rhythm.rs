//! Pulsar rhythm - a fixed-period click train that ignores control data.

use crate::config::RhythmConfig;
use crate::dsp::envelope::ExpDecay;
use crate::dsp::oscillator::Oscillator;
use crate::snapshot::DataSnapshot;

use super::Instrument;

#[derive(Debug, Clone)]
pub struct RhythmInstrument {
    /// Period in frames. Fractional so long runs do not drift.
    period: f64,
    click: Vec<f64>,
    next_tick_deadline: Option<f64>,
    ticks_fired: u64,
}

impl RhythmInstrument {
    pub fn new(config: &RhythmConfig, sample_rate: u32) -> Self {
        let rate = f64::from(sample_rate);
        RhythmInstrument {
            period: (config.period * rate).max(1.0),
            click: click_waveform(config, rate),
            next_tick_deadline: None,
            ticks_fired: 0,
        }
    }

    pub fn click_waveform(&self) -> &[f64] {
        &self.click
    }

    /// Clicks started since construction.
    pub fn ticks_fired(&self) -> u64 {
        self.ticks_fired
    }

    pub fn next_tick_deadline(&self) -> Option<f64> {
        self.next_tick_deadline
    }
}

/// Decaying sinusoid lasting `click_decay_count` time constants.
fn click_waveform(config: &RhythmConfig, sample_rate: f64) -> Vec<f64> {
    let len = (config.click_decay * config.click_decay_count * sample_rate) as usize;
    let envelope = ExpDecay::new(config.click_decay, sample_rate);
    let mut osc = Oscillator::new(sample_rate);
    osc.frequency = config.click_freq;
    (0..len as u64)
        .map(|n| osc.next_sample() * envelope.level(n) * config.gain)
        .collect()
}

impl Instrument for RhythmInstrument {
    fn name(&self) -> &'static str {
        "pulsar-rhythm"
    }

    fn retarget(&mut self, _snapshot: &DataSnapshot) {}

    fn render(&mut self, start_frame: u64, out: &mut [f64]) {
        out.fill(0.0);
        let len = out.len();
        let start = start_frame as f64;
        let end = start + len as f64;

        let mut deadline = self.next_tick_deadline.unwrap_or(start);
        // Overdue by more than two periods: restart from now instead of
        // bursting through the backlog
        if start - deadline > 2.0 * self.period {
            deadline = start;
        }

        while deadline < end {
            let offset = (deadline - start).max(0.0) as usize;
            if offset < len {
                let n = self.click.len().min(len - offset);
                for (o, &c) in out[offset..offset + n].iter_mut().zip(&self.click) {
                    *o += c;
                }
            }
            self.ticks_fired += 1;
            deadline += self.period;
        }
        self.next_tick_deadline = Some(deadline);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rhythm(sample_rate: u32) -> RhythmInstrument {
        RhythmInstrument::new(&RhythmConfig::default(), sample_rate)
    }

    #[test]
    fn click_waveform_is_precomputed() {
        let r = rhythm(44100);
        // 0.05 s decay, five time constants
        assert_eq!(r.click_waveform().len(), 11025);
        assert_eq!(r.click_waveform()[0], 0.0);
        assert!(r.click_waveform().iter().all(|s| s.abs() <= 0.5));
        let tail = r.click_waveform()[11000].abs();
        assert!(tail < 0.5 * (-4.9f64).exp() + 1e-9, "click should have decayed, got {tail}");
    }

    #[test]
    fn retarget_is_a_no_op() {
        let mut a = rhythm(8000);
        let mut b = rhythm(8000);
        a.retarget(
            &DataSnapshot::new()
                .with_kp_index(9)
                .with_sunspot_number(200)
                .with_speed_series(vec![1500.0]),
        );
        let mut x = vec![0.0; 4000];
        let mut y = vec![0.0; 4000];
        a.render(0, &mut x);
        b.render(0, &mut y);
        assert_eq!(x, y);
    }

    #[test]
    fn first_tick_fires_immediately() {
        let mut r = rhythm(44100);
        let mut buf = vec![0.0; 64];
        r.render(0, &mut buf);
        assert_eq!(r.ticks_fired(), 1);
        assert!(buf.iter().any(|&s| s != 0.0));
    }

    #[test]
    fn click_count_matches_period() {
        let sample_rate = 8000;
        let seconds = 10.0;
        let expected = (seconds / 0.08933f64).floor() as i64;
        for block in [64usize, 333, 1024, 8000] {
            let mut r = rhythm(sample_rate);
            let total = (seconds * sample_rate as f64) as u64;
            let mut buf = vec![0.0; block];
            let mut clock = 0u64;
            while clock < total {
                let n = block.min((total - clock) as usize);
                r.render(clock, &mut buf[..n]);
                clock += n as u64;
            }
            let fired = r.ticks_fired() as i64;
            assert!(
                (fired - expected).abs() <= 1,
                "block {block}: {fired} clicks, expected {expected} +/- 1"
            );
        }
    }

    #[test]
    fn tick_lands_at_sample_offset() {
        // 0.08933 s at 10 kHz is 893.3 frames; second tick at offset 893
        let mut r = rhythm(10_000);
        let mut first = vec![0.0; 800];
        r.render(0, &mut first);
        let mut second = vec![0.0; 800];
        r.render(800, &mut second);
        assert_eq!(r.ticks_fired(), 2);
        let onset = 893 - 800;
        // The click itself starts at zero phase; the next sample is non-zero
        assert!(second[onset + 1] != 0.0);
        // Before the onset only the first click's clipped tail could sound, and
        // that tail was clipped at the previous buffer end
        assert!(second[..onset].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn click_is_clipped_at_buffer_end() {
        let mut r = rhythm(44100);
        let mut buf = vec![0.0; 100];
        r.render(0, &mut buf);
        assert_eq!(&buf[..], &r.click_waveform()[..100]);
    }

    #[test]
    fn stall_resyncs_instead_of_bursting() {
        let mut r = rhythm(10_000);
        let mut buf = vec![0.0; 100];
        r.render(0, &mut buf);
        assert_eq!(r.ticks_fired(), 1);
        // Jump ten periods ahead
        r.render(8_933, &mut buf);
        assert_eq!(r.ticks_fired(), 2, "one tick at resync, not a backlog");
        let deadline = r.next_tick_deadline().unwrap();
        assert!((deadline - (8_933.0 + 893.3)).abs() < 1e-6);
    }

    #[test]
    fn deadline_advances_by_exact_period() {
        let mut r = rhythm(10_000);
        let mut buf = vec![0.0; 500];
        let mut clock = 0;
        for _ in 0..20 {
            r.render(clock, &mut buf);
            clock += 500;
        }
        let deadline = r.next_tick_deadline().unwrap();
        let ticks = r.ticks_fired() as f64;
        assert!((deadline - ticks * 893.3).abs() < 1e-6);
    }
}
