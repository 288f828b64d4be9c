//! Sunspot drone - a continuous sine whose pitch follows the sunspot count.

use crate::config::DroneConfig;
use crate::dsp::oscillator::{clock_phase, sine};
use crate::snapshot::DataSnapshot;

use super::Instrument;

#[derive(Debug, Clone)]
pub struct DroneInstrument {
    sunspot_max: u32,
    freq_min: f64,
    freq_max: f64,
    gain: f64,
    frequency: f64,
    sample_rate: u32,
}

impl DroneInstrument {
    pub fn new(config: &DroneConfig, sample_rate: u32) -> Self {
        // Inverted bounds are swapped so retarget can never panic
        let freq_min = config.freq_min.min(config.freq_max);
        let freq_max = config.freq_min.max(config.freq_max);
        DroneInstrument {
            sunspot_max: config.sunspot_max.max(1),
            freq_min,
            freq_max,
            gain: config.gain,
            frequency: freq_min,
            sample_rate,
        }
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    /// `f_min + clamp(n, 0, max) / max * (f_max - f_min)`.
    pub fn frequency_for(&self, sunspot_number: i64) -> f64 {
        let max = i64::from(self.sunspot_max);
        if sunspot_number >= max {
            return self.freq_max;
        }
        let norm = sunspot_number.clamp(0, max) as f64 / max as f64;
        (self.freq_min + norm * (self.freq_max - self.freq_min))
            .max(self.freq_min)
            .min(self.freq_max)
    }
}

impl Instrument for DroneInstrument {
    fn name(&self) -> &'static str {
        "sunspot-drone"
    }

    fn retarget(&mut self, snapshot: &DataSnapshot) {
        if let Some(count) = snapshot.sunspot_number {
            self.frequency = self.frequency_for(count);
        }
    }

    /// Phase comes from the shared clock, so a retune between cycles jumps
    /// frequency without restarting the waveform.
    fn render(&mut self, start_frame: u64, out: &mut [f64]) {
        for (i, sample) in out.iter_mut().enumerate() {
            let phase = clock_phase(self.frequency, start_frame + i as u64, self.sample_rate);
            *sample = sine(phase) * self.gain;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drone() -> DroneInstrument {
        DroneInstrument::new(&DroneConfig::default(), 44100)
    }

    #[test]
    fn starts_at_minimum() {
        assert_eq!(drone().frequency(), 30.0);
    }

    #[test]
    fn frequency_within_bounds() {
        let d = drone();
        for n in -100..1000 {
            let f = d.frequency_for(n);
            assert!((30.0..=80.0).contains(&f), "sunspots {n} gave {f} Hz");
        }
        assert_eq!(d.frequency_for(0), 30.0);
        assert_eq!(d.frequency_for(250), 80.0);
        assert_eq!(d.frequency_for(i64::MAX), 80.0);
    }

    #[test]
    fn strictly_increasing_over_domain() {
        let d = drone();
        for n in 0..250 {
            assert!(
                d.frequency_for(n + 1) > d.frequency_for(n),
                "not increasing at {n}"
            );
        }
    }

    #[test]
    fn retarget_updates_frequency() {
        let mut d = drone();
        d.retarget(&DataSnapshot::new().with_sunspot_number(125));
        assert!((d.frequency() - 55.0).abs() < 1e-12);
        d.retarget(&DataSnapshot::new().with_kp_index(2));
        assert!((d.frequency() - 55.0).abs() < 1e-12, "absent field keeps pitch");
    }

    #[test]
    fn phase_is_continuous_across_buffers() {
        let mut split = drone();
        let mut whole = drone();
        let mut a = vec![0.0; 300];
        let mut b = vec![0.0; 300];
        split.render(0, &mut a);
        split.render(300, &mut b);
        let mut all = vec![0.0; 600];
        whole.render(0, &mut all);
        assert_eq!(&all[..300], &a[..]);
        assert_eq!(&all[300..], &b[..]);
    }

    #[test]
    fn inverted_bounds_are_swapped() {
        let config = DroneConfig {
            freq_min: 80.0,
            freq_max: 30.0,
            ..DroneConfig::default()
        };
        let mut d = DroneInstrument::new(&config, 44100);
        assert_eq!(d.frequency(), 30.0);
        for n in [-5, 0, 10, 125, 250, 9000] {
            d.retarget(&DataSnapshot::new().with_sunspot_number(n));
            assert!((30.0..=80.0).contains(&d.frequency()), "sunspots {n} gave {}", d.frequency());
        }
        assert_eq!(d.frequency_for(250), 80.0);
    }

    #[test]
    fn nan_bound_does_not_panic() {
        let config = DroneConfig {
            freq_min: f64::NAN,
            ..DroneConfig::default()
        };
        let d = DroneInstrument::new(&config, 44100);
        assert_eq!(d.frequency_for(100), 80.0);
    }

    #[test]
    fn output_bounded_by_gain() {
        let mut d = drone();
        d.retarget(&DataSnapshot::new().with_sunspot_number(200));
        let mut buf = vec![0.0; 44100];
        d.render(0, &mut buf);
        assert!(buf.iter().all(|s| s.abs() <= 0.6 + 1e-12));
    }
}
