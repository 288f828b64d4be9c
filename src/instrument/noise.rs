//! GST noise - white noise whose level follows the geomagnetic Kp index.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::config::NoiseConfig;
use crate::snapshot::DataSnapshot;

use super::Instrument;

#[derive(Debug, Clone)]
pub struct NoiseInstrument {
    kp_max: u32,
    max_intensity: f64,
    intensity: f64,
    rng: Pcg32,
}

impl NoiseInstrument {
    pub fn new(config: &NoiseConfig) -> Self {
        NoiseInstrument {
            kp_max: config.kp_max.max(1),
            max_intensity: config.max_intensity.max(0.0),
            intensity: 0.0,
            rng: Pcg32::seed_from_u64(config.seed),
        }
    }

    pub fn intensity(&self) -> f64 {
        self.intensity
    }

    pub fn max_intensity(&self) -> f64 {
        self.max_intensity
    }

    /// `clamp(kp, 0, kp_max) / kp_max * max_intensity`.
    pub fn intensity_for(&self, kp_index: i64) -> f64 {
        let kp_max = i64::from(self.kp_max);
        if kp_index >= kp_max {
            return self.max_intensity;
        }
        kp_index.clamp(0, kp_max) as f64 / kp_max as f64 * self.max_intensity
    }
}

impl Instrument for NoiseInstrument {
    fn name(&self) -> &'static str {
        "gst-noise"
    }

    fn retarget(&mut self, snapshot: &DataSnapshot) {
        if let Some(kp) = snapshot.max_kp_index {
            self.intensity = self.intensity_for(kp);
        }
    }

    fn render(&mut self, _start_frame: u64, out: &mut [f64]) {
        if self.intensity == 0.0 {
            out.fill(0.0);
            return;
        }
        for sample in out.iter_mut() {
            *sample = self.rng.random_range(-1.0f64..=1.0) * self.intensity;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noise() -> NoiseInstrument {
        NoiseInstrument::new(&NoiseConfig::default())
    }

    #[test]
    fn starts_silent() {
        let mut n = noise();
        assert_eq!(n.intensity(), 0.0);
        let mut buf = vec![1.0; 64];
        n.render(0, &mut buf);
        assert!(buf.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn kp_bounds_hit_exact_intensity() {
        let mut n = noise();
        n.retarget(&DataSnapshot::new().with_kp_index(9));
        assert_eq!(n.intensity(), n.max_intensity());
        n.retarget(&DataSnapshot::new().with_kp_index(0));
        assert_eq!(n.intensity(), 0.0);
    }

    #[test]
    fn intensity_always_within_bounds() {
        let n = noise();
        for kp in -20..40 {
            let i = n.intensity_for(kp);
            assert!(
                (0.0..=n.max_intensity()).contains(&i),
                "kp {kp} gave intensity {i}"
            );
        }
        assert_eq!(n.intensity_for(i64::MAX), n.max_intensity());
        assert_eq!(n.intensity_for(i64::MIN), 0.0);
    }

    #[test]
    fn missing_kp_keeps_level() {
        let mut n = noise();
        n.retarget(&DataSnapshot::new().with_kp_index(6));
        let level = n.intensity();
        n.retarget(&DataSnapshot::new().with_sunspot_number(100));
        assert_eq!(n.intensity(), level);
    }

    #[test]
    fn samples_stay_within_intensity() {
        let mut n = noise();
        n.retarget(&DataSnapshot::new().with_kp_index(9));
        let mut buf = vec![0.0; 8192];
        n.render(0, &mut buf);
        assert!(buf.iter().all(|s| s.abs() <= 0.15));
        assert!(buf.iter().any(|&s| s != 0.0));
    }

    #[test]
    fn every_cycle_draws_fresh_noise() {
        let mut n = noise();
        n.retarget(&DataSnapshot::new().with_kp_index(5));
        let mut a = vec![0.0; 256];
        let mut b = vec![0.0; 256];
        n.render(0, &mut a);
        n.render(0, &mut b);
        assert_ne!(a, b);
    }

    #[test]
    fn same_seed_is_reproducible() {
        let mut a = noise();
        let mut b = noise();
        let snap = DataSnapshot::new().with_kp_index(4);
        a.retarget(&snap);
        b.retarget(&snap);
        let mut x = vec![0.0; 128];
        let mut y = vec![0.0; 128];
        a.render(0, &mut x);
        b.render(0, &mut y);
        assert_eq!(x, y);
    }
}
