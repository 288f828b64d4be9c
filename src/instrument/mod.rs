//! Instruments - each one turns snapshot fields into sonic parameters and
//! renders one buffer per audio cycle.

pub mod accent;
pub mod drone;
pub mod melody;
pub mod noise;
pub mod rhythm;

pub use accent::{AccentInstrument, FlareTier};
pub use drone::DroneInstrument;
pub use melody::MelodyInstrument;
pub use noise::NoiseInstrument;
pub use rhythm::RhythmInstrument;

use crate::config::{OrchestraConfig, SectionKind};
use crate::snapshot::DataSnapshot;

/// Capability shared by every instrument.
///
/// `retarget` absorbs new control data; `render` must stay allocation-free
/// and O(frames).
pub trait Instrument: Send {
    fn name(&self) -> &'static str;

    /// Absorb a snapshot. Absent fields leave the current state untouched.
    fn retarget(&mut self, snapshot: &DataSnapshot);

    /// Overwrite `out` with the next `out.len()` samples. `start_frame` is
    /// the shared clock value for `out[0]`.
    fn render(&mut self, start_frame: u64, out: &mut [f64]);
}

/// One seat in the orchestra.
#[derive(Debug, Clone)]
pub enum Section {
    Melody(MelodyInstrument),
    Noise(NoiseInstrument),
    Drone(DroneInstrument),
    Rhythm(RhythmInstrument),
    Accent(AccentInstrument),
}

impl Section {
    /// Build the instrument for `kind` with its configured defaults.
    pub fn build(kind: SectionKind, config: &OrchestraConfig) -> Self {
        let sample_rate = config.sample_rate;
        match kind {
            SectionKind::Melody => Section::Melody(MelodyInstrument::new(&config.melody, sample_rate)),
            SectionKind::Noise => Section::Noise(NoiseInstrument::new(&config.noise)),
            SectionKind::Drone => Section::Drone(DroneInstrument::new(&config.drone, sample_rate)),
            SectionKind::Rhythm => Section::Rhythm(RhythmInstrument::new(&config.rhythm, sample_rate)),
            SectionKind::Accent => Section::Accent(AccentInstrument::new(&config.accent, sample_rate)),
        }
    }

    pub fn kind(&self) -> SectionKind {
        match self {
            Section::Melody(_) => SectionKind::Melody,
            Section::Noise(_) => SectionKind::Noise,
            Section::Drone(_) => SectionKind::Drone,
            Section::Rhythm(_) => SectionKind::Rhythm,
            Section::Accent(_) => SectionKind::Accent,
        }
    }

    fn as_instrument(&mut self) -> &mut dyn Instrument {
        match self {
            Section::Melody(i) => i,
            Section::Noise(i) => i,
            Section::Drone(i) => i,
            Section::Rhythm(i) => i,
            Section::Accent(i) => i,
        }
    }
}

impl Instrument for Section {
    fn name(&self) -> &'static str {
        match self {
            Section::Melody(i) => i.name(),
            Section::Noise(i) => i.name(),
            Section::Drone(i) => i.name(),
            Section::Rhythm(i) => i.name(),
            Section::Accent(i) => i.name(),
        }
    }

    fn retarget(&mut self, snapshot: &DataSnapshot) {
        self.as_instrument().retarget(snapshot);
    }

    fn render(&mut self, start_frame: u64, out: &mut [f64]) {
        self.as_instrument().render(start_frame, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_every_kind() {
        let config = OrchestraConfig::default();
        for kind in SectionKind::ALL {
            let section = Section::build(kind, &config);
            assert_eq!(section.kind(), kind);
        }
    }

    #[test]
    fn names_are_distinct() {
        let config = OrchestraConfig::default();
        let mut names: Vec<&str> = SectionKind::ALL
            .iter()
            .map(|&k| Section::build(k, &config).name())
            .collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 5);
    }
}
