//! Orchestra - owns the instruments, fans out snapshots and mixes one
//! buffer per render cycle.

use tracing::warn;

use crate::config::OrchestraConfig;
use crate::dsp::clock::SampleClock;
use crate::dsp::mixer::Mixer;
use crate::instrument::{
    AccentInstrument, DroneInstrument, Instrument, MelodyInstrument, NoiseInstrument,
    RhythmInstrument, Section,
};
use crate::snapshot::DataSnapshot;

pub struct Orchestra {
    sections: Vec<Section>,
    mixer: Mixer,
    /// Per-instrument render target, one chunk long.
    scratch: Vec<f64>,
    clock: SampleClock,
}

impl Orchestra {
    /// Build every section listed in `config.sections`, in order.
    pub fn new(config: &OrchestraConfig) -> Self {
        let sections = config
            .sections
            .iter()
            .map(|&kind| Section::build(kind, config))
            .collect();
        Self::with_sections(config, sections)
    }

    /// An unvalidated config is accepted; instruments sanitise their own
    /// bounds so nothing downstream panics.
    pub fn with_sections(config: &OrchestraConfig, sections: Vec<Section>) -> Self {
        if let Err(e) = config.validate() {
            warn!("building orchestra from an invalid configuration: {e}");
        }
        let block = config.block_size.max(1);
        Orchestra {
            sections,
            mixer: Mixer::new(config.master_gain, block),
            scratch: vec![0.0; block],
            clock: SampleClock::new(config.sample_rate),
        }
    }

    /// Hand the snapshot to every instrument. Instruments do not interact,
    /// so order is irrelevant.
    pub fn retarget_all(&mut self, snapshot: &DataSnapshot) {
        for section in &mut self.sections {
            section.retarget(snapshot);
        }
    }

    /// Fill `out` with the next `out.len()` mixed frames and advance the
    /// clock. Allocation free for any buffer length.
    pub fn render(&mut self, out: &mut [f32]) {
        let block = self.mixer.capacity();
        for chunk in out.chunks_mut(block) {
            let frames = chunk.len();
            let start = self.clock.frames();
            self.mixer.clear(frames);
            for section in &mut self.sections {
                let scratch = &mut self.scratch[..frames];
                section.render(start, scratch);
                self.mixer.accumulate(scratch);
            }
            self.mixer.write_output(chunk);
            self.clock.advance(frames);
        }
    }

    /// Render into a fresh buffer.
    pub fn render_frames(&mut self, frames: usize) -> Vec<f32> {
        let mut out = vec![0.0; frames];
        self.render(&mut out);
        out
    }

    pub fn frames_rendered(&self) -> u64 {
        self.clock.frames()
    }

    pub fn clock(&self) -> SampleClock {
        self.clock
    }

    pub fn master_gain(&self) -> f64 {
        self.mixer.master_gain
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn melody(&self) -> Option<&MelodyInstrument> {
        self.sections.iter().find_map(|s| match s {
            Section::Melody(i) => Some(i),
            _ => None,
        })
    }

    pub fn noise(&self) -> Option<&NoiseInstrument> {
        self.sections.iter().find_map(|s| match s {
            Section::Noise(i) => Some(i),
            _ => None,
        })
    }

    pub fn drone(&self) -> Option<&DroneInstrument> {
        self.sections.iter().find_map(|s| match s {
            Section::Drone(i) => Some(i),
            _ => None,
        })
    }

    pub fn rhythm(&self) -> Option<&RhythmInstrument> {
        self.sections.iter().find_map(|s| match s {
            Section::Rhythm(i) => Some(i),
            _ => None,
        })
    }

    pub fn accent(&self) -> Option<&AccentInstrument> {
        self.sections.iter().find_map(|s| match s {
            Section::Accent(i) => Some(i),
            _ => None,
        })
    }
}

impl std::fmt::Debug for Orchestra {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestra")
            .field("sections", &self.sections.iter().map(|s| s.name()).collect::<Vec<_>>())
            .field("frames_rendered", &self.clock.frames())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SectionKind;
    use crate::snapshot::FlareEvent;

    fn small_config() -> OrchestraConfig {
        OrchestraConfig {
            sample_rate: 8000,
            block_size: 256,
            ..OrchestraConfig::default()
        }
    }

    fn only(kinds: &[SectionKind]) -> OrchestraConfig {
        OrchestraConfig {
            sections: kinds.to_vec(),
            ..small_config()
        }
    }

    #[test]
    fn builds_configured_sections() {
        let orchestra = Orchestra::new(&small_config());
        assert_eq!(orchestra.sections().len(), 5);
        let baseline = Orchestra::new(&only(&[SectionKind::Melody, SectionKind::Noise]));
        assert_eq!(baseline.sections().len(), 2);
        assert!(baseline.drone().is_none());
    }

    #[test]
    fn calm_snapshot_scenario() {
        let mut orchestra = Orchestra::new(&small_config());
        let snapshot = DataSnapshot::new()
            .with_speed_series(vec![])
            .with_kp_index(0)
            .with_sunspot_number(0);
        orchestra.retarget_all(&snapshot);

        let melody = orchestra.melody().unwrap();
        assert_eq!(melody.sequence().len(), 16);
        assert!(melody.sequence().iter().all(|&f| f == melody.scale()[0]));
        assert_eq!(orchestra.noise().unwrap().intensity(), 0.0);
        assert_eq!(orchestra.drone().unwrap().frequency(), 30.0);
    }

    #[test]
    fn max_kp_scenario() {
        let mut orchestra = Orchestra::new(&small_config());
        orchestra.retarget_all(&DataSnapshot::new().with_kp_index(9));
        let noise = orchestra.noise().unwrap();
        assert_eq!(noise.intensity(), 0.15);
    }

    #[test]
    fn flare_scenario_sounds_then_goes_silent() {
        let config = only(&[SectionKind::Accent]);
        let mut orchestra = Orchestra::new(&config);
        orchestra.retarget_all(&DataSnapshot::new().with_flare(FlareEvent::new("F1", "X1.0")));

        let rate = config.sample_rate as usize;
        let gong = orchestra.render_frames(8 * rate);
        for (i, second) in gong.chunks(rate).enumerate() {
            assert!(second.iter().any(|&s| s != 0.0), "second {i} silent");
        }
        let after = orchestra.render_frames(4 * rate);
        // The frame at exactly 8 s still belongs to the gong
        assert!(after[1..].iter().all(|&s| s == 0.0));
        assert!(!orchestra.accent().unwrap().is_sounding());
    }

    #[test]
    fn counter_advances_by_frame_count() {
        let mut orchestra = Orchestra::new(&small_config());
        assert_eq!(orchestra.frames_rendered(), 0);
        let mut buf = vec![0.0f32; 1000];
        orchestra.render(&mut buf);
        assert_eq!(orchestra.frames_rendered(), 1000);
        orchestra.render(&mut buf[..0]);
        assert_eq!(orchestra.frames_rendered(), 1000);
        orchestra.render(&mut buf[..17]);
        assert_eq!(orchestra.frames_rendered(), 1017);
    }

    #[test]
    fn clip_is_total() {
        let mut config = small_config();
        config.master_gain = 1.0;
        config.melody.gain = 50.0;
        config.noise.max_intensity = 50.0;
        config.drone.gain = 50.0;
        config.rhythm.gain = 50.0;
        config.accent.high_intensity = 50.0;
        let mut orchestra = Orchestra::new(&config);
        orchestra.retarget_all(
            &DataSnapshot::new()
                .with_speed_series(vec![2000.0, 300.0])
                .with_kp_index(9)
                .with_sunspot_number(250)
                .with_flare(FlareEvent::new("F1", "X9.9")),
        );
        let out = orchestra.render_frames(8000 * 3);
        assert!(out.iter().all(|s| (-1.0..=1.0).contains(s)));
        assert!(out.iter().any(|&s| s == 1.0 || s == -1.0), "gain this high must clip");
    }

    #[test]
    fn unvalidated_config_never_panics() {
        let mut config = small_config();
        config.drone.freq_min = 80.0;
        config.drone.freq_max = 30.0;
        config.melody.speed_min = 500.0;
        config.melody.speed_max = 500.0;
        config.rhythm.period = 0.0;
        config.accent.duration = -1.0;
        assert!(config.validate().is_err());

        let mut orchestra = Orchestra::new(&config);
        orchestra.retarget_all(
            &DataSnapshot::new()
                .with_speed_series(vec![400.0, 900.0])
                .with_kp_index(4)
                .with_sunspot_number(10)
                .with_flare(FlareEvent::new("F1", "X1.0")),
        );
        let drone = orchestra.drone().unwrap().frequency();
        assert!((30.0..=80.0).contains(&drone), "drone at {drone} Hz");

        let out = orchestra.render_frames(4096);
        assert!(out.iter().all(|s| (-1.0..=1.0).contains(s)));
    }

    #[test]
    fn chunking_is_transparent() {
        let config = only(&[
            SectionKind::Melody,
            SectionKind::Noise,
            SectionKind::Drone,
            SectionKind::Accent,
        ]);
        let snapshot = DataSnapshot::new()
            .with_speed_series(vec![500.0, 1500.0])
            .with_kp_index(5)
            .with_sunspot_number(90)
            .with_flare(FlareEvent::new("F7", "M1.0"));

        let mut a = Orchestra::new(&config);
        a.retarget_all(&snapshot);
        let one_call = a.render_frames(3000);

        let mut b = Orchestra::new(&config);
        b.retarget_all(&snapshot);
        let mut split = Vec::new();
        for n in [100usize, 1900, 1000] {
            split.extend(b.render_frames(n));
        }
        assert_eq!(one_call, split);
    }

    #[test]
    fn silent_when_everything_calm_and_idle() {
        let config = only(&[SectionKind::Noise, SectionKind::Accent]);
        let mut orchestra = Orchestra::new(&config);
        let out = orchestra.render_frames(2048);
        assert!(out.iter().all(|&s| s == 0.0));
    }
}
