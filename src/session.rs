//! A live session: audio driver plus control loop, wired through one
//! snapshot link.

use std::time::Duration;

use tracing::info;

use crate::config::OrchestraConfig;
use crate::error::Result;
use crate::link::{FrameCounter, snapshot_link};
use crate::output::AudioDriver;
use crate::source::{ControlHandle, ControlLoop, DataSource};

pub struct LiveSession {
    driver: AudioDriver,
    control: ControlHandle,
}

impl LiveSession {
    /// Start playback and the control-rate updater. The first poll happens
    /// right away, so instruments retarget within one buffer of it landing.
    pub fn start(config: &OrchestraConfig, source: Box<dyn DataSource>) -> Result<Self> {
        let (sender, inbox) = snapshot_link(config.control.queue_capacity);
        let driver = AudioDriver::start(config, inbox)?;
        let interval = Duration::from_secs(config.control.update_interval_secs.max(1));
        let control = ControlLoop::spawn(source, sender, interval)?;
        Ok(LiveSession { driver, control })
    }

    pub fn sample_rate(&self) -> u32 {
        self.driver.sample_rate()
    }

    pub fn frame_counter(&self) -> FrameCounter {
        self.driver.frame_counter()
    }

    pub fn is_updating(&self) -> bool {
        self.control.is_alive()
    }

    /// Silence the output first, then stop polling.
    pub fn shutdown(self) {
        let LiveSession { driver, control } = self;
        let frames = driver.frame_counter().frames();
        driver.stop();
        control.stop();
        info!(frames, "session shut down");
    }
}
