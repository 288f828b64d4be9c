//! Data sources and the control-rate updater.
//!
//! Acquiring data is outside the engine; a [`DataSource`] is whatever can
//! hand over a [`DataSnapshot`] when asked. The [`ControlLoop`] polls one on
//! a coarse timer and forwards the result through a [`SnapshotSender`].

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::error::{OrchestraError, Result};
use crate::link::SnapshotSender;
use crate::snapshot::DataSnapshot;

/// A producer of snapshots, polled from the control thread. Blocking I/O
/// is fine here.
pub trait DataSource: Send {
    fn name(&self) -> &str;
    fn fetch(&mut self) -> Result<DataSnapshot>;
}

/// Re-reads a JSON snapshot document on every poll.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    name: String,
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        JsonFileSource {
            name: path.display().to_string(),
            path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DataSource for JsonFileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&mut self) -> Result<DataSnapshot> {
        let source = std::fs::read_to_string(&self.path).map_err(|source| OrchestraError::Io {
            path: self.path.clone(),
            source,
        })?;
        Ok(DataSnapshot::from_json_str(&source)?)
    }
}

/// Always returns the same snapshot.
#[derive(Debug, Clone)]
pub struct StaticSource {
    name: String,
    snapshot: DataSnapshot,
}

impl StaticSource {
    pub fn new(name: impl Into<String>, snapshot: DataSnapshot) -> Self {
        StaticSource {
            name: name.into(),
            snapshot,
        }
    }
}

impl DataSource for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&mut self) -> Result<DataSnapshot> {
        Ok(self.snapshot.clone())
    }
}

/// Several sources merged into one snapshot, later sources winning.
/// A failing source is skipped so the others still get through.
pub struct MergedSource {
    sources: Vec<Box<dyn DataSource>>,
}

impl MergedSource {
    pub fn new(sources: Vec<Box<dyn DataSource>>) -> Self {
        MergedSource { sources }
    }
}

impl DataSource for MergedSource {
    fn name(&self) -> &str {
        "merged"
    }

    fn fetch(&mut self) -> Result<DataSnapshot> {
        let mut merged = DataSnapshot::new();
        let mut succeeded = 0;
        for source in &mut self.sources {
            match source.fetch() {
                Ok(snapshot) => {
                    debug!(source = source.name(), "fetched snapshot");
                    merged = merged.merge(snapshot);
                    succeeded += 1;
                }
                Err(e) => warn!(source = source.name(), "fetch failed: {e}"),
            }
        }
        if succeeded == 0 && !self.sources.is_empty() {
            return Err(OrchestraError::source_failed("merged", "every source failed"));
        }
        Ok(merged)
    }
}

/// Fetch once and forward the result. Failures are logged and leave the
/// instruments on their last known state.
pub fn poll_once(source: &mut dyn DataSource, sender: &mut SnapshotSender) -> bool {
    match source.fetch() {
        Ok(snapshot) => sender.send(snapshot),
        Err(e) => {
            error!(source = source.name(), "failed to fetch data, keeping last state: {e}");
            false
        }
    }
}

/// Spawns the control-rate updater thread.
pub struct ControlLoop;

impl ControlLoop {
    /// Poll `source` immediately, then every `interval`, until the returned
    /// handle is stopped or dropped.
    pub fn spawn(
        mut source: Box<dyn DataSource>,
        mut sender: SnapshotSender,
        interval: Duration,
    ) -> Result<ControlHandle> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let handle = thread::Builder::new()
            .name("control-rate".into())
            .spawn(move || {
                info!(source = source.name(), ?interval, "control loop started");
                loop {
                    poll_once(source.as_mut(), &mut sender);
                    info!("next update in {:.0} minutes", interval.as_secs_f64() / 60.0);
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                debug!("control loop finished");
                sender
            })
            .map_err(OrchestraError::Spawn)?;

        Ok(ControlHandle {
            stop: Some(stop_tx),
            handle: Some(handle),
        })
    }
}

/// Handle to a running [`ControlLoop`].
pub struct ControlHandle {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<SnapshotSender>>,
}

impl ControlHandle {
    pub fn is_alive(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the loop and wait for it. Returns the sender so the link can be
    /// reused.
    pub fn stop(mut self) -> Option<SnapshotSender> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Option<SnapshotSender> {
        // Dropping the sender wakes the timed wait as well
        drop(self.stop.take());
        let handle = self.handle.take()?;
        match handle.join() {
            Ok(sender) => Some(sender),
            Err(_) => {
                error!("control loop panicked");
                None
            }
        }
    }
}

impl Drop for ControlHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::time::Instant;

    use super::*;
    use crate::config::OrchestraConfig;
    use crate::link::{RealtimeOrchestra, snapshot_link};
    use crate::orchestra::Orchestra;

    struct FailingSource;

    impl DataSource for FailingSource {
        fn name(&self) -> &str {
            "failing"
        }

        fn fetch(&mut self) -> Result<DataSnapshot> {
            Err(OrchestraError::source_failed("failing", "upstream unavailable"))
        }
    }

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "cosmic-orchestra-{}-{name}",
            std::process::id()
        ));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn json_file_source_reads_snapshot() {
        let path = temp_file("snapshot.json", r#"{ "max_kp_index": 7, "sunspot_number": 80 }"#);
        let mut source = JsonFileSource::new(&path);
        let snapshot = source.fetch().unwrap();
        assert_eq!(snapshot.max_kp_index, Some(7));
        assert_eq!(snapshot.sunspot_number, Some(80));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let mut source = JsonFileSource::new("/nonexistent/cosmic/snapshot.json");
        assert!(matches!(source.fetch(), Err(OrchestraError::Io { .. })));
    }

    #[test]
    fn merged_source_overlays_and_skips_failures() {
        let mut merged = MergedSource::new(vec![
            Box::new(StaticSource::new("nasa", DataSnapshot::new().with_kp_index(3))),
            Box::new(FailingSource),
            Box::new(StaticSource::new("sidc", DataSnapshot::new().with_sunspot_number(99))),
        ]);
        let snapshot = merged.fetch().unwrap();
        assert_eq!(snapshot.max_kp_index, Some(3));
        assert_eq!(snapshot.sunspot_number, Some(99));
    }

    #[test]
    fn merged_source_fails_when_all_fail() {
        let mut merged = MergedSource::new(vec![Box::new(FailingSource), Box::new(FailingSource)]);
        assert!(merged.fetch().is_err());
    }

    #[test]
    fn failed_poll_keeps_last_state() {
        let config = OrchestraConfig {
            sample_rate: 8000,
            ..OrchestraConfig::default()
        };
        let (mut tx, rx) = snapshot_link(4);
        let mut rt = RealtimeOrchestra::new(Orchestra::new(&config), rx);
        let mut good = StaticSource::new("good", DataSnapshot::new().with_kp_index(9));
        assert!(poll_once(&mut good, &mut tx));
        let mut buf = vec![0.0f32; 32];
        rt.process(&mut buf);

        assert!(!poll_once(&mut FailingSource, &mut tx));
        rt.process(&mut buf);
        assert_eq!(rt.orchestra().noise().unwrap().intensity(), 0.15);
    }

    #[test]
    fn control_loop_delivers_and_stops_promptly() {
        let (tx, rx) = snapshot_link(4);
        let config = OrchestraConfig {
            sample_rate: 8000,
            ..OrchestraConfig::default()
        };
        let mut rt = RealtimeOrchestra::new(Orchestra::new(&config), rx);
        let source = StaticSource::new("static", DataSnapshot::new().with_sunspot_number(250));
        let handle = ControlLoop::spawn(Box::new(source), tx, Duration::from_secs(3600)).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut buf = vec![0.0f32; 64];
        while rt.orchestra().drone().unwrap().frequency() != 80.0 {
            assert!(Instant::now() < deadline, "control loop never delivered");
            rt.process(&mut buf);
            thread::sleep(Duration::from_millis(1));
        }

        let started = Instant::now();
        assert!(handle.is_alive());
        let sender = handle.stop();
        assert!(sender.is_some());
        assert!(started.elapsed() < Duration::from_secs(2), "stop waited for the interval");
    }
}
