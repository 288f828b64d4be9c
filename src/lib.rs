pub mod config;
pub mod dsp;
pub mod error;
pub mod instrument;
pub mod link;
pub mod orchestra;
#[cfg(feature = "device")]
pub mod output;
pub mod renderer;
#[cfg(feature = "device")]
pub mod session;
pub mod snapshot;
pub mod source;

pub use crate::config::{ConfigError, OrchestraConfig, SectionKind};
pub use crate::error::OrchestraError;
pub use crate::instrument::{Instrument, Section};
pub use crate::link::{FrameCounter, RealtimeOrchestra, SnapshotInbox, SnapshotSender, snapshot_link};
pub use crate::orchestra::Orchestra;
pub use crate::snapshot::{DataSnapshot, FlareEvent};
pub use crate::source::{ControlHandle, ControlLoop, DataSource, JsonFileSource, MergedSource, StaticSource};

use wasm_bindgen::prelude::*;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the cosmic_orchestra version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

fn to_js<E: std::fmt::Display>(e: E) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Default orchestra at `sample_rate`, rejected when the rate is unusable.
fn default_config(sample_rate: u32) -> std::result::Result<OrchestraConfig, ConfigError> {
    let config = OrchestraConfig {
        sample_rate,
        ..OrchestraConfig::default()
    };
    config.validate()?;
    Ok(config)
}

/// WASM-exposed: render a JSON snapshot for `seconds` to mono f32 samples.
#[wasm_bindgen]
pub fn render_snapshot_samples(snapshot_json: &str, seconds: f64, sample_rate: u32) -> Result<Vec<f32>, JsValue> {
    let config = default_config(sample_rate).map_err(to_js)?;
    let snapshot = DataSnapshot::from_json_str(snapshot_json).map_err(to_js)?;
    Ok(renderer::render_samples(&config, &snapshot, seconds))
}

/// WASM-exposed: render a JSON snapshot for `seconds` to a WAV byte array.
#[wasm_bindgen]
pub fn render_snapshot_wav(snapshot_json: &str, seconds: f64, sample_rate: u32) -> Result<Vec<u8>, JsValue> {
    let config = default_config(sample_rate).map_err(to_js)?;
    let snapshot = DataSnapshot::from_json_str(snapshot_json).map_err(to_js)?;
    renderer::render_wav(&config, &snapshot, seconds).map_err(to_js)
}

/// Pull-model orchestra for an AudioWorklet. Retargets and renders run on
/// the worklet thread, so no link is needed.
#[wasm_bindgen]
pub struct WebOrchestra {
    orchestra: Orchestra,
}

#[wasm_bindgen]
impl WebOrchestra {
    #[wasm_bindgen(constructor)]
    pub fn new(sample_rate: u32) -> Result<WebOrchestra, JsValue> {
        let config = default_config(sample_rate).map_err(to_js)?;
        Ok(WebOrchestra {
            orchestra: Orchestra::new(&config),
        })
    }

    /// Build from a JSON configuration document.
    #[wasm_bindgen(js_name = withConfig)]
    pub fn with_config(config_json: &str) -> Result<WebOrchestra, JsValue> {
        let config = OrchestraConfig::from_json_str(config_json).map_err(to_js)?;
        Ok(WebOrchestra {
            orchestra: Orchestra::new(&config),
        })
    }

    /// Retarget from a plain JS object.
    pub fn retarget(&mut self, snapshot: JsValue) -> Result<(), JsValue> {
        let value: serde_json::Value = serde_wasm_bindgen::from_value(snapshot)?;
        self.orchestra.retarget_all(&DataSnapshot::from_value(&value));
        Ok(())
    }

    /// Retarget from a JSON string.
    #[wasm_bindgen(js_name = retargetJson)]
    pub fn retarget_json(&mut self, snapshot_json: &str) -> Result<(), JsValue> {
        let snapshot = DataSnapshot::from_json_str(snapshot_json).map_err(to_js)?;
        self.orchestra.retarget_all(&snapshot);
        Ok(())
    }

    /// Fill the worklet's output buffer.
    pub fn process(&mut self, out: &mut [f32]) {
        self.orchestra.render(out);
    }

    #[wasm_bindgen(getter, js_name = framesRendered)]
    pub fn frames_rendered(&self) -> f64 {
        self.orchestra.frames_rendered() as f64
    }
}
