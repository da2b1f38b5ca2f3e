use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{InterpolationMode, LoopPlayerError, OutputChannelMask, Result};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub audio: AudioConfig,
}

impl AppConfig {
    /// Parses a JSON document. Missing sections and fields keep their
    /// defaults.
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&text)?;
        tracing::debug!(path = %path.display(), ?config, "loaded configuration");
        Ok(config)
    }
}

/// Settings consumed by [`PlaybackEngine`](crate::PlaybackEngine).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub playback_rate: f64,
    pub interpolation: InterpolationMode,
    /// Slots in the control-to-audio command ring.
    pub command_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            playback_rate: 1.0,
            interpolation: InterpolationMode::Linear,
            command_capacity: 16,
        }
    }
}

/// Shape of the output device the host drives the engine with.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub block_size: usize,
    pub output_channels: usize,
    /// Explicit set of active outputs; every output is active when absent.
    pub active_channels: Option<Vec<usize>>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            block_size: 1024,
            output_channels: 2,
            active_channels: None,
        }
    }
}

impl AudioConfig {
    /// Builds the channel mask the host reports to the engine each block.
    pub fn output_mask(&self) -> Result<OutputChannelMask> {
        let Some(active) = &self.active_channels else {
            return Ok(OutputChannelMask::first_n(self.output_channels));
        };

        if let Some(index) = active.iter().find(|index| **index >= self.output_channels) {
            return Err(LoopPlayerError::msg(format!(
                "active channel {index} exceeds the {} configured outputs",
                self.output_channels
            )));
        }

        OutputChannelMask::from_indices(active.iter().copied())
    }
}
