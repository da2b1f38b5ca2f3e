//! Core library for the loop player.
//!
//! The centre of the crate is [`render_block`], which fills device output
//! blocks from a decoded [`SampleBuffer`] at a fractional playback rate,
//! looping at the end of the buffer and fanning source channels out across
//! the active outputs. [`PlaybackEngine`] wraps it for use from an audio
//! callback and pairs it with an [`EngineController`] that other threads use
//! to swap buffers and change the rate without locking.

pub mod analysis;
pub mod buffer;
pub mod config;
pub mod engine;
pub mod error;
pub mod loader;
pub mod mask;
pub mod render;
pub mod store;
pub mod transport;

pub use analysis::{BlockAnalyzer, ChannelReport};
pub use buffer::SampleBuffer;
pub use config::{AppConfig, AudioConfig, EngineConfig};
pub use engine::{EngineController, PlaybackEngine};
pub use error::{LoopPlayerError, Result};
pub use loader::{load_path, to_raw_pcm, BufferLoader, RawPcmLoader};
pub use mask::{OutputChannelMask, MAX_OUTPUT_CHANNELS};
pub use render::{render_block, InterpolationMode, RenderStatus, SilenceReason};
pub use store::SampleStore;
pub use transport::TransportState;
