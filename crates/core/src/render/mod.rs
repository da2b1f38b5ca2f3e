//! Block renderer: fills device output blocks from the loaded sample buffer.
//!
//! Runs on the audio callback. Nothing in here allocates, locks, logs or
//! returns an error; every missing resource turns into silence and a
//! [`RenderStatus`] the host may inspect afterwards.

use serde::{Deserialize, Serialize};

use crate::{OutputChannelMask, SampleBuffer, SampleStore, TransportState};

/// How a fractional read position is turned into a sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpolationMode {
    /// Blend the two neighbouring frames, looping from the last frame back to
    /// the first.
    #[default]
    Linear,
    /// Read `floor(position)` without blending.
    Nearest,
}

/// Why a block was rendered as silence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SilenceReason {
    /// No sample data has been installed.
    MissingBuffer,
    /// The device layer could not describe its output channels.
    NoActiveDevice,
    /// The device mask has no active channel.
    NoActiveChannels,
    /// The installed buffer has zero channels or zero frames.
    EmptySource,
}

/// Outcome of a single [`render_block`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    Rendered { frames: usize },
    Silenced(SilenceReason),
}

impl RenderStatus {
    pub fn is_silenced(&self) -> bool {
        matches!(self, Self::Silenced(_))
    }
}

/// Writes `frame_count` frames into `outputs`, one slice per device channel.
///
/// Active channels in `device_mask` read source channel
/// `index % source_channels`; inactive channels, and slices past the highest
/// active channel, are zeroed. The transport advances exactly once per frame.
/// Slices shorter than `frame_count` are written up to their end.
pub fn render_block(
    outputs: &mut [&mut [f32]],
    device_mask: Option<&OutputChannelMask>,
    frame_count: usize,
    transport: &mut TransportState,
    store: &SampleStore,
    interpolation: InterpolationMode,
) -> RenderStatus {
    if frame_count == 0 {
        return RenderStatus::Rendered { frames: 0 };
    }

    let Some(buffer) = store.buffer() else {
        return silence(outputs, frame_count, SilenceReason::MissingBuffer);
    };
    let Some(mask) = device_mask else {
        return silence(outputs, frame_count, SilenceReason::NoActiveDevice);
    };
    let addressable = mask.addressable_channels();
    if addressable == 0 {
        return silence(outputs, frame_count, SilenceReason::NoActiveChannels);
    }
    if buffer.is_empty() {
        return silence(outputs, frame_count, SilenceReason::EmptySource);
    }

    for (index, output) in outputs.iter_mut().enumerate() {
        if index >= addressable || !mask.contains(index) {
            clear(output, frame_count);
        }
    }

    let source_frames = buffer.frame_count();
    let length = source_frames as f64;

    for frame in 0..frame_count {
        let position = transport.position();

        if (0.0..length).contains(&position) {
            let i0 = position as usize;
            let i1 = if i0 + 1 >= source_frames { 0 } else { i0 + 1 };
            let fraction = (position - i0 as f64) as f32;

            for channel in mask.iter() {
                let Some(output) = outputs.get_mut(channel) else {
                    break;
                };
                if let Some(slot) = output.get_mut(frame) {
                    let source = channel % buffer.channel_count();
                    *slot = read_sample(buffer, source, i0, i1, fraction, interpolation);
                }
            }
        } else {
            for channel in mask.iter() {
                let Some(output) = outputs.get_mut(channel) else {
                    break;
                };
                if let Some(slot) = output.get_mut(frame) {
                    *slot = 0.0;
                }
            }
        }

        transport.advance(source_frames);
    }

    RenderStatus::Rendered {
        frames: frame_count,
    }
}

#[inline]
fn read_sample(
    buffer: &SampleBuffer,
    channel: usize,
    i0: usize,
    i1: usize,
    fraction: f32,
    interpolation: InterpolationMode,
) -> f32 {
    let current = buffer.sample_at(channel, i0);
    match interpolation {
        InterpolationMode::Nearest => current,
        InterpolationMode::Linear => {
            let next = buffer.sample_at(channel, i1);
            current + (next - current) * fraction
        }
    }
}

fn silence(outputs: &mut [&mut [f32]], frame_count: usize, reason: SilenceReason) -> RenderStatus {
    for output in outputs.iter_mut() {
        clear(output, frame_count);
    }
    RenderStatus::Silenced(reason)
}

#[inline]
fn clear(output: &mut [f32], frame_count: usize) {
    let end = frame_count.min(output.len());
    output[..end].fill(0.0);
}
