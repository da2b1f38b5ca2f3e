//! Seam for the collaborator that turns stored audio into a [`SampleBuffer`].

use std::path::Path;

use crate::{LoopPlayerError, Result, SampleBuffer};

const BYTES_PER_SAMPLE: usize = std::mem::size_of::<f32>();

/// Produces sample buffers from raw bytes.
pub trait BufferLoader {
    fn load(&self, bytes: &[u8]) -> Result<SampleBuffer>;

    /// Like [`load`](Self::load), but a failure is logged and reported as "no
    /// buffer", which the engine plays as silence.
    fn load_or_absent(&self, bytes: &[u8]) -> Option<SampleBuffer> {
        match self.load(bytes) {
            Ok(buffer) => Some(buffer),
            Err(err) => {
                tracing::warn!(%err, "failed to load sample buffer");
                None
            }
        }
    }
}

/// Headerless interleaved little-endian `f32` samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawPcmLoader {
    channels: usize,
}

impl RawPcmLoader {
    pub fn new(channels: usize) -> Self {
        Self { channels }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }
}

impl BufferLoader for RawPcmLoader {
    fn load(&self, bytes: &[u8]) -> Result<SampleBuffer> {
        if bytes.len() % BYTES_PER_SAMPLE != 0 {
            return Err(LoopPlayerError::msg(format!(
                "raw pcm data of {} bytes is not a whole number of f32 samples",
                bytes.len()
            )));
        }

        let samples: Vec<f32> = bytes
            .chunks_exact(BYTES_PER_SAMPLE)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();

        SampleBuffer::from_interleaved(&samples, self.channels)
    }
}

/// Reads `path` and hands its bytes to `loader`.
pub fn load_path<L>(loader: &L, path: impl AsRef<Path>) -> Result<SampleBuffer>
where
    L: BufferLoader + ?Sized,
{
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let buffer = loader.load(&bytes)?;

    tracing::info!(
        path = %path.display(),
        channels = buffer.channel_count(),
        frames = buffer.frame_count(),
        "loaded sample buffer"
    );

    Ok(buffer)
}

/// Interleaves `channels` into the byte layout [`RawPcmLoader`] reads.
pub fn to_raw_pcm(channels: &[Vec<f32>]) -> Vec<u8> {
    let frames = channels.iter().map(Vec::len).max().unwrap_or(0);
    let mut bytes = Vec::with_capacity(frames * channels.len() * BYTES_PER_SAMPLE);

    for frame in 0..frames {
        for channel in channels {
            let sample = channel.get(frame).copied().unwrap_or(0.0);
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
    }

    bytes
}
