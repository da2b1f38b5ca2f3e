use crate::SampleBuffer;

/// Owner of the sample data the engine is currently playing.
///
/// Holding no buffer is a normal state (nothing loaded yet, or the loader
/// failed); every query has a defined answer for it.
#[derive(Debug, Default)]
pub struct SampleStore {
    buffer: Option<Box<SampleBuffer>>,
}

impl SampleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_buffer(buffer: SampleBuffer) -> Self {
        Self {
            buffer: Some(Box::new(buffer)),
        }
    }

    pub fn has_buffer(&self) -> bool {
        self.buffer.is_some()
    }

    pub fn buffer(&self) -> Option<&SampleBuffer> {
        self.buffer.as_deref()
    }

    pub fn channel_count(&self) -> usize {
        self.buffer().map_or(0, SampleBuffer::channel_count)
    }

    pub fn frame_count(&self) -> usize {
        self.buffer().map_or(0, SampleBuffer::frame_count)
    }

    /// Returns `None` when nothing is loaded or either index is out of range.
    pub fn sample_at(&self, channel: usize, frame: usize) -> Option<f32> {
        let buffer = self.buffer()?;
        if channel >= buffer.channel_count() || frame >= buffer.frame_count() {
            return None;
        }
        Some(buffer.sample_at(channel, frame))
    }

    /// Installs `next` and hands back whatever was held before. Dropping the
    /// returned box is left to the caller, which lets the audio thread pass it
    /// somewhere else to be freed.
    pub fn replace(&mut self, next: Option<Box<SampleBuffer>>) -> Option<Box<SampleBuffer>> {
        std::mem::replace(&mut self.buffer, next)
    }
}
