use crate::{LoopPlayerError, Result};

/// Decoded, planar multi-channel audio. Every channel holds exactly
/// `frame_count` samples; the buffer never changes after construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleBuffer {
    channels: Vec<Vec<f32>>,
    frame_count: usize,
}

impl SampleBuffer {
    /// Builds a buffer from one sample vector per channel.
    pub fn from_channels(channels: Vec<Vec<f32>>) -> Result<Self> {
        let frame_count = channels.first().map(Vec::len).unwrap_or(0);

        if let Some((channel, data)) = channels
            .iter()
            .enumerate()
            .find(|(_, data)| data.len() != frame_count)
        {
            return Err(LoopPlayerError::MismatchedChannelLength {
                channel,
                expected: frame_count,
                found: data.len(),
            });
        }

        Ok(Self {
            channels,
            frame_count,
        })
    }

    /// De-interleaves `[c0, c1, .., c0, c1, ..]` data into a planar buffer.
    pub fn from_interleaved(samples: &[f32], channel_count: usize) -> Result<Self> {
        if channel_count == 0 {
            if samples.is_empty() {
                return Ok(Self::default());
            }
            return Err(LoopPlayerError::InvalidChannelCount(channel_count));
        }

        if samples.len() % channel_count != 0 {
            return Err(LoopPlayerError::TruncatedFrame {
                samples: samples.len(),
                channels: channel_count,
            });
        }

        let frame_count = samples.len() / channel_count;
        let mut channels: Vec<Vec<f32>> = (0..channel_count)
            .map(|_| Vec::with_capacity(frame_count))
            .collect();
        for frame in samples.chunks_exact(channel_count) {
            for (channel, sample) in channels.iter_mut().zip(frame) {
                channel.push(*sample);
            }
        }

        Ok(Self {
            channels,
            frame_count,
        })
    }

    /// Zero-filled buffer of the requested shape.
    pub fn silent(channel_count: usize, frame_count: usize) -> Self {
        Self {
            channels: vec![vec![0.0; frame_count]; channel_count],
            frame_count,
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// True when the buffer has no channels or no frames, i.e. nothing can be
    /// played from it.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty() || self.frame_count == 0
    }

    /// Reads a single sample. Panics if either index is out of range; the
    /// renderer establishes both bounds before calling.
    #[inline]
    pub fn sample_at(&self, channel: usize, frame: usize) -> f32 {
        self.channels[channel][frame]
    }

    pub fn channel(&self, channel: usize) -> Option<&[f32]> {
        self.channels.get(channel).map(Vec::as_slice)
    }

    /// Length of the buffer in seconds when played at `sample_rate`.
    pub fn duration_seconds(&self, sample_rate: u32) -> f64 {
        if sample_rate == 0 {
            return 0.0;
        }
        self.frame_count as f64 / f64::from(sample_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_from_equal_length_channels() {
        let buffer = SampleBuffer::from_channels(vec![vec![0.0, 1.0], vec![2.0, 3.0]]).unwrap();

        assert_eq!(buffer.channel_count(), 2);
        assert_eq!(buffer.frame_count(), 2);
        assert_eq!(buffer.sample_at(1, 0), 2.0);
        assert!(!buffer.is_empty());
    }

    #[test]
    fn rejects_ragged_channels() {
        let err = SampleBuffer::from_channels(vec![vec![0.0; 4], vec![0.0; 3]]).unwrap_err();

        match err {
            LoopPlayerError::MismatchedChannelLength {
                channel,
                expected,
                found,
            } => {
                assert_eq!((channel, expected, found), (1, 4, 3));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn deinterleaves_frames() {
        let buffer = SampleBuffer::from_interleaved(&[1.0, -1.0, 2.0, -2.0, 3.0, -3.0], 2).unwrap();

        assert_eq!(buffer.frame_count(), 3);
        assert_eq!(buffer.channel(0).unwrap(), &[1.0, 2.0, 3.0]);
        assert_eq!(buffer.channel(1).unwrap(), &[-1.0, -2.0, -3.0]);
    }

    #[test]
    fn rejects_partial_interleaved_frame() {
        let err = SampleBuffer::from_interleaved(&[0.0; 5], 2).unwrap_err();
        assert!(format!("{err}").contains("5 samples"));
    }

    #[test]
    fn zero_channels_only_accepts_empty_data() {
        assert!(SampleBuffer::from_interleaved(&[], 0).unwrap().is_empty());
        assert!(matches!(
            SampleBuffer::from_interleaved(&[0.5], 0),
            Err(LoopPlayerError::InvalidChannelCount(0))
        ));
    }

    #[test]
    fn silent_buffer_reports_duration() {
        let buffer = SampleBuffer::silent(1, 24_000);
        assert!(buffer.channel(0).unwrap().iter().all(|s| *s == 0.0));
        assert_eq!(buffer.duration_seconds(48_000), 0.5);
        assert_eq!(buffer.duration_seconds(0), 0.0);
    }
}
