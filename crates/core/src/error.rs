/// Result alias that carries the custom [`LoopPlayerError`] type.
pub type Result<T> = std::result::Result<T, LoopPlayerError>;

/// Common error type for everything that runs off the audio thread.
///
/// The render path never produces one of these; missing resources there
/// degrade to silence and are reported through
/// [`SilenceReason`](crate::SilenceReason) instead.
#[derive(Debug, thiserror::Error)]
pub enum LoopPlayerError {
    /// Free-form message for conditions that do not deserve their own variant.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// A configuration document could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
    /// The FFT used by the analyser rejected its buffers.
    #[error("fft failed: {0}")]
    Fft(#[from] realfft::FftError),
    /// A channel did not have the same number of frames as channel 0.
    #[error("channel {channel} has {found} frames, expected {expected}")]
    MismatchedChannelLength {
        channel: usize,
        expected: usize,
        found: usize,
    },
    /// Samples were supplied for a buffer that declares no channels.
    #[error("sample data requires at least one channel, got {0}")]
    InvalidChannelCount(usize),
    /// Interleaved data ended in the middle of a frame.
    #[error("{samples} samples do not divide into frames of {channels} channels")]
    TruncatedFrame { samples: usize, channels: usize },
    /// An output channel index exceeded the mask capacity.
    #[error("output channel {index} is out of range (capacity {capacity})")]
    ChannelOutOfRange { index: usize, capacity: usize },
    /// The engine has not drained earlier commands yet.
    #[error("engine command queue is full")]
    CommandQueueFull,
}

impl LoopPlayerError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for LoopPlayerError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for LoopPlayerError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
