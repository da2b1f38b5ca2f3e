use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use rtrb::{Consumer, Producer, RingBuffer};

use crate::render::{self, InterpolationMode, RenderStatus};
use crate::{EngineConfig, LoopPlayerError, OutputChannelMask, Result, SampleBuffer, SampleStore, TransportState};

/// Control-thread requests applied at the start of the next rendered block.
enum EngineCommand {
    Install(Option<Box<SampleBuffer>>),
    SetRate(f64),
    Seek(f64),
    SetInterpolation(InterpolationMode),
}

/// Snapshot of engine state published after every block.
#[derive(Debug, Default)]
struct SharedStatus {
    has_buffer: AtomicBool,
    channel_count: AtomicUsize,
    frame_count: AtomicUsize,
    position: AtomicU64,
    rate: AtomicU64,
}

impl SharedStatus {
    fn publish(&self, store: &SampleStore, transport: &TransportState) {
        self.has_buffer.store(store.has_buffer(), Ordering::Relaxed);
        self.channel_count.store(store.channel_count(), Ordering::Relaxed);
        self.frame_count.store(store.frame_count(), Ordering::Relaxed);
        self.position
            .store(transport.position().to_bits(), Ordering::Relaxed);
        self.rate.store(transport.rate().to_bits(), Ordering::Relaxed);
    }
}

/// Audio-thread half of the player. Owns the sample store and transport and
/// is driven once per device block through [`render_block`](Self::render_block).
///
/// Other threads talk to it only through the [`EngineController`] returned by
/// [`PlaybackEngine::new`]. Buffers travel in both directions as boxes over
/// lock-free rings so the callback never allocates or frees.
pub struct PlaybackEngine {
    store: SampleStore,
    transport: TransportState,
    interpolation: InterpolationMode,
    commands: Consumer<EngineCommand>,
    retired: Producer<Box<SampleBuffer>>,
    status: Arc<SharedStatus>,
}

impl PlaybackEngine {
    /// Creates an engine with no buffer loaded, plus its controller.
    pub fn new(config: &EngineConfig) -> (Self, EngineController) {
        let capacity = config.command_capacity.max(1);
        let (command_tx, command_rx) = RingBuffer::new(capacity);
        let (retired_tx, retired_rx) = RingBuffer::new(capacity);
        let status = Arc::new(SharedStatus::default());

        let engine = Self {
            store: SampleStore::new(),
            transport: TransportState::with_rate(config.playback_rate),
            interpolation: config.interpolation,
            commands: command_rx,
            retired: retired_tx,
            status: status.clone(),
        };
        engine.status.publish(&engine.store, &engine.transport);

        let controller = EngineController {
            commands: command_tx,
            retired: retired_rx,
            status,
        };

        (engine, controller)
    }

    /// Applies pending control commands, then fills `outputs` for one device
    /// block. See [`render::render_block`] for the per-frame contract.
    pub fn render_block(
        &mut self,
        outputs: &mut [&mut [f32]],
        device_mask: Option<&OutputChannelMask>,
        frame_count: usize,
    ) -> RenderStatus {
        self.drain_commands();

        let status = render::render_block(
            outputs,
            device_mask,
            frame_count,
            &mut self.transport,
            &self.store,
            self.interpolation,
        );

        self.status.publish(&self.store, &self.transport);
        status
    }

    /// Called when the device starts or changes configuration.
    pub fn prepare_to_play(&mut self) {
        self.drain_commands();
        self.transport.reset();
        self.status.publish(&self.store, &self.transport);
    }

    /// Called when the device stops. The engine holds nothing device-bound.
    pub fn release_resources(&mut self) {}

    /// Installs a buffer directly. Only for setup while no callback is
    /// running; returns the buffer it replaced.
    pub fn load_buffer(&mut self, buffer: SampleBuffer) -> Option<SampleBuffer> {
        let previous = self.install(Some(Box::new(buffer)));
        self.status.publish(&self.store, &self.transport);
        previous.map(|buffer| *buffer)
    }

    pub fn set_playback_rate(&mut self, rate: f64) {
        self.transport.set_rate(rate);
        self.status.publish(&self.store, &self.transport);
    }

    pub fn set_interpolation(&mut self, interpolation: InterpolationMode) {
        self.interpolation = interpolation;
    }

    pub fn interpolation(&self) -> InterpolationMode {
        self.interpolation
    }

    pub fn has_buffer(&self) -> bool {
        self.store.has_buffer()
    }

    pub fn channel_count(&self) -> usize {
        self.store.channel_count()
    }

    pub fn frame_count(&self) -> usize {
        self.store.frame_count()
    }

    pub fn position(&self) -> f64 {
        self.transport.position()
    }

    pub fn rate(&self) -> f64 {
        self.transport.rate()
    }

    fn drain_commands(&mut self) {
        loop {
            // A swap that would displace a buffer waits until the controller
            // has made room to take the old one back.
            let blocked = match self.commands.peek() {
                Ok(EngineCommand::Install(_)) => self.store.has_buffer() && self.retired.is_full(),
                Ok(_) => false,
                Err(_) => break,
            };
            if blocked {
                break;
            }

            let Ok(command) = self.commands.pop() else {
                break;
            };

            match command {
                EngineCommand::Install(next) => {
                    if let Some(previous) = self.install(next) {
                        let _ = self.retired.push(previous);
                    }
                }
                EngineCommand::SetRate(rate) => self.transport.set_rate(rate),
                EngineCommand::Seek(position) => self.transport.seek(position),
                EngineCommand::SetInterpolation(mode) => self.interpolation = mode,
            }
        }
    }

    fn install(&mut self, next: Option<Box<SampleBuffer>>) -> Option<Box<SampleBuffer>> {
        let previous = self.store.replace(next);
        self.transport.reset();
        previous
    }
}

impl fmt::Debug for PlaybackEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackEngine")
            .field("channels", &self.store.channel_count())
            .field("frames", &self.store.frame_count())
            .field("transport", &self.transport)
            .field("interpolation", &self.interpolation)
            .finish_non_exhaustive()
    }
}

/// Control-thread half of the player.
///
/// Every setter enqueues a command that the engine applies at the start of
/// its next block. Status getters read the snapshot the engine published
/// after its most recent block.
pub struct EngineController {
    commands: Producer<EngineCommand>,
    retired: Consumer<Box<SampleBuffer>>,
    status: Arc<SharedStatus>,
}

impl EngineController {
    /// Hands `buffer` to the engine. Playback restarts from frame 0 once it
    /// is installed.
    pub fn load_buffer(&mut self, buffer: SampleBuffer) -> Result<()> {
        let channels = buffer.channel_count();
        let frames = buffer.frame_count();
        self.send(EngineCommand::Install(Some(Box::new(buffer))))?;
        tracing::debug!(channels, frames, "queued sample buffer");
        Ok(())
    }

    /// Removes the current buffer; the engine renders silence afterwards.
    pub fn clear_buffer(&mut self) -> Result<()> {
        self.send(EngineCommand::Install(None))?;
        tracing::debug!("queued buffer removal");
        Ok(())
    }

    pub fn set_playback_rate(&mut self, rate: f64) -> Result<()> {
        self.send(EngineCommand::SetRate(rate))?;
        tracing::debug!(rate, "queued playback rate");
        Ok(())
    }

    pub fn seek(&mut self, position: f64) -> Result<()> {
        self.send(EngineCommand::Seek(position))
    }

    pub fn reset_position(&mut self) -> Result<()> {
        self.seek(0.0)
    }

    pub fn set_interpolation(&mut self, interpolation: InterpolationMode) -> Result<()> {
        self.send(EngineCommand::SetInterpolation(interpolation))
    }

    /// Drops buffers the engine has swapped out. Returns how many were freed.
    pub fn collect_retired(&mut self) -> usize {
        let mut freed = 0;
        while let Ok(buffer) = self.retired.pop() {
            drop(buffer);
            freed += 1;
        }
        if freed > 0 {
            tracing::debug!(freed, "released retired sample buffers");
        }
        freed
    }

    pub fn has_buffer(&self) -> bool {
        self.status.has_buffer.load(Ordering::Relaxed)
    }

    pub fn channel_count(&self) -> usize {
        self.status.channel_count.load(Ordering::Relaxed)
    }

    pub fn frame_count(&self) -> usize {
        self.status.frame_count.load(Ordering::Relaxed)
    }

    pub fn position(&self) -> f64 {
        f64::from_bits(self.status.position.load(Ordering::Relaxed))
    }

    pub fn rate(&self) -> f64 {
        f64::from_bits(self.status.rate.load(Ordering::Relaxed))
    }

    fn send(&mut self, command: EngineCommand) -> Result<()> {
        self.collect_retired();
        self.commands
            .push(command)
            .map_err(|_| LoopPlayerError::CommandQueueFull)
    }
}

impl fmt::Debug for EngineController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineController")
            .field("has_buffer", &self.has_buffer())
            .field("position", &self.position())
            .field("rate", &self.rate())
            .finish_non_exhaustive()
    }
}
