use std::f32::consts::PI;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use loop_player_core::{
    load_path, to_raw_pcm, AppConfig, BlockAnalyzer, BufferLoader, InterpolationMode, PlaybackEngine,
    RawPcmLoader, SampleBuffer,
};
use tracing_subscriber::EnvFilter;

fn main() -> loop_player_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render(args) => run_render(args),
        Commands::Inspect { source } => run_inspect(&source),
        Commands::Config { output } => run_config(output.as_deref()),
    }
}

fn run_render(args: RenderArgs) -> loop_player_core::Result<()> {
    let config = args.resolve_config()?;
    let sample_rate = config.audio.sample_rate;
    let block_size = config.audio.block_size;
    let output_channels = config.audio.output_channels;
    let mask = config.audio.output_mask()?;

    tracing::info!(
        rate = config.engine.playback_rate,
        interpolation = ?config.engine.interpolation,
        block_size,
        output_channels,
        blocks = args.blocks,
        "starting offline render"
    );

    let (mut engine, mut controller) = PlaybackEngine::new(&config.engine);
    match load_source(&args.source, sample_rate, true)? {
        Some(buffer) => controller.load_buffer(buffer)?,
        None => tracing::warn!("no source buffer available; output will be silent"),
    }
    engine.prepare_to_play();

    let mut block = vec![vec![0.0_f32; block_size]; output_channels];
    let mut rendered: Vec<Vec<f32>> = (0..output_channels)
        .map(|_| Vec::with_capacity(block_size * args.blocks))
        .collect();

    for index in 0..args.blocks {
        let status = {
            let mut outputs: Vec<&mut [f32]> = block.iter_mut().map(Vec::as_mut_slice).collect();
            engine.render_block(&mut outputs, Some(&mask), block_size)
        };
        if status.is_silenced() {
            tracing::debug!(block = index, ?status, "block rendered as silence");
        }

        for (channel, samples) in rendered.iter_mut().zip(&block) {
            channel.extend_from_slice(samples);
        }
    }
    engine.release_resources();

    tracing::info!(
        has_buffer = controller.has_buffer(),
        source_channels = controller.channel_count(),
        source_frames = controller.frame_count(),
        position = controller.position(),
        "render finished"
    );

    if block_size * args.blocks >= 2 {
        let mut analyzer = BlockAnalyzer::new(sample_rate);
        for (channel, report) in analyzer.analyze(&rendered)?.iter().enumerate() {
            tracing::info!(
                channel,
                rms = report.rms,
                peak = report.peak,
                dominant_hz = report.dominant_hz,
                "output channel"
            );
        }
    }

    if let Some(output) = &args.output {
        std::fs::write(output, to_raw_pcm(&rendered))?;
        tracing::info!(?output, "wrote rendered audio as raw interleaved f32");
    }

    Ok(())
}

fn run_inspect(source: &SourceArgs) -> loop_player_core::Result<()> {
    let sample_rate = AppConfig::default().audio.sample_rate;
    let Some(buffer) = load_source(source, sample_rate, false)? else {
        tracing::warn!("source did not produce a buffer");
        return Ok(());
    };

    tracing::info!(
        channels = buffer.channel_count(),
        frames = buffer.frame_count(),
        seconds = buffer.duration_seconds(sample_rate),
        "source buffer"
    );
    Ok(())
}

fn run_config(output: Option<&Path>) -> loop_player_core::Result<()> {
    let text = serde_json::to_string_pretty(&AppConfig::default())?;
    match output {
        Some(path) => {
            std::fs::write(path, text)?;
            tracing::info!(?path, "wrote default configuration");
        }
        None => println!("{text}"),
    }
    Ok(())
}

/// Builds the source buffer from a raw PCM file or a generated tone. With
/// `tolerant` set, an undecodable file yields `None` instead of an error.
fn load_source(
    source: &SourceArgs,
    sample_rate: u32,
    tolerant: bool,
) -> loop_player_core::Result<Option<SampleBuffer>> {
    let loader = RawPcmLoader::new(source.channels);

    match &source.input {
        Some(path) if tolerant => {
            let bytes = std::fs::read(path)?;
            Ok(loader.load_or_absent(&bytes))
        }
        Some(path) => load_path(&loader, path).map(Some),
        None => tone_buffer(source.tone_hz, source.tone_seconds, sample_rate, source.channels).map(Some),
    }
}

fn tone_buffer(
    hz: f32,
    seconds: f32,
    sample_rate: u32,
    channels: usize,
) -> loop_player_core::Result<SampleBuffer> {
    let frames = (seconds.max(0.0) * sample_rate as f32) as usize;
    let samples: Vec<f32> = (0..frames)
        .map(|i| (2.0 * PI * hz * i as f32 / sample_rate as f32).sin())
        .collect();

    tracing::debug!(hz, frames, channels, "generated test tone");
    SampleBuffer::from_channels(vec![samples; channels])
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Looping sample player driven block by block", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Drive the engine offline as an audio device would and report the output.
    Render(RenderArgs),
    /// Load a source and report its shape.
    Inspect {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Print (or write) the default configuration document.
    Config {
        /// Destination file; stdout when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Headerless interleaved little-endian f32 file to play.
    #[arg(short, long)]
    input: Option<PathBuf>,
    /// Channel count of the input file, or of the generated tone.
    #[arg(short, long, default_value_t = 1)]
    channels: usize,
    /// Frequency of the generated tone used when no input is given.
    #[arg(long, default_value_t = 440.0)]
    tone_hz: f32,
    /// Length of the generated tone in seconds.
    #[arg(long, default_value_t = 1.0)]
    tone_seconds: f32,
}

#[derive(Args, Debug)]
struct RenderArgs {
    #[command(flatten)]
    source: SourceArgs,
    /// JSON configuration file; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Playback rate multiplier. Negative values play in reverse.
    #[arg(short, long, allow_hyphen_values = true)]
    rate: Option<f64>,
    #[arg(short, long, value_enum)]
    mode: Option<ModeArg>,
    #[arg(long)]
    block_size: Option<usize>,
    /// Number of output channels the simulated device exposes.
    #[arg(long)]
    outputs: Option<usize>,
    /// Comma separated list of active output channels.
    #[arg(long, value_delimiter = ',')]
    active: Option<Vec<usize>>,
    /// Number of device blocks to render.
    #[arg(short, long, default_value_t = 16)]
    blocks: usize,
    /// Write the rendered output as raw interleaved f32.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl RenderArgs {
    fn resolve_config(&self) -> loop_player_core::Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::from_path(path)?,
            None => AppConfig::default(),
        };

        if let Some(rate) = self.rate {
            config.engine.playback_rate = rate;
        }
        if let Some(mode) = self.mode {
            config.engine.interpolation = mode.into();
        }
        if let Some(block_size) = self.block_size {
            config.audio.block_size = block_size;
        }
        if let Some(outputs) = self.outputs {
            config.audio.output_channels = outputs;
        }
        if let Some(active) = &self.active {
            config.audio.active_channels = Some(active.clone());
        }

        Ok(config)
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Linear,
    Nearest,
}

impl From<ModeArg> for InterpolationMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Linear => InterpolationMode::Linear,
            ModeArg::Nearest => InterpolationMode::Nearest,
        }
    }
}
