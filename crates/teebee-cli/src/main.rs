use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use teebee_engine::{AudioBuffer, AudioProcessor, BufferConfig, ChannelLayout};
use teebee_filter::{
    FilterMode, TeeBeeFilter, PARAM_AUTOMATION, PARAM_CUTOFF, PARAM_DRIVE, PARAM_FEEDBACK_AMOUNT,
    PARAM_FEEDBACK_HP, PARAM_MODE, PARAM_RESONANCE,
};
use teebee_plugin_sdk::{NativePlugin, ParameterDefinition, ParameterKind, ParameterValue};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init()
        .ok();

    let cli = Cli::parse();
    match cli.command {
        Commands::Render(args) => execute_render(args),
        Commands::Impulse(args) => execute_impulse(args),
        Commands::State(args) => execute_state(args),
        Commands::Params => execute_params(),
    }
}

#[derive(Parser)]
#[command(author, version, about = "Offline tools for the TeeBee diode ladder filter")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a WAV file through the filter.
    Render(RenderArgs),
    /// Print the left channel impulse response, one sample per line.
    Impulse(ImpulseArgs),
    /// Print the plugin state for the given parameters as JSON.
    State(StateArgs),
    /// List the automatable parameters with their ranges and defaults.
    Params,
}

/// Parameter overrides shared by every subcommand. Flags that are not given
/// keep the value from `--state`, or the default.
#[derive(Args, Debug, Default)]
struct FilterArgs {
    /// Cutoff frequency in Hz.
    #[arg(long)]
    cutoff: Option<f32>,
    /// Resonance in percent.
    #[arg(long)]
    resonance: Option<f32>,
    /// Input drive in dB.
    #[arg(long, allow_negative_numbers = true)]
    drive: Option<f32>,
    /// Filter response.
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,
    /// Feedback high-pass cutoff in Hz.
    #[arg(long = "fb-hp")]
    fb_hp: Option<f32>,
    /// Feedback amount in percent.
    #[arg(long = "fb-amount")]
    fb_amount: Option<f32>,
    /// Use the short smoothing window meant for host automation.
    #[arg(long)]
    automation: bool,
    /// State file written by `teebee state`.
    #[arg(long)]
    state: Option<PathBuf>,
}

impl FilterArgs {
    fn overrides(&self) -> Vec<(&'static str, ParameterValue)> {
        let continuous = [
            (PARAM_CUTOFF, self.cutoff),
            (PARAM_RESONANCE, self.resonance),
            (PARAM_DRIVE, self.drive),
            (PARAM_FEEDBACK_HP, self.fb_hp),
            (PARAM_FEEDBACK_AMOUNT, self.fb_amount),
        ];
        let mut overrides: Vec<_> = continuous
            .into_iter()
            .filter_map(|(id, value)| value.map(|v| (id, ParameterValue::Continuous(v))))
            .collect();
        if let Some(mode) = self.mode {
            overrides.push((PARAM_MODE, ParameterValue::Choice(FilterMode::from(mode).index())));
        }
        if self.automation {
            overrides.push((PARAM_AUTOMATION, ParameterValue::Toggle(true)));
        }
        overrides
    }

    fn configure(&self, plugin: &mut TeeBeeFilter) -> Result<()> {
        if let Some(path) = &self.state {
            let data = fs::read(path)
                .with_context(|| format!("failed to read state file {}", path.display()))?;
            plugin
                .restore_state(&data)
                .with_context(|| format!("{} is not a valid state file", path.display()))?;
        }
        for (id, value) in self.overrides() {
            let stored = plugin
                .set_parameter(&id.into(), value)
                .with_context(|| format!("failed to set parameter `{id}`"))?;
            if stored != value {
                tracing::warn!(parameter = id, ?value, ?stored, "parameter value clamped");
            }
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Tb303,
    Lp24,
    Lp18,
    Lp12,
    Hp12,
    Flat,
}

impl From<ModeArg> for FilterMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Tb303 => FilterMode::Tb303,
            ModeArg::Lp24 => FilterMode::LowPass24,
            ModeArg::Lp18 => FilterMode::LowPass18,
            ModeArg::Lp12 => FilterMode::LowPass12,
            ModeArg::Hp12 => FilterMode::HighPass12,
            ModeArg::Flat => FilterMode::Flat,
        }
    }
}

#[derive(Args)]
struct RenderArgs {
    /// WAV file to process.
    #[arg(long)]
    input: PathBuf,
    /// Destination; always written as 32-bit float WAV.
    #[arg(long)]
    output: PathBuf,
    /// Frames handed to the filter per process call.
    #[arg(long, default_value_t = 512)]
    block_size: usize,
    #[command(flatten)]
    filter: FilterArgs,
}

#[derive(Args)]
struct ImpulseArgs {
    /// Length of the response in samples.
    #[arg(long, default_value_t = 64)]
    samples: usize,
    #[arg(long, default_value_t = 44_100.0)]
    sample_rate: f32,
    #[command(flatten)]
    filter: FilterArgs,
}

#[derive(Args)]
struct StateArgs {
    #[command(flatten)]
    filter: FilterArgs,
}

fn execute_render(args: RenderArgs) -> Result<()> {
    ensure!(args.block_size > 0, "block size must be at least one frame");

    let (spec, mut channels) = read_wav(&args.input)?;

    let mut plugin = TeeBeeFilter::new();
    args.filter.configure(&mut plugin)?;
    let config = BufferConfig::new(
        spec.sample_rate as f32,
        args.block_size,
        ChannelLayout::from_channels(channels.len()),
    );
    plugin.prepare(&config)?;

    let tail = tail_frames(&plugin, spec.sample_rate);
    for channel in channels.iter_mut() {
        channel.resize(channel.len() + tail, 0.0);
    }
    let frames = channels.first().map(Vec::len).unwrap_or_default();

    process_in_blocks(&mut plugin, &mut channels, args.block_size)?;
    write_wav(&args.output, spec.sample_rate, &channels)?;

    tracing::info!(
        frames,
        tail,
        channels = channels.len(),
        sample_rate = spec.sample_rate,
        "rendered {} -> {}",
        args.input.display(),
        args.output.display()
    );
    println!(
        "Rendered {} frames x {} channels to {}",
        frames,
        channels.len(),
        args.output.display()
    );
    Ok(())
}

fn execute_impulse(args: ImpulseArgs) -> Result<()> {
    ensure!(args.samples > 0, "impulse length must be at least one sample");

    let mut plugin = TeeBeeFilter::new();
    args.filter.configure(&mut plugin)?;
    let config = BufferConfig::new(args.sample_rate, args.samples, ChannelLayout::Stereo);
    plugin.prepare(&config)?;

    let mut buffer = AudioBuffer::from_config(config);
    if let Some(left) = buffer.channel_mut(0) {
        left[0] = 1.0;
    }
    plugin.process(&mut buffer)?;

    for sample in buffer.channel(0).unwrap_or_default() {
        println!("{sample}");
    }
    Ok(())
}

fn execute_state(args: StateArgs) -> Result<()> {
    let mut plugin = TeeBeeFilter::new();
    args.filter.configure(&mut plugin)?;
    let state: serde_json::Value = serde_json::from_slice(&plugin.state()?)?;
    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}

fn execute_params() -> Result<()> {
    let plugin = TeeBeeFilter::new();
    for definition in plugin.parameter_layout().parameters() {
        println!("{}", describe_parameter(definition));
    }
    Ok(())
}

fn describe_parameter(definition: &ParameterDefinition) -> String {
    let range = match &definition.kind {
        ParameterKind::Continuous(options) => {
            let mut range = format!(
                "{} to {} (default {})",
                options.min, options.max, options.default
            );
            if let Some(unit) = definition.unit {
                range = format!("{range} {unit}");
            }
            if let Some(skew) = options.skew {
                range = format!("{range}, skew {skew}");
            }
            range
        }
        ParameterKind::Toggle { default } => format!("on/off (default {})", on_off(*default)),
        ParameterKind::Choice { options, default } => format!(
            "{} (default {})",
            options.join(" | "),
            options.get(*default).map(String::as_str).unwrap_or_default()
        ),
    };
    let mut line = format!("{:<8} {:<16} {range}", definition.id.as_str(), definition.name);
    if let Some(description) = definition.description {
        line = format!("{line}\n         {description}");
    }
    line
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

/// Silent frames appended to a render so the filter can ring out.
fn tail_frames(plugin: &impl AudioProcessor, sample_rate: u32) -> usize {
    (plugin.tail_seconds() * f64::from(sample_rate)).ceil() as usize
}

fn process_in_blocks(
    plugin: &mut TeeBeeFilter,
    channels: &mut [Vec<f32>],
    block_size: usize,
) -> Result<()> {
    let frames = channels.first().map(Vec::len).unwrap_or_default();
    let mut start = 0;
    while start < frames {
        let end = (start + block_size).min(frames);
        let mut buffer = AudioBuffer::from_channels(
            channels
                .iter()
                .map(|channel| channel[start..end].to_vec())
                .collect(),
        );
        plugin.process(&mut buffer)?;
        for (channel, processed) in channels.iter_mut().zip(buffer.into_channels()) {
            channel[start..end].copy_from_slice(&processed);
        }
        start = end;
    }
    Ok(())
}

fn read_wav(path: &Path) -> Result<(WavSpec, Vec<Vec<f32>>)> {
    let mut reader = WavReader::open(path)
        .with_context(|| format!("failed to open input file {}", path.display()))?;
    let spec = reader.spec();
    ensure!(spec.channels > 0, "{} has no channels", path.display());

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .with_context(|| format!("failed to decode {}", path.display()))?,
        SampleFormat::Int => {
            let scale = 1.0 / (1u64 << spec.bits_per_sample.saturating_sub(1)) as f32;
            reader
                .samples::<i32>()
                .map(|sample| sample.map(|s| s as f32 * scale))
                .collect::<Result<_, _>>()
                .with_context(|| format!("failed to decode {}", path.display()))?
        }
    };
    Ok((spec, deinterleave(&interleaved, usize::from(spec.channels))))
}

fn write_wav(path: &Path, sample_rate: u32, channels: &[Vec<f32>]) -> Result<()> {
    let spec = WavSpec {
        channels: u16::try_from(channels.len()).context("too many channels for WAV")?,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(path, spec)
        .with_context(|| format!("failed to create output file {}", path.display()))?;
    for sample in interleave(channels) {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}

fn deinterleave(samples: &[f32], channel_count: usize) -> Vec<Vec<f32>> {
    let frames = samples.len() / channel_count;
    let mut channels = vec![Vec::with_capacity(frames); channel_count];
    for frame in samples.chunks_exact(channel_count) {
        for (channel, sample) in channels.iter_mut().zip(frame) {
            channel.push(*sample);
        }
    }
    channels
}

fn interleave(channels: &[Vec<f32>]) -> impl Iterator<Item = f32> + '_ {
    let frames = channels.first().map(Vec::len).unwrap_or_default();
    (0..frames).flat_map(move |frame| channels.iter().map(move |channel| channel[frame]))
}
