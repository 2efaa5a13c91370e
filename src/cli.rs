//! Command-line interface
//!
//! Argument parsing with clap derive macros plus the file-to-file drivers the
//! `sonostego` binary runs. Values come from the command line first, then the
//! configuration file, then built-in defaults.

use crate::codec::{EmbeddingParameters, Method};
use crate::config::{FrequencyMode, StegoConfig};
use crate::error::StegoError;
use crate::io::{load_audio, write_wav, LoadOptions, WavFormat};
use crate::selector::select_method;
use crate::signal::SignalBuffer;
#[cfg(feature = "live-audio")]
use crate::stream::{CpalFrameSink, CpalFrameSource};
use crate::stream::{FrameSink, FrameSource, StreamRunner, StreamTask, WavFrameSink, WavFrameSource};
use crate::{decode_channels, encode_channels};
use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

/// Hide audio inside audio
#[derive(Parser, Debug)]
#[command(name = "sonostego", version, about = "Hide audio inside audio")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to a TOML configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Compute device index (0 = CPU)
    #[arg(long, global = true, value_name = "INDEX", default_value_t = 0)]
    pub device: usize,

    /// Verbose output (-v: debug, -vv: trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Hide a secret file in a cover file
    Encode(EncodeArgs),

    /// Recover a secret from a stego file
    Decode(DecodeArgs),

    /// Run encode or decode frame by frame
    Stream {
        #[command(flatten)]
        live: LiveOptions,

        /// Direction
        #[command(subcommand)]
        mode: StreamMode,
    },
}

/// Audio devices standing in for stream files
#[derive(Args, Debug, Clone, Default)]
pub struct LiveOptions {
    /// Read the input stream from an audio device ("default" or a device name)
    #[cfg(feature = "live-audio")]
    #[arg(long, global = true, value_name = "DEVICE")]
    pub capture: Option<String>,

    /// Play the output stream on an audio device ("default" or a device name)
    #[cfg(feature = "live-audio")]
    #[arg(long, global = true, value_name = "DEVICE")]
    pub playback: Option<String>,
}

/// Streaming directions
#[derive(Subcommand, Debug)]
pub enum StreamMode {
    /// Encode frame by frame
    Encode(EncodeArgs),
    /// Decode frame by frame
    Decode(DecodeArgs),
}

/// Embedding method on the command line
#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
pub enum MethodArg {
    /// Least-significant-bit substitution
    Lsb,
    /// Frequency domain (mode from --fft-mode or the config)
    Fft,
    /// Echo hiding
    Echo,
}

/// Decoding method on the command line
#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
pub enum DecodeMethodArg {
    /// Least-significant-bit substitution
    Lsb,
    /// Frequency domain (mode from --fft-mode or the config)
    Fft,
    /// Echo hiding
    Echo,
    /// Try every blind method and keep the highest-variance output
    Auto,
}

/// Frequency mode on the command line
#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
pub enum FftModeArg {
    /// Additive spectrum mixing (decode needs --cover)
    Additive,
    /// STFT phase modulation (blind)
    Phase,
}

impl From<FftModeArg> for FrequencyMode {
    fn from(mode: FftModeArg) -> Self {
        match mode {
            FftModeArg::Additive => FrequencyMode::Additive,
            FftModeArg::Phase => FrequencyMode::Phase,
        }
    }
}

/// Per-method overrides shared by encode and decode
#[derive(Args, Debug, Clone, Default)]
pub struct MethodOptions {
    /// Frequency mode
    #[arg(long, value_enum)]
    pub fft_mode: Option<FftModeArg>,

    /// LSB bits per sample (1-8)
    #[arg(long, value_name = "N")]
    pub bits: Option<u8>,

    /// Additive frequency weight
    #[arg(long)]
    pub alpha: Option<f32>,

    /// Phase modulation strength
    #[arg(long)]
    pub strength: Option<f32>,

    /// Echo delay in seconds
    #[arg(long, value_name = "SECONDS")]
    pub delay: Option<f32>,

    /// Echo decay, in (0, 1)
    #[arg(long)]
    pub decay: Option<f32>,
}

/// Arguments of `encode`
#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Embedding method
    #[arg(long, value_enum)]
    pub method: MethodArg,

    /// Cover audio
    #[arg(long, short, value_name = "COVER")]
    pub input: Option<PathBuf>,

    /// Secret audio
    #[arg(long, short, value_name = "SECRET")]
    pub secret: Option<PathBuf>,

    /// Stego WAV to write
    #[arg(long, short, value_name = "OUT")]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub options: MethodOptions,
}

/// Arguments of `decode`
#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Decoding method
    #[arg(long, value_enum)]
    pub method: DecodeMethodArg,

    /// Stego audio
    #[arg(long, short, value_name = "STEGO")]
    pub input: Option<PathBuf>,

    /// Original cover (additive frequency mode only)
    #[arg(long, value_name = "COVER")]
    pub cover: Option<PathBuf>,

    /// Extracted WAV to write
    #[arg(long, short, value_name = "OUT")]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub options: MethodOptions,
}

/// Fail unless `index` names an available compute device
///
/// Only the CPU FFT backend (index 0) exists.
pub fn check_device(index: usize) -> crate::Result<()> {
    if index != 0 {
        return Err(StegoError::AcceleratorUnavailable(format!(
            "device {} not found; only the CPU backend (0) is available",
            index
        )));
    }
    Ok(())
}

/// Fold command-line overrides into `config`
pub fn apply_overrides(config: &mut StegoConfig, options: &MethodOptions) {
    if let Some(mode) = options.fft_mode {
        config.frequency.mode = mode.into();
    }
    if let Some(bits) = options.bits {
        config.lsb.num_bits = bits;
    }
    if let Some(alpha) = options.alpha {
        config.frequency.alpha = alpha;
    }
    if let Some(strength) = options.strength {
        config.frequency.strength = strength;
    }
    if let Some(delay) = options.delay {
        config.echo.delay_seconds = delay;
    }
    if let Some(decay) = options.decay {
        config.echo.decay = decay;
    }
}

/// Codec method a command-line method resolves to
pub fn resolve_method(method: MethodArg, config: &StegoConfig) -> Method {
    match method {
        MethodArg::Lsb => Method::Lsb,
        MethodArg::Fft => config.frequency.mode.method(),
        MethodArg::Echo => Method::Echo,
    }
}

fn load_config(path: Option<&Path>) -> Result<StegoConfig> {
    match path {
        Some(path) => StegoConfig::load(path)
            .with_context(|| format!("loading configuration {}", path.display())),
        None => Ok(StegoConfig::default()),
    }
}

fn required(value: Option<PathBuf>, fallback: &Option<PathBuf>, what: &str) -> Result<PathBuf> {
    match value.or_else(|| fallback.clone()) {
        Some(path) => Ok(path),
        None => bail!("missing {} path (pass it on the command line or set it under [paths])", what),
    }
}

/// Stego output format: LSB payloads need the 16-bit grid
fn output_format(method: Method) -> WavFormat {
    match method {
        Method::Lsb => WavFormat::Pcm16,
        _ => WavFormat::Float32,
    }
}

/// Run the parsed command line, returning the path written
///
/// Streams played on an audio device write no file and return `None`.
pub fn run(cli: Cli) -> Result<Option<PathBuf>> {
    check_device(cli.device)?;
    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Encode(args) => {
            apply_overrides(&mut config, &args.options);
            run_encode(&config, args).map(Some)
        }
        Commands::Decode(args) => {
            apply_overrides(&mut config, &args.options);
            run_decode(&config, args).map(Some)
        }
        Commands::Stream { live, mode } => match mode {
            StreamMode::Encode(args) => {
                apply_overrides(&mut config, &args.options);
                run_stream_encode(&config, &live, args)
            }
            StreamMode::Decode(args) => {
                apply_overrides(&mut config, &args.options);
                run_stream_decode(&config, &live, args)
            }
        },
    }
}

fn run_encode(config: &StegoConfig, args: EncodeArgs) -> Result<PathBuf> {
    let cover_path = required(args.input, &config.paths.cover, "cover")?;
    let secret_path = required(args.secret, &config.paths.secret, "secret")?;
    let output = required(args.output, &config.paths.stego, "output")?;
    let method = resolve_method(args.method, config);
    let params = config.parameters(method);
    params.validate()?;

    let cover = load_audio(&cover_path, LoadOptions::normalized())
        .with_context(|| format!("loading cover {}", cover_path.display()))?;
    let secret = load_audio(
        &secret_path,
        LoadOptions::normalized().at_rate(cover.sample_rate),
    )
    .with_context(|| format!("loading secret {}", secret_path.display()))?;

    let stego = encode_channels(&cover, &secret, &params)?;
    write_wav(&output, &stego, output_format(method))
        .with_context(|| format!("writing {}", output.display()))?;
    Ok(output)
}

fn run_decode(config: &StegoConfig, args: DecodeArgs) -> Result<PathBuf> {
    let stego_path = required(args.input, &config.paths.stego, "stego")?;
    let output = required(args.output, &config.paths.extracted, "output")?;

    let stego = load_audio(&stego_path, LoadOptions::raw())
        .with_context(|| format!("loading stego {}", stego_path.display()))?;

    let extracted = match args.method {
        DecodeMethodArg::Auto => decode_auto(config, &stego)?,
        DecodeMethodArg::Lsb | DecodeMethodArg::Fft | DecodeMethodArg::Echo => {
            let method = match args.method {
                DecodeMethodArg::Lsb => Method::Lsb,
                DecodeMethodArg::Fft => config.frequency.mode.method(),
                _ => Method::Echo,
            };
            let params = config.parameters(method);
            params.validate()?;

            let cover_path = args.cover.or_else(|| config.paths.cover.clone());
            let cover = match (&params, cover_path) {
                (EmbeddingParameters::FrequencyAdditive { .. }, Some(path)) => Some(
                    load_audio(&path, LoadOptions::normalized().at_rate(stego.sample_rate))
                        .with_context(|| format!("loading cover {}", path.display()))?,
                ),
                _ => None,
            };
            decode_channels(&stego, cover.as_ref(), &params)?
        }
    };

    write_wav(&output, &extracted, WavFormat::Float32)
        .with_context(|| format!("writing {}", output.display()))?;
    Ok(output)
}

/// Blind selection per channel, printing every score
fn decode_auto(config: &StegoConfig, stego: &SignalBuffer) -> Result<SignalBuffer> {
    let selector = config.selector_config();
    let channels = stego.split_channels();
    let multi = channels.len() > 1;

    let mut chosen = Vec::with_capacity(channels.len());
    for (i, channel) in channels.iter().enumerate() {
        let selection = select_method(channel, &selector)?;
        let prefix = if multi {
            format!("channel {}: ", i)
        } else {
            String::new()
        };
        for (method, variance) in selection.scores() {
            println!("{}{:<12} variance {:.6}", prefix, method, variance);
        }
        if selection.is_ambiguous() {
            println!(
                "{}chosen: {} (tied with {:?})",
                prefix,
                selection.method(),
                selection.tied_with
            );
        } else {
            println!("{}chosen: {}", prefix, selection.method());
        }
        chosen.push(selection.into_signal());
    }

    Ok(SignalBuffer::merge_channels(chosen)?)
}

/// `None` selects the default device
#[cfg(feature = "live-audio")]
fn device_choice(name: &str) -> Option<String> {
    (name != "default").then(|| name.to_string())
}

#[cfg(feature = "live-audio")]
fn capture_source(live: &LiveOptions) -> Option<Box<dyn FrameSource>> {
    live.capture
        .as_deref()
        .map(|name| Box::new(CpalFrameSource::new(device_choice(name))) as Box<dyn FrameSource>)
}

#[cfg(not(feature = "live-audio"))]
fn capture_source(_live: &LiveOptions) -> Option<Box<dyn FrameSource>> {
    None
}

#[cfg(feature = "live-audio")]
fn playback_sink(live: &LiveOptions) -> Option<Box<dyn FrameSink>> {
    live.playback
        .as_deref()
        .map(|name| Box::new(CpalFrameSink::new(device_choice(name))) as Box<dyn FrameSink>)
}

#[cfg(not(feature = "live-audio"))]
fn playback_sink(_live: &LiveOptions) -> Option<Box<dyn FrameSink>> {
    None
}

/// Primary stream: the capture device if one was asked for, else a WAV file
fn stream_source(
    live: &LiveOptions,
    path: Option<PathBuf>,
    fallback: &Option<PathBuf>,
    what: &str,
) -> Result<Box<dyn FrameSource>> {
    match capture_source(live) {
        Some(source) => Ok(source),
        None => Ok(Box::new(WavFrameSource::new(required(path, fallback, what)?))),
    }
}

/// Output stream: the playback device if one was asked for, else a WAV file
fn stream_sink(
    live: &LiveOptions,
    path: Option<PathBuf>,
    fallback: &Option<PathBuf>,
    format: WavFormat,
) -> Result<(Box<dyn FrameSink>, Option<PathBuf>)> {
    match playback_sink(live) {
        Some(sink) => Ok((sink, None)),
        None => {
            let output = required(path, fallback, "output")?;
            Ok((Box::new(WavFrameSink::new(&output, format)), Some(output)))
        }
    }
}

fn run_stream_encode(
    config: &StegoConfig,
    live: &LiveOptions,
    args: EncodeArgs,
) -> Result<Option<PathBuf>> {
    let cover = stream_source(live, args.input, &config.paths.cover, "cover")?;
    let secret_path = required(args.secret, &config.paths.secret, "secret")?;
    let method = resolve_method(args.method, config);
    let (mut sink, output) = stream_sink(
        live,
        args.output,
        &config.paths.stego,
        output_format(method),
    )?;

    let task = StreamTask::Encode {
        cover,
        secret: Box::new(WavFrameSource::new(secret_path)),
        params: config.parameters(method),
    };
    let stats = StreamRunner::new(&config.stream).run(task, sink.as_mut())?;
    log::info!(
        "{} frames encoded, {} skipped",
        stats.frames_processed,
        stats.frames_failed
    );
    Ok(output)
}

fn run_stream_decode(
    config: &StegoConfig,
    live: &LiveOptions,
    args: DecodeArgs,
) -> Result<Option<PathBuf>> {
    let method = match args.method {
        DecodeMethodArg::Lsb => Method::Lsb,
        DecodeMethodArg::Fft => config.frequency.mode.method(),
        DecodeMethodArg::Echo => Method::Echo,
        DecodeMethodArg::Auto => bail!("blind decoding is not available in stream mode"),
    };
    let params = config.parameters(method);
    let stego = stream_source(live, args.input, &config.paths.stego, "stego")?;
    let (mut sink, output) = stream_sink(
        live,
        args.output,
        &config.paths.extracted,
        WavFormat::Float32,
    )?;

    let cover = match params {
        EmbeddingParameters::FrequencyAdditive { .. } => args
            .cover
            .or_else(|| config.paths.cover.clone())
            .map(|p| Box::new(WavFrameSource::new(p)) as Box<dyn FrameSource>),
        _ => None,
    };

    let task = StreamTask::Decode {
        stego,
        cover,
        params,
    };
    let stats = StreamRunner::new(&config.stream).run(task, sink.as_mut())?;
    log::info!(
        "{} frames decoded, {} skipped",
        stats.frames_processed,
        stats.frames_failed
    );
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_encode() {
        let cli = Cli::try_parse_from([
            "sonostego", "encode", "--method", "fft", "--fft-mode", "phase", "--input", "c.wav",
            "--secret", "s.wav", "--output", "o.wav", "--strength", "0.05",
        ])
        .unwrap();

        let Commands::Encode(args) = cli.command else {
            panic!("expected encode");
        };
        let mut config = StegoConfig::default();
        apply_overrides(&mut config, &args.options);
        assert_eq!(resolve_method(args.method, &config), Method::FrequencyPhase);
        assert_eq!(config.frequency.strength, 0.05);
        assert_eq!(cli.device, 0);
    }

    #[test]
    fn test_parse_decode_auto_with_global_flags() {
        let cli = Cli::try_parse_from([
            "sonostego", "decode", "--method", "auto", "--input", "x.wav", "--output", "y.wav",
            "--device", "2", "-vv",
        ])
        .unwrap();
        assert_eq!(cli.device, 2);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(
            cli.command,
            Commands::Decode(DecodeArgs {
                method: DecodeMethodArg::Auto,
                ..
            })
        ));
    }

    #[test]
    fn test_unknown_method_rejected() {
        assert!(Cli::try_parse_from(["sonostego", "encode", "--method", "dct"]).is_err());
        assert!(Cli::try_parse_from(["sonostego", "encode", "--method", "auto"]).is_err());
    }

    #[test]
    fn test_device_check() {
        assert!(check_device(0).is_ok());
        assert!(matches!(
            check_device(1),
            Err(StegoError::AcceleratorUnavailable(_))
        ));
    }

    #[test]
    fn test_missing_secret_reported() {
        let cli = Cli::try_parse_from([
            "sonostego", "encode", "--method", "lsb", "--input", "c.wav", "--output", "o.wav",
        ])
        .unwrap();
        let err = run(cli).unwrap_err();
        assert!(err.to_string().contains("secret"));
    }

    #[test]
    fn test_stream_without_devices_needs_files() {
        let cli = Cli::try_parse_from([
            "sonostego", "stream", "encode", "--method", "lsb", "--secret", "s.wav", "--output",
            "o.wav",
        ])
        .unwrap();
        assert!(capture_source(&LiveOptions::default()).is_none());
        assert!(playback_sink(&LiveOptions::default()).is_none());
        let err = run(cli).unwrap_err();
        assert!(err.to_string().contains("cover"));
    }

    #[cfg(feature = "live-audio")]
    #[test]
    fn test_parse_live_devices() {
        let cli = Cli::try_parse_from([
            "sonostego", "stream", "encode", "--method", "echo", "--capture", "default",
            "--playback", "USB Audio", "--secret", "s.wav",
        ])
        .unwrap();
        let Commands::Stream { live, .. } = cli.command else {
            panic!("expected stream");
        };
        assert_eq!(live.capture.as_deref().and_then(device_choice), None);
        assert_eq!(
            live.playback.as_deref().and_then(device_choice),
            Some("USB Audio".to_string())
        );
        assert!(capture_source(&live).is_some());
        assert!(playback_sink(&live).is_some());
    }
}
