mod config;
mod error;
mod report;
mod wav;

use clap::{Parser, Subcommand};
use config::{ModemArgs, Settings};
use error::CliError;
use log::{info, warn};
use report::ConsoleSink;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tonelink_core::tones::tone_table;
use tonelink_core::{
    Listener, Packet, Payload, ToneChannel, Transmitter, DEFAULT_TONE_GAIN, PREAMBLE_FREQUENCY_HZ,
};
use wav::{WavCapture, WavPlayback};

#[derive(Parser)]
#[command(name = "tonelink")]
#[command(about = "Acoustic data modem: text and images over 16-tone FSK")]
struct Cli {
    #[command(flatten)]
    modem: ModemArgs,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode text or an image into a WAV file
    Encode {
        /// Text message to send
        #[arg(long, conflicts_with = "image", required_unless_present = "image")]
        text: Option<String>,

        /// Compressed image file to send as-is
        #[arg(long, requires_all = ["width", "height"])]
        image: Option<PathBuf>,

        /// Image width in pixels
        #[arg(long)]
        width: Option<u16>,

        /// Image height in pixels
        #[arg(long)]
        height: Option<u16>,

        /// Output WAV file
        #[arg(short, long, value_name = "OUTPUT.WAV")]
        output: PathBuf,

        /// Peak tone gain (0.01..1.0)
        #[arg(long, default_value_t = DEFAULT_TONE_GAIN)]
        gain: f32,
    },

    /// Receive every packet found in a WAV file
    Decode {
        /// Input WAV file
        #[arg(value_name = "INPUT.WAV")]
        input: PathBuf,

        /// Where to write received image bytes
        #[arg(long, value_name = "FILE")]
        image_out: Option<PathBuf>,

        /// Print receiver events as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Send text through a noiseless tone-level channel
    Loopback {
        #[arg(long)]
        text: String,
    },

    /// Print the tone table for the current settings
    Tones,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let settings = cli.modem.resolve()?;

    match cli.command {
        Commands::Encode {
            text,
            image,
            width,
            height,
            output,
            gain,
        } => {
            let payload = match (text, image) {
                (Some(text), _) => Payload::Text(text),
                (None, Some(path)) => Payload::Image {
                    width: width.unwrap_or_default(),
                    height: height.unwrap_or_default(),
                    data: std::fs::read(&path).map_err(|e| CliError::io(&path, e))?,
                },
                (None, None) => {
                    return Err(CliError::Usage("either --text or --image is required".into()).into())
                }
            };
            encode_command(&settings, &payload, gain, &output)?
        }
        Commands::Decode {
            input,
            image_out,
            json,
        } => decode_command(&settings, &input, image_out.as_deref(), json)?,
        Commands::Loopback { text } => loopback_command(&settings, text)?,
        Commands::Tones => tones_command(&settings),
    }

    Ok(())
}

fn encode_command(settings: &Settings, payload: &Payload, gain: f32, output: &Path) -> Result<(), CliError> {
    let mut tx = Transmitter::new(settings.modem)?;
    tx.set_gain(gain);

    let mut playback = WavPlayback::new(settings.sample_rate);
    let plan = tx.send(payload, &mut playback)?;
    let length = playback.write(output, plan.total)?;

    println!(
        "Encoded {} bytes ({} tones) into {:.2}s of audio: {}",
        payload.bytes().len(),
        plan.tones.len(),
        length.as_secs_f32(),
        output.display()
    );
    Ok(())
}

fn decode_command(
    settings: &Settings,
    input: &Path,
    image_out: Option<&Path>,
    json: bool,
) -> Result<(), CliError> {
    let mut listener = Listener::new(WavCapture::new(input));
    let mut sink = ConsoleSink::new(json);
    listener.run(&settings.modem, &mut sink)?;

    if sink.packets.is_empty() {
        return Err(CliError::NothingDecoded);
    }

    let mut images = 0;
    for packet in &sink.packets {
        match packet {
            Packet::Text { text } => {
                if !json {
                    println!("{}", text);
                }
            }
            Packet::Image {
                width,
                height,
                data,
            } => {
                let Some(base) = image_out else {
                    warn!(
                        "Received {}x{} image ({} bytes); pass --image-out to save it",
                        width,
                        height,
                        data.len()
                    );
                    continue;
                };
                let path = numbered_path(base, images);
                std::fs::write(&path, data).map_err(|e| CliError::io(&path, e))?;
                info!("Wrote {}x{} image to {}", width, height, path.display());
                images += 1;
            }
        }
    }
    Ok(())
}

/// `base` for the first image, `stem-N.ext` for later ones
fn numbered_path(base: &Path, index: usize) -> PathBuf {
    if index == 0 {
        return base.to_path_buf();
    }
    let stem = base.file_stem().and_then(|s| s.to_str()).unwrap_or("image");
    let name = match base.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}-{}.{}", stem, index, ext),
        None => format!("{}-{}", stem, index),
    };
    base.with_file_name(name)
}

fn loopback_command(settings: &Settings, text: String) -> Result<(), CliError> {
    let plan = Transmitter::new(settings.modem)?.plan(&Payload::Text(text))?;

    let mut channel = ToneChannel::new().with_tail(Duration::from_secs(1));
    channel.transmit(&plan, Duration::ZERO);

    let mut listener = Listener::new(channel);
    let mut sink = ConsoleSink::new(false);
    listener.run(&settings.modem, &mut sink)?;

    match sink.packets.first() {
        Some(Packet::Text { text }) => {
            println!("{}", text);
            Ok(())
        }
        _ => Err(CliError::NothingDecoded),
    }
}

fn tones_command(settings: &Settings) {
    let config = &settings.modem;
    println!(
        "preamble  {:>7.1} Hz  ({} ms symbols)",
        PREAMBLE_FREQUENCY_HZ,
        config.symbol_duration.as_millis()
    );
    for (symbol, frequency) in tone_table(config).iter().enumerate() {
        println!("0x{:X}       {:>7.1} Hz", symbol, frequency);
    }
}
