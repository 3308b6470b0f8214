use clap::{Parser, Subcommand};
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use std::path::{Path, PathBuf};
use tonelink_core::resample::resample;
use tonelink_core::{
    flip_positions, BitString, CancelToken, LinkConfig, MemorySink, MemorySource, Receiver,
    Reception, Transmitter,
};

mod wav;

use wav::{read_wav, WavSink};

#[derive(Parser)]
#[command(name = "tonelink")]
#[command(about = "Acoustic FSK data link with CRC error correction")]
struct Cli {
    /// JSON link configuration (defaults are used for missing fields)
    #[arg(short, long, global = true, value_name = "CONFIG.JSON")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a bit string to a WAV audio file
    Send {
        /// Payload, e.g. 1010
        #[arg(value_name = "BITS")]
        bits: String,

        /// Output WAV file
        #[arg(value_name = "OUTPUT.WAV")]
        output: PathBuf,

        /// Flip the body bit at this fractional position in (0, 1]
        #[arg(short, long, value_name = "FRACTION")]
        flip: Vec<f32>,
    },

    /// Decode a bit string from a WAV audio file
    Receive {
        /// Input WAV file
        #[arg(value_name = "INPUT.WAV")]
        input: PathBuf,
    },

    /// Send and receive in memory, without audio files
    Simulate {
        /// Payload, e.g. 1010
        #[arg(value_name = "BITS")]
        bits: String,

        /// Flip the body bit at this fractional position in (0, 1]
        #[arg(short, long, value_name = "FRACTION")]
        flip: Vec<f32>,

        /// Standard deviation of added Gaussian noise
        #[arg(short, long, default_value = "0.0")]
        noise: f32,

        /// Seed for the noise generator
        #[arg(long, default_value = "0")]
        seed: u64,
    },

    /// Print the effective configuration as JSON
    Config,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Send { bits, output, flip } => {
            let config = load_config(cli.config.as_deref())?;
            send_command(&config, &bits, &output, &flip)?
        }
        Commands::Receive { input } => {
            let config = load_config(cli.config.as_deref())?;
            receive_command(&config, &input)?
        }
        Commands::Simulate {
            bits,
            flip,
            noise,
            seed,
        } => {
            let config = load_config(cli.config.as_deref())?;
            simulate_command(&config, &bits, &flip, noise, seed)?
        }
        Commands::Config => {
            let config = load_config(cli.config.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<LinkConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            let config: LinkConfig = serde_json::from_str(&text)?;
            info!("Loaded configuration from {}", path.display());
            config
        }
        None => LinkConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

/// Body indices selected by `--flip` fractions for this payload
fn injected_flips(
    transmitter: &Transmitter,
    payload: &BitString,
    fractions: &[f32],
) -> Result<Vec<usize>, Box<dyn std::error::Error>> {
    if fractions.is_empty() {
        return Ok(Vec::new());
    }
    let body_len = transmitter.prepare(payload, &[])?.body().len();
    Ok(flip_positions(fractions, body_len))
}

fn send_command(
    config: &LinkConfig,
    bits: &str,
    output_path: &Path,
    fractions: &[f32],
) -> Result<(), Box<dyn std::error::Error>> {
    let payload: BitString = bits.parse()?;
    let transmitter = Transmitter::new(config)?;
    let flips = injected_flips(&transmitter, &payload, fractions)?;

    let mut sink = WavSink::create(output_path, config.tx.sample_rate)?;
    let written = transmitter.send(&payload, &flips, &mut sink)?;
    sink.finalize()?;

    println!(
        "Wrote {} samples ({:.1} s) to {}",
        written,
        written as f32 / config.tx.sample_rate as f32,
        output_path.display()
    );
    Ok(())
}

fn receive_command(config: &LinkConfig, input_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut source = read_wav(input_path, config.rx.sample_rate)?;
    println!("Read {} samples from {}", source.remaining(), input_path.display());

    let reception = listen(config, &mut source)?;
    print_reception(&reception);
    Ok(())
}

fn simulate_command(
    config: &LinkConfig,
    bits: &str,
    fractions: &[f32],
    noise: f32,
    seed: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let payload: BitString = bits.parse()?;
    let transmitter = Transmitter::new(config)?;
    let flips = injected_flips(&transmitter, &payload, fractions)?;

    let mut sink = MemorySink::new(config.tx.sample_rate);
    transmitter.send(&payload, &flips, &mut sink)?;
    let mut samples = resample(&sink.into_samples(), config.tx.sample_rate, config.rx.sample_rate);

    if noise > 0.0 {
        let mut rng = StdRng::seed_from_u64(seed);
        let normal = Normal::new(0.0, noise)?;
        for sample in samples.iter_mut() {
            *sample += normal.sample(&mut rng);
        }
        println!("Added Gaussian noise (sigma {})", noise);
    }

    let mut source = MemorySource::new(samples, config.rx.sample_rate);
    let reception = listen(config, &mut source)?;
    print_reception(&reception);

    if reception.message == payload {
        println!("Payload recovered");
    } else {
        return Err(format!("Sent {} but received {}", payload, reception.message).into());
    }
    Ok(())
}

fn listen(config: &LinkConfig, source: &mut MemorySource) -> Result<Reception, Box<dyn std::error::Error>> {
    let mut receiver = Receiver::new(config)?;
    Ok(receiver.receive(source, &CancelToken::new())?)
}

fn print_reception(reception: &Reception) {
    println!("Message: {}", reception.message);
    println!("Codeword: {}", reception.codeword);
    match reception.correction.flipped() {
        [] => println!("CRC: clean"),
        flipped => println!("CRC: corrected bits {:?}", flipped),
    }
    if !reception.frame.suspected_flips.is_empty() {
        println!(
            "Padding bits set at {:?}",
            reception.frame.suspected_flips
        );
    }
}
