use clap::{Parser, Subcommand};
use log::LevelFilter;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use snn_sweep::config::SweepConfig;
use snn_sweep::error::ConfigError;
use snn_sweep::sweep::{expand, expand_experiment, Trial};

#[derive(Parser, Debug)]
#[command(name = "snn-sweep", version, about = "Validate and expand spiking neural network parameter sweeps")]
struct Args {
    /// The log level, one of: off, error, warn, info, debug, trace
    #[arg(long, default_value = "info")]
    log_level: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load and validate a sweep document, then summarize its experiments
    Check {
        /// The sweep document
        config: PathBuf,
    },
    /// Expand the experiments of a sweep document into trials, written as JSON
    Expand {
        /// The sweep document
        config: PathBuf,
        /// Only expand the experiment with this name
        #[arg(short, long)]
        experiment: Option<String>,
        /// The output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Encode binary samples as input spike trains using the document's input parameters
    Encode {
        /// The sweep document
        config: PathBuf,
        /// Comma-separated binary samples, e.g. 0110,1001
        #[arg(long)]
        bits: String,
        /// The seed used for spike sampling
        #[arg(long, default_value = "0")]
        seed: u64,
    },
}

/// A trial along with the digest of its resolved configuration.
#[derive(Serialize)]
struct TrialRecord<'a> {
    digest: String,
    #[serde(flatten)]
    trial: &'a Trial,
}

fn init_logging(level: LevelFilter) -> Result<(), ConfigError> {
    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new("{l} - {m}{n}")))
        .build();

    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(level))
        .map_err(|e| ConfigError::IOError(e.to_string()))?;

    log4rs::init_config(config).map_err(|e| ConfigError::IOError(e.to_string()))?;
    Ok(())
}

fn parse_samples(bits: &str) -> Result<Vec<Vec<bool>>, ConfigError> {
    bits.split(',')
        .map(|sample| {
            sample
                .trim()
                .chars()
                .map(|c| match c {
                    '0' => Ok(false),
                    '1' => Ok(true),
                    _ => Err(ConfigError::schema(
                        "bits",
                        format!("invalid bit `{}` in sample `{}`", c, sample),
                    )),
                })
                .collect::<Result<Vec<bool>, ConfigError>>()
        })
        .collect()
}

fn check(config: &SweepConfig) {
    for experiment in config.experiments() {
        println!(
            "{}: {} point(s) x {} repetition(s) = {} trial(s)",
            experiment.name,
            experiment.num_points().unwrap_or(usize::MAX),
            experiment.repeat,
            experiment.num_trials().unwrap_or(usize::MAX)
        );
    }
    println!("Total: {} trial(s)", config.num_trials());
}

fn write_trials<W: Write>(trials: &[Trial], writer: W) -> Result<(), ConfigError> {
    let mut records = Vec::with_capacity(trials.len());
    for trial in trials {
        records.push(TrialRecord {
            digest: trial.digest()?,
            trial,
        });
    }

    let mut writer = BufWriter::new(writer);
    serde_json::to_writer_pretty(&mut writer, &records)
        .map_err(|e| ConfigError::IOError(e.to_string()))?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

fn main() -> Result<(), ConfigError> {
    let args = Args::parse();
    let level = args
        .log_level
        .parse::<LevelFilter>()
        .map_err(|e| ConfigError::schema("log-level", e.to_string()))?;
    init_logging(level)?;
    log::debug!("{:?}", args);

    match args.command {
        Command::Check { config } => {
            let config = SweepConfig::load_from(&config)?;
            check(&config);
        }
        Command::Expand {
            config,
            experiment,
            output,
        } => {
            let config = SweepConfig::load_from(&config)?;
            let trials = match experiment {
                Some(name) => {
                    let index = config
                        .experiments()
                        .iter()
                        .position(|experiment| experiment.name == name)
                        .ok_or_else(|| {
                            ConfigError::schema(
                                "experiments",
                                format!("no experiment named \"{}\"", name),
                            )
                        })?;
                    expand_experiment(&config, index)?
                }
                None => expand(&config)?,
            };

            match output {
                Some(path) => {
                    write_trials(&trials, File::create(&path)?)?;
                    log::info!("{} trial(s) written to {}", trials.len(), path.display());
                }
                None => write_trials(&trials, io::stdout().lock())?,
            }
        }
        Command::Encode { config, bits, seed } => {
            let config = SweepConfig::load_from(&config)?;
            let samples = parse_samples(&bits)?;
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let channels = config.parameters().input.encode_samples(
                &samples,
                config.parameters().topology.multiplicity,
                0.0,
                &mut rng,
            )?;
            for (channel, times) in channels.iter().enumerate() {
                println!("{}: {:?}", channel, times);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_samples() {
        assert_eq!(
            parse_samples("0110, 1001").unwrap(),
            vec![vec![false, true, true, false], vec![true, false, false, true]]
        );
        assert!(matches!(
            parse_samples("01x0"),
            Err(ConfigError::Schema { .. })
        ));
    }

    #[test]
    fn test_args() {
        let args = Args::try_parse_from([
            "snn-sweep",
            "--log-level",
            "debug",
            "expand",
            "config.json",
            "--experiment",
            "Time window",
        ])
        .unwrap();
        assert_eq!(args.log_level.parse::<LevelFilter>().unwrap(), LevelFilter::Debug);
        match args.command {
            Command::Expand { experiment, output, .. } => {
                assert_eq!(experiment.as_deref(), Some("Time window"));
                assert!(output.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
