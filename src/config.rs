//! Loading, validation and saving of sweep documents.
//!
//! A sweep document is JSON extended with comments. Loading goes through three stages, each with
//! its own error kind: the text is parsed ([`ConfigError::Parse`]), the schema is extracted
//! ([`ConfigError::Schema`]) and the numeric constraints are checked ([`ConfigError::Range`]).
//! The loader fails closed: fields required by the schema never fall back to defaults.
//!
//! # Examples
//!
//! ```rust
//! use snn_sweep::config::SweepConfig;
//!
//! let text = r#"{
//!     "data": {"n_bits_in": 16, "n_bits_out": 16, "n_ones_in": 3, "n_ones_out": 3},
//!     "topology": {"params": {"v_thresh": -47.0}, "neuron_type": "IF_cond_exp", "w": 0.011},
//!     /* Spike encoding of the input samples */
//!     "input": {"burst_size": 1, "time_window": 100.0, "isi": 1.0, "sigma_t": 0.0,
//!               "sigma_t_offs": 0.0, "p0": 0.0, "p1": 0.0},
//!     "output": {"burst_size": 1},
//!     "experiments": [
//!         {"name": "Jitter", "sweeps": {"input.sigma_t": {"min": 0.0, "max": 5.0, "count": 6}}, "repeat": 2}
//!     ]
//! }"#;
//!
//! let config: SweepConfig = text.parse().unwrap();
//! assert_eq!(config.experiments().len(), 1);
//! assert_eq!(config.num_trials(), 12);
//! ```
use json_comments::StripComments;
use serde::Serialize;
use serde_json::Value;
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::experiment::{Experiment, Sweep, SweepRange};
use crate::params::{
    join_path, DataAlgorithm, DataParams, InputParams, OutputParams, Parameters, TopologyParams,
    Validate,
};
use crate::path::ParamPath;
use crate::schema::{as_array, Fields};

/// A validated sweep document: the base parameters and the experiments run on top of them.
#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct SweepConfig {
    #[serde(flatten)]
    parameters: Parameters,
    experiments: Vec<Experiment>,
}

impl SweepConfig {
    /// Create a sweep configuration from its parts, validating it as the loader would.
    pub fn build(parameters: Parameters, experiments: Vec<Experiment>) -> Result<Self, ConfigError> {
        let config = SweepConfig {
            parameters,
            experiments,
        };
        config.validate("")?;
        Ok(config)
    }

    /// Returns the base parameters.
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Returns the experiments, in document order.
    pub fn experiments(&self) -> &[Experiment] {
        &self.experiments
    }

    /// Returns the first experiment with the given name.
    pub fn experiment(&self, name: &str) -> Option<&Experiment> {
        self.experiments.iter().find(|experiment| experiment.name == name)
    }

    /// Returns the total number of trials over all experiments.
    ///
    /// A loaded or built configuration is validated, so the total always fits in a `usize`.
    pub fn num_trials(&self) -> usize {
        self.checked_num_trials().unwrap_or(usize::MAX)
    }

    fn checked_num_trials(&self) -> Option<usize> {
        self.experiments
            .iter()
            .try_fold(0usize, |total, experiment| {
                total.checked_add(experiment.num_trials()?)
            })
    }

    /// Build a sweep configuration from an already parsed JSON value.
    pub fn from_value(value: &Value) -> Result<Self, ConfigError> {
        let mut root = Fields::new("", value)?;
        let data = data_from(root.req_object("data")?)?;
        let topology = topology_from(root.req_object("topology")?)?;
        let input = input_from(root.req_object("input")?)?;
        let output = output_from(root.req_object("output")?)?;

        let experiments = as_array("experiments", root.req("experiments")?)?
            .iter()
            .enumerate()
            .map(|(i, value)| experiment_from(Fields::new(&format!("experiments[{}]", i), value)?))
            .collect::<Result<Vec<Experiment>, ConfigError>>()?;
        root.finish()?;

        let config = SweepConfig {
            parameters: Parameters {
                data,
                topology,
                input,
                output,
            },
            experiments,
        };
        config.validate("")?;
        Ok(config)
    }

    /// Serialize the configuration to pretty-printed JSON (without comments).
    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::IOError(e.to_string()))
    }

    /// Save the configuration to a file.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)
            .map_err(|e| ConfigError::IOError(e.to_string()))?;
        writer.flush()?;
        Ok(())
    }

    /// Load a configuration from a file.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = String::from_utf8(fs::read(path)?).map_err(|e| {
            let valid = &e.as_bytes()[..e.utf8_error().valid_up_to()];
            let (line, column) = end_position(&String::from_utf8_lossy(valid));
            ConfigError::Parse {
                line,
                column,
                message: "invalid UTF-8".to_string(),
            }
        })?;
        let config: SweepConfig = text.parse()?;
        log::info!(
            "Loaded {} with {} experiment(s) and {} trial(s)",
            path.display(),
            config.experiments.len(),
            config.num_trials()
        );
        Ok(config)
    }
}

impl FromStr for SweepConfig {
    type Err = ConfigError;

    /// Parse a sweep document, tolerating `/* */` and `//` comments.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut stripped = String::with_capacity(text.len());
        StripComments::new(text.as_bytes())
            .read_to_string(&mut stripped)
            .map_err(|e| {
                let (line, column) = end_position(text);
                ConfigError::Parse {
                    line,
                    column,
                    message: e.to_string(),
                }
            })?;
        let value: Value = serde_json::from_str(&stripped)?;
        SweepConfig::from_value(&value)
    }
}

impl Validate for SweepConfig {
    fn validate(&self, path: &str) -> Result<(), ConfigError> {
        self.parameters.validate(path)?;
        for (i, experiment) in self.experiments.iter().enumerate() {
            let experiment_path = join_path(path, &format!("experiments[{}]", i));
            experiment.validate(&experiment_path)?;

            let sweeps_path = join_path(&experiment_path, "sweeps");
            for sweep in experiment.sweeps.iter() {
                let sweep_path = join_path(&sweeps_path, &sweep.path.to_string());
                if !self.check_sweep_bounds(sweep, &sweep_path)? {
                    log::warn!(
                        "Experiment \"{}\": `{}` is not a known parameter, treating it as an additive override",
                        experiment.name,
                        sweep.path
                    );
                }
            }
            log::debug!(
                "Experiment \"{}\": {} point(s) x {} repetition(s)",
                experiment.name,
                experiment.num_points().unwrap_or(usize::MAX),
                experiment.repeat
            );
        }
        if self.checked_num_trials().is_none() {
            return Err(ConfigError::range(
                join_path(path, "experiments"),
                "total number of trials does not fit in a usize",
            ));
        }
        Ok(())
    }
}

impl SweepConfig {
    /// Apply both endpoints of a sweep onto the base parameters and validate the result.
    /// Returns false if the sweep is an additive override.
    fn check_sweep_bounds(&self, sweep: &Sweep, sweep_path: &str) -> Result<bool, ConfigError> {
        for (key, value) in [("min", sweep.range.min), ("max", sweep.range.max)] {
            let mut params = self.parameters.clone();
            match params.apply(&sweep.path, value) {
                Ok(true) => params.validate("").map_err(|e| match e {
                    ConfigError::Schema { .. } => relocate(e, sweep_path.to_string()),
                    e => relocate(e, join_path(sweep_path, key)),
                })?,
                Ok(false) => return Ok(false),
                Err(e @ ConfigError::Schema { .. }) => return Err(relocate(e, sweep_path.to_string())),
                Err(e) => return Err(relocate(e, join_path(sweep_path, key))),
            }
        }
        Ok(true)
    }
}

/// Returns the 1-based line and column just past the end of `text`.
fn end_position(text: &str) -> (usize, usize) {
    let line = text.matches('\n').count() + 1;
    let column = text.rsplit('\n').next().map_or(0, |last| last.chars().count()) + 1;
    (line, column)
}

/// Move an error to another path, keeping the original location in the message.
fn relocate(e: ConfigError, path: String) -> ConfigError {
    match e {
        ConfigError::Schema {
            path: old,
            message,
        } => ConfigError::schema(path, format!("`{}` {}", old, message)),
        ConfigError::Range {
            path: old,
            message,
        } => ConfigError::range(path, format!("`{}` {}", old, message)),
        other => other,
    }
}

fn data_from(mut fields: Fields) -> Result<DataParams, ConfigError> {
    let (n_bits_in, n_bits_out) = match fields.opt_usize("n_bits")? {
        Some(n_bits) => {
            for key in ["n_bits_in", "n_bits_out"] {
                if fields.contains(key) {
                    return Err(ConfigError::schema(
                        fields.child(key),
                        "cannot be combined with `n_bits`",
                    ));
                }
            }
            (n_bits, n_bits)
        }
        None => (fields.req_usize("n_bits_in")?, fields.req_usize("n_bits_out")?),
    };
    let n_ones_in = fields.req_usize("n_ones_in")?;
    let n_ones_out = fields.req_usize("n_ones_out")?;
    let n_samples = fields.opt_usize("n_samples")?;
    let algorithm = match fields.opt_str("algorithm")? {
        Some(name) => name
            .parse::<DataAlgorithm>()
            .map_err(|e| ConfigError::schema(fields.child("algorithm"), e))?,
        None => DataAlgorithm::default(),
    };
    fields.finish()?;

    Ok(DataParams {
        n_bits_in,
        n_bits_out,
        n_ones_in,
        n_ones_out,
        n_samples,
        algorithm,
    })
}

fn topology_from(mut fields: Fields) -> Result<TopologyParams, ConfigError> {
    let defaults = TopologyParams::default();
    let topology = TopologyParams {
        params: fields.req_f64_map("params")?,
        param_noise: fields.opt_f64_map("param_noise")?,
        multiplicity: fields
            .opt_usize("multiplicity")?
            .unwrap_or(defaults.multiplicity),
        neuron_type: fields.req_str("neuron_type")?.to_string(),
        w: fields.req_f64("w")?,
        sigma_w: fields.opt_f64("sigma_w")?.unwrap_or(defaults.sigma_w),
    };
    fields.finish()?;
    Ok(topology)
}

fn input_from(mut fields: Fields) -> Result<InputParams, ConfigError> {
    let input = InputParams {
        burst_size: fields.req_usize("burst_size")?,
        time_window: fields.req_f64("time_window")?,
        isi: fields.req_f64("isi")?,
        sigma_t: fields.req_f64("sigma_t")?,
        sigma_t_offs: fields.req_f64("sigma_t_offs")?,
        p0: fields.req_f64("p0")?,
        p1: fields.req_f64("p1")?,
    };
    fields.finish()?;
    Ok(input)
}

fn output_from(mut fields: Fields) -> Result<OutputParams, ConfigError> {
    let output = OutputParams {
        burst_size: fields.req_usize("burst_size")?,
    };
    fields.finish()?;
    Ok(output)
}

fn experiment_from(mut fields: Fields) -> Result<Experiment, ConfigError> {
    let name = fields.req_str("name")?.to_string();
    let mut sweeps_fields = fields.req_object("sweeps")?;
    let sweeps_path = sweeps_fields.path().to_string();

    let sweeps = sweeps_fields
        .entries()
        .map(|(key, value)| -> Result<Sweep, ConfigError> {
            let location = join_path(&sweeps_path, key);
            let path = key
                .parse::<ParamPath>()
                .map_err(|e| relocate(e, location.clone()))?;
            let mut range_fields = Fields::new(&location, value)?;
            let range = SweepRange {
                min: range_fields.req_f64("min")?,
                max: range_fields.req_f64("max")?,
                count: range_fields.req_usize("count")?,
            };
            range_fields.finish()?;
            Ok(Sweep { path, range })
        })
        .collect::<Result<Vec<Sweep>, ConfigError>>()?;
    sweeps_fields.finish()?;

    let repeat = fields.req_usize("repeat")?;
    fields.finish()?;

    Ok(Experiment {
        name,
        sweeps,
        repeat,
    })
}
