//! Typed parameter sections of a sweep document.
//!
//! The four sections (data, topology, input and output) make up the base [`Parameters`] that every
//! trial of a sweep starts from. Sweeps then override single scalar fields, addressed by a
//! [`ParamPath`].
//!
//! # Examples
//!
//! ```rust
//! use snn_sweep::params::{Parameters, Validate};
//!
//! let mut params = Parameters::default();
//! params.input.sigma_t = 2.5;
//! assert!(params.validate("").is_ok());
//!
//! let resolved = params.apply(&"input.sigma_t".parse().unwrap(), 4.0).unwrap();
//! assert!(resolved);
//! assert_eq!(params.input.sigma_t, 4.0);
//! ```
use derivative::Derivative;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::path::{ParamPath, Section};

/// The name of the default neuron model (conductance based integrate-and-fire, exponential synapses).
pub const DEFAULT_NEURON_TYPE: &str = "IF_cond_exp";

/// Types that can check their numeric and structural constraints.
pub trait Validate {
    /// Validate the value; `path` is the dotted location of `self` in the document, used in errors.
    fn validate(&self, path: &str) -> Result<(), ConfigError>;
}

/// Join a parent path and a field name.
pub fn join_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}

fn check_positive(path: &str, key: &str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::range(join_path(path, key), "must be positive"));
    }
    Ok(())
}

fn check_non_negative(path: &str, key: &str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigError::range(
            join_path(path, key),
            format!("must be non-negative, got {}", value),
        ));
    }
    Ok(())
}

fn check_probability(path: &str, key: &str, value: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::range(
            join_path(path, key),
            format!("must be a probability in [0, 1], got {}", value),
        ));
    }
    Ok(())
}

fn check_finite(path: &str, key: &str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::range(
            join_path(path, key),
            format!("must be finite, got {}", value),
        ));
    }
    Ok(())
}

/// The algorithm used by the runner to generate the binary data samples.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataAlgorithm {
    /// Balanced bit usage across samples.
    #[default]
    Balanced,
    /// Independent random samples.
    Random,
    /// Unique samples without balancing.
    Unique,
}

impl FromStr for DataAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "balanced" => Ok(DataAlgorithm::Balanced),
            "random" => Ok(DataAlgorithm::Random),
            "unique" => Ok(DataAlgorithm::Unique),
            _ => Err(format!(
                "invalid data generation algorithm `{}`, must be one of `random`, `balanced` or `unique`",
                s
            )),
        }
    }
}

impl fmt::Display for DataAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DataAlgorithm::Balanced => write!(f, "balanced"),
            DataAlgorithm::Random => write!(f, "random"),
            DataAlgorithm::Unique => write!(f, "unique"),
        }
    }
}

/// Width and weight of the sparse binary code.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, Derivative)]
#[derivative(Default)]
pub struct DataParams {
    /// Number of input bits.
    #[derivative(Default(value = "16"))]
    pub n_bits_in: usize,
    /// Number of output bits.
    #[derivative(Default(value = "16"))]
    pub n_bits_out: usize,
    /// Number of ones per input sample.
    #[derivative(Default(value = "3"))]
    pub n_ones_in: usize,
    /// Number of ones per output sample.
    #[derivative(Default(value = "3"))]
    pub n_ones_out: usize,
    /// Number of samples; left to the runner when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_samples: Option<usize>,
    #[serde(default)]
    pub algorithm: DataAlgorithm,
}

impl Validate for DataParams {
    fn validate(&self, path: &str) -> Result<(), ConfigError> {
        check_positive(path, "n_bits_in", self.n_bits_in)?;
        check_positive(path, "n_bits_out", self.n_bits_out)?;
        check_positive(path, "n_ones_in", self.n_ones_in)?;
        check_positive(path, "n_ones_out", self.n_ones_out)?;
        if self.n_ones_in > self.n_bits_in {
            return Err(ConfigError::range(
                join_path(path, "n_ones_in"),
                format!("must not exceed n_bits_in ({})", self.n_bits_in),
            ));
        }
        if self.n_ones_out > self.n_bits_out {
            return Err(ConfigError::range(
                join_path(path, "n_ones_out"),
                format!("must not exceed n_bits_out ({})", self.n_bits_out),
            ));
        }
        if let Some(n_samples) = self.n_samples {
            check_positive(path, "n_samples", n_samples)?;
        }
        Ok(())
    }
}

/// Neuron model, neuron parameters and synaptic weights.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, Derivative)]
#[derivative(Default)]
pub struct TopologyParams {
    /// Neuron model parameters, e.g. `v_thresh` or `tau_refrac`.
    pub params: BTreeMap<String, f64>,
    /// Standard deviation of the noise on each neuron parameter.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub param_noise: BTreeMap<String, f64>,
    /// Number of neurons (and signals) representing each bit.
    #[derivative(Default(value = "1"))]
    #[serde(default = "default_multiplicity")]
    pub multiplicity: usize,
    /// Name of the neuron model.
    #[derivative(Default(value = "DEFAULT_NEURON_TYPE.to_string()"))]
    pub neuron_type: String,
    /// Synaptic weight.
    #[derivative(Default(value = "0.03"))]
    pub w: f64,
    /// Standard deviation of the synaptic weight.
    #[serde(default)]
    pub sigma_w: f64,
}

fn default_multiplicity() -> usize {
    1
}

impl Validate for TopologyParams {
    fn validate(&self, path: &str) -> Result<(), ConfigError> {
        if self.neuron_type.trim().is_empty() {
            return Err(ConfigError::schema(
                join_path(path, "neuron_type"),
                "must not be empty",
            ));
        }
        let params_path = join_path(path, "params");
        for (name, value) in self.params.iter() {
            check_finite(&params_path, name, *value)?;
        }
        let noise_path = join_path(path, "param_noise");
        for (name, sigma) in self.param_noise.iter() {
            if !self.params.contains_key(name) {
                return Err(ConfigError::schema(
                    join_path(&noise_path, name),
                    "noise given for a parameter missing from `params`",
                ));
            }
            check_non_negative(&noise_path, name, *sigma)?;
        }
        check_positive(path, "multiplicity", self.multiplicity)?;
        check_finite(path, "w", self.w)?;
        check_non_negative(path, "sigma_w", self.sigma_w)?;
        Ok(())
    }
}

/// Encoding of the input samples as spike bursts.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, Derivative)]
#[derivative(Default)]
pub struct InputParams {
    /// Number of spikes representing a one.
    #[derivative(Default(value = "1"))]
    pub burst_size: usize,
    /// Time between the presentation of two samples.
    #[derivative(Default(value = "100.0"))]
    pub time_window: f64,
    /// Inter-spike interval within a burst.
    #[derivative(Default(value = "1.0"))]
    pub isi: f64,
    /// Jitter of each individual spike.
    pub sigma_t: f64,
    /// Jitter of the burst offset.
    pub sigma_t_offs: f64,
    /// Probability of omitting a spike of a one.
    pub p0: f64,
    /// Probability of emitting a spike for a zero.
    pub p1: f64,
}

impl Validate for InputParams {
    fn validate(&self, path: &str) -> Result<(), ConfigError> {
        check_positive(path, "burst_size", self.burst_size)?;
        check_non_negative(path, "time_window", self.time_window)?;
        check_non_negative(path, "isi", self.isi)?;
        check_non_negative(path, "sigma_t", self.sigma_t)?;
        check_non_negative(path, "sigma_t_offs", self.sigma_t_offs)?;
        check_probability(path, "p0", self.p0)?;
        check_probability(path, "p1", self.p1)?;
        Ok(())
    }
}

/// The expected output.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, Derivative)]
#[derivative(Default)]
pub struct OutputParams {
    /// Number of expected output spikes per neuron.
    #[derivative(Default(value = "1"))]
    pub burst_size: usize,
}

impl Validate for OutputParams {
    fn validate(&self, path: &str) -> Result<(), ConfigError> {
        check_positive(path, "burst_size", self.burst_size)
    }
}

/// A mutable handle on a numeric field addressed by a [`ParamPath`].
#[derive(Debug)]
pub enum Scalar<'a> {
    Int(&'a mut usize),
    OptInt(&'a mut Option<usize>),
    Float(&'a mut f64),
}

impl Scalar<'_> {
    /// Assign a swept value; integer fields take the truncated value.
    pub fn set(self, value: f64, path: &ParamPath) -> Result<(), ConfigError> {
        if !value.is_finite() {
            return Err(ConfigError::range(
                path.to_string(),
                format!("must be finite, got {}", value),
            ));
        }
        match self {
            Scalar::Float(field) => *field = value,
            Scalar::Int(_) | Scalar::OptInt(_) if value < 0.0 => {
                return Err(ConfigError::range(
                    path.to_string(),
                    format!("integer field cannot take the negative value {}", value),
                ));
            }
            Scalar::Int(field) => *field = value.trunc() as usize,
            Scalar::OptInt(field) => *field = Some(value.trunc() as usize),
        }
        Ok(())
    }

    /// Returns the current value as a float, if any.
    pub fn get(&self) -> Option<f64> {
        match self {
            Scalar::Float(field) => Some(**field),
            Scalar::Int(field) => Some(**field as f64),
            Scalar::OptInt(field) => field.map(|n| n as f64),
        }
    }
}

/// The base parameters shared by all trials of a sweep.
#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
pub struct Parameters {
    pub data: DataParams,
    pub topology: TopologyParams,
    pub input: InputParams,
    pub output: OutputParams,
}

impl Parameters {
    /// Resolve a path onto a numeric field.
    ///
    /// Returns `Ok(None)` when the path names no existing field and is thus an additive override.
    /// Entries of `topology.params` and `topology.param_noise` are created on demand. Paths that
    /// reach a non-numeric field, or that descend into a scalar, are schema errors.
    pub fn scalar_mut(&mut self, path: &ParamPath) -> Result<Option<Scalar<'_>>, ConfigError> {
        let not_numeric =
            || ConfigError::schema(path.to_string(), "does not name a numeric parameter");

        let keys = path.key_strs();
        let scalar = match (path.section(), keys.as_slice()) {
            (Section::Data, ["n_bits_in"]) => Scalar::Int(&mut self.data.n_bits_in),
            (Section::Data, ["n_bits_out"]) => Scalar::Int(&mut self.data.n_bits_out),
            (Section::Data, ["n_ones_in"]) => Scalar::Int(&mut self.data.n_ones_in),
            (Section::Data, ["n_ones_out"]) => Scalar::Int(&mut self.data.n_ones_out),
            (Section::Data, ["n_samples"]) => Scalar::OptInt(&mut self.data.n_samples),
            (Section::Data, ["algorithm", ..]) => return Err(not_numeric()),

            (Section::Topology, ["params", name]) => {
                Scalar::Float(self.topology.params.entry(name.to_string()).or_insert(0.0))
            }
            (Section::Topology, ["param_noise", name]) => Scalar::Float(
                self.topology
                    .param_noise
                    .entry(name.to_string())
                    .or_insert(0.0),
            ),
            (Section::Topology, ["multiplicity"]) => Scalar::Int(&mut self.topology.multiplicity),
            (Section::Topology, ["w"]) => Scalar::Float(&mut self.topology.w),
            (Section::Topology, ["sigma_w"]) => Scalar::Float(&mut self.topology.sigma_w),
            (Section::Topology, ["params" | "param_noise" | "neuron_type", ..]) => {
                return Err(not_numeric())
            }

            (Section::Input, ["burst_size"]) => Scalar::Int(&mut self.input.burst_size),
            (Section::Input, ["time_window"]) => Scalar::Float(&mut self.input.time_window),
            (Section::Input, ["isi"]) => Scalar::Float(&mut self.input.isi),
            (Section::Input, ["sigma_t"]) => Scalar::Float(&mut self.input.sigma_t),
            (Section::Input, ["sigma_t_offs"]) => Scalar::Float(&mut self.input.sigma_t_offs),
            (Section::Input, ["p0"]) => Scalar::Float(&mut self.input.p0),
            (Section::Input, ["p1"]) => Scalar::Float(&mut self.input.p1),

            (Section::Output, ["burst_size"]) => Scalar::Int(&mut self.output.burst_size),

            (section, [field, _, ..]) if Self::has_scalar_field(section, field) => {
                return Err(ConfigError::schema(
                    path.to_string(),
                    format!("`{}` is a scalar and has no fields", field),
                ))
            }
            _ => return Ok(None),
        };
        Ok(Some(scalar))
    }

    fn has_scalar_field(section: Section, field: &str) -> bool {
        match section {
            Section::Data => matches!(
                field,
                "n_bits_in" | "n_bits_out" | "n_ones_in" | "n_ones_out" | "n_samples"
            ),
            Section::Topology => matches!(field, "multiplicity" | "w" | "sigma_w"),
            Section::Input => matches!(
                field,
                "burst_size" | "time_window" | "isi" | "sigma_t" | "sigma_t_offs" | "p0" | "p1"
            ),
            Section::Output => field == "burst_size",
        }
    }

    /// Returns the current value at the given path, if it resolves to a set numeric field.
    pub fn get(&self, path: &ParamPath) -> Option<f64> {
        let keys = path.key_strs();
        match (path.section(), keys.as_slice()) {
            (Section::Data, ["n_bits_in"]) => Some(self.data.n_bits_in as f64),
            (Section::Data, ["n_bits_out"]) => Some(self.data.n_bits_out as f64),
            (Section::Data, ["n_ones_in"]) => Some(self.data.n_ones_in as f64),
            (Section::Data, ["n_ones_out"]) => Some(self.data.n_ones_out as f64),
            (Section::Data, ["n_samples"]) => self.data.n_samples.map(|n| n as f64),

            (Section::Topology, ["params", name]) => self.topology.params.get(*name).copied(),
            (Section::Topology, ["param_noise", name]) => {
                self.topology.param_noise.get(*name).copied()
            }
            (Section::Topology, ["multiplicity"]) => Some(self.topology.multiplicity as f64),
            (Section::Topology, ["w"]) => Some(self.topology.w),
            (Section::Topology, ["sigma_w"]) => Some(self.topology.sigma_w),

            (Section::Input, ["burst_size"]) => Some(self.input.burst_size as f64),
            (Section::Input, ["time_window"]) => Some(self.input.time_window),
            (Section::Input, ["isi"]) => Some(self.input.isi),
            (Section::Input, ["sigma_t"]) => Some(self.input.sigma_t),
            (Section::Input, ["sigma_t_offs"]) => Some(self.input.sigma_t_offs),
            (Section::Input, ["p0"]) => Some(self.input.p0),
            (Section::Input, ["p1"]) => Some(self.input.p1),

            (Section::Output, ["burst_size"]) => Some(self.output.burst_size as f64),
            _ => None,
        }
    }

    /// Override the field at the given path with a swept value.
    ///
    /// Returns `Ok(false)` if the path is an additive override that does not resolve onto a field,
    /// in which case the parameters are left untouched.
    pub fn apply(&mut self, path: &ParamPath, value: f64) -> Result<bool, ConfigError> {
        match self.scalar_mut(path)? {
            Some(scalar) => {
                scalar.set(value, path)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl Validate for Parameters {
    fn validate(&self, path: &str) -> Result<(), ConfigError> {
        self.data.validate(&join_path(path, "data"))?;
        self.topology.validate(&join_path(path, "topology"))?;
        self.input.validate(&join_path(path, "input"))?;
        self.output.validate(&join_path(path, "output"))?;
        Ok(())
    }
}
