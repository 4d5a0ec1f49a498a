//! Expansion of experiments into fully resolved trials.
//!
//! Each experiment spans the Cartesian product of its sweep ranges; every point of that product is
//! run `repeat` times. A [`Trial`] carries the base parameters with the point's values applied, so
//! that a runner never has to resolve parameter paths itself.
//!
//! # Examples
//!
//! ```rust
//! use snn_sweep::config::SweepConfig;
//! use snn_sweep::experiment::{Experiment, Sweep, SweepRange};
//! use snn_sweep::params::Parameters;
//! use snn_sweep::sweep::expand;
//!
//! let experiment = Experiment::new(
//!     "Weight",
//!     vec![Sweep { path: "topology.w".parse().unwrap(), range: SweepRange::new(0.01, 0.03, 3) }],
//!     2,
//! );
//! let config = SweepConfig::build(Parameters::default(), vec![experiment]).unwrap();
//!
//! let trials = expand(&config).unwrap();
//! assert_eq!(trials.len(), 6);
//! assert_eq!(trials[5].parameters.topology.w, 0.03);
//! ```
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::config::SweepConfig;
use crate::error::ConfigError;
use crate::params::{Parameters, Validate};
use crate::path::ParamPath;

/// Minimum number of sweep points to resolve them in parallel.
pub const MIN_PARALLEL_POINTS: usize = 64;

/// The value taken by one swept dimension in a trial.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SweptValue {
    pub path: ParamPath,
    pub value: f64,
}

/// A single simulation run: one sweep point of one experiment, at one repetition.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Trial {
    /// Index of the experiment in the document.
    pub experiment: usize,
    pub experiment_name: String,
    /// Index of the sweep point within the experiment.
    pub point: usize,
    /// Repetition index, from 0 to `repeat - 1`.
    pub repetition: usize,
    /// The swept values, one per dimension.
    pub values: Vec<SweptValue>,
    /// The base parameters with the swept values applied.
    pub parameters: Parameters,
    /// Swept values whose paths name no known parameter.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub overrides: BTreeMap<ParamPath, f64>,
}

impl Trial {
    /// Returns the value of a parameter in this trial, looking at additive overrides first.
    pub fn value(&self, path: &ParamPath) -> Option<f64> {
        self.overrides
            .get(path)
            .copied()
            .or_else(|| self.parameters.get(path))
    }

    /// Returns a hex encoded SHA-256 digest of the resolved configuration.
    ///
    /// Repetitions of the same point share a digest, as do points of different experiments that
    /// resolve to the same configuration.
    pub fn digest(&self) -> Result<String, ConfigError> {
        let bytes = serde_json::to_vec(&(&self.parameters, &self.overrides))
            .map_err(|e| ConfigError::IOError(e.to_string()))?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Ok(format!("{:x}", hasher.finalize()))
    }
}

/// Expand a single experiment of the configuration into its trials, point-major.
pub fn expand_experiment(config: &SweepConfig, index: usize) -> Result<Vec<Trial>, ConfigError> {
    let experiment = config.experiments().get(index).ok_or_else(|| {
        ConfigError::schema(format!("experiments[{}]", index), "no such experiment")
    })?;
    let points = experiment.points();

    let resolve = |(point, values): (usize, &Vec<f64>)| -> Result<Vec<Trial>, ConfigError> {
        let mut parameters = config.parameters().clone();
        let mut overrides = BTreeMap::new();
        let mut swept = Vec::with_capacity(values.len());

        for (sweep, value) in experiment.sweeps.iter().zip(values.iter()) {
            if !parameters.apply(&sweep.path, *value)? {
                overrides.insert(sweep.path.clone(), *value);
            }
            swept.push(SweptValue {
                path: sweep.path.clone(),
                value: *value,
            });
        }
        parameters.validate("").map_err(|e| {
            ConfigError::range(
                format!("experiments[{}]", index),
                format!("sweep point {} is invalid: {}", point, e),
            )
        })?;

        Ok((0..experiment.repeat)
            .map(|repetition| Trial {
                experiment: index,
                experiment_name: experiment.name.clone(),
                point,
                repetition,
                values: swept.clone(),
                parameters: parameters.clone(),
                overrides: overrides.clone(),
            })
            .collect())
    };

    let trials: Vec<Vec<Trial>> = if points.len() >= MIN_PARALLEL_POINTS {
        points
            .par_iter()
            .enumerate()
            .map(&resolve)
            .collect::<Result<_, _>>()?
    } else {
        points
            .iter()
            .enumerate()
            .map(&resolve)
            .collect::<Result<_, _>>()?
    };

    log::debug!(
        "Experiment \"{}\" expanded into {} point(s) x {} repetition(s)",
        experiment.name,
        points.len(),
        experiment.repeat
    );
    Ok(trials.into_iter().flatten().collect())
}

/// Expand all experiments of the configuration, in document order.
pub fn expand(config: &SweepConfig) -> Result<Vec<Trial>, ConfigError> {
    let mut trials = Vec::new();
    for index in 0..config.experiments().len() {
        trials.extend(expand_experiment(config, index)?);
    }
    log::info!(
        "Expanded {} experiment(s) into {} trial(s)",
        config.experiments().len(),
        trials.len()
    );
    Ok(trials)
}
