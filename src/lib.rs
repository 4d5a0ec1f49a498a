//! This crate provides tools for loading, validating and expanding parameter sweeps over spiking
//! neural network simulations in Rust.
//!
//! A sweep document describes a binary associative memory experiment: the sparse binary data, the
//! neuron model and topology, the spike encoding of inputs and outputs, and a list of experiments
//! varying some of those parameters. The simulations themselves are left to an external runner.
//!
//! # Loading a Sweep Document
//!
//! ```rust
//! use snn_sweep::config::SweepConfig;
//!
//! let config: SweepConfig = r#"{
//!     /** Data, neuron model and spike encoding */
//!     "data": {"n_bits_in": 32, "n_bits_out": 32, "n_ones_in": 3, "n_ones_out": 3},
//!     "topology": {"params": {"cm": 0.2, "v_thresh": -47.0}, "neuron_type": "IF_cond_exp", "w": 0.011},
//!     "input": {"burst_size": 1, "time_window": 500.0, "isi": 1.0, "sigma_t": 5.0,
//!               "sigma_t_offs": 0.0, "p0": 0.0, "p1": 0.0},
//!     "output": {"burst_size": 1},
//!     "experiments": [
//!         {"name": "Weight", "sweeps": {"topology.w": {"min": 0.005, "max": 0.02, "count": 4}}, "repeat": 3}
//!     ]
//! }"#.parse().unwrap();
//!
//! assert_eq!(config.parameters().data.n_bits_in, 32);
//! assert_eq!(config.num_trials(), 12);
//! ```
//!
//! # Expanding Experiments
//!
//! ```rust
//! use snn_sweep::config::SweepConfig;
//! use snn_sweep::experiment::{Experiment, Sweep, SweepRange};
//! use snn_sweep::params::Parameters;
//! use snn_sweep::sweep::expand;
//!
//! let experiment = Experiment::new(
//!     "Jitter",
//!     vec![
//!         Sweep { path: "input.sigma_t".parse().unwrap(), range: SweepRange::new(0.0, 10.0, 5) },
//!         Sweep { path: "input.p0".parse().unwrap(), range: SweepRange::new(0.0, 0.2, 3) },
//!     ],
//!     2,
//! );
//! let config = SweepConfig::build(Parameters::default(), vec![experiment]).unwrap();
//!
//! // Every combination of the two dimensions, each run twice
//! let trials = expand(&config).unwrap();
//! assert_eq!(trials.len(), 5 * 3 * 2);
//! ```

pub mod config;
pub mod encoding;
pub mod error;
pub mod experiment;
pub mod params;
pub mod path;
pub mod schema;
pub mod sweep;
