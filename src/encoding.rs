//! Spike encoding of binary samples and noisy draws of the topology parameters.
//!
//! A one is represented by a burst of `burst_size` spikes, `isi` apart. Individual spikes of a one
//! are dropped with probability `p0`, and a zero emits the spikes of a burst with probability `p1`.
//! Spikes are jittered by `sigma_t`, whole bursts by `sigma_t_offs`.
//!
//! # Examples
//!
//! ```rust
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//! use snn_sweep::params::InputParams;
//!
//! let mut rng = StdRng::seed_from_u64(42);
//! let input = InputParams { burst_size: 3, isi: 2.0, ..InputParams::default() };
//!
//! let spikes = input.spike_train(true, 10.0, &mut rng).unwrap();
//! assert_eq!(spikes, vec![10.0, 12.0, 14.0]);
//! ```
use rand::Rng;
use rand_distr::{Distribution, Normal};
use std::collections::BTreeMap;

use crate::error::ConfigError;
use crate::params::{InputParams, TopologyParams};

fn normal(path: &str, mean: f64, std_dev: f64) -> Result<Normal<f64>, ConfigError> {
    Normal::new(mean, std_dev)
        .map_err(|e| ConfigError::range(path, format!("invalid normal distribution: {}", e)))
}

impl InputParams {
    /// Sample the spike times encoding a single bit, with the burst starting at `offset`.
    /// The returned times are sorted.
    pub fn spike_train<R: Rng + ?Sized>(
        &self,
        value: bool,
        offset: f64,
        rng: &mut R,
    ) -> Result<Vec<f64>, ConfigError> {
        let offset = if self.sigma_t_offs > 0.0 {
            normal("input.sigma_t_offs", offset, self.sigma_t_offs)?.sample(rng)
        } else {
            offset
        };
        let jitter = if self.sigma_t > 0.0 {
            Some(normal("input.sigma_t", 0.0, self.sigma_t)?)
        } else {
            None
        };

        // A spike is dropped when the uniform draw falls below `p_drop`
        let p_drop = if value { self.p0 } else { 1.0 - self.p1 };

        let mut times: Vec<f64> = (0..self.burst_size)
            .filter_map(|i| {
                if rng.gen::<f64>() < p_drop {
                    return None;
                }
                let noise = jitter.as_ref().map_or(0.0, |jitter| jitter.sample(rng));
                Some(offset + i as f64 * self.isi + noise)
            })
            .collect();
        times.sort_by(|a, b| a.total_cmp(b));
        Ok(times)
    }

    /// Encode a sequence of binary samples as one spike train per input channel.
    ///
    /// Sample `l` is presented at `l * time_window`; each bit is represented by `multiplicity`
    /// channels, bit `i` owning channels `i * multiplicity` to `(i + 1) * multiplicity - 1`.
    /// All times are finally shifted so that the earliest spike occurs at `start`.
    pub fn encode_samples<R: Rng + ?Sized>(
        &self,
        samples: &[Vec<bool>],
        multiplicity: usize,
        start: f64,
        rng: &mut R,
    ) -> Result<Vec<Vec<f64>>, ConfigError> {
        let num_bits = match samples.first() {
            Some(sample) => sample.len(),
            None => return Ok(vec![]),
        };
        if let Some(l) = samples.iter().position(|sample| sample.len() != num_bits) {
            return Err(ConfigError::schema(
                format!("samples[{}]", l),
                format!(
                    "expected {} bits, found {}",
                    num_bits,
                    samples[l].len()
                ),
            ));
        }

        let mut channels = vec![Vec::new(); num_bits * multiplicity];
        for (l, sample) in samples.iter().enumerate() {
            let offset = l as f64 * self.time_window;
            for (i, bit) in sample.iter().enumerate() {
                for j in 0..multiplicity {
                    let train = self.spike_train(*bit, offset, rng)?;
                    channels[i * multiplicity + j].extend(train);
                }
            }
        }

        let min_time = channels
            .iter()
            .flatten()
            .copied()
            .fold(f64::INFINITY, f64::min);
        if min_time.is_finite() {
            channels.iter_mut().flatten().for_each(|t| *t += start - min_time);
        }
        for channel in channels.iter_mut() {
            channel.sort_by(|a, b| a.total_cmp(b));
        }

        log::debug!(
            "Encoded {} sample(s) on {} channel(s)",
            samples.len(),
            channels.len()
        );
        Ok(channels)
    }
}

impl TopologyParams {
    /// Draw a synaptic weight: `w` itself without weight noise, otherwise a normal draw around `w`
    /// clamped at zero.
    pub fn draw_weight<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<f64, ConfigError> {
        if self.sigma_w <= 0.0 {
            return Ok(self.w);
        }
        Ok(normal("topology.sigma_w", self.w, self.sigma_w)?
            .sample(rng)
            .max(0.0))
    }

    /// Draw the neuron parameters, adding normal noise to those listed in `param_noise`.
    pub fn draw_params<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<BTreeMap<String, f64>, ConfigError> {
        self.params
            .iter()
            .map(|(name, value)| -> Result<(String, f64), ConfigError> {
                let value = match self.param_noise.get(name) {
                    Some(sigma) if *sigma > 0.0 => {
                        normal(&format!("topology.param_noise.{}", name), *value, *sigma)?
                            .sample(rng)
                    }
                    _ => *value,
                };
                Ok((name.clone(), value))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const SEED: u64 = 42;

    fn input(burst_size: usize, isi: f64) -> InputParams {
        InputParams {
            burst_size,
            isi,
            ..InputParams::default()
        }
    }

    #[test]
    fn test_spike_train_noiseless() {
        let mut rng = StdRng::seed_from_u64(SEED);
        let input = input(4, 2.5);

        assert_eq!(
            input.spike_train(true, 5.0, &mut rng).unwrap(),
            vec![5.0, 7.5, 10.0, 12.5]
        );
        assert!(input.spike_train(false, 5.0, &mut rng).unwrap().is_empty());
    }

    #[test]
    fn test_spike_train_probabilities() {
        let mut rng = StdRng::seed_from_u64(SEED);

        let mut always_drop = input(5, 1.0);
        always_drop.p0 = 1.0;
        assert!(always_drop.spike_train(true, 0.0, &mut rng).unwrap().is_empty());

        let mut always_emit = input(5, 1.0);
        always_emit.p1 = 1.0;
        assert_eq!(always_emit.spike_train(false, 0.0, &mut rng).unwrap().len(), 5);

        let mut half = input(1, 1.0);
        half.p0 = 0.5;
        let num_spikes: usize = (0..10_000)
            .map(|_| half.spike_train(true, 0.0, &mut rng).unwrap().len())
            .sum();
        assert!((4_500..5_500).contains(&num_spikes));
    }

    #[test]
    fn test_spike_train_jitter() {
        let mut rng = StdRng::seed_from_u64(SEED);
        let mut jittered = input(50, 1.0);
        jittered.sigma_t = 2.0;
        jittered.sigma_t_offs = 1.0;

        for _ in 0..100 {
            let times = jittered.spike_train(true, 100.0, &mut rng).unwrap();
            assert_eq!(times.len(), 50);
            assert!(times.windows(2).all(|w| w[0] <= w[1]));
        }
    }

    #[test]
    fn test_encode_samples() {
        let mut rng = StdRng::seed_from_u64(SEED);
        let mut input = input(2, 1.0);
        input.time_window = 100.0;
        let samples = vec![vec![true, false], vec![false, true]];

        let channels = input.encode_samples(&samples, 2, 0.0, &mut rng).unwrap();
        assert_eq!(channels.len(), 4);
        assert_eq!(channels[0], vec![0.0, 1.0]);
        assert_eq!(channels[1], vec![0.0, 1.0]);
        assert_eq!(channels[2], vec![100.0, 101.0]);
        assert_eq!(channels[3], vec![100.0, 101.0]);

        let channels = input.encode_samples(&samples[1..], 1, 10.0, &mut rng).unwrap();
        assert_eq!(channels, vec![vec![], vec![10.0, 11.0]]);
    }

    #[test]
    fn test_encode_samples_invalid() {
        let mut rng = StdRng::seed_from_u64(SEED);
        let input = InputParams::default();
        assert_eq!(input.encode_samples(&[], 1, 0.0, &mut rng), Ok(vec![]));

        let samples = vec![vec![true, false], vec![true]];
        assert_eq!(
            input
                .encode_samples(&samples, 1, 0.0, &mut rng)
                .unwrap_err()
                .path(),
            Some("samples[1]")
        );
    }

    #[test]
    fn test_draw_weight() {
        let mut rng = StdRng::seed_from_u64(SEED);
        let mut topology = TopologyParams::default();
        topology.w = 0.011;
        assert_eq!(topology.draw_weight(&mut rng), Ok(0.011));

        topology.sigma_w = 0.005;
        let weights: Vec<f64> = (0..10_000)
            .map(|_| topology.draw_weight(&mut rng).unwrap())
            .collect();
        assert!(weights.iter().all(|w| *w >= 0.0));
        let mean = weights.iter().sum::<f64>() / weights.len() as f64;
        assert_relative_eq!(mean, 0.011, epsilon = 5e-4);
    }

    #[test]
    fn test_draw_params() {
        let mut rng = StdRng::seed_from_u64(SEED);
        let mut topology = TopologyParams::default();
        topology.params.insert("v_rest".to_string(), -50.0);
        topology.params.insert("v_thresh".to_string(), -47.0);
        topology.param_noise.insert("v_thresh".to_string(), 1.0);

        let drawn = topology.draw_params(&mut rng).unwrap();
        assert_eq!(drawn.len(), 2);
        assert_eq!(drawn["v_rest"], -50.0);
        assert_ne!(drawn["v_thresh"], -47.0);
        assert!((drawn["v_thresh"] + 47.0).abs() < 10.0);
    }
}
