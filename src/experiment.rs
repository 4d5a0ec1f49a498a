//! Experiments: named sets of parameter sweeps, repeated a number of times.
use itertools::Itertools;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::ConfigError;
use crate::params::{join_path, Validate};
use crate::path::ParamPath;

/// A closed range sampled at `count` evenly spaced points.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub struct SweepRange {
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

impl SweepRange {
    pub fn new(min: f64, max: f64, count: usize) -> Self {
        SweepRange { min, max, count }
    }

    /// Returns the sample points of the range.
    ///
    /// A range with a single point degenerates to `[min]`. Otherwise both endpoints are included and
    /// the last value is exactly `max`.
    pub fn values(&self) -> Vec<f64> {
        match self.count {
            0 => vec![],
            1 => vec![self.min],
            n => {
                let step = (self.max - self.min) / (n - 1) as f64;
                (0..n)
                    .map(|i| {
                        if i == n - 1 {
                            self.max
                        } else {
                            self.min + i as f64 * step
                        }
                    })
                    .collect()
            }
        }
    }
}

impl Validate for SweepRange {
    fn validate(&self, path: &str) -> Result<(), ConfigError> {
        for (key, value) in [("min", self.min), ("max", self.max)] {
            if !value.is_finite() {
                return Err(ConfigError::range(
                    join_path(path, key),
                    format!("must be finite, got {}", value),
                ));
            }
        }
        if self.min > self.max {
            return Err(ConfigError::range(
                path,
                format!("min ({}) exceeds max ({})", self.min, self.max),
            ));
        }
        if self.count < 1 {
            return Err(ConfigError::range(
                join_path(path, "count"),
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

/// A single swept dimension.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Sweep {
    pub path: ParamPath,
    pub range: SweepRange,
}

/// A named experiment varying one or more parameters.
#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct Experiment {
    /// Human readable label, may contain markup.
    pub name: String,
    /// The swept dimensions, in document order.
    #[serde(serialize_with = "serialize_sweeps")]
    pub sweeps: Vec<Sweep>,
    /// Number of repeated trials per sweep point.
    pub repeat: usize,
}

fn serialize_sweeps<S: Serializer>(sweeps: &[Sweep], serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(sweeps.len()))?;
    for sweep in sweeps {
        map.serialize_entry(&sweep.path, &sweep.range)?;
    }
    map.end()
}

impl Experiment {
    pub fn new(name: impl Into<String>, sweeps: Vec<Sweep>, repeat: usize) -> Self {
        Experiment {
            name: name.into(),
            sweeps,
            repeat,
        }
    }

    /// Returns the number of distinct sweep points, i.e., the product of all range counts,
    /// or `None` if it overflows a `usize`.
    pub fn num_points(&self) -> Option<usize> {
        self.sweeps
            .iter()
            .try_fold(1usize, |n, sweep| n.checked_mul(sweep.range.count))
    }

    /// Returns the total number of trials, i.e., the number of points times the number of
    /// repetitions, or `None` if it overflows a `usize`.
    pub fn num_trials(&self) -> Option<usize> {
        self.num_points()?.checked_mul(self.repeat)
    }

    /// Returns the sweep points as the Cartesian product of all dimensions, the last dimension
    /// varying fastest. Each point lists one value per sweep, in sweep order.
    /// An experiment without sweeps has a single empty point.
    pub fn points(&self) -> Vec<Vec<f64>> {
        if self.sweeps.is_empty() {
            return vec![vec![]];
        }
        self.sweeps
            .iter()
            .map(|sweep| sweep.range.values())
            .multi_cartesian_product()
            .collect()
    }
}

impl Validate for Experiment {
    fn validate(&self, path: &str) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::schema(
                join_path(path, "name"),
                "must not be empty",
            ));
        }
        let sweeps_path = join_path(path, "sweeps");
        for (i, sweep) in self.sweeps.iter().enumerate() {
            if self.sweeps[..i].iter().any(|other| other.path == sweep.path) {
                return Err(ConfigError::schema(
                    join_path(&sweeps_path, &sweep.path.to_string()),
                    "parameter swept twice",
                ));
            }
            sweep
                .range
                .validate(&join_path(&sweeps_path, &sweep.path.to_string()))?;
        }
        if self.repeat < 1 {
            return Err(ConfigError::range(
                join_path(path, "repeat"),
                "must be at least 1",
            ));
        }
        if self.num_trials().is_none() {
            return Err(ConfigError::range(
                path,
                "number of trials does not fit in a usize",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sweep(path: &str, min: f64, max: f64, count: usize) -> Sweep {
        Sweep {
            path: path.parse().unwrap(),
            range: SweepRange::new(min, max, count),
        }
    }

    #[test]
    fn test_values_single_point() {
        assert_eq!(SweepRange::new(3.5, 10.0, 1).values(), vec![3.5]);
        assert_eq!(SweepRange::new(-1.0, -1.0, 1).values(), vec![-1.0]);
    }

    #[test]
    fn test_values_endpoints_and_monotonicity() {
        let values = SweepRange::new(1.0, 20.0, 50).values();
        assert_eq!(values.len(), 50);
        assert_eq!(values[0], 1.0);
        assert_eq!(values[49], 20.0);
        assert!(values.windows(2).all(|w| w[0] < w[1]));
        assert_relative_eq!(values[1] - values[0], 19.0 / 49.0, epsilon = 1e-12);

        let values = SweepRange::new(0.0, 0.1, 3).values();
        assert_relative_eq!(values[1], 0.05);
        assert_eq!(values[2], 0.1);
    }

    #[test]
    fn test_values_degenerate_range() {
        assert_eq!(SweepRange::new(2.0, 2.0, 3).values(), vec![2.0, 2.0, 2.0]);
    }

    #[test]
    fn test_range_validate() {
        assert_eq!(SweepRange::new(0.0, 1.0, 10).validate("s"), Ok(()));
        assert_eq!(
            SweepRange::new(0.0, 1.0, 0).validate("s"),
            Err(ConfigError::range("s.count", "must be at least 1"))
        );
        assert!(matches!(
            SweepRange::new(2.0, 1.0, 10).validate("s"),
            Err(ConfigError::Range { .. })
        ));
        assert_eq!(
            SweepRange::new(f64::NAN, 1.0, 10).validate("s").unwrap_err().path(),
            Some("s.min")
        );
    }

    #[test]
    fn test_num_points_and_trials() {
        let experiment = Experiment::new("Time window", vec![sweep("input.time_window", 1.0, 20.0, 50)], 8);
        assert_eq!(experiment.num_points(), Some(50));
        assert_eq!(experiment.num_trials(), Some(400));

        let experiment = Experiment::new(
            "Jitter",
            vec![
                sweep("input.sigma_t", 0.0, 10.0, 5),
                sweep("input.sigma_t_offs", 0.0, 2.0, 3),
            ],
            2,
        );
        assert_eq!(experiment.num_points(), Some(15));
        assert_eq!(experiment.num_trials(), Some(30));

        let experiment = Experiment::new("Baseline", vec![], 4);
        assert_eq!(experiment.num_points(), Some(1));
        assert_eq!(experiment.num_trials(), Some(4));
    }

    #[test]
    fn test_num_trials_overflow() {
        let count = 1usize << (usize::BITS / 2);
        let experiment = Experiment::new(
            "Huge",
            vec![sweep("input.sigma_t", 0.0, 1.0, count), sweep("input.isi", 1.0, 2.0, count)],
            2,
        );
        assert_eq!(experiment.num_points(), None);
        assert_eq!(experiment.num_trials(), None);
        assert!(matches!(
            experiment.validate("experiments[0]"),
            Err(ConfigError::Range { path, .. }) if path == "experiments[0]"
        ));

        let experiment = Experiment::new("Huge", vec![sweep("input.sigma_t", 0.0, 1.0, count)], count);
        assert_eq!(experiment.num_points(), Some(count));
        assert_eq!(experiment.num_trials(), None);
    }

    #[test]
    fn test_points_cartesian_product() {
        let experiment = Experiment::new(
            "Grid",
            vec![sweep("input.p0", 0.0, 1.0, 2), sweep("input.p1", 0.0, 0.5, 3)],
            1,
        );
        let points = experiment.points();
        assert_eq!(
            points,
            vec![
                vec![0.0, 0.0],
                vec![0.0, 0.25],
                vec![0.0, 0.5],
                vec![1.0, 0.0],
                vec![1.0, 0.25],
                vec![1.0, 0.5],
            ]
        );
        assert_eq!(Some(points.len()), experiment.num_points());

        assert_eq!(Experiment::new("Empty", vec![], 1).points(), vec![Vec::<f64>::new()]);
    }

    #[test]
    fn test_experiment_validate() {
        let experiment = Experiment::new("", vec![], 1);
        assert!(matches!(
            experiment.validate("experiments[0]"),
            Err(ConfigError::Schema { .. })
        ));

        let experiment = Experiment::new("x", vec![], 0);
        assert_eq!(
            experiment.validate("experiments[0]").unwrap_err().path(),
            Some("experiments[0].repeat")
        );

        let experiment = Experiment::new(
            "x",
            vec![sweep("input.p0", 0.0, 1.0, 2), sweep("input.p0", 0.0, 0.5, 3)],
            1,
        );
        assert_eq!(
            experiment.validate("experiments[0]").unwrap_err().path(),
            Some("experiments[0].sweeps.input.p0")
        );
    }

    #[test]
    fn test_experiment_serialize() {
        let experiment = Experiment::new(
            "<i>σ</i>",
            vec![sweep("topology.sigma_w", 0.0, 0.01, 4)],
            2,
        );
        let json = serde_json::to_value(&experiment).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "<i>σ</i>",
                "sweeps": {"topology.sigma_w": {"min": 0.0, "max": 0.01, "count": 4}},
                "repeat": 2
            })
        );
    }
}
