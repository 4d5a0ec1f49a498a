//! Dotted parameter paths, e.g. `input.sigma_t` or `topology.params.v_thresh`.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// The top-level sections of a sweep document that sweeps may reach into.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Data,
    Topology,
    Input,
    Output,
}

impl Section {
    pub const ALL: [Section; 4] = [
        Section::Data,
        Section::Topology,
        Section::Input,
        Section::Output,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Data => "data",
            Section::Topology => "topology",
            Section::Input => "input",
            Section::Output => "output",
        }
    }
}

impl FromStr for Section {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Section::ALL
            .into_iter()
            .find(|section| section.as_str() == s)
            .ok_or_else(|| {
                ConfigError::schema(
                    s,
                    "unknown section, expected one of `data`, `topology`, `input` or `output`",
                )
            })
    }
}

/// A path from a section down to a (possibly nested) field.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ParamPath {
    section: Section,
    keys: Vec<String>,
}

impl ParamPath {
    /// Returns the section the path starts in.
    pub fn section(&self) -> Section {
        self.section
    }

    /// Returns the keys following the section name.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Returns the keys following the section name, as string slices.
    pub fn key_strs(&self) -> Vec<&str> {
        self.keys.iter().map(String::as_str).collect()
    }
}

impl FromStr for ParamPath {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut segments = s.split('.');
        let head = segments.next().unwrap_or_default();
        let keys: Vec<String> = segments.map(str::to_string).collect();

        if keys.is_empty() {
            return Err(ConfigError::schema(
                s,
                "a parameter path needs a section and at least one field",
            ));
        }
        if head.is_empty() || keys.iter().any(|key| key.is_empty()) {
            return Err(ConfigError::schema(s, "empty segment in parameter path"));
        }

        let section = head
            .parse::<Section>()
            .map_err(|_| ConfigError::schema(s, format!("unknown section `{}`", head)))?;

        Ok(ParamPath { section, keys })
    }
}

impl TryFrom<String> for ParamPath {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ParamPath> for String {
    fn from(path: ParamPath) -> Self {
        path.to_string()
    }
}

impl fmt::Display for ParamPath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.section.as_str())?;
        for key in self.keys.iter() {
            write!(f, ".{}", key)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_path() {
        let path: ParamPath = "input.sigma_t".parse().unwrap();
        assert_eq!(path.section(), Section::Input);
        assert_eq!(path.key_strs(), vec!["sigma_t"]);
        assert_eq!(path.to_string(), "input.sigma_t");

        let path: ParamPath = "topology.params.v_thresh".parse().unwrap();
        assert_eq!(path.section(), Section::Topology);
        assert_eq!(path.key_strs(), vec!["params", "v_thresh"]);
        assert_eq!(path.to_string(), "topology.params.v_thresh");
    }

    #[test]
    fn test_parse_invalid_path() {
        assert!(matches!(
            "input".parse::<ParamPath>(),
            Err(ConfigError::Schema { .. })
        ));
        assert!(matches!(
            "input..sigma_t".parse::<ParamPath>(),
            Err(ConfigError::Schema { .. })
        ));
        assert!(matches!(
            ".sigma_t".parse::<ParamPath>(),
            Err(ConfigError::Schema { .. })
        ));
        assert_eq!(
            "network.w".parse::<ParamPath>().unwrap_err().path(),
            Some("network.w")
        );
    }

    #[test]
    fn test_path_serde() {
        let path: ParamPath = serde_json::from_str("\"output.burst_size\"").unwrap();
        assert_eq!(path.section(), Section::Output);
        assert_eq!(serde_json::to_string(&path).unwrap(), "\"output.burst_size\"");
        assert!(serde_json::from_str::<ParamPath>("\"burst_size\"").is_err());
    }
}
