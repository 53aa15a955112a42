use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{Result, ShoeboxError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    pub input_dir: String,
    pub output_dir: String,
    /// Only files with these extensions are processed; `None` means all.
    pub extensions: Option<Vec<String>>,
    /// Stop after this many files.
    pub max_files: Option<u64>,
    /// Move files into place instead of copying them.
    #[serde(default)]
    pub move_files: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Ask the operator for every new day instead of geocoding.
    #[serde(default)]
    pub explicit_labels: bool,
    /// Consult sibling flight-log files for non-image media.
    #[serde(default)]
    pub telemetry_assist: bool,
    /// Extensions treated as images carrying EXIF metadata.
    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodeConfig {
    pub endpoint: String,
    pub user_agent: String,
    /// Sleep applied after every reverse-geocode call returns.
    pub throttle_secs: f64,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpsConfig {
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShoeboxConfig {
    pub dispatch: DispatchConfig,
    pub resolver: ResolverConfig,
    pub geocode: GeocodeConfig,
    pub ops: OpsConfig,
}

fn default_image_extensions() -> Vec<String> {
    vec!["jpg".into(), "jpeg".into()]
}

impl DispatchConfig {
    /// Extension filter with entries lowercased and leading dots stripped,
    /// so `.JPG` and `jpg` select the same files.
    pub fn normalized_extensions(&self) -> Option<Vec<String>> {
        self.extensions.as_ref().map(|list| {
            list.iter()
                .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
                .collect()
        })
    }
}

impl ResolverConfig {
    pub fn is_image_extension(&self, ext: &str) -> bool {
        self.image_extensions
            .iter()
            .any(|known| known.eq_ignore_ascii_case(ext))
    }
}

impl ShoeboxConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref).map_err(|err| {
            ShoeboxError::Configuration(format!(
                "unable to read config file {}: {err}",
                path_ref.display()
            ))
        })?;
        toml::from_str(&contents).map_err(|err| {
            ShoeboxError::Configuration(format!(
                "failed to parse config file {}: {err}",
                path_ref.display()
            ))
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.dispatch.input_dir.is_empty() {
            return Err(ShoeboxError::Configuration(
                "dispatch.input_dir must not be empty".into(),
            ));
        }
        if self.dispatch.output_dir.is_empty() {
            return Err(ShoeboxError::Configuration(
                "dispatch.output_dir must not be empty".into(),
            ));
        }
        if self.resolver.image_extensions.is_empty() {
            return Err(ShoeboxError::Configuration(
                "resolver.image_extensions must name at least one extension".into(),
            ));
        }
        if !self.geocode.throttle_secs.is_finite() || self.geocode.throttle_secs < 0.0 {
            return Err(ShoeboxError::Configuration(
                "geocode.throttle_secs must be zero or a positive number".into(),
            ));
        }
        if self.geocode.user_agent.is_empty() {
            return Err(ShoeboxError::Configuration(
                "geocode.user_agent must not be empty".into(),
            ));
        }
        if self.geocode.endpoint.is_empty() {
            return Err(ShoeboxError::Configuration(
                "geocode.endpoint must not be empty".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn sample_config() -> ShoeboxConfig {
        ShoeboxConfig {
            dispatch: DispatchConfig {
                input_dir: "Files".into(),
                output_dir: "Output".into(),
                extensions: Some(vec![".JPG".into(), "mp4".into()]),
                max_files: Some(100),
                move_files: false,
            },
            resolver: ResolverConfig {
                explicit_labels: false,
                telemetry_assist: true,
                image_extensions: default_image_extensions(),
            },
            geocode: GeocodeConfig {
                endpoint: "https://nominatim.openstreetmap.org/reverse".into(),
                user_agent: "shoebox/0.1".into(),
                throttle_secs: 1.0,
                timeout_secs: 30,
            },
            ops: OpsConfig {
                log_level: "info".into(),
            },
        }
    }

    #[test]
    fn load_shoebox_config_from_file() {
        let temp_path = std::env::temp_dir().join("shoebox-config-test.toml");
        let config = sample_config();

        let doc = toml::to_string(&config).expect("serialize config");
        fs::write(&temp_path, doc).expect("write temp config");

        let loaded = ShoeboxConfig::from_file(&temp_path).expect("load config");
        assert_eq!(loaded.dispatch.input_dir, config.dispatch.input_dir);
        assert_eq!(loaded.dispatch.max_files, config.dispatch.max_files);
        assert!(loaded.resolver.telemetry_assist);
        assert_eq!(loaded.geocode.throttle_secs, 1.0);
        fs::remove_file(&temp_path).expect("cleanup temp config");
    }

    #[test]
    fn validate_configuration_rules() {
        let mut config = sample_config();
        assert!(config.validate().is_ok());

        config.dispatch.input_dir.clear();
        assert!(config.validate().is_err());
        config.dispatch.input_dir = "Files".into();

        config.resolver.image_extensions.clear();
        assert!(config.validate().is_err());
        config.resolver.image_extensions = default_image_extensions();

        config.geocode.throttle_secs = -1.0;
        assert!(config.validate().is_err());
        config.geocode.throttle_secs = 0.5;

        config.geocode.user_agent.clear();
        assert!(config.validate().is_err());
        config.geocode.user_agent = "shoebox/0.1".into();

        assert!(config.validate().is_ok());
    }

    #[test]
    fn extension_filter_is_normalized() {
        let config = sample_config();
        let normalized = config
            .dispatch
            .normalized_extensions()
            .expect("filter present");
        assert_eq!(normalized, vec!["jpg".to_string(), "mp4".to_string()]);
    }

    #[test]
    fn image_extension_match_ignores_case() {
        let config = sample_config();
        assert!(config.resolver.is_image_extension("JPG"));
        assert!(config.resolver.is_image_extension("jpeg"));
        assert!(!config.resolver.is_image_extension("mp4"));
    }
}
