use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Result, ensure};
use serde::Deserialize;

use crate::pipeline::PipelineOptions;
use crate::processing::FitMode;

const APP_DIR: &str = "gphotos-frame";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Configuration {
    /// Framebuffer device node the slideshow draws on.
    pub device: PathBuf,
    /// Time between two rotations.
    #[serde(with = "humantime_serde")]
    pub rotation_interval: Duration,
    /// OAuth client secrets downloaded from the Google Cloud console.
    pub credentials: PathBuf,
    /// Where the OAuth token is cached between runs.
    pub token_cache: PathBuf,
    /// Upper bound for every HTTP request.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Number of items requested per listing page (1..=100).
    pub page_size: u32,
    /// List through the search endpoint restricted to photos.
    pub photos_only: bool,
    pub fit: FitMode,
    /// How far a small photo may be enlarged; 1.0 never enlarges.
    pub max_upscale_factor: f32,
    /// Optional deterministic seed for the photo selector.
    pub shuffle_seed: Option<u64>,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        ensure!(
            !self.rotation_interval.is_zero(),
            "rotation-interval must be greater than zero"
        );
        ensure!(
            !self.request_timeout.is_zero(),
            "request-timeout must be greater than zero"
        );
        ensure!(
            (1..=100).contains(&self.page_size),
            "page-size must be between 1 and 100"
        );
        ensure!(
            self.max_upscale_factor.is_finite() && self.max_upscale_factor >= 1.0,
            "max-upscale-factor must be at least 1.0"
        );
        ensure!(
            !self.device.as_os_str().is_empty(),
            "device must not be empty"
        );
        Ok(self)
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            fit: self.fit,
            max_upscale: self.max_upscale_factor,
        }
    }

    fn default_credentials() -> PathBuf {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR).join("credentials.json"))
            .unwrap_or_else(|| PathBuf::from("credentials.json"))
    }

    fn default_token_cache() -> PathBuf {
        dirs::cache_dir()
            .map(|dir| dir.join(APP_DIR).join("token.json"))
            .unwrap_or_else(|| PathBuf::from("token.json"))
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            device: PathBuf::from("/dev/fb0"),
            rotation_interval: Duration::from_secs(10),
            credentials: Self::default_credentials(),
            token_cache: Self::default_token_cache(),
            request_timeout: Duration::from_secs(30),
            page_size: 100,
            photos_only: true,
            fit: FitMode::Fit,
            max_upscale_factor: 1.0,
            shuffle_seed: None,
        }
    }
}
