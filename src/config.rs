//! Pipeline configuration: sizes, thresholds and shadow parameters.
//!
//! Values come from defaults, an optional JSON file, then `HATFIT_*` environment variables,
//! in that order.

use std::{fs::File, io::BufReader, path::Path};

use anyhow::Context as _;

use crate::codec::DEFAULT_MAX_SOURCE_DIMENSION;
use crate::compose::ComposeSettings;
use crate::crop::DEFAULT_OUTPUT_SIZE;
use crate::foundation::error::{HatfitError, HatfitResult};
use crate::matte::MatteParams;

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CropSettings {
    pub output_size: u32,
}

impl Default for CropSettings {
    fn default() -> Self {
        Self {
            output_size: DEFAULT_OUTPUT_SIZE,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    /// Source photos are scaled down so neither side exceeds this; 0 disables.
    pub max_dimension: u32,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_SOURCE_DIMENSION,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub crop: CropSettings,
    pub compose: ComposeSettings,
    pub matte: MatteParams,
    pub source: SourceSettings,
}

impl PipelineConfig {
    pub fn from_json_file(path: &Path) -> HatfitResult<Self> {
        let f = File::open(path).with_context(|| format!("open config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_reader(BufReader::new(f))
            .with_context(|| format!("parse config JSON '{}'", path.display()))?;
        Ok(cfg)
    }

    /// Defaults or `path`, then environment overrides, then validation.
    pub fn load(path: Option<&Path>) -> HatfitResult<Self> {
        let mut cfg = match path {
            Some(p) => Self::from_json_file(p)?,
            None => Self::default(),
        };
        cfg.apply_env_overrides(|key| std::env::var(key).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn apply_env_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> HatfitResult<()> {
        let read = |key: &str| -> HatfitResult<Option<u32>> {
            match lookup(key) {
                None => Ok(None),
                Some(v) => v.trim().parse::<u32>().map(Some).map_err(|_| {
                    HatfitError::validation(format!("{key} must be an unsigned integer, got '{v}'"))
                }),
            }
        };
        if let Some(v) = read("HATFIT_CANVAS_SIZE")? {
            self.compose.canvas_size = v;
        }
        if let Some(v) = read("HATFIT_OUTPUT_SIZE")? {
            self.crop.output_size = v;
        }
        if let Some(v) = read("HATFIT_MAX_SOURCE_DIM")? {
            self.source.max_dimension = v;
        }
        Ok(())
    }

    pub fn validate(&self) -> HatfitResult<()> {
        if self.crop.output_size == 0 {
            return Err(HatfitError::validation("crop.output_size must be > 0"));
        }
        self.compose.validate()?;
        let d = self.matte.distance_threshold;
        if !d.is_finite() || d < 0.0 {
            return Err(HatfitError::validation(
                "matte.distance_threshold must be finite and >= 0",
            ));
        }
        Ok(())
    }
}
