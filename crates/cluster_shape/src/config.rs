use crate::{
    constants::{BUNDLED_DATA_DIR, DEFAULT_PIXEL_SHAPE_FILE, ENV_DATA_DIR, STRIP_SHAPE_FILE},
    error::{ClusterShapeError, Result},
};
use serde::{Deserialize, Serialize};
use std::{
    env,
    path::{Path, PathBuf},
};

/// Filter settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Pixel calibration resource (relative names are searched, see `resolve_resource`)
    #[serde(alias = "PixelShapeFile")]
    pub pixel_shape_file: String,
    /// Extra directory searched before `CLUSTER_SHAPE_DATA_DIR`
    pub data_dir: Option<PathBuf>,

    #[serde(alias = "cutOnPixelShape", alias = "doPixelShapeCut")]
    pub cut_on_pixel_shape: bool,
    #[serde(alias = "cutOnStripShape", alias = "doStripShapeCut")]
    pub cut_on_strip_shape: bool,

    #[serde(alias = "cutOnPixelCharge")]
    pub cut_on_pixel_charge: bool,
    #[serde(alias = "minGoodPixelCharge")]
    pub min_good_pixel_charge: f32,
    /// Unset: enabled iff `min_good_strip_charge > 0`
    #[serde(alias = "cutOnStripCharge")]
    pub cut_on_strip_charge: Option<bool>,
    #[serde(alias = "minGoodStripCharge")]
    pub min_good_strip_charge: f32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            pixel_shape_file: DEFAULT_PIXEL_SHAPE_FILE.to_string(),
            data_dir: None,
            cut_on_pixel_shape: true,
            cut_on_strip_shape: true,
            cut_on_pixel_charge: false,
            min_good_pixel_charge: 0.0,
            cut_on_strip_charge: None,
            min_good_strip_charge: 0.0,
        }
    }
}

impl FilterConfig {
    /// Reads settings from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClusterShapeError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let config: FilterConfig = toml::from_str(&content).map_err(|e| {
            ClusterShapeError::Config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.pixel_shape_file.trim().is_empty() {
            return Err(ClusterShapeError::Config(
                "pixel_shape_file cannot be empty".to_string(),
            ));
        }

        for (name, value) in [
            ("min_good_pixel_charge", self.min_good_pixel_charge),
            ("min_good_strip_charge", self.min_good_strip_charge),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ClusterShapeError::Config(format!(
                    "{name} must be a finite non-negative number, got {value}"
                )));
            }
        }

        if let Some(dir) = &self.data_dir
            && dir.exists()
            && !dir.is_dir()
        {
            return Err(ClusterShapeError::Config(format!(
                "data_dir is not a directory: {}",
                dir.display()
            )));
        }

        Ok(())
    }

    pub fn strip_charge_cut_enabled(&self) -> bool {
        self.cut_on_strip_charge
            .unwrap_or(self.min_good_strip_charge > 0.0)
    }

    pub fn pixel_shape_path(&self) -> Result<PathBuf> {
        self.resolve_resource(&self.pixel_shape_file)
    }

    pub fn strip_shape_path(&self) -> Result<PathBuf> {
        self.resolve_resource(STRIP_SHAPE_FILE)
    }

    /// Finds a calibration resource.
    ///
    /// Order: the name itself, `data_dir`, `$CLUSTER_SHAPE_DATA_DIR`, the
    /// data directory shipped with this crate.
    pub fn resolve_resource(&self, name: &str) -> Result<PathBuf> {
        let direct = PathBuf::from(name);
        if direct.is_absolute() || direct.is_file() {
            return Ok(direct);
        }

        let mut searched = vec![direct.display().to_string()];
        let env_dir = env::var(ENV_DATA_DIR)
            .ok()
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from);
        let dirs = self
            .data_dir
            .iter()
            .cloned()
            .chain(env_dir)
            .chain(std::iter::once(PathBuf::from(BUNDLED_DATA_DIR)));

        for dir in dirs {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Ok(candidate);
            }
            searched.push(candidate.display().to_string());
        }

        Err(ClusterShapeError::CalibrationNotFound {
            name: name.to_string(),
            searched: searched.join(", "),
        })
    }
}
