//! Run-time configuration.
//!
//! Everything a density calculation depends on is passed around as plain
//! values: the four basis scalars in [`BasisConfig`], and the grids, strategy
//! and file locations of a full run in [`RunConfig`], which is read from YAML:
//! ```yaml
//! basis:
//!   br: 1.935801664793151
//!   bz: 2.829683956491218
//!   n: 14
//!   q: 1.3
//! rho: rho.arma
//! r: { min: -10.0, max: 10.0, points: 21 }
//! z: { min: -20.0, max: 20.0, points: 21 }
//! strategy: factorized
//! threads: 4
//! output: density.txt
//! ```

use std::path::{ Path, PathBuf };
use ndarray as nd;
use serde::{ Deserialize, Serialize };
use crate::{ density::Strategy, error::ConfigError };

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Deformation lengths and truncation parameters fixing a basis.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BasisConfig {
    /// Radial (perpendicular) deformation length.
    pub br: f64,
    /// Axial deformation length.
    pub bz: f64,
    /// Integer truncation parameter *N*.
    pub n: usize,
    /// Real truncation parameter *Q*.
    pub q: f64,
}

impl Default for BasisConfig {
    fn default() -> Self {
        Self { br: 1.935801664793151, bz: 2.829683956491218, n: 14, q: 1.3 }
    }
}

/// A uniformly spaced coordinate grid, endpoints included.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    pub min: f64,
    pub max: f64,
    pub points: usize,
}

impl GridConfig {
    pub fn new(min: f64, max: f64, points: usize) -> Self {
        Self { min, max, points }
    }

    /// Sample the grid.
    pub fn linspace(&self) -> nd::Array1<f64> {
        nd::Array1::linspace(self.min, self.max, self.points)
    }

    fn check(&self, name: &'static str) -> ConfigResult<()> {
        (self.min.is_finite() && self.max.is_finite()).then_some(())
            .ok_or(ConfigError::BadGrid(name, self.min, self.max))
    }
}

fn def_r() -> GridConfig { GridConfig::new(-10.0, 10.0, 21) }

fn def_z() -> GridConfig { GridConfig::new(-20.0, 20.0, 21) }

fn def_output() -> PathBuf { PathBuf::from("density.txt") }

/// Configuration for a full density run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub basis: BasisConfig,
    /// Path to the density coefficient matrix.
    pub rho: PathBuf,
    #[serde(default = "def_r")]
    pub r: GridConfig,
    #[serde(default = "def_z")]
    pub z: GridConfig,
    #[serde(default)]
    pub strategy: Strategy,
    /// Size of a dedicated worker pool; the global pool is used if absent.
    #[serde(default)]
    pub threads: Option<usize>,
    #[serde(default = "def_output")]
    pub output: PathBuf,
}

impl RunConfig {
    /// Parse from a YAML string.
    pub fn from_yaml_str(s: &str) -> ConfigResult<Self> {
        let config: Self = serde_yaml::from_str(s)?;
        config.r.check("r")?;
        config.z.check("z")?;
        Ok(config)
    }

    /// Read from a YAML file. A relative `rho` path is taken relative to the
    /// file's directory.
    pub fn from_yaml<P>(path: P) -> ConfigResult<Self>
    where P: AsRef<Path>
    {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        let mut config = Self::from_yaml_str(&s)?;
        if config.rho.is_relative() {
            if let Some(dir) = path.parent() {
                config.rho = dir.join(&config.rho);
            }
        }
        Ok(config)
    }
}
