//! JSON configuration for a reconstruction session

use crate::error::{EitError, Result};
use crate::strategy::Algorithm;
use crate::strategy::bp::BpParams;
use crate::strategy::greit::GreitParams;
use crate::strategy::jac::JacParams;
use math_eit_fem::MeasurementParser;
use math_eit_mesh::{DistMeshConfig, MIN_ELECTRODES};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Complete session configuration loaded from JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconstructionConfig {
    #[serde(default)]
    pub algorithm: Algorithm,
    #[serde(default = "default_n_el")]
    pub n_el: usize,
    #[serde(default)]
    pub mesh: MeshConfig,
    #[serde(default)]
    pub protocol: ProtocolConfig,
    #[serde(default)]
    pub bp: BpParams,
    #[serde(default)]
    pub jac: JacParams,
    #[serde(default)]
    pub greit: GreitParams,
    /// Where `reset_baseline` takes its reference frame from
    #[serde(default)]
    pub reference: ReferenceSource,
    /// Replacement for measurements that are exactly zero
    #[serde(default = "default_zero_sentinel")]
    pub zero_sentinel: f64,
    /// How long the worker waits for a frame before checking for commands
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Images the worker may queue before it blocks on the consumer
    #[serde(default = "default_image_queue_capacity")]
    pub image_queue_capacity: usize,
}

fn default_n_el() -> usize {
    16
}

fn default_zero_sentinel() -> f64 {
    1.0
}

fn default_poll_interval_ms() -> u64 {
    50
}

fn default_image_queue_capacity() -> usize {
    8
}

impl Default for ReconstructionConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::default(),
            n_el: default_n_el(),
            mesh: MeshConfig::default(),
            protocol: ProtocolConfig::default(),
            bp: BpParams::default(),
            jac: JacParams::default(),
            greit: GreitParams::default(),
            reference: ReferenceSource::default(),
            zero_sentinel: default_zero_sentinel(),
            poll_interval_ms: default_poll_interval_ms(),
            image_queue_capacity: default_image_queue_capacity(),
        }
    }
}

/// Mesh generator and its parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MeshConfig {
    /// Relaxed unstructured mesh of the unit disk
    #[serde(rename = "distmesh")]
    DistMesh(DistMeshConfig),
    /// Deterministic fan mesh of the unit disk
    LayerCircle { n_fan: usize, n_layer: usize },
}

impl Default for MeshConfig {
    fn default() -> Self {
        MeshConfig::DistMesh(DistMeshConfig::default())
    }
}

/// Stimulation and measurement settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Distance between source and sink; `n_el / 2` when absent
    #[serde(default)]
    pub dist: Option<usize>,
    #[serde(default = "default_step")]
    pub step: usize,
    #[serde(default)]
    pub parser: MeasurementParser,
    /// Optional custom pattern; `{n_el}` in the path is replaced by the
    /// electrode count
    #[serde(default)]
    pub stimulation_file: Option<PathBuf>,
}

fn default_step() -> usize {
    1
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            dist: None,
            step: default_step(),
            parser: MeasurementParser::default(),
            stimulation_file: None,
        }
    }
}

impl ProtocolConfig {
    pub fn dist_for(&self, n_el: usize) -> usize {
        self.dist.unwrap_or(n_el / 2)
    }

    /// Stimulation file path for a given electrode count
    pub fn stimulation_path(&self, n_el: usize) -> Option<PathBuf> {
        self.stimulation_file.as_ref().map(|p| {
            let text = p.to_string_lossy().replace("{n_el}", &n_el.to_string());
            PathBuf::from(text)
        })
    }
}

/// Source of the persisted reference frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReferenceSource {
    /// Boundary voltages of the uniform-conductivity forward solve
    #[default]
    Simulated,
    /// A `<label> : v1, v2, ...` record file; the first record is used
    /// when `label` is absent
    File {
        path: PathBuf,
        #[serde(default)]
        label: Option<String>,
    },
}

impl ReconstructionConfig {
    /// Load configuration from JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to JSON file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_el < MIN_ELECTRODES {
            return Err(EitError::Configuration(format!(
                "{} electrodes requested, at least {MIN_ELECTRODES} are required",
                self.n_el
            )));
        }
        let dist = self.protocol.dist_for(self.n_el);
        if dist == 0 || dist >= self.n_el {
            return Err(EitError::Configuration(format!(
                "excitation distance {dist} must lie in 1..{}",
                self.n_el
            )));
        }
        if self.protocol.step == 0 || self.protocol.step >= self.n_el {
            return Err(EitError::Configuration(format!(
                "measurement step {} must lie in 1..{}",
                self.protocol.step, self.n_el
            )));
        }
        if self.zero_sentinel == 0.0 || !self.zero_sentinel.is_finite() {
            return Err(EitError::Configuration(format!(
                "zero sentinel {} must be finite and nonzero",
                self.zero_sentinel
            )));
        }
        if self.image_queue_capacity == 0 {
            return Err(EitError::Configuration(
                "image queue capacity must be at least 1".into(),
            ));
        }
        self.bp.validate()?;
        self.jac.validate()?;
        self.greit.validate()?;
        Ok(())
    }
}
