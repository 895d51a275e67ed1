//! Settings file and validated request parameters.
//!
//! [`Settings`] describes the installation (tool binaries, database and
//! scratch directories, known databases) and is read from TOML. Every field
//! has a default so an absent or partial file is fine.
//!
//! [`ScreenParams`] is one request: melting temperature, product size range,
//! stringency window, subunit length and target database. Its
//! [`ScreenParams::validate`] applies the accepted ranges before any external
//! service is called.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::classify::Thresholds;
use crate::error::{Result, ScreenError};
use crate::primer::DesignParams;

/// Genome databases shipped with the service.
pub const BUILTIN_DATABASES: &[&str] = &[
    "TbruceiTREU927",
    "TbruceiGambienseDAL972",
    "TbruceiLister427",
    "TcongolenseIL3000",
];

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub tools: ToolSettings,
    #[serde(default)]
    pub paths: PathSettings,
    /// Extra database names accepted on top of [`BUILTIN_DATABASES`].
    #[serde(default)]
    pub databases: Vec<String>,
    /// Worker threads for per-pair screening (0 = all cores).
    #[serde(default)]
    pub threads: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSettings {
    #[serde(default = "default_primer3")]
    pub primer3: PathBuf,
    #[serde(default = "default_blastn")]
    pub blastn: PathBuf,
    /// Value passed to `blastn -task`.
    #[serde(default = "default_blast_task")]
    pub blast_task: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Directory holding the BLAST databases, one per name.
    #[serde(default = "default_db_dir")]
    pub db_dir: PathBuf,
    /// Root under which each search creates its scratch directory.
    #[serde(default = "default_tmp_dir")]
    pub tmp_dir: PathBuf,
}

fn default_primer3() -> PathBuf { PathBuf::from("primer3_core") }
fn default_blastn() -> PathBuf { PathBuf::from("blastn") }
fn default_blast_task() -> String { "blastn".to_string() }
fn default_db_dir() -> PathBuf { PathBuf::from("/data/blast") }
fn default_tmp_dir() -> PathBuf { std::env::temp_dir() }

impl Default for ToolSettings {
    fn default() -> Self {
        Self { primer3: default_primer3(), blastn: default_blastn(), blast_task: default_blast_task() }
    }
}

impl Default for PathSettings {
    fn default() -> Self {
        Self { db_dir: default_db_dir(), tmp_dir: default_tmp_dir() }
    }
}

impl Settings {
    /// All database names a request may target.
    pub fn known_databases(&self) -> Vec<String> {
        let mut names: Vec<String> = BUILTIN_DATABASES.iter().map(|s| s.to_string()).collect();
        for extra in &self.databases {
            if !names.contains(extra) {
                names.push(extra.clone());
            }
        }
        names
    }

    /// Path handed to `blastn -db` for a known database name.
    pub fn database_path(&self, name: &str) -> Result<PathBuf> {
        let known = self.known_databases();
        if !known.iter().any(|d| d == name) {
            return Err(ScreenError::invalid(
                "database",
                name,
                format!("Valid options are {}", known.join("|")),
            ));
        }
        Ok(self.paths.db_dir.join(name))
    }
}

/// Worker count for a requested thread setting (0 = all cores).
pub fn worker_threads(requested: usize) -> usize {
    if requested == 0 { num_cpus::get().max(1) } else { requested }
}

pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let p = path.as_ref();
    let contents = std::fs::read_to_string(p)
        .map_err(|e| ScreenError::Config(format!("cannot read {}: {}", p.display(), e)))?;
    toml::from_str(&contents)
        .map_err(|e| ScreenError::Config(format!("failed to parse {}: {}", p.display(), e)))
}

/// Load settings from `path` when given, otherwise use the defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<Settings> {
    match path {
        Some(p) => load_settings(p),
        None => Ok(Settings::default()),
    }
}

/// One screening request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenParams {
    /// Optimal primer melting temperature (°C).
    pub melting_temp: i64,
    pub product_min: i64,
    pub product_max: i64,
    /// Lower bound of the suspicious identity window (percent).
    pub string_min: i64,
    /// Upper bound of the suspicious identity window (percent).
    pub string_max: i64,
    pub subunit_length: i64,
    pub database: String,
}

fn check_range(name: &str, value: i64, min: Option<i64>, max: Option<i64>, criteria: &str) -> Result<()> {
    let below = min.is_some_and(|m| value < m);
    let above = max.is_some_and(|m| value > m);
    if below || above {
        return Err(ScreenError::invalid(name, value, format!("Outside range {criteria}")));
    }
    Ok(())
}

/// Check the stringency window and subunit length, then build [`Thresholds`].
pub fn validate_thresholds(string_min: i64, string_max: i64, subunit_length: i64) -> Result<Thresholds> {
    check_range("minimum similarity", string_min, Some(80), None, ">80")?;
    check_range("maximum similarity", string_max, None, Some(99), "<99")?;
    check_range("subunit length", subunit_length, Some(15), Some(25), "15-25")?;
    Ok(Thresholds {
        conflicting_identity_range: (string_min as f64, string_max as f64),
        subunit_length: subunit_length as usize,
        ..Thresholds::default()
    })
}

impl ScreenParams {
    /// Apply the accepted parameter ranges.
    ///
    /// # Examples
    /// ```
    /// use ampliscreen::config::{ScreenParams, Settings};
    /// let p = ScreenParams {
    ///     melting_temp: 60, product_min: 100, product_max: 500,
    ///     string_min: 80, string_max: 99, subunit_length: 20,
    ///     database: "TbruceiTREU927".into(),
    /// };
    /// assert!(p.validate(&Settings::default()).is_ok());
    /// ```
    pub fn validate(&self, settings: &Settings) -> Result<()> {
        self.validate_design()?;
        validate_thresholds(self.string_min, self.string_max, self.subunit_length)?;
        settings.database_path(&self.database)?;
        Ok(())
    }

    /// Only the ranges the design service depends on.
    pub fn validate_design(&self) -> Result<()> {
        check_range("melting temperature", self.melting_temp, Some(50), Some(75), "50-75")?;
        check_range("minimum PCR product size", self.product_min, Some(1), None, ">1")?;
        check_range("maximum PCR product size", self.product_max, Some(1), None, ">1")?;
        if self.product_min > self.product_max {
            return Err(ScreenError::invalid(
                "minimum PCR product size",
                self.product_min,
                format!("must not exceed the maximum product size ({})", self.product_max),
            ));
        }
        Ok(())
    }

    pub fn design_params(&self) -> DesignParams {
        DesignParams {
            optimal_melting_temp: self.melting_temp as u32,
            product_min: self.product_min as usize,
            product_max: self.product_max as usize,
        }
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            conflicting_identity_range: (self.string_min as f64, self.string_max as f64),
            subunit_length: self.subunit_length as usize,
            ..Thresholds::default()
        }
    }
}
