// src/config.rs

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::columns::{
    ACADEMY_FLAG, ADMISSIONS_POLICY, DENOMINATION, SEX_OF_SCHOOL, TYPE_OF_ESTABLISHMENT,
    URBAN_RURAL,
};

/// Canvas and typography for the rendered chart. Sizes are in inches and points so the
/// same settings give the same proportions at any DPI.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FigureConfig {
    pub width_in: f64,
    pub height_in: f64,
    pub dpi: u32,
    pub tick_font_pt: f64,
    pub legend_font_pt: f64,
    pub label_font_pt: f64,
    /// Open the saved PNG in the system image viewer after rendering.
    pub show: bool,
}

impl Default for FigureConfig {
    fn default() -> Self {
        Self {
            width_in: 6.0,
            height_in: 45.0,
            dpi: 300,
            tick_font_pt: 6.0,
            legend_font_pt: 6.0,
            label_font_pt: 10.0,
            show: false,
        }
    }
}

impl FigureConfig {
    /// Canvas size in pixels.
    pub fn pixel_size(&self) -> (u32, u32) {
        let px = |inches: f64| (inches * self.dpi as f64).round().max(1.0) as u32;
        (px(self.width_in), px(self.height_in))
    }

    /// Convert a point size to pixels at the configured DPI.
    pub fn font_px(&self, pt: f64) -> f64 {
        pt * self.dpi as f64 / 72.0
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// School characteristics CSV.
    pub input: PathBuf,
    /// Where the PNG chart is written.
    pub output: PathBuf,
    /// Authority whose pivot row is printed as a sanity check. `None` skips the check.
    pub check_authority: Option<String>,
    /// Value of `phase_type_grouping` to keep.
    pub phase: String,
    /// Aggregate marker used by the publisher for "all sub-categories".
    pub sentinel: String,
    /// Categorical columns pinned to the sentinel to avoid double counting.
    pub pinned_dimensions: Vec<String>,
    /// Optional CSV export of the sorted summary.
    pub summary_csv: Option<PathBuf>,
    pub figure: FigureConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: PathBuf::from("data/spc_school_characteristics_.csv"),
            output: PathBuf::from("figure1-300dpi.png"),
            check_authority: Some("Buckinghamshire".to_string()),
            phase: "State-funded secondary".to_string(),
            sentinel: "Total".to_string(),
            pinned_dimensions: [
                SEX_OF_SCHOOL,
                TYPE_OF_ESTABLISHMENT,
                DENOMINATION,
                URBAN_RURAL,
                ACADEMY_FLAG,
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            summary_csv: None,
            figure: FigureConfig::default(),
        }
    }
}

impl Config {
    /// Load a YAML config file. Keys not present take their defaults.
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_yaml_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.figure.dpi == 0 {
            bail!("figure.dpi must be positive");
        }
        if !(self.figure.width_in > 0.0 && self.figure.height_in > 0.0) {
            bail!(
                "figure size must be positive, got {}x{} in",
                self.figure.width_in,
                self.figure.height_in
            );
        }
        for (name, pt) in [
            ("tick_font_pt", self.figure.tick_font_pt),
            ("legend_font_pt", self.figure.legend_font_pt),
            ("label_font_pt", self.figure.label_font_pt),
        ] {
            if !(pt > 0.0) {
                bail!("figure.{} must be positive, got {}", name, pt);
            }
        }
        if self
            .pinned_dimensions
            .iter()
            .any(|d| d == ADMISSIONS_POLICY)
        {
            bail!("`{}` is the output dimension and cannot be pinned", ADMISSIONS_POLICY);
        }
        if self.sentinel.is_empty() {
            bail!("sentinel must not be empty");
        }
        Ok(())
    }
}

/// Compare total secondary pupils with pupils in selective (grammar) schools per local
/// authority and draw the result as a PNG bar chart.
#[derive(Parser, Debug, Default)]
#[command(name = "selective-schools", version, about, long_about = None)]
pub struct Cli {
    /// YAML config file; CLI flags override its values.
    #[arg(short, long, env = "SELECTIVE_SCHOOLS_CONFIG")]
    pub config: Option<PathBuf>,

    /// School characteristics CSV.
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// PNG output path.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Local authority to print as a sanity check.
    #[arg(long = "check-authority", conflicts_with = "no_check")]
    pub check_authority: Option<String>,

    /// Skip the sanity check print.
    #[arg(long = "no-check")]
    pub no_check: bool,

    /// Also write the sorted summary as CSV.
    #[arg(long = "summary-csv")]
    pub summary_csv: Option<PathBuf>,

    /// Override the figure DPI.
    #[arg(long)]
    pub dpi: Option<u32>,

    /// Open the chart in the system image viewer once written.
    #[arg(long)]
    pub show: bool,
}

impl Cli {
    /// Merge defaults, the optional config file and CLI flags, in that order.
    pub fn resolve(self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_yaml_file(path)?,
            None => Config::default(),
        };

        if let Some(input) = self.input {
            config.input = input;
        }
        if let Some(output) = self.output {
            config.output = output;
        }
        if let Some(name) = self.check_authority {
            config.check_authority = Some(name);
        }
        if self.no_check {
            config.check_authority = None;
        }
        if let Some(path) = self.summary_csv {
            config.summary_csv = Some(path);
        }
        if let Some(dpi) = self.dpi {
            config.figure.dpi = dpi;
        }
        if self.show {
            config.figure.show = true;
        }

        config.validate()?;
        Ok(config)
    }
}
