pub mod cli;
pub mod toml_config;

use crate::core::ghost::DEFAULT_MAX_EDITIONS;
use crate::core::solver::{SameYearOrdering, DEFAULT_MAX_STEPS};
use crate::utils::error::Result;
use crate::utils::validation::{validate_positive_number, Validate};
use serde::{Deserialize, Serialize};

#[cfg(feature = "cli")]
use crate::core::ConfigProvider;
#[cfg(feature = "cli")]
use crate::utils::validation::{
    validate_json_input, validate_output_formats, validate_path, validate_required_field,
};
#[cfg(feature = "cli")]
use clap::Parser;

pub const OUTPUT_FORMATS: [&str; 2] = ["json", "csv"];

/// 補全引擎的調整參數 (TOML 的 `[completion]` 區段)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionSettings {
    pub solver_max_steps: u64,
    pub same_year_ordering: SameYearOrdering,
    /// Merge orphan records into ghost editions of their year.
    pub reattach_orphans: bool,
    /// Longest timeline (highest ordinal) ghost synthesis will build.
    pub max_editions: u64,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            solver_max_steps: DEFAULT_MAX_STEPS,
            same_year_ordering: SameYearOrdering::default(),
            reattach_orphans: true,
            max_editions: DEFAULT_MAX_EDITIONS,
        }
    }
}

impl Validate for CompletionSettings {
    fn validate(&self) -> Result<()> {
        validate_positive_number("completion.solver_max_steps", self.solver_max_steps, 1)?;
        validate_positive_number("completion.max_editions", self.max_editions, 1)
    }
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "series-completion")]
#[command(about = "Reconstructs complete edition timelines for academic event series")]
pub struct CliConfig {
    /// JSON file mapping series names to lists of event records
    #[arg(long, required_unless_present = "config")]
    pub input: Option<String>,

    #[arg(long, default_value = "./output")]
    pub output_path: String,

    /// TOML configuration file; its values replace the command line defaults
    #[arg(long)]
    pub config: Option<String>,

    #[arg(long, value_delimiter = ',', default_value = "json")]
    pub formats: Vec<String>,

    #[arg(long, help = "Only derive the blank (year, ordinal) timeline")]
    pub blank_only: bool,

    #[arg(long, help = "Drop lower-quality titles per source and year before completing")]
    pub reduce_duplicates: bool,

    #[arg(long, value_enum, default_value = "non-decreasing")]
    #[serde(default)]
    pub same_year_ordering: SameYearOrdering,

    #[arg(long, default_value_t = DEFAULT_MAX_STEPS, help = "Step budget of the ordinal solver")]
    pub solver_max_steps: u64,

    #[arg(long, default_value_t = DEFAULT_MAX_EDITIONS, help = "Highest ordinal a completed timeline may reach")]
    pub max_editions: u64,

    #[arg(long, help = "Keep records without ordinal evidence out of ghost editions")]
    pub no_reattach: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,
}

#[cfg(feature = "cli")]
impl ConfigProvider for CliConfig {
    fn input_path(&self) -> &str {
        self.input.as_deref().unwrap_or_default()
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn output_formats(&self) -> &[String] {
        &self.formats
    }

    fn completion_settings(&self) -> CompletionSettings {
        CompletionSettings {
            solver_max_steps: self.solver_max_steps,
            same_year_ordering: self.same_year_ordering,
            reattach_orphans: !self.no_reattach,
            max_editions: self.max_editions,
        }
    }

    fn reduce_duplicates(&self) -> bool {
        self.reduce_duplicates
    }

    fn blank_only(&self) -> bool {
        self.blank_only
    }
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        let input = validate_required_field("input", &self.input)?;
        validate_json_input("input", input)?;
        validate_path("output_path", &self.output_path)?;
        validate_output_formats("formats", &self.formats, &OUTPUT_FORMATS)?;
        self.completion_settings().validate()
    }
}
