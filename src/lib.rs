pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use config::cli::LocalStorage;
pub use config::toml_config::TomlConfig;
pub use config::CompletionSettings;
#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use core::completion::{CompletionReport, SeriesCompletion};
pub use core::solver::{BacktrackingSolver, SameYearOrdering};
pub use core::{etl::CompletionEngine, pipeline::CompletionPipeline};
pub use domain::model::{CompletionOutcome, EventRecord, SeriesTimeline, YearOrdinalPair};
pub use utils::error::{Result, SeriesError};
