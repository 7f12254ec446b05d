pub mod completion;
pub mod etl;
pub mod frequency;
pub mod ghost;
pub mod ordinal;
pub mod pipeline;
pub mod solver;
pub mod title_quality;

pub use crate::domain::model::{EventRecord, TransformResult};
pub use crate::domain::ports::{ConfigProvider, OrdinalSolver, Pipeline, Storage};
pub use crate::utils::error::Result;
