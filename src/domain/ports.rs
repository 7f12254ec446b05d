use crate::config::CompletionSettings;
use crate::domain::model::{SeriesRecords, TransformResult};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::BTreeSet;
use thiserror::Error;

/// One decision variable of the ordinal assignment: a record's year and its candidate ordinals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrdinalVariable {
    pub year: i64,
    pub candidates: BTreeSet<i64>,
}

impl OrdinalVariable {
    pub fn new(year: i64, candidates: impl IntoIterator<Item = i64>) -> Self {
        Self {
            year,
            candidates: candidates.into_iter().collect(),
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveError {
    #[error("no ordinal assignment satisfies the chronology")]
    Infeasible,

    #[error("solver gave up after {steps} steps")]
    BudgetExhausted { steps: u64 },
}

/// 序數指派求解器介面，實作可替換 (backtracking、外部 CP/ILP 等)
pub trait OrdinalSolver: Send + Sync {
    /// Returns one ordinal per variable, in input order.
    fn solve(&self, variables: &[OrdinalVariable]) -> std::result::Result<Vec<i64>, SolveError>;
}

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn input_path(&self) -> &str;
    fn output_path(&self) -> &str;
    fn output_formats(&self) -> &[String];
    fn completion_settings(&self) -> CompletionSettings;
    fn reduce_duplicates(&self) -> bool;
    fn blank_only(&self) -> bool;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<SeriesRecords>>;
    async fn transform(&self, data: Vec<SeriesRecords>) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<String>;
}
