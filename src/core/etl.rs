use crate::core::Pipeline;
use crate::utils::error::Result;
use std::time::Instant;

/// 依序執行 extract → transform → load
pub struct CompletionEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> CompletionEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self) -> Result<String> {
        let started = Instant::now();
        tracing::info!("🚀 Starting series completion");

        let series = self.pipeline.extract().await?;
        tracing::debug!("Extracted {} series", series.len());

        let result = self.pipeline.transform(series).await?;
        let record_count: usize = result.series.iter().map(|s| s.records.len()).sum();
        tracing::debug!(
            "Transformed {} series into {} records",
            result.series.len(),
            record_count
        );

        let output_path = self.pipeline.load(result).await?;
        tracing::info!(
            "Series completion finished in {:.2?}, output at {}",
            started.elapsed(),
            output_path
        );

        Ok(output_path)
    }
}
