use crate::core::completion::SeriesCompletion;
use crate::core::ordinal::annotate;
use crate::core::solver::BacktrackingSolver;
use crate::core::title_quality::filter_duplicates_by_title;
use crate::core::{ConfigProvider, OrdinalSolver, Pipeline, Storage};
use crate::domain::model::{
    CompletionOutcome, EventRecord, SeriesRecords, SeriesResult, TransformResult, YearOrdinalPair,
};
use crate::utils::error::{Result, SeriesError};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

pub const COMPLETED_SERIES_FILE: &str = "completed_series.json";
pub const BLANK_TIMELINE_JSON_FILE: &str = "blank_timeline.json";
pub const BLANK_TIMELINE_CSV_FILE: &str = "blank_timeline.csv";

/// 讀取系列 JSON、逐系列補全、輸出 JSON/CSV
pub struct CompletionPipeline<S: Storage, C: ConfigProvider, O: OrdinalSolver = BacktrackingSolver>
{
    storage: S,
    config: C,
    completion: Arc<SeriesCompletion<O>>,
}

impl<S: Storage, C: ConfigProvider> CompletionPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        let completion = Arc::new(SeriesCompletion::new(config.completion_settings()));
        Self {
            storage,
            config,
            completion,
        }
    }
}

impl<S: Storage, C: ConfigProvider, O: OrdinalSolver> CompletionPipeline<S, C, O> {
    pub fn with_solver(storage: S, config: C, solver: O) -> Self {
        let completion = Arc::new(SeriesCompletion::with_solver(
            config.completion_settings(),
            solver,
        ));
        Self {
            storage,
            config,
            completion,
        }
    }

    fn wants(&self, format: &str) -> bool {
        self.config
            .output_formats()
            .iter()
            .any(|f| f.eq_ignore_ascii_case(format))
    }
}

/// One series worth of work; runs on the blocking pool.
fn process_series<O: OrdinalSolver>(
    completion: &SeriesCompletion<O>,
    series: SeriesRecords,
    reduce: bool,
    blank_only: bool,
) -> SeriesResult {
    let SeriesRecords { name, records } = series;
    let records = if reduce {
        filter_duplicates_by_title(records)
    } else {
        records
    };

    if blank_only {
        let mut annotated = records.clone();
        let parsed = annotated.iter_mut().map(annotate).filter(|added| *added).count();
        if parsed > 0 {
            tracing::debug!("Parsed {} ordinals from titles", parsed);
        }
        let blank_timeline = completion.completed_blank_series(&annotated);
        return SeriesResult {
            name,
            records,
            blank_timeline,
            outcome: None,
        };
    }

    let blank_timeline = completion.completed_blank_series(&records);
    let report = completion.complete(records);
    tracing::info!(outcome = report.outcome.label(), "Series processed");
    SeriesResult {
        name,
        records: report.timeline.into_records(),
        blank_timeline,
        outcome: Some(report.outcome),
    }
}

#[derive(Serialize)]
struct BlankTimelineRow<'a> {
    series: &'a str,
    year: i64,
    ordinal: i64,
}

fn blank_timeline_csv(series: &[SeriesResult]) -> Result<Vec<u8>> {
    // 標頭手動寫入，沒有任何列時也保留
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(["series", "year", "ordinal"])?;
    for result in series {
        for pair in &result.blank_timeline {
            writer.serialize(BlankTimelineRow {
                series: &result.name,
                year: pair.year,
                ordinal: pair.ordinal,
            })?;
        }
    }
    writer
        .into_inner()
        .map_err(|e| SeriesError::processing(format!("CSV buffer error: {}", e)))
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider, O: OrdinalSolver + 'static> Pipeline
    for CompletionPipeline<S, C, O>
{
    async fn extract(&self) -> Result<Vec<SeriesRecords>> {
        tracing::info!("📥 Reading series from {}", self.config.input_path());
        let raw = self.storage.read_file(self.config.input_path()).await?;
        let parsed: BTreeMap<String, Vec<EventRecord>> = serde_json::from_slice(&raw)?;

        let series: Vec<SeriesRecords> = parsed
            .into_iter()
            .map(|(name, records)| SeriesRecords { name, records })
            .collect();
        let total: usize = series.iter().map(|s| s.records.len()).sum();
        tracing::info!("📊 Extracted {} series with {} records", series.len(), total);
        Ok(series)
    }

    async fn transform(&self, data: Vec<SeriesRecords>) -> Result<TransformResult> {
        tracing::info!("🔧 Completing {} series", data.len());
        let reduce = self.config.reduce_duplicates();
        let blank_only = self.config.blank_only();

        let mut handles = Vec::with_capacity(data.len());
        for series in data {
            let completion = Arc::clone(&self.completion);
            let span = tracing::info_span!("series", name = %series.name);
            // 任務失敗時原樣輸出這個系列
            let original = series.clone();
            let handle = tokio::task::spawn_blocking(move || {
                let _entered = span.enter();
                process_series(&completion, series, reduce, blank_only)
            });
            handles.push((original, handle));
        }

        let mut series = Vec::with_capacity(handles.len());
        for (original, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!(
                        series = %original.name,
                        outcome = "failed",
                        "❌ Series task failed, records kept unchanged: {}",
                        e
                    );
                    SeriesResult {
                        name: original.name,
                        records: original.records,
                        blank_timeline: Vec::new(),
                        outcome: Some(CompletionOutcome::Failed),
                    }
                }
            };
            series.push(result);
        }

        let result = TransformResult { series };
        tracing::info!("✅ Transform complete: {:?}", result.outcome_counts());
        Ok(result)
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        tracing::info!("💾 Writing results to {}", self.config.output_path());

        if self.wants("json") {
            let (file_name, json) = if self.config.blank_only() {
                let timelines: BTreeMap<&str, &[YearOrdinalPair]> = result
                    .series
                    .iter()
                    .map(|s| (s.name.as_str(), s.blank_timeline.as_slice()))
                    .collect();
                (BLANK_TIMELINE_JSON_FILE, serde_json::to_vec_pretty(&timelines)?)
            } else {
                let completed: BTreeMap<&str, &[EventRecord]> = result
                    .series
                    .iter()
                    .map(|s| (s.name.as_str(), s.records.as_slice()))
                    .collect();
                (COMPLETED_SERIES_FILE, serde_json::to_vec_pretty(&completed)?)
            };
            self.storage.write_file(file_name, &json).await?;
            tracing::debug!("{} written ({} bytes)", file_name, json.len());
        }

        if self.wants("csv") {
            let csv_data = blank_timeline_csv(&result.series)?;
            self.storage
                .write_file(BLANK_TIMELINE_CSV_FILE, &csv_data)
                .await?;
            tracing::debug!("{} written ({} bytes)", BLANK_TIMELINE_CSV_FILE, csv_data.len());
        }

        let output_path = self.config.output_path().to_string();
        tracing::info!("📦 Output saved: {}", output_path);
        Ok(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompletionSettings;
    use crate::domain::ports::{OrdinalVariable, SolveError};
    use serde_json::json;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        async fn put(&self, path: &str, data: &[u8]) {
            self.files.lock().await.insert(path.to_string(), data.to_vec());
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            self.files.lock().await.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                SeriesError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            self.put(path, data).await;
            Ok(())
        }
    }

    struct MockConfig {
        output_formats: Vec<String>,
        reduce_duplicates: bool,
        blank_only: bool,
    }

    impl MockConfig {
        fn new(formats: &[&str]) -> Self {
            Self {
                output_formats: formats.iter().map(|f| f.to_string()).collect(),
                reduce_duplicates: false,
                blank_only: false,
            }
        }
    }

    impl ConfigProvider for MockConfig {
        fn input_path(&self) -> &str {
            "series.json"
        }

        fn output_path(&self) -> &str {
            "test_output"
        }

        fn output_formats(&self) -> &[String] {
            &self.output_formats
        }

        fn completion_settings(&self) -> CompletionSettings {
            CompletionSettings::default()
        }

        fn reduce_duplicates(&self) -> bool {
            self.reduce_duplicates
        }

        fn blank_only(&self) -> bool {
            self.blank_only
        }
    }

    fn sample_input() -> Vec<u8> {
        serde_json::to_vec(&json!({
            "WS": [
                {"source": "dblp", "title": "1st Workshop on Graphs", "year": 2001, "ordinal": 1},
                {"source": "dblp", "title": "3rd Workshop on Graphs", "year": 2003, "ordinal": 3}
            ],
            "CONF": [
                {"source": "wikidata", "title": "Conference 2010", "year": 2010}
            ]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_extract_sorts_series_by_name() {
        let storage = MockStorage::default();
        storage.put("series.json", &sample_input()).await;
        let pipeline = CompletionPipeline::new(storage, MockConfig::new(&["json"]));

        let series = pipeline.extract().await.unwrap();
        let names: Vec<&str> = series.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["CONF", "WS"]);
        assert_eq!(series[1].records.len(), 2);
    }

    #[tokio::test]
    async fn test_extract_rejects_non_object_input() {
        let storage = MockStorage::default();
        storage.put("series.json", b"[1, 2, 3]").await;
        let pipeline = CompletionPipeline::new(storage, MockConfig::new(&["json"]));

        let err = pipeline.extract().await.unwrap_err();
        assert!(matches!(err, SeriesError::SerializationError(_)));
    }

    #[tokio::test]
    async fn test_transform_completes_each_series() {
        let storage = MockStorage::default();
        storage.put("series.json", &sample_input()).await;
        let pipeline = CompletionPipeline::new(storage, MockConfig::new(&["json"]));

        let series = pipeline.extract().await.unwrap();
        let result = pipeline.transform(series).await.unwrap();

        let ws = result.series.iter().find(|s| s.name == "WS").unwrap();
        assert_eq!(ws.records.len(), 3);
        assert!(ws.records[1].is_ghost());
        assert_eq!(ws.blank_timeline.len(), 3);

        let counts = result.outcome_counts();
        assert_eq!(counts.get("completed"), Some(&1));
        assert_eq!(counts.get("empty"), Some(&1));
    }

    #[tokio::test]
    async fn test_load_writes_json_and_csv() {
        let storage = MockStorage::default();
        storage.put("series.json", &sample_input()).await;
        let pipeline = CompletionPipeline::new(storage.clone(), MockConfig::new(&["json", "csv"]));

        let series = pipeline.extract().await.unwrap();
        let result = pipeline.transform(series).await.unwrap();
        let output_path = pipeline.load(result).await.unwrap();
        assert_eq!(output_path, "test_output");

        let json_data = storage.get_file(COMPLETED_SERIES_FILE).await.unwrap();
        let completed: serde_json::Value = serde_json::from_slice(&json_data).unwrap();
        assert_eq!(completed["WS"].as_array().unwrap().len(), 3);
        assert_eq!(completed["WS"][1], json!({"year": 2002, "ordinal": 2}));

        let csv_data = String::from_utf8(storage.get_file(BLANK_TIMELINE_CSV_FILE).await.unwrap()).unwrap();
        let lines: Vec<&str> = csv_data.lines().collect();
        assert_eq!(lines, vec!["series,year,ordinal", "WS,2001,1", "WS,2002,2", "WS,2003,3"]);
    }

    /// Backtracking solver that blows up on pre-1900 years.
    struct FragileSolver;

    impl OrdinalSolver for FragileSolver {
        fn solve(
            &self,
            variables: &[OrdinalVariable],
        ) -> std::result::Result<Vec<i64>, SolveError> {
            if variables.iter().any(|v| v.year < 1900) {
                panic!("corrupt series");
            }
            BacktrackingSolver::default().solve(variables)
        }
    }

    #[tokio::test]
    async fn test_failed_series_does_not_stop_the_batch() {
        let storage = MockStorage::default();
        storage
            .put(
                "series.json",
                &serde_json::to_vec(&json!({
                    "BAD": [
                        {"source": "dblp", "title": "1st Workshop", "year": 1850, "eventId": "b1"}
                    ],
                    "GOOD": [
                        {"source": "dblp", "title": "1st Workshop on Graphs", "year": 2001},
                        {"source": "dblp", "title": "3rd Workshop on Graphs", "year": 2003}
                    ]
                }))
                .unwrap(),
            )
            .await;
        let config = MockConfig::new(&["json"]);
        let pipeline = CompletionPipeline::with_solver(storage.clone(), config, FragileSolver);

        let series = pipeline.extract().await.unwrap();
        let result = pipeline.transform(series).await.unwrap();

        let bad = result.series.iter().find(|s| s.name == "BAD").unwrap();
        assert_eq!(bad.outcome, Some(CompletionOutcome::Failed));
        assert_eq!(bad.records[0].ordinal, None);
        let counts = result.outcome_counts();
        assert_eq!(counts.get("failed"), Some(&1));
        assert_eq!(counts.get("completed"), Some(&1));

        pipeline.load(result).await.unwrap();
        let json_data = storage.get_file(COMPLETED_SERIES_FILE).await.unwrap();
        let completed: serde_json::Value = serde_json::from_slice(&json_data).unwrap();
        assert_eq!(
            completed["BAD"],
            json!([{"source": "dblp", "title": "1st Workshop", "year": 1850, "eventId": "b1"}])
        );
        assert_eq!(completed["GOOD"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_blank_only_parses_titles() {
        let storage = MockStorage::default();
        storage
            .put(
                "series.json",
                &serde_json::to_vec(&json!({
                    "WS": [
                        {"source": "dblp", "title": "First Workshop", "year": 2000},
                        {"source": "dblp", "title": "3rd Workshop", "year": 2004}
                    ]
                }))
                .unwrap(),
            )
            .await;
        let mut config = MockConfig::new(&["json"]);
        config.blank_only = true;
        let pipeline = CompletionPipeline::new(storage.clone(), config);

        let series = pipeline.extract().await.unwrap();
        let result = pipeline.transform(series).await.unwrap();
        assert_eq!(result.series[0].outcome, None);
        pipeline.load(result).await.unwrap();

        assert!(storage.get_file(COMPLETED_SERIES_FILE).await.is_none());
        let json_data = storage.get_file(BLANK_TIMELINE_JSON_FILE).await.unwrap();
        let blank: serde_json::Value = serde_json::from_slice(&json_data).unwrap();
        assert_eq!(
            blank["WS"],
            json!([
                {"year": 2000, "ordinal": 1},
                {"year": 2002, "ordinal": 2},
                {"year": 2004, "ordinal": 3}
            ])
        );
    }
}
