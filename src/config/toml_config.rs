use crate::config::{CompletionSettings, OUTPUT_FORMATS};
use crate::core::ConfigProvider;
use crate::utils::error::{Result, SeriesError};
use crate::utils::validation::{
    validate_json_input, validate_non_empty_string, validate_output_formats, validate_path,
    Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;

static RE_ENV_VAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").unwrap());

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub pipeline: PipelineConfig,
    pub source: SourceConfig,
    #[serde(default)]
    pub completion: CompletionSettings,
    pub load: LoadConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    pub description: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub input_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    pub output_path: String,
    #[serde(default = "default_output_formats")]
    pub output_formats: Vec<String>,
    #[serde(default)]
    pub reduce_duplicates: bool,
    #[serde(default)]
    pub blank_only: bool,
}

fn default_output_formats() -> Vec<String> {
    vec!["json".to_string()]
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| SeriesError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${SERIES_DATA_DIR})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> String {
        RE_ENV_VAR
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validate_non_empty_string("pipeline.name", &self.pipeline.name)?;
        validate_json_input("source.input_path", &self.source.input_path)?;
        validate_path("load.output_path", &self.load.output_path)?;
        validate_output_formats("load.output_formats", &self.load.output_formats, &OUTPUT_FORMATS)?;
        self.completion.validate()?;
        Ok(())
    }
}

impl ConfigProvider for TomlConfig {
    fn input_path(&self) -> &str {
        &self.source.input_path
    }

    fn output_path(&self) -> &str {
        &self.load.output_path
    }

    fn output_formats(&self) -> &[String] {
        &self.load.output_formats
    }

    fn completion_settings(&self) -> CompletionSettings {
        self.completion.clone()
    }

    fn reduce_duplicates(&self) -> bool {
        self.load.reduce_duplicates
    }

    fn blank_only(&self) -> bool {
        self.load.blank_only
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::solver::SameYearOrdering;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_basic_toml_config() {
        let toml_content = r#"
[pipeline]
name = "dblp-series"
description = "Complete DBLP conference series"
version = "1.0.0"

[source]
input_path = "data/series.json"

[completion]
solver_max_steps = 5000
same_year_ordering = "equal"
max_editions = 250

[load]
output_path = "./test-output"
output_formats = ["json", "csv"]
reduce_duplicates = true
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.pipeline.name, "dblp-series");
        assert_eq!(config.input_path(), "data/series.json");
        assert_eq!(config.completion.solver_max_steps, 5000);
        assert_eq!(config.completion.same_year_ordering, SameYearOrdering::Equal);
        assert_eq!(config.completion.max_editions, 250);
        assert!(config.completion.reattach_orphans);
        assert!(config.reduce_duplicates());
        assert!(!config.blank_only());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_completion_section_is_optional() {
        let toml_content = r#"
[pipeline]
name = "minimal"

[source]
input_path = "series.json"

[load]
output_path = "./output"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.completion, CompletionSettings::default());
        assert_eq!(config.output_formats(), ["json".to_string()]);
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("TEST_SERIES_DATA_DIR", "/srv/series");

        let toml_content = r#"
[pipeline]
name = "test"

[source]
input_path = "${TEST_SERIES_DATA_DIR}/series.json"

[load]
output_path = "${TEST_SERIES_UNSET_DIR}/output"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.source.input_path, "/srv/series/series.json");
        assert_eq!(config.load.output_path, "${TEST_SERIES_UNSET_DIR}/output");

        std::env::remove_var("TEST_SERIES_DATA_DIR");
    }

    #[test]
    fn test_config_validation() {
        let toml_content = r#"
[pipeline]
name = "test"

[source]
input_path = "series.csv"

[load]
output_path = "./output"
output_formats = ["json"]
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_err());

        let toml_content = r#"
[pipeline]
name = "test"

[source]
input_path = "series.json"

[load]
output_path = "./output"
output_formats = ["xlsx"]
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let err = TomlConfig::from_toml_str("[pipeline\nname = ").unwrap_err();
        assert!(matches!(err, SeriesError::ConfigValidationError { .. }));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();

        let toml_content = r#"
[pipeline]
name = "file-test"

[source]
input_path = "series.json"

[load]
output_path = "./output"
output_formats = ["csv"]
"#;

        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.pipeline.name, "file-test");
    }
}
