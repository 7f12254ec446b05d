use clap::Parser;
use series_completion::core::ConfigProvider;
use series_completion::utils::error::{ErrorSeverity, SeriesError};
use series_completion::utils::{logger, validation::Validate};
use series_completion::{CliConfig, CompletionEngine, CompletionPipeline, LocalStorage, TomlConfig};

fn report_and_exit(e: &SeriesError) -> ! {
    tracing::error!("❌ Series completion failed: {} (Severity: {:?})", e, e.severity());
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    let exit_code = match e.severity() {
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}

/// 相對輸入路徑以目前工作目錄為準，不受輸出目錄影響
fn absolute_input(path: &str) -> Result<String, SeriesError> {
    Ok(std::path::absolute(path)?.display().to_string())
}

async fn run<C: ConfigProvider>(config: C) -> Result<String, SeriesError> {
    let storage = LocalStorage::new(config.output_path());
    let pipeline = CompletionPipeline::new(storage, config);
    CompletionEngine::new(pipeline).run().await
}

async fn execute(mut config: CliConfig) -> Result<String, SeriesError> {
    match config.config.clone() {
        Some(path) => {
            tracing::info!("📄 Loading configuration from {}", path);
            let mut toml_config = TomlConfig::from_file(&path)?;
            toml_config.validate()?;
            toml_config.source.input_path = absolute_input(&toml_config.source.input_path)?;
            run(toml_config).await
        }
        None => {
            config.validate()?;
            if let Some(input) = config.input.take() {
                config.input = Some(absolute_input(&input)?);
            }
            run(config).await
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();

    // 初始化日誌
    if config.json_logs {
        logger::init_json_logger(config.verbose);
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting series-completion CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    match execute(config).await {
        Ok(output_path) => {
            tracing::info!("✅ Series completion finished successfully!");
            println!("✅ Series completion finished successfully!");
            println!("📁 Output saved to: {}", output_path);
            Ok(())
        }
        Err(e) => report_and_exit(&e),
    }
}
