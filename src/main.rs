use clap::Parser;
use hr_etl::utils::logger::{self, LogFormat};
use hr_etl::utils::validation::Validate;
use hr_etl::{CliConfig, DbConfig, EtlEngine, HrPipeline, PostgresStore};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // .env 不存在時忽略
    let _ = dotenvy::dotenv();

    let config = CliConfig::parse();
    logger::init_logger(LogFormat::from_env());

    tracing::info!("Starting hr-etl");
    tracing::debug!("CLI config: {:?}", config);

    // 驗證配置
    let db_config = match config.validate().and_then(|_| DbConfig::from_env()) {
        Ok(db_config) => db_config,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };
    tracing::debug!("Database: {}", db_config.redacted_url());

    let store = PostgresStore::new(db_config);
    let pipeline = HrPipeline::new(store, config);
    let engine = EtlEngine::new(pipeline);

    let result = engine.run().await;
    println!("{}", result);
    tracing::debug!("Run result: {}", result.to_json()?);

    if !result.is_success() {
        if let Some(error) = &result.error {
            eprintln!("❌ {}", error);
        }
        std::process::exit(1);
    }

    Ok(())
}
