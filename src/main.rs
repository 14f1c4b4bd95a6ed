use cut_it_now::api;
use cut_it_now::config::AppConfig;

#[tokio::main]
async fn main() {
    // RUST_LOG may come from .env, so load it before the logger
    let dotenv_result = dotenvy::dotenv();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    if let Err(err) = dotenv_result {
        if !matches!(err, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            log::warn!("⚠️ Could not load .env: {}", err);
        }
    }

    let app_config = AppConfig::from_env();

    log::info!("🚀 Cutting service starting...");
    api::start_api_server(app_config.api, app_config.optimizer).await;
}
