use autotimetabler::config::Settings;
use autotimetabler::server;
use log::error;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Invalid settings: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server::run_server(settings).await {
        error!("Server stopped: {}", e);
        std::process::exit(1);
    }
}
