use tinsel::{AppConfig, SceneConfig};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = tinsel::run(AppConfig::default(), SceneConfig::default()) {
        log::error!("{e}");
        std::process::exit(1);
    }
}
