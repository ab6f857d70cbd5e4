#[macro_use]
extern crate rocket;

use std::sync::Arc;

use dotenv::dotenv;
use env_logger::Env;
use flyerproxy::config::AppConfig;
use flyerproxy::origin::HttpOriginFetcher;
use log::info;
use rocket::{
    figment::{
        providers::{Env as EnvProvider, Format, Toml},
        Figment, Profile,
    },
    Config,
};

#[launch]
fn rocket() -> _ {
    dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    // Load config: defaults, then App.toml, then APP_* environment variables
    let figment = Figment::from(Config::default())
        .merge(Toml::file("App.toml").nested())
        .merge(EnvProvider::prefixed("APP_").ignore(&["PROFILE"]).global())
        .select(Profile::from_env_or("APP_PROFILE", "default"));

    let config = figment
        .extract::<AppConfig>()
        .expect("Invalid configuration");
    info!("Configuration loaded successfully");

    let fetcher = HttpOriginFetcher::new(&config).expect("Failed to build HTTP client");

    info!(
        "Starting flyerproxy on {}:{} (html origin: {}, image origin: {})",
        config.address, config.port, config.html_origin_root, config.image_origin_root
    );

    flyerproxy::build(figment, config, Arc::new(fetcher)).expect("Failed to create cache directory")
}
