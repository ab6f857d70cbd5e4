#[macro_use]
extern crate rocket;

pub mod api;
pub mod cache;
pub mod config;
pub mod cors;
pub mod images;
pub mod origin;
pub mod pages;

use std::io;
use std::sync::Arc;

use log::info;
use rocket::figment::Provider;
use rocket::{Build, Rocket};

use cache::DiskCache;
use config::AppConfig;
use cors::CORS;
use images::ImageTransformCache;
use origin::OriginFetch;
use pages::PageProxy;

/// Assembles the server. Fails if the cache directory cannot be created.
pub fn build<T: Provider>(
    provider: T,
    config: AppConfig,
    fetcher: Arc<dyn OriginFetch>,
) -> io::Result<Rocket<Build>> {
    let disk_cache = DiskCache::open(&config.cache_dir)?;
    info!("Image cache directory ready at {}", disk_cache.root().display());

    let image_cache = ImageTransformCache::new(fetcher.clone(), disk_cache, config.clone());
    let page_proxy = PageProxy::new(fetcher, config);

    Ok(rocket::custom(provider)
        .attach(CORS)
        .manage(image_cache)
        .manage(page_proxy)
        .mount("/", api::routes())
        .register("/", api::catchers()))
}
