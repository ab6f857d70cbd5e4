pub mod tools;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use log::{info, warn};
use parking_lot::Mutex;

use crate::cache::{CacheKey, DiskCache};
use crate::config::AppConfig;
use crate::origin::OriginFetch;

pub use tools::{ImageError, TransformParams, CONTENT_TYPE};

#[derive(Debug)]
pub struct TransformedImage {
    pub data: Vec<u8>,
    pub content_type: &'static str,
    pub from_cache: bool,
}

impl TransformedImage {
    fn new(data: Vec<u8>, from_cache: bool) -> Self {
        Self {
            data,
            content_type: CONTENT_TYPE,
            from_cache,
        }
    }
}

/// Resized JPEG derivatives of origin images, persisted in a [`DiskCache`].
pub struct ImageTransformCache {
    fetcher: Arc<dyn OriginFetch>,
    cache: DiskCache,
    config: AppConfig,
    // One lock per key being produced, so concurrent misses share the work
    in_flight: InFlightMap,
}

impl ImageTransformCache {
    pub fn new(fetcher: Arc<dyn OriginFetch>, cache: DiskCache, config: AppConfig) -> Self {
        Self {
            fetcher,
            cache,
            config,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn cache(&self) -> &DiskCache {
        &self.cache
    }

    pub async fn get_transformed_image(
        &self,
        image_name: &str,
        params: &TransformParams,
    ) -> Result<TransformedImage, ImageError> {
        let started = Instant::now();
        let key = params.cache_key(image_name);

        if let Some(data) = self.read_cached(&key).await? {
            info!(
                "Cache hit for {} ({} bytes) in {:?}",
                key,
                data.len(),
                started.elapsed()
            );
            return Ok(TransformedImage::new(data, true));
        }

        // Dropping the slot releases it even if this future is cancelled
        let slot = InFlightSlot::claim(&self.in_flight, &key);
        let _guard = slot.lock.lock().await;

        // Another request may have produced it while we waited
        let cached = self.read_cached(&key).await?;
        let image = match cached {
            Some(data) => {
                info!("Cache filled by concurrent request for {}", key);
                TransformedImage::new(data, true)
            }
            None => {
                let data = self.produce(image_name, &key, params, started).await?;
                TransformedImage::new(data, false)
            }
        };

        Ok(image)
    }

    async fn read_cached(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, ImageError> {
        if !self.cache.exists(key).await {
            return Ok(None);
        }
        Ok(Some(self.cache.read(key).await?))
    }

    async fn produce(
        &self,
        image_name: &str,
        key: &CacheKey,
        params: &TransformParams,
        started: Instant,
    ) -> Result<Vec<u8>, ImageError> {
        let url = self.config.image_url(image_name);
        info!("Cache miss for {}, fetching {}", key, url);

        let original = self.fetcher.fetch(&url).await?;
        let original_size = original.len();

        // Decoding and resizing are CPU bound
        let params = *params;
        let encoded = tokio::task::spawn_blocking(move || tools::transform_image(&original, &params))
            .await
            .map_err(|e| ImageError::Encode(format!("Transform task failed: {}", e)))??;

        if let Err(e) = self.cache.write(key, &encoded).await {
            warn!("Failed to store {} in cache: {}", key, e);
        }

        info!(
            "Transformed {} ({} bytes -> {} bytes) in {:?}",
            key,
            original_size,
            encoded.len(),
            started.elapsed()
        );

        Ok(encoded)
    }
}

type InFlightMap = Mutex<HashMap<CacheKey, Arc<tokio::sync::Mutex<()>>>>;

// A claim on the per-key lock; the map entry goes away with its last claim
struct InFlightSlot<'a> {
    map: &'a InFlightMap,
    key: CacheKey,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl<'a> InFlightSlot<'a> {
    fn claim(map: &'a InFlightMap, key: &CacheKey) -> Self {
        let lock = map
            .lock()
            .entry(key.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone();

        Self {
            map,
            key: key.clone(),
            lock,
        }
    }
}

impl Drop for InFlightSlot<'_> {
    fn drop(&mut self) {
        let mut map = self.map.lock();
        // The map holds one reference and this slot holds the other
        if Arc::strong_count(&self.lock) <= 2 {
            map.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::origin::OriginError;
    use async_trait::async_trait;
    use image::GenericImageView;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct CountingOrigin {
        body: Option<Vec<u8>>,
        calls: AtomicUsize,
    }

    impl CountingOrigin {
        fn serving(body: Vec<u8>) -> Arc<Self> {
            Arc::new(Self {
                body: Some(body),
                calls: AtomicUsize::new(0),
            })
        }

        fn rejecting() -> Arc<Self> {
            Arc::new(Self {
                body: None,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl OriginFetch for CountingOrigin {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>, OriginError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            // Give concurrent callers a chance to overlap
            tokio::task::yield_now().await;
            self.body.clone().ok_or_else(|| OriginError::Rejected {
                url: url.to_string(),
                status: 404,
            })
        }
    }

    fn config() -> AppConfig {
        AppConfig {
            port: 8000,
            address: "127.0.0.1".to_string(),
            timeout: 5,
            user_agent: "flyerproxy-test".to_string(),
            cache_dir: "unused".to_string(),
            html_origin_root: "https://store.example/html".to_string(),
            image_origin_root: "https://store.example/images".to_string(),
            sitemap_url: "https://functions.example/sitemap".to_string(),
            public_host: "flyers.example".to_string(),
        }
    }

    fn transform_cache(dir: &TempDir, origin: Arc<CountingOrigin>) -> ImageTransformCache {
        let cache = DiskCache::open(dir.path()).unwrap();
        ImageTransformCache::new(origin, cache, config())
    }

    #[tokio::test]
    async fn second_request_is_served_from_disk() {
        let dir = TempDir::new().unwrap();
        let origin = CountingOrigin::serving(tools::tests::png_bytes(600, 400));
        let images = transform_cache(&dir, origin.clone());
        let params = TransformParams::new(Some(300), Some(200), Some(70));

        let first = images.get_transformed_image("house.png", &params).await.unwrap();
        assert!(!first.from_cache);
        assert_eq!(first.content_type, "image/jpeg");
        assert_eq!(origin.calls(), 1);
        assert!(dir.path().join("house_w300_h200_q70_cached.jpg").is_file());

        let decoded = image::load_from_memory(&first.data).unwrap();
        assert_eq!(decoded.dimensions(), (300, 200));

        let second = images.get_transformed_image("house.png", &params).await.unwrap();
        assert!(second.from_cache);
        assert_eq!(origin.calls(), 1);
        assert_eq!(first.data, second.data);
    }

    #[tokio::test]
    async fn different_parameters_miss_the_cache() {
        let dir = TempDir::new().unwrap();
        let origin = CountingOrigin::serving(tools::tests::png_bytes(100, 100));
        let images = transform_cache(&dir, origin.clone());

        images
            .get_transformed_image("a.png", &TransformParams::new(Some(50), Some(50), Some(80)))
            .await
            .unwrap();
        images
            .get_transformed_image("a.png", &TransformParams::new(Some(50), Some(50), Some(81)))
            .await
            .unwrap();

        assert_eq!(origin.calls(), 2);
        assert_eq!(images.cache().list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn concurrent_misses_fetch_once() {
        let dir = TempDir::new().unwrap();
        let origin = CountingOrigin::serving(tools::tests::png_bytes(200, 100));
        let images = transform_cache(&dir, origin.clone());
        let params = TransformParams::new(Some(100), Some(100), Some(60));

        let (a, b) = tokio::join!(
            images.get_transformed_image("pair.png", &params),
            images.get_transformed_image("pair.png", &params)
        );

        assert_eq!(a.unwrap().data, b.unwrap().data);
        assert_eq!(origin.calls(), 1);
        assert!(images.in_flight.lock().is_empty());
    }

    #[tokio::test]
    async fn origin_rejection_is_surfaced_and_nothing_is_cached() {
        let dir = TempDir::new().unwrap();
        let images = transform_cache(&dir, CountingOrigin::rejecting());

        let err = images
            .get_transformed_image("missing.png", &TransformParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ImageError::Origin(OriginError::Rejected { status: 404, .. })));
        assert!(images.cache().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn undecodable_origin_bytes_fail_without_caching() {
        let dir = TempDir::new().unwrap();
        let origin = CountingOrigin::serving(b"definitely not an image".to_vec());
        let images = transform_cache(&dir, origin);

        let err = images
            .get_transformed_image("broken.png", &TransformParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ImageError::Decode(_)));
        assert!(images.cache().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cache_write_failure_still_returns_the_image() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("cache");
        let origin = CountingOrigin::serving(tools::tests::png_bytes(40, 40));
        let images = ImageTransformCache::new(origin, DiskCache::open(&root).unwrap(), config());
        std::fs::remove_dir_all(&root).unwrap();

        let image = images
            .get_transformed_image("lost.png", &TransformParams::default())
            .await
            .unwrap();
        assert!(!image.from_cache);
        assert!(image.data.starts_with(&[0xFF, 0xD8, 0xFF]));
    }

    struct HangingOrigin;

    #[async_trait]
    impl OriginFetch for HangingOrigin {
        async fn fetch(&self, _url: &str) -> Result<Vec<u8>, OriginError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn cancelled_request_releases_its_key() {
        let dir = TempDir::new().unwrap();
        let images = ImageTransformCache::new(
            Arc::new(HangingOrigin),
            DiskCache::open(dir.path()).unwrap(),
            config(),
        );

        let attempt = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            images.get_transformed_image("stuck.png", &TransformParams::default()),
        )
        .await;

        assert!(attempt.is_err());
        assert!(images.in_flight.lock().is_empty());
        assert!(images.cache().list().await.unwrap().is_empty());
    }
}
