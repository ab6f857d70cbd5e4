use rocket::http::{Header, Status};
use rocket::serde::json::Json;
use rocket::State;
use serde_json::{json, Value};

use crate::api::ApiError;
use crate::images::ImageTransformCache;
use crate::pages::PageProxy;

#[derive(Responder)]
#[response(content_type = "application/xml")]
pub struct Sitemap {
    body: Vec<u8>,
    cache_control: Header<'static>,
}

#[get("/")]
pub fn index() -> Json<Value> {
    Json(json!({ "message": "flyerproxy" }))
}

#[get("/health")]
pub fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

#[get("/sitemap.xml")]
pub async fn sitemap(pages: &State<PageProxy>) -> Result<Sitemap, ApiError> {
    let body = pages.get_sitemap().await?;
    Ok(Sitemap {
        body,
        cache_control: Header::new("Cache-Control", "public, max-age=3600"),
    })
}

#[get("/cache-list")]
pub async fn cache_list(images: &State<ImageTransformCache>) -> Result<Json<Value>, ApiError> {
    let files = images.cache().list().await?;
    Ok(Json(json!({ "cached_files": files })))
}

// Answers CORS preflight requests; the headers come from the CORS fairing
#[options("/<_..>")]
pub fn preflight() -> Status {
    Status::NoContent
}
