pub mod error;
pub mod images;
pub mod pages;
pub mod system;

pub use error::ApiError;

use rocket::serde::json::Json;
use rocket::{Catcher, Request, Route};
use serde_json::{json, Value};

pub fn routes() -> Vec<Route> {
    routes![
        system::index,
        system::health,
        system::sitemap,
        system::cache_list,
        system::preflight,
        images::proxy_image,
        pages::serve_page,
    ]
}

#[catch(404)]
fn not_found(req: &Request) -> Json<Value> {
    Json(json!({
        "error": "Not found",
        "message": format!("No route for {}", req.uri())
    }))
}

#[catch(500)]
fn internal_error() -> Json<Value> {
    Json(json!({
        "error": "Internal server error",
        "message": "The request could not be processed"
    }))
}

pub fn catchers() -> Vec<Catcher> {
    catchers![not_found, internal_error]
}
