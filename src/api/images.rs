use rocket::http::{ContentType, Header, Status};
use rocket::{request::Request, response::{self, Responder, Response}, State};
use std::io::Cursor;

use crate::api::ApiError;
use crate::config::is_object_segment;
use crate::images::{ImageTransformCache, TransformParams, TransformedImage};

const IMMUTABLE_CACHE_CONTROL: &str = "public, max-age=31536000";

pub struct ImageResponse {
    pub data: Vec<u8>,
    pub from_cache: bool,
}

impl From<TransformedImage> for ImageResponse {
    fn from(image: TransformedImage) -> Self {
        Self {
            data: image.data,
            from_cache: image.from_cache,
        }
    }
}

impl<'r> Responder<'r, 'static> for ImageResponse {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let etag = format!("\"{:x}\"", md5::compute(&self.data));
        let x_cache = if self.from_cache { "HIT" } else { "MISS" };

        // Check If-None-Match header
        if let Some(if_none_match) = req.headers().get_one("If-None-Match") {
            if if_none_match == etag {
                return Response::build()
                    .status(Status::NotModified)
                    .header(Header::new("ETag", etag))
                    .header(Header::new("Cache-Control", IMMUTABLE_CACHE_CONTROL))
                    .ok();
            }
        }

        Response::build()
            .header(ContentType::JPEG)
            .header(Header::new("Cache-Control", IMMUTABLE_CACHE_CONTROL))
            .header(Header::new("ETag", etag))
            .header(Header::new("X-Cache", x_cache))
            .sized_body(self.data.len(), Cursor::new(self.data))
            .ok()
    }
}

fn validate_image_name(image_name: &str) -> Result<(), ApiError> {
    if !is_object_segment(image_name) {
        return Err(ApiError::NotFound(format!("Image '{}' not found", image_name)));
    }
    Ok(())
}

#[get("/image-proxy/<image_name>?<width>&<height>&<quality>")]
pub async fn proxy_image(
    image_name: &str,
    width: Option<u32>,
    height: Option<u32>,
    quality: Option<u8>,
    images: &State<ImageTransformCache>,
) -> Result<ImageResponse, ApiError> {
    validate_image_name(image_name)?;

    if width == Some(0) || height == Some(0) {
        return Err(ApiError::InvalidParameter(
            "width and height must be greater than zero".to_string(),
        ));
    }

    let params = TransformParams::new(width, height, quality);
    log::debug!("Proxying image '{}' with {:?}", image_name, params);

    let image = images.get_transformed_image(image_name, &params).await?;
    Ok(image.into())
}
