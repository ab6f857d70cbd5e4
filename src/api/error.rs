use crate::cache::CacheError;
use crate::images::ImageError;
use crate::origin::OriginError;
use crate::pages::PageError;
use rocket::http::{ContentType, Status};
use serde_json::json;

#[derive(Debug)]
pub enum ApiError {
    ImageError(ImageError),
    PageError(PageError),
    CacheError(CacheError),
    NotFound(String),
    InvalidParameter(String),
}

impl From<ImageError> for ApiError {
    fn from(error: ImageError) -> Self {
        ApiError::ImageError(error)
    }
}

impl From<PageError> for ApiError {
    fn from(error: PageError) -> Self {
        ApiError::PageError(error)
    }
}

impl From<CacheError> for ApiError {
    fn from(error: CacheError) -> Self {
        ApiError::CacheError(error)
    }
}

impl ApiError {
    fn status_and_title(&self) -> (Status, &'static str) {
        match self {
            ApiError::NotFound(_) | ApiError::PageError(PageError::NotFound(_)) => {
                (Status::NotFound, "Not found")
            }
            ApiError::InvalidParameter(_) => (Status::BadRequest, "Invalid parameter"),
            ApiError::ImageError(ImageError::Origin(OriginError::Unavailable(_)))
            | ApiError::PageError(PageError::Origin(OriginError::Unavailable(_))) => {
                (Status::InternalServerError, "Origin unavailable")
            }
            ApiError::ImageError(ImageError::Origin(OriginError::Rejected { .. }))
            | ApiError::PageError(PageError::Origin(OriginError::Rejected { .. })) => {
                (Status::InternalServerError, "Origin rejected request")
            }
            ApiError::ImageError(ImageError::Decode(_)) => {
                (Status::InternalServerError, "Image decode error")
            }
            ApiError::ImageError(ImageError::Encode(_)) => {
                (Status::InternalServerError, "Image processing error")
            }
            ApiError::ImageError(ImageError::Cache(_)) | ApiError::CacheError(_) => {
                (Status::InternalServerError, "Cache error")
            }
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::ImageError(error) => error.to_string(),
            ApiError::PageError(error) => error.to_string(),
            ApiError::CacheError(error) => error.to_string(),
            ApiError::NotFound(message) | ApiError::InvalidParameter(message) => message.clone(),
        }
    }
}

impl<'r> rocket::response::Responder<'r, 'static> for ApiError {
    fn respond_to(self, req: &'r rocket::Request<'_>) -> rocket::response::Result<'static> {
        let (status, title) = self.status_and_title();
        let message = self.message();

        if status == Status::InternalServerError {
            log::error!("{} {} failed: {}", req.method(), req.uri(), message);
        } else {
            log::debug!("{} {} -> {}: {}", req.method(), req.uri(), status, message);
        }

        let body = json!({
            "error": title,
            "message": message
        })
        .to_string();

        rocket::Response::build()
            .status(status)
            .header(ContentType::JSON)
            .sized_body(body.len(), std::io::Cursor::new(body))
            .ok()
    }
}
