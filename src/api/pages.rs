use std::path::PathBuf;

use rocket::http::Header;
use rocket::State;

use crate::api::ApiError;
use crate::pages::PageProxy;

#[derive(Responder)]
#[response(content_type = "html")]
pub struct HtmlPage {
    body: Vec<u8>,
    cache_control: Header<'static>,
    content_type_options: Header<'static>,
    content_disposition: Header<'static>,
}

impl HtmlPage {
    fn new(body: Vec<u8>) -> Self {
        Self {
            body,
            cache_control: Header::new("Cache-Control", "no-transform"),
            content_type_options: Header::new("X-Content-Type-Options", "nosniff"),
            content_disposition: Header::new("Content-Disposition", "inline"),
        }
    }
}

// Catch-all: ranked after every fixed route
#[get("/<user_id>/<file_id..>", rank = 20)]
pub async fn serve_page(
    user_id: &str,
    file_id: PathBuf,
    pages: &State<PageProxy>,
) -> Result<HtmlPage, ApiError> {
    let file_id = file_id
        .iter()
        .map(|segment| segment.to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");

    let body = pages.get_rewritten_document(user_id, &file_id).await?;
    Ok(HtmlPage::new(body))
}
