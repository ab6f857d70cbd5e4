use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::Deserialize;

// Everything that would end or restructure a single path segment
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'`')
    .add(b'{')
    .add(b'}');

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub address: String,
    /// Per-request origin timeout, in seconds.
    pub timeout: u64,
    pub user_agent: String,
    pub cache_dir: String,
    /// Root URL holding the HTML documents, addressed as `{root}/{user_id}/{file_id}`.
    pub html_origin_root: String,
    /// Root URL holding the source images, addressed as `{root}/{image_name}`.
    pub image_origin_root: String,
    pub sitemap_url: String,
    /// Externally visible host used in rewritten image URLs.
    pub public_host: String,
}

impl AppConfig {
    /// `file_id` may span several segments; each one is encoded on its own.
    pub fn html_url(&self, user_id: &str, file_id: &str) -> String {
        let file_path = file_id
            .split('/')
            .map(encode_segment)
            .collect::<Vec<_>>()
            .join("/");
        format!(
            "{}/{}/{}",
            self.html_origin_root.trim_end_matches('/'),
            encode_segment(user_id),
            file_path
        )
    }

    pub fn image_url(&self, image_name: &str) -> String {
        format!(
            "{}/{}",
            self.image_origin_root.trim_end_matches('/'),
            encode_segment(image_name)
        )
    }
}

fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}

/// A segment that names an object rather than walking the path.
pub fn is_object_segment(segment: &str) -> bool {
    !segment.is_empty() && segment != "." && segment != ".." && !segment.contains(&['/', '\\'][..])
}
