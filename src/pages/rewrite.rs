use lazy_static::lazy_static;
use regex::bytes::{Captures, Regex};

lazy_static! {
    // <meta property="og:image" content="...">, attribute values in either quote style.
    // Attribute names must follow whitespace so `data-content` is not mistaken for `content`.
    static ref PROPERTY_FIRST: Regex = Regex::new(
        r#"(?i-u)(?P<pre><meta\s(?:[^>]*?\s)?(?:property|name)\s*=\s*["'](?:og|twitter):image["'][^>]*?\scontent\s*=\s*)(?:"(?P<dq>[^"]*)"|'(?P<sq>[^']*)')"#
    ).unwrap();

    // <meta content="..." property="og:image">
    static ref CONTENT_FIRST: Regex = Regex::new(
        r#"(?i-u)(?P<pre><meta\s(?:[^>]*?\s)?content\s*=\s*)(?:"(?P<dq>[^"]*)"|'(?P<sq>[^']*)')(?P<post>[^>]*?\s(?:property|name)\s*=\s*["'](?:og|twitter):image["'])"#
    ).unwrap();
}

/// Points social preview image tags at our own `/image-proxy` endpoint.
///
/// Only URLs under the image origin root are touched, so running the rewrite
/// on its own output changes nothing.
#[derive(Debug, Clone)]
pub struct ImageTagRewriter {
    origin_prefix: String,
    public_host: String,
}

impl ImageTagRewriter {
    pub fn new(image_origin_root: &str, public_host: &str) -> Self {
        Self {
            origin_prefix: format!("{}/", image_origin_root.trim_end_matches('/').to_ascii_lowercase()),
            public_host: public_host.trim_end_matches('/').to_string(),
        }
    }

    pub fn proxied_url(&self, base_name: &str) -> String {
        format!("https://{}/image-proxy/{}", self.public_host, base_name)
    }

    /// Returns the rewritten document and the number of tags retargeted.
    pub fn rewrite(&self, document: &[u8]) -> (Vec<u8>, usize) {
        let mut replaced = 0;

        let pass = PROPERTY_FIRST.replace_all(document, |caps: &Captures| self.retarget(caps, &mut replaced));
        let output = CONTENT_FIRST
            .replace_all(&pass, |caps: &Captures| self.retarget(caps, &mut replaced))
            .into_owned();

        (output, replaced)
    }

    fn retarget(&self, caps: &Captures, replaced: &mut usize) -> Vec<u8> {
        let (url, quote) = match (caps.name("dq"), caps.name("sq")) {
            (Some(url), _) => (url.as_bytes(), b'"'),
            (None, Some(url)) => (url.as_bytes(), b'\''),
            (None, None) => return caps[0].to_vec(),
        };

        let base_name = match self.base_name(url) {
            Some(name) => name,
            None => return caps[0].to_vec(),
        };

        let mut out = caps["pre"].to_vec();
        out.push(quote);
        out.extend_from_slice(self.proxied_url(base_name).as_bytes());
        out.push(quote);
        if let Some(post) = caps.name("post") {
            out.extend_from_slice(post.as_bytes());
        }

        *replaced += 1;
        out
    }

    // Trailing path segment of an origin image URL, without query or fragment
    fn base_name<'a>(&self, url: &'a [u8]) -> Option<&'a str> {
        let url = std::str::from_utf8(url).ok()?;
        if !url.to_ascii_lowercase().starts_with(&self.origin_prefix) {
            return None;
        }

        let path = url.split(&['?', '#'][..]).next().unwrap_or(url);
        match path.rsplit('/').next() {
            Some(name) if !name.is_empty() => Some(name),
            _ => None,
        }
    }
}
