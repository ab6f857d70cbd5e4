use std::fmt;

/// Identifies one transformed image artifact. Its string form is also the
/// file name under the cache root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    base_name: String,
    width: u32,
    height: u32,
    quality: u8,
}

impl CacheKey {
    pub const EXTENSION: &'static str = "jpg";

    pub fn new(image_name: &str, width: u32, height: u32, quality: u8) -> Self {
        Self {
            base_name: base_name(image_name).to_string(),
            width,
            height,
            quality,
        }
    }

    pub fn file_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_w{}_h{}_q{}_cached.{}",
            self.base_name,
            self.width,
            self.height,
            self.quality,
            Self::EXTENSION
        )
    }
}

// Strips the final extension; dotfiles keep their name
fn base_name(image_name: &str) -> &str {
    match image_name.rfind('.') {
        Some(0) | None => image_name,
        Some(idx) => &image_name[..idx],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_matches_documented_layout() {
        let key = CacheKey::new("house.png", 300, 200, 70);
        assert_eq!(key.file_name(), "house_w300_h200_q70_cached.jpg");
    }

    #[test]
    fn key_is_deterministic() {
        let a = CacheKey::new("a.jpg", 100, 100, 80);
        let b = CacheKey::new("a.jpg", 100, 100, 80);
        assert_eq!(a, b);
        assert_eq!(a.file_name(), b.file_name());
    }

    #[test]
    fn any_parameter_change_changes_the_key() {
        let base = CacheKey::new("a.jpg", 100, 100, 80).file_name();
        assert_ne!(base, CacheKey::new("a.jpg", 100, 100, 81).file_name());
        assert_ne!(base, CacheKey::new("a.jpg", 101, 100, 80).file_name());
        assert_ne!(base, CacheKey::new("a.jpg", 100, 101, 80).file_name());
        assert_ne!(base, CacheKey::new("b.jpg", 100, 100, 80).file_name());
    }

    #[test]
    fn only_the_last_extension_is_stripped() {
        assert_eq!(
            CacheKey::new("front.door.webp", 10, 20, 30).file_name(),
            "front.door_w10_h20_q30_cached.jpg"
        );
        assert_eq!(
            CacheKey::new("noext", 10, 20, 30).file_name(),
            "noext_w10_h20_q30_cached.jpg"
        );
    }
}
