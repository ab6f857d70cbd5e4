mod disk;
mod key;

pub use disk::{CacheError, DiskCache};
pub use key::CacheKey;
