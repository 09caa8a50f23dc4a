mod atomic_io;
mod hashing;
mod types;
mod watch;

pub use atomic_io::{write_text_atomic, write_text_if_missing};
pub use hashing::{fingerprint_bytes, ContentFingerprint};
pub use types::ReloadError;
pub use watch::{FileWatch, WatchEvent};
