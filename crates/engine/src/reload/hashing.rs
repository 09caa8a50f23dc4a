use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentFingerprint {
    pub byte_len: usize,
    pub hash_hex: String,
}

pub fn fingerprint_bytes(bytes: &[u8]) -> ContentFingerprint {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    ContentFingerprint {
        byte_len: bytes.len(),
        hash_hex: to_hex_lower(&hasher.finalize()),
    }
}

fn to_hex_lower(bytes: &[u8]) -> String {
    let mut output = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        use std::fmt::Write as _;
        let _ = write!(&mut output, "{byte:02x}");
    }
    output
}
