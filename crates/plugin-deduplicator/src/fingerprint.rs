//! Content fingerprints: lowercase hex SHA-256.

use std::path::Path;

use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;

use rpipe_core::error::AppError;
use rpipe_core::result::AppResult;

const CHUNK_SIZE: usize = 64 * 1024;

/// Fingerprints an in-memory buffer.
pub fn sha256_bytes(bytes: &[u8]) -> String {
    hex_encode(&Sha256::digest(bytes))
}

/// Streams a file through SHA-256.
pub async fn sha256_file(path: &Path) -> AppResult<String> {
    let mut file = tokio::fs::File::open(path).await.map_err(|e| {
        AppError::with_source(
            rpipe_core::error::ErrorKind::NotFound,
            format!("Cannot open '{}' for fingerprinting", path.display()),
            e,
        )
    })?;

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        let read = file.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex_encode(&hasher.finalize()))
}

fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}
