//! # Content Hasher
//!
//! Streams a byte source through SHA-256 in fixed-size blocks so that
//! arbitrarily large files are hashed in bounded memory.
//!
//! Hashing has no side effects. A cancellation flag lets a caller abandon a
//! long read mid-stream; since nothing is appended until the digest is
//! complete, an abandoned hash leaves the archive log untouched.

use std::fs::File;
use std::io::{self, ErrorKind, Read};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::digest::ContentDigest;

/// Default read block size (64 KiB).
pub const DEFAULT_BLOCK_SIZE: usize = 64 * 1024;

/// Result of hashing a stream: its digest and how many bytes were consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashedContent {
    /// SHA-256 of the consumed bytes.
    pub digest: ContentDigest,
    /// Number of bytes read from the stream.
    pub size_bytes: u64,
}

/// Incremental SHA-256 hasher for files and readers.
#[derive(Debug, Clone)]
pub struct ContentHasher {
    block_size: usize,
    cancel: Option<Arc<AtomicBool>>,
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentHasher {
    /// A hasher reading [`DEFAULT_BLOCK_SIZE`] blocks.
    pub fn new() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            cancel: None,
        }
    }

    /// Use a different block size. Zero is bumped to one byte.
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size.max(1);
        self
    }

    /// Abandon hashing with [`ErrorKind::Interrupted`] once `flag` is set.
    /// The flag is checked between blocks.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Hash everything `reader` yields.
    pub fn digest<R: Read>(&self, reader: R) -> io::Result<ContentDigest> {
        self.digest_with_len(reader).map(|h| h.digest)
    }

    /// Hash everything `reader` yields, also reporting the byte count.
    pub fn digest_with_len<R: Read>(&self, mut reader: R) -> io::Result<HashedContent> {
        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; self.block_size];
        let mut size_bytes = 0u64;
        loop {
            if self.is_cancelled() {
                return Err(io::Error::new(ErrorKind::Interrupted, "hashing cancelled"));
            }
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                // A signal-interrupted read is retried by the std convention,
                // unlike a caller-initiated cancel above.
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            hasher.update(&buf[..n]);
            size_bytes += n as u64;
        }
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&hasher.finalize());
        Ok(HashedContent {
            digest: ContentDigest::from_bytes(bytes),
            size_bytes,
        })
    }

    /// Open and hash the file at `path`.
    pub fn digest_file(&self, path: &Path) -> io::Result<HashedContent> {
        let file = File::open(path)?;
        self.digest_with_len(file)
    }

    /// Hash an in-memory buffer.
    pub fn digest_bytes(&self, data: &[u8]) -> ContentDigest {
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&Sha256::digest(data));
        ContentDigest::from_bytes(bytes)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}
