//! Streaming file hasher.
//!
//! # Overview
//!
//! This module provides the [`Hasher`] struct for computing content digests
//! with a fixed-size read buffer, so memory use per file stays constant no
//! matter how large the file is. Two algorithms are offered:
//!
//! - [`HashAlgorithm::Fast`]: MD5, quick but not collision resistant
//! - [`HashAlgorithm::Strong`]: SHA-256, safe under adversarial input
//!
//! The hasher also implements the byte-for-byte comparison used to resolve
//! digest collisions.
//!
//! # Example
//!
//! ```no_run
//! use dupeguard::scanner::{HashAlgorithm, Hasher};
//! use std::path::Path;
//!
//! let hasher = Hasher::new(HashAlgorithm::Strong);
//! let digest = hasher.full_hash(Path::new("file.bin")).unwrap();
//! println!("{}", digest.to_hex());
//! ```

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::Digest as _;

use super::{FileRecord, HashError};

/// Read buffer size used when streaming file content.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Digest algorithm, chosen once at configuration time.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum HashAlgorithm {
    /// MD5: fast, adequate for trusted data.
    #[default]
    #[serde(alias = "md5")]
    #[value(alias = "md5")]
    Fast,
    /// SHA-256: collision resistant.
    #[serde(alias = "sha256")]
    #[value(alias = "sha256")]
    Strong,
}

impl HashAlgorithm {
    /// Conventional name of the underlying digest.
    #[must_use]
    pub fn digest_name(self) -> &'static str {
        match self {
            Self::Fast => "md5",
            Self::Strong => "sha256",
        }
    }

    /// Digest length in bytes.
    #[must_use]
    pub fn digest_len(self) -> usize {
        match self {
            Self::Fast => 16,
            Self::Strong => 32,
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fast => write!(f, "fast"),
            Self::Strong => write!(f, "strong"),
        }
    }
}

/// Digest of a file's full content under a specific algorithm.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest {
    algorithm: HashAlgorithm,
    bytes: Vec<u8>,
}

impl Digest {
    /// Wrap raw digest bytes.
    #[must_use]
    pub fn new(algorithm: HashAlgorithm, bytes: Vec<u8>) -> Self {
        Self { algorithm, bytes }
    }

    /// Algorithm that produced this digest.
    #[must_use]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Raw digest bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Lowercase hexadecimal form.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hash_to_hex(&self.bytes)
    }
}

/// Convert digest bytes to a lowercase hexadecimal string.
#[must_use]
pub fn hash_to_hex(bytes: &[u8]) -> String {
    use fmt::Write;

    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

enum DigestState {
    Md5(md5::Context),
    Sha256(sha2::Sha256),
}

impl DigestState {
    fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Fast => Self::Md5(md5::Context::new()),
            HashAlgorithm::Strong => Self::Sha256(sha2::Sha256::new()),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Md5(ctx) => ctx.consume(data),
            Self::Sha256(ctx) => ctx.update(data),
        }
    }

    fn finish(self) -> Vec<u8> {
        match self {
            Self::Md5(ctx) => ctx.compute().0.to_vec(),
            Self::Sha256(ctx) => ctx.finalize().to_vec(),
        }
    }
}

/// Chunked content hasher.
#[derive(Debug, Clone)]
pub struct Hasher {
    algorithm: HashAlgorithm,
    chunk_size: usize,
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Hasher {
    /// Create a hasher for the given algorithm with the default chunk size.
    #[must_use]
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            algorithm,
            chunk_size: DEFAULT_CHUNK_SIZE,
            shutdown_flag: None,
        }
    }

    /// Override the read buffer size.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Set the shutdown flag, checked between chunks.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Algorithm this hasher computes.
    #[must_use]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Hash the full content of a file.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened or a read fails
    /// part-way; a partial digest is never returned.
    pub fn full_hash(&self, path: &Path) -> Result<Digest, HashError> {
        self.hash_path(path).map(|(digest, _)| digest)
    }

    /// Hash a scanned record, rejecting files whose length changed since
    /// the scan.
    ///
    /// # Errors
    ///
    /// Returns [`HashError::SizeMismatch`] if the byte count read differs
    /// from `record.size`, or any error from [`Hasher::full_hash`].
    pub fn hash_record(&self, record: &FileRecord) -> Result<Digest, HashError> {
        let (digest, read) = self.hash_path(&record.path)?;
        if read != record.size {
            return Err(HashError::SizeMismatch {
                path: record.path.clone(),
                expected: record.size,
                actual: read,
            });
        }
        Ok(digest)
    }

    fn hash_path(&self, path: &Path) -> Result<(Digest, u64), HashError> {
        let file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        self.hash_reader(file).map_err(|e| {
            if e.kind() == io::ErrorKind::Interrupted && self.is_shutdown_requested() {
                HashError::Interrupted(path.to_path_buf())
            } else {
                HashError::from_io(path, e)
            }
        })
    }

    /// Hash everything a reader yields, returning the digest and byte count.
    ///
    /// # Errors
    ///
    /// Propagates read errors. Cancellation surfaces as
    /// [`io::ErrorKind::Interrupted`].
    pub fn hash_reader<R: Read>(&self, mut reader: R) -> io::Result<(Digest, u64)> {
        let mut state = DigestState::new(self.algorithm);
        let mut buffer = vec![0u8; self.chunk_size];
        let mut total = 0u64;

        loop {
            if self.is_shutdown_requested() {
                return Err(io::Error::new(io::ErrorKind::Interrupted, "shutdown"));
            }
            let n = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            state.update(&buffer[..n]);
            total += n as u64;
        }

        Ok((Digest::new(self.algorithm, state.finish()), total))
    }

    /// Compare two files byte for byte.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] for whichever file fails to open or read.
    pub fn files_equal(&self, a: &Path, b: &Path) -> Result<bool, HashError> {
        let mut file_a = File::open(a).map_err(|e| HashError::from_io(a, e))?;
        let mut file_b = File::open(b).map_err(|e| HashError::from_io(b, e))?;
        let mut buf_a = vec![0u8; self.chunk_size];
        let mut buf_b = vec![0u8; self.chunk_size];

        loop {
            if self.is_shutdown_requested() {
                return Err(HashError::Interrupted(a.to_path_buf()));
            }
            let n_a = read_full(&mut file_a, &mut buf_a).map_err(|e| HashError::from_io(a, e))?;
            let n_b = read_full(&mut file_b, &mut buf_b).map_err(|e| HashError::from_io(b, e))?;
            if n_a != n_b || buf_a[..n_a] != buf_b[..n_b] {
                return Ok(false);
            }
            if n_a == 0 {
                return Ok(true);
            }
        }
    }
}

/// Fill `buf` as far as the reader allows; a short count means EOF.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
