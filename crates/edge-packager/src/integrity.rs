//! Content integrity for pinned downloads and produced artifacts.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha384, Sha512};

/// Supported hash algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// SHA-256 (recommended).
    #[default]
    Sha256,
    /// SHA-384.
    Sha384,
    /// SHA-512, what npm registries publish.
    Sha512,
}

impl HashAlgorithm {
    /// Expected digest length in hex characters.
    pub fn hex_length(&self) -> usize {
        match self {
            Self::Sha256 => 64,
            Self::Sha384 => 96,
            Self::Sha512 => 128,
        }
    }

    /// Parse from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sha256" | "sha-256" => Some(Self::Sha256),
            "sha384" | "sha-384" => Some(Self::Sha384),
            "sha512" | "sha-512" => Some(Self::Sha512),
            _ => None,
        }
    }

    /// Hex digest of `data`.
    pub fn digest_hex(&self, data: &[u8]) -> String {
        match self {
            Self::Sha256 => format!("{:x}", Sha256::digest(data)),
            Self::Sha384 => format!("{:x}", Sha384::digest(data)),
            Self::Sha512 => format!("{:x}", Sha512::digest(data)),
        }
    }
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sha256 => write!(f, "sha256"),
            Self::Sha384 => write!(f, "sha384"),
            Self::Sha512 => write!(f, "sha512"),
        }
    }
}

/// A content hash with its algorithm. The digest is stored as lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentHash {
    pub algorithm: HashAlgorithm,
    pub hash: String,
}

impl ContentHash {
    /// Create a new content hash from a hex digest.
    pub fn new(algorithm: HashAlgorithm, hash: impl Into<String>) -> Self {
        Self {
            algorithm,
            hash: hash.into().to_lowercase(),
        }
    }

    /// Hash `data` with `algorithm`.
    pub fn compute(algorithm: HashAlgorithm, data: &[u8]) -> Self {
        Self::new(algorithm, algorithm.digest_hex(data))
    }

    /// Parse from SRI (Subresource Integrity) format.
    ///
    /// Accepts both the standard base64 digest (`sha512-z4PhNX7v...`) and a
    /// hex digest (`sha256-ab12...`).
    pub fn from_sri(sri: &str) -> Result<Self, IntegrityError> {
        let (algo_str, digest) = sri
            .trim()
            .split_once('-')
            .ok_or_else(|| IntegrityError::InvalidFormat("missing algorithm prefix".into()))?;

        let algorithm = HashAlgorithm::parse(algo_str)
            .ok_or_else(|| IntegrityError::UnsupportedAlgorithm(algo_str.into()))?;

        let hash = if digest.len() == algorithm.hex_length()
            && digest.chars().all(|c| c.is_ascii_hexdigit())
        {
            digest.to_lowercase()
        } else {
            let bytes = STANDARD
                .decode(digest)
                .map_err(|e| IntegrityError::InvalidHashFormat(e.to_string()))?;
            bytes.iter().map(|b| format!("{:02x}", b)).collect()
        };

        let parsed = Self { algorithm, hash };
        parsed.validate()?;
        Ok(parsed)
    }

    /// Convert to SRI format (hex digest).
    pub fn to_sri(&self) -> String {
        format!("{}-{}", self.algorithm, self.hash)
    }

    /// Validate the digest length for the algorithm.
    pub fn validate(&self) -> Result<(), IntegrityError> {
        let expected = self.algorithm.hex_length();
        if self.hash.len() != expected {
            return Err(IntegrityError::InvalidHashLength {
                expected,
                actual: self.hash.len(),
            });
        }
        if !self.hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(IntegrityError::InvalidHashFormat(
                "hash contains non-hexadecimal characters".into(),
            ));
        }
        Ok(())
    }

    /// Check that `data` hashes to this digest.
    pub fn verify(&self, subject: &str, data: &[u8]) -> Result<(), IntegrityError> {
        let actual = self.algorithm.digest_hex(data);
        if actual != self.hash {
            return Err(IntegrityError::VerificationFailed {
                path: subject.to_string(),
                expected: self.hash.clone(),
                actual,
            });
        }
        Ok(())
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_sri())
    }
}

/// Integrity verification errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum IntegrityError {
    #[error("invalid integrity format: {0}")]
    InvalidFormat(String),

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("invalid hash length: expected {expected}, got {actual}")]
    InvalidHashLength { expected: usize, actual: usize },

    #[error("invalid hash format: {0}")]
    InvalidHashFormat(String),

    #[error("integrity check failed for '{path}': expected {expected}, got {actual}")]
    VerificationFailed {
        path: String,
        expected: String,
        actual: String,
    },
}
