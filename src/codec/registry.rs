//! Case-insensitive lookup from encoding token to codec.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::codec::deflate::DeflateCodec;
use crate::codec::gzip::GzipCodec;
use crate::codec::lz4::Lz4Codec;
use crate::codec::Codec;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Codec already registered for encoding '{0}'")]
    Duplicate(String),

    #[error("No built-in codec for encoding '{0}'")]
    Unknown(String),
}

/// Encoding tokens with a built-in codec.
pub const BUILTIN_ENCODINGS: [&str; 3] = ["gzip", "deflate", "lz4"];

/// Look up a built-in codec by token.
pub fn builtin(token: &str) -> Option<Arc<dyn Codec>> {
    match token.trim().to_ascii_lowercase().as_str() {
        "gzip" => Some(Arc::new(GzipCodec::new())),
        "deflate" => Some(Arc::new(DeflateCodec::new())),
        "lz4" => Some(Arc::new(Lz4Codec::new())),
        _ => None,
    }
}

/// Registry of codecs keyed by lowercase encoding token.
///
/// Populated once at startup, then shared read-only (`Arc<CodecRegistry>`).
#[derive(Clone, Default)]
pub struct CodecRegistry {
    codecs: HashMap<String, Arc<dyn Codec>>,
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with gzip, deflate and lz4.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for token in BUILTIN_ENCODINGS {
            if let Some(codec) = builtin(token) {
                // Built-in tokens are distinct.
                let _ = registry.register(codec);
            }
        }
        registry
    }

    /// Registry holding the built-in codecs named by `tokens`.
    pub fn from_tokens<S: AsRef<str>>(tokens: &[S]) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for token in tokens {
            let token = token.as_ref();
            let codec = builtin(token).ok_or_else(|| RegistryError::Unknown(token.to_string()))?;
            registry.register(codec)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, codec: Arc<dyn Codec>) -> Result<(), RegistryError> {
        let key = codec.encoding().to_ascii_lowercase();
        if self.codecs.contains_key(&key) {
            return Err(RegistryError::Duplicate(key));
        }
        self.codecs.insert(key, codec);
        Ok(())
    }

    pub fn find(&self, token: &str) -> Option<Arc<dyn Codec>> {
        self.codecs.get(&token.trim().to_ascii_lowercase()).cloned()
    }

    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }

    pub fn encodings(&self) -> impl Iterator<Item = &str> {
        self.codecs.keys().map(String::as_str)
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tokens: Vec<_> = self.encodings().collect();
        tokens.sort_unstable();
        f.debug_struct("CodecRegistry").field("codecs", &tokens).finish()
    }
}
