//! Body codecs applied at the transport boundary.
//!
//! A [`Codec`] transforms serialized request bodies on their way out and raw
//! response bodies on their way in. Cache keys are derived before encoding and
//! cached values are stored after decoding, so the cache only ever holds
//! logical values, never ciphertext.
//!
//! - [`PlainCodec`]: identity; the default.
//! - [`AesGcmCodec`]: AES-256-GCM with a fresh random nonce per message.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use thiserror::Error;

/// Length of the AES-GCM nonce prefixed to every ciphertext.
const NONCE_LEN: usize = 12;

/// Length of an AES-256 key in bytes.
pub const KEY_LEN: usize = 32;

/// Errors raised while encoding or decoding a body.
#[derive(Debug, Clone, Error)]
pub enum CodecError {
    #[error("invalid key: expected 32 bytes, got {0}")]
    KeyLength(usize),

    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("payload of {0} bytes is too short to hold a nonce")]
    Truncated(usize),

    #[error("encryption failed")]
    Encrypt,

    #[error("decryption failed: wrong key or tampered payload")]
    Decrypt,
}

/// A reversible transform of body bytes.
///
/// Implementations must satisfy `decode(encode(b)) == b` for every `b`.
pub trait Codec: Send + Sync {
    /// Transform an outgoing body.
    fn encode(&self, body: Bytes) -> Result<Bytes, CodecError>;

    /// Reverse the transform on an incoming body.
    fn decode(&self, wire: Bytes) -> Result<Bytes, CodecError>;
}

/// The identity codec, used when encryption is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainCodec;

impl Codec for PlainCodec {
    fn encode(&self, body: Bytes) -> Result<Bytes, CodecError> {
        Ok(body)
    }

    fn decode(&self, wire: Bytes) -> Result<Bytes, CodecError> {
        Ok(wire)
    }
}

/// AES-256-GCM body encryption.
///
/// Wire format: `base64(nonce || ciphertext)`, with a random 96-bit nonce per
/// message. Encoding the same body twice yields different bytes.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use reqcache::codec::{AesGcmCodec, Codec};
///
/// let codec = AesGcmCodec::from_base64(&AesGcmCodec::generate_key()).unwrap();
/// let body = Bytes::from_static(br#"{"card":"4242"}"#);
///
/// let wire = codec.encode(body.clone()).unwrap();
/// assert_ne!(wire, body);
/// assert_eq!(codec.decode(wire).unwrap(), body);
/// ```
#[derive(Clone)]
pub struct AesGcmCodec {
    cipher: Aes256Gcm,
}

impl AesGcmCodec {
    /// Creates a codec from a raw 32-byte key.
    pub fn new(key: &[u8]) -> Result<Self, CodecError> {
        let cipher =
            Aes256Gcm::new_from_slice(key).map_err(|_| CodecError::KeyLength(key.len()))?;
        Ok(Self { cipher })
    }

    /// Creates a codec from a base64-encoded 32-byte key.
    pub fn from_base64(key: &str) -> Result<Self, CodecError> {
        let raw = STANDARD.decode(key.trim())?;
        Self::new(&raw)
    }

    /// Generates a random key, base64-encoded.
    pub fn generate_key() -> String {
        STANDARD.encode(Aes256Gcm::generate_key(OsRng))
    }
}

impl std::fmt::Debug for AesGcmCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesGcmCodec").finish_non_exhaustive()
    }
}

impl Codec for AesGcmCodec {
    fn encode(&self, body: Bytes) -> Result<Bytes, CodecError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, body.as_ref())
            .map_err(|_| CodecError::Encrypt)?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(Bytes::from(STANDARD.encode(sealed)))
    }

    fn decode(&self, wire: Bytes) -> Result<Bytes, CodecError> {
        let sealed = STANDARD.decode(wire.trim_ascii())?;
        if sealed.len() < NONCE_LEN {
            return Err(CodecError::Truncated(sealed.len()));
        }

        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CodecError::Decrypt)?;
        Ok(Bytes::from(plaintext))
    }
}
