// Token obfuscation
//
// The device buffer is prefixed with a version byte and a one-byte seed,
// then every byte is XORed with the low byte of a key that evolves as
// `key = !(key * 131)` in 32-bit wrapping arithmetic. The exact schedule is
// what the service expects; it must not be simplified.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;

use crate::error::Error;

/// Leading byte of every token envelope.
pub const ENVELOPE_VERSION: u8 = 3;

/// Encoder/decoder for the `hexin-v` token format.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenCodec;

impl TokenCodec {
    /// Fold `e = (e << 5) - e + byte` over the data and keep the low byte.
    pub fn simple_hash(data: &[u8]) -> u8 {
        let folded = data.iter().fold(0u32, |e, &b| {
            e.wrapping_shl(5).wrapping_sub(e).wrapping_add(u32::from(b))
        });
        folded.to_le_bytes()[0]
    }

    /// 32-bit string hash over the Unicode scalar values of `s`.
    pub fn str_hash(s: &str) -> u32 {
        s.chars().fold(0u32, |c, ch| {
            c.wrapping_shl(5).wrapping_sub(c).wrapping_add(u32::from(ch))
        })
    }

    /// Advance the obfuscation key by one byte position.
    pub fn next_key(key: u32) -> u32 {
        !key.wrapping_mul(131)
    }

    /// Build the raw envelope: `[3, seed] ++ obfuscated(buffer)`.
    pub fn seal(buffer: &[u8]) -> Vec<u8> {
        let seed = Self::simple_hash(buffer);
        let mut out = Vec::with_capacity(buffer.len() + 2);
        out.push(ENVELOPE_VERSION);
        out.push(seed);

        let mut key = u32::from(seed);
        for &byte in buffer {
            out.push(byte ^ key.to_le_bytes()[0]);
            key = Self::next_key(key);
        }
        out
    }

    /// Seal the buffer and encode it as padded URL-safe base64.
    pub fn encode(buffer: &[u8]) -> String {
        URL_SAFE.encode(Self::seal(buffer))
    }

    /// Invert [`encode`](Self::encode), recovering the device buffer.
    ///
    /// Fails if the token is not valid base64, carries an unknown version
    /// byte, or if the recovered buffer does not hash back to the seed.
    pub fn decode(token: &str) -> Result<Vec<u8>, Error> {
        let envelope = URL_SAFE
            .decode(token.trim())
            .map_err(|e| Error::InvalidToken(format!("not URL-safe base64: {e}")))?;

        let [version, seed, body @ ..] = envelope.as_slice() else {
            return Err(Error::InvalidToken("envelope shorter than 2 bytes".into()));
        };
        if *version != ENVELOPE_VERSION {
            return Err(Error::InvalidToken(format!(
                "unknown envelope version {version}"
            )));
        }

        let mut key = u32::from(*seed);
        let buffer: Vec<u8> = body
            .iter()
            .map(|&byte| {
                let raw = byte ^ key.to_le_bytes()[0];
                key = Self::next_key(key);
                raw
            })
            .collect();

        let expected = Self::simple_hash(&buffer);
        if expected != *seed {
            return Err(Error::InvalidToken(format!(
                "seed mismatch: envelope says {seed}, buffer hashes to {expected}"
            )));
        }
        Ok(buffer)
    }
}
