use std::fmt;

use base32::Alphabet;

use crate::{OtpError, OtpResult, TotpConfig};

const ALPHABET: Alphabet = Alphabet::Rfc4648 { padding: false };

/// Shared secret key bytes.
///
/// `Debug` output never includes the key.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(Vec<u8>);

impl Secret {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Secret(bytes)
    }

    /// Use the UTF-8 bytes of `text` as the key, without any decoding.
    ///
    /// Only for callers that explicitly asked for a raw secret; Base32 text
    /// passed here is not decoded.
    pub fn from_raw_text(text: &str, config: &TotpConfig) -> OtpResult<Self> {
        check_length(text.len(), config)?;
        Ok(Secret(text.as_bytes().to_vec()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_base32(&self) -> String {
        encode_base32(&self.0)
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret({} bytes)", self.0.len())
    }
}

/// Encode bytes as unpadded RFC 4648 Base32.
pub fn encode_base32(bytes: &[u8]) -> String {
    base32::encode(ALPHABET, bytes)
}

/// Decode Base32 `text` into a [`Secret`], enforcing the configured length
/// guardrails.
///
/// Case-insensitive. Whitespace and trailing `=` padding are ignored; any
/// other character outside `A-Z2-7` is rejected, as are lengths no encoder
/// produces and trailing characters carrying non-zero leftover bits.
pub fn decode_secret(text: &str, config: &TotpConfig) -> OtpResult<Secret> {
    let text = if config.normalize_charset {
        normalize_secret_text(text)
    } else {
        text.chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_uppercase()
    };
    let text = text.trim_end_matches('=');

    if !text.bytes().all(|b| matches!(b, b'A'..=b'Z' | b'2'..=b'7')) {
        return Err(OtpError::InvalidEncoding);
    }
    if !is_canonical(text) {
        return Err(OtpError::InvalidEncoding);
    }
    let bytes = base32::decode(ALPHABET, text).ok_or(OtpError::InvalidEncoding)?;
    check_length(bytes.len(), config)?;
    log::trace!("decoded {} byte secret", bytes.len());
    Ok(Secret(bytes))
}

// Unpadded lengths of 1, 3 or 6 mod 8 never come out of an encoder, and the
// bits of the last character past the final whole byte must be zero.
fn is_canonical(text: &str) -> bool {
    if matches!(text.len() % 8, 1 | 3 | 6) {
        return false;
    }
    let leftover = (text.len() * 5) % 8;
    match text.bytes().last() {
        Some(last) if leftover > 0 => symbol_value(last) & ((1 << leftover) - 1) == 0,
        _ => true,
    }
}

fn symbol_value(b: u8) -> u8 {
    match b {
        b'A'..=b'Z' => b - b'A',
        _ => b - b'2' + 26,
    }
}

/// Correct common transcription mistakes in Base32 text.
///
/// Uppercases, drops whitespace and maps `1` to `I` and `0` to `O`. Lossy: a
/// string that really meant those digits decodes to a different secret.
pub fn normalize_secret_text(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c.to_ascii_uppercase() {
            '1' => 'I',
            '0' => 'O',
            c => c,
        })
        .collect()
}

pub(crate) fn check_length(len: usize, config: &TotpConfig) -> OtpResult<()> {
    if len < config.min_secret_bytes {
        return Err(OtpError::SecretTooShort {
            len,
            min: config.min_secret_bytes,
        });
    }
    if len > config.max_secret_bytes {
        return Err(OtpError::SecretTooLong {
            len,
            max: config.max_secret_bytes,
        });
    }
    Ok(())
}
