//! Time-based one-time passcodes.
//!
//! The engine is a set of pure functions over a [`Secret`], a Unix time in
//! seconds and an explicit [`TotpConfig`]. Nothing reads the clock unless you
//! ask it to through [`Totp`].
//!
//! ```
//! use totp_engine::{decode_secret, generate, verify, TotpConfig};
//!
//! let config = TotpConfig::default();
//! let secret = decode_secret("GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ", &config).unwrap();
//! let code = generate(&secret, 1_700_000_000, &config).unwrap();
//! assert!(verify(&secret, &code.to_string(), 1_700_000_000, &config).unwrap());
//! ```

mod config;
mod hotp;
mod secret;
mod totp;
mod uri;

pub use config::{Algorithm, TotpConfig};
pub use hotp::{derive_code, Code, Counter, Hotp};
pub use secret::{decode_secret, encode_base32, normalize_secret_text, Secret};
pub use totp::{
    counter_at, generate, remaining_at, remaining_seconds, unix_now, verify, Time, Totp,
};
pub use uri::OtpAuthUri;

use hmac::digest::InvalidLength;

/// Errors produced by the engine.
///
/// A code that does not verify is not an error: [`verify`] returns
/// `Ok(false)` for it.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum OtpError {
    #[error("secret is not valid base32")]
    InvalidEncoding,
    #[error("secret is too short ({len} bytes, need at least {min})")]
    SecretTooShort { len: usize, min: usize },
    #[error("secret is too long ({len} bytes, at most {max} allowed)")]
    SecretTooLong { len: usize, max: usize },
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),
    #[error("invalid otpauth uri: {0}")]
    InvalidUri(String),
    #[error("error when computing HMAC")]
    HmacError(#[from] InvalidLength),
}

impl OtpError {
    /// Whether the caller can fix this by supplying a different secret.
    pub fn is_secret_error(&self) -> bool {
        matches!(
            self,
            OtpError::InvalidEncoding
                | OtpError::SecretTooShort { .. }
                | OtpError::SecretTooLong { .. }
        )
    }
}

pub type OtpResult<T> = std::result::Result<T, OtpError>;

/// Supplies the moving factor (the counter) fed to the HMAC.
pub trait MovingFactor {
    fn counter(&mut self) -> OtpResult<u64>;
}

/// A one-time passcode generator.
///
/// Generic over the source of the moving factor; see [`Hotp`] and [`Totp`].
pub struct Otp<G> {
    secret: Secret,
    generator: G,
    digits: u32,
    algorithm: Algorithm,
}

impl<G: MovingFactor> Otp<G> {
    /// Get the passcode for the generator's current moving factor.
    pub fn get(&mut self) -> OtpResult<Code> {
        let counter = self.generator.counter()?;
        derive_code(self.secret.as_bytes(), counter, self.digits, self.algorithm)
    }
}

impl<G> Otp<G> {
    pub fn digits(&self) -> u32 {
        self.digits
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }
}

#[cfg(test)]
mod test {
    use crate::OtpError;

    #[test]
    fn it_classifies_secret_errors() {
        assert!(OtpError::InvalidEncoding.is_secret_error());
        assert!(OtpError::SecretTooShort { len: 5, min: 10 }.is_secret_error());
        assert!(OtpError::SecretTooLong { len: 80, max: 64 }.is_secret_error());
        assert!(!OtpError::InvalidParameters("digits".into()).is_secret_error());
        assert!(!OtpError::InvalidUri("scheme".into()).is_secret_error());
    }
}
