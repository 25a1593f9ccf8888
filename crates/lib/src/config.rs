use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use crate::{OtpError, OtpResult};

const DIGITS: RangeInclusive<u32> = 6..=8;
const STEP: RangeInclusive<u64> = 1..=3600;
const MAX_WINDOW: u64 = 10;

/// HMAC hash function used to derive codes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Algorithm {
    #[default]
    Sha1,
    Sha256,
    Sha512,
}

/// Displayed the way `otpauth` URIs spell it.
impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Algorithm::Sha1 => write!(f, "SHA1"),
            Algorithm::Sha256 => write!(f, "SHA256"),
            Algorithm::Sha512 => write!(f, "SHA512"),
        }
    }
}

impl FromStr for Algorithm {
    type Err = OtpError;

    fn from_str(s: &str) -> OtpResult<Self> {
        match s.to_ascii_uppercase().replace('-', "").as_str() {
            "SHA1" => Ok(Algorithm::Sha1),
            "SHA256" => Ok(Algorithm::Sha256),
            "SHA512" => Ok(Algorithm::Sha512),
            _ => Err(OtpError::InvalidParameters(format!(
                "unsupported algorithm: {s}"
            ))),
        }
    }
}

/// Parameters for generating and verifying codes.
///
/// Passed by reference into every engine call; there is no global default
/// instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TotpConfig {
    pub algorithm: Algorithm,
    /// Number of decimal digits in a code.
    pub digits: u32,
    /// Length of a time step in seconds.
    pub step: u64,
    /// Unix time at which step 0 begins.
    pub t0: u64,
    /// Steps accepted on either side of the current one when verifying.
    pub window: u64,
    pub min_secret_bytes: usize,
    pub max_secret_bytes: usize,
    /// Apply [`normalize_secret_text`](crate::normalize_secret_text) before
    /// decoding. Lossy, so off by default.
    pub normalize_charset: bool,
}

impl Default for TotpConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::Sha1,
            digits: 6,
            step: 30,
            t0: 0,
            window: 1,
            min_secret_bytes: 10,
            max_secret_bytes: 64,
            normalize_charset: false,
        }
    }
}

impl TotpConfig {
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_digits(mut self, digits: u32) -> Self {
        self.digits = digits;
        self
    }

    pub fn with_step(mut self, step: u64) -> Self {
        self.step = step;
        self
    }

    pub fn with_t0(mut self, t0: u64) -> Self {
        self.t0 = t0;
        self
    }

    pub fn with_window(mut self, window: u64) -> Self {
        self.window = window;
        self
    }

    pub fn with_min_secret_bytes(mut self, min: usize) -> Self {
        self.min_secret_bytes = min;
        self
    }

    pub fn with_max_secret_bytes(mut self, max: usize) -> Self {
        self.max_secret_bytes = max;
        self
    }

    pub fn with_normalize_charset(mut self, normalize: bool) -> Self {
        self.normalize_charset = normalize;
        self
    }

    /// Check every parameter against the supported ranges.
    pub fn validate(&self) -> OtpResult<()> {
        check_digits(self.digits)?;
        check_step(self.step)?;
        if self.window > MAX_WINDOW {
            return Err(OtpError::InvalidParameters(format!(
                "window must be at most {MAX_WINDOW}, got {}",
                self.window
            )));
        }
        if self.min_secret_bytes == 0 || self.min_secret_bytes > self.max_secret_bytes {
            return Err(OtpError::InvalidParameters(format!(
                "secret length bounds {}..={} are invalid",
                self.min_secret_bytes, self.max_secret_bytes
            )));
        }
        Ok(())
    }
}

pub(crate) fn check_digits(digits: u32) -> OtpResult<()> {
    if DIGITS.contains(&digits) {
        Ok(())
    } else {
        Err(OtpError::InvalidParameters(format!(
            "digits must be within {}..={}, got {digits}",
            DIGITS.start(),
            DIGITS.end()
        )))
    }
}

pub(crate) fn check_step(step: u64) -> OtpResult<()> {
    if STEP.contains(&step) {
        Ok(())
    } else {
        Err(OtpError::InvalidParameters(format!(
            "step must be within {}..={} seconds, got {step}",
            STEP.start(),
            STEP.end()
        )))
    }
}

#[cfg(test)]
mod test {
    use test_case::test_case;

    use crate::{Algorithm, OtpError, TotpConfig};

    #[test]
    fn it_has_conventional_defaults() {
        let config = TotpConfig::default();
        assert_eq!(config.algorithm, Algorithm::Sha1);
        assert_eq!(config.digits, 6);
        assert_eq!(config.step, 30);
        assert_eq!(config.window, 1);
        assert_eq!(config.min_secret_bytes, 10);
        assert!(!config.normalize_charset);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test_case(TotpConfig::default().with_digits(5))]
    #[test_case(TotpConfig::default().with_digits(9))]
    #[test_case(TotpConfig::default().with_step(0))]
    #[test_case(TotpConfig::default().with_step(3601))]
    #[test_case(TotpConfig::default().with_window(11))]
    #[test_case(TotpConfig::default().with_min_secret_bytes(0))]
    #[test_case(TotpConfig::default().with_min_secret_bytes(65))]
    #[test_case(TotpConfig::default().with_max_secret_bytes(5))]
    fn it_rejects_out_of_range_parameters(config: TotpConfig) {
        assert!(matches!(
            config.validate(),
            Err(OtpError::InvalidParameters(_))
        ));
    }

    #[test_case("SHA1", Algorithm::Sha1)]
    #[test_case("sha256", Algorithm::Sha256)]
    #[test_case("SHA-512", Algorithm::Sha512)]
    fn it_parses_algorithms(text: &str, expected: Algorithm) {
        assert_eq!(text.parse::<Algorithm>(), Ok(expected));
    }

    #[test]
    fn it_rejects_unknown_algorithms() {
        assert!("MD5".parse::<Algorithm>().is_err());
    }

    #[test]
    fn it_displays_algorithms_for_uris() {
        assert_eq!(Algorithm::Sha256.to_string(), "SHA256");
    }
}
