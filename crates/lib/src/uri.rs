use std::fmt;
use std::str::FromStr;

use percent_encoding::percent_decode_str;
use url::Url;

use crate::{decode_secret, Algorithm, OtpError, OtpResult, Secret, TotpConfig};

/// A parsed `otpauth://totp/...` key URI, as found in enrollment QR codes.
///
/// Parameters the URI leaves out fall back to whatever config it is
/// [applied](Self::apply) to.
#[derive(Clone, PartialEq, Eq)]
pub struct OtpAuthUri {
    issuer: Option<String>,
    account: String,
    secret: String,
    algorithm: Option<Algorithm>,
    digits: Option<u32>,
    period: Option<u64>,
}

impl OtpAuthUri {
    pub fn parse(text: &str) -> OtpResult<Self> {
        let url = Url::parse(text.trim()).map_err(|e| invalid(e.to_string()))?;
        if url.scheme() != "otpauth" {
            return Err(invalid(format!("unexpected scheme {}", url.scheme())));
        }
        match url.host_str().map(str::to_ascii_lowercase).as_deref() {
            Some("totp") => {}
            Some(other) => return Err(invalid(format!("unsupported otp type {other}"))),
            None => return Err(invalid("missing otp type")),
        }

        let label = percent_decode_str(url.path().trim_start_matches('/'))
            .decode_utf8()
            .map_err(|_| invalid("label is not valid UTF-8"))?;
        let (label_issuer, account) = match label.split_once(':') {
            Some((issuer, account)) => (Some(issuer.trim().to_string()), account.trim()),
            None => (None, label.trim()),
        };

        let mut uri = OtpAuthUri {
            issuer: label_issuer.filter(|issuer| !issuer.is_empty()),
            account: account.to_string(),
            secret: String::new(),
            algorithm: None,
            digits: None,
            period: None,
        };

        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "secret" => uri.secret = value.into_owned(),
                "issuer" if !value.is_empty() => uri.issuer = Some(value.into_owned()),
                "algorithm" => {
                    let algorithm = value
                        .parse()
                        .map_err(|_| invalid(format!("unsupported algorithm {value}")))?;
                    uri.algorithm = Some(algorithm);
                }
                "digits" => uri.digits = Some(parse_number(&key, &value)?),
                "period" => uri.period = Some(parse_number(&key, &value)?),
                _ => log::debug!("ignoring otpauth parameter {key}"),
            }
        }

        if uri.secret.is_empty() {
            return Err(invalid("missing secret"));
        }
        Ok(uri)
    }

    pub fn issuer(&self) -> Option<&str> {
        self.issuer.as_deref()
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn algorithm(&self) -> Option<Algorithm> {
        self.algorithm
    }

    pub fn digits(&self) -> Option<u32> {
        self.digits
    }

    pub fn period(&self) -> Option<u64> {
        self.period
    }

    /// `base` with the algorithm, digits and period this URI specifies.
    pub fn apply(&self, base: &TotpConfig) -> OtpResult<TotpConfig> {
        let mut config = base.clone();
        if let Some(algorithm) = self.algorithm {
            config.algorithm = algorithm;
        }
        if let Some(digits) = self.digits {
            config.digits = digits;
        }
        if let Some(period) = self.period {
            config.step = period;
        }
        config.validate()?;
        Ok(config)
    }

    /// Decode the URI's Base32 secret under `config`'s guardrails.
    pub fn secret(&self, config: &TotpConfig) -> OtpResult<Secret> {
        decode_secret(&self.secret, config)
    }
}

impl FromStr for OtpAuthUri {
    type Err = OtpError;

    fn from_str(s: &str) -> OtpResult<Self> {
        OtpAuthUri::parse(s)
    }
}

impl fmt::Debug for OtpAuthUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OtpAuthUri")
            .field("issuer", &self.issuer)
            .field("account", &self.account)
            .field("secret", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("digits", &self.digits)
            .field("period", &self.period)
            .finish()
    }
}

fn invalid(reason: impl Into<String>) -> OtpError {
    OtpError::InvalidUri(reason.into())
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> OtpResult<T> {
    value
        .parse()
        .map_err(|_| invalid(format!("{key} is not a number: {value}")))
}
