//! Turning user-supplied secret text into engine input.

use clap::ValueEnum;
use serde::Deserialize;
use totp_engine::{decode_secret, OtpAuthUri, OtpResult, Secret, TotpConfig};

/// How a secret string should be read.
///
/// There is no fallback between the two: invalid Base32 is an error, and
/// text is only used verbatim when `raw` is asked for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretFormat {
    #[default]
    Base32,
    Raw,
}

pub fn read_secret(text: &str, format: SecretFormat, config: &TotpConfig) -> OtpResult<Secret> {
    match format {
        SecretFormat::Base32 => decode_secret(text, config),
        SecretFormat::Raw => Secret::from_raw_text(text, config),
    }
}

/// Resolve a secret from an `otpauth://` URI, returning the config the URI
/// asks for along with it.
pub fn read_uri(uri: &str, base: &TotpConfig) -> OtpResult<(Secret, TotpConfig)> {
    let uri = OtpAuthUri::parse(uri)?;
    let config = uri.apply(base)?;
    let secret = uri.secret(&config)?;
    Ok((secret, config))
}

/// Strip the spaces people type into codes ("123 456").
pub fn clean_token(token: &str) -> String {
    token.chars().filter(|c| !c.is_whitespace()).collect()
}

#[cfg(test)]
mod test {
    use test_case::test_case;
    use totp_engine::{OtpError, TotpConfig};

    use super::{clean_token, read_secret, read_uri, SecretFormat};

    #[test_case(SecretFormat::Base32, "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ")]
    #[test_case(SecretFormat::Raw, "12345678901234567890")]
    fn it_reads_both_formats(format: SecretFormat, text: &str) {
        let secret = read_secret(text, format, &TotpConfig::default()).unwrap();
        assert_eq!(secret.as_bytes(), b"12345678901234567890");
    }

    #[test]
    fn it_does_not_fall_back_to_raw_text() {
        assert_eq!(
            read_secret("my password!", SecretFormat::Base32, &TotpConfig::default()),
            Err(OtpError::InvalidEncoding)
        );
    }

    #[test]
    fn it_takes_parameters_from_uris() {
        let (secret, config) = read_uri(
            "otpauth://totp/x?secret=GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ&digits=8",
            &TotpConfig::default(),
        )
        .unwrap();
        assert_eq!(secret.len(), 20);
        assert_eq!(config.digits, 8);
    }

    #[test]
    fn it_cleans_tokens() {
        assert_eq!(clean_token(" 287 082\n"), "287082");
    }
}
