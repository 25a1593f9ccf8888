use std::fmt;

use hmac::{digest::KeyInit, Hmac, Mac};
use sha1::Sha1;
use sha2::{Sha256, Sha512};

use crate::config::{check_digits, Algorithm};
use crate::{MovingFactor, Otp, OtpError, OtpResult, Secret};

/// A one-time passcode.
///
/// Displays as a decimal string zero-padded to `digits`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Code {
    value: u32,
    digits: u32,
}

impl Code {
    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn digits(&self) -> u32 {
        self.digits
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$}", self.value, width = self.digits as usize)
    }
}

/// Derive the code for `counter` (RFC 4226 HOTP).
pub fn derive_code(
    secret: &[u8],
    counter: u64,
    digits: u32,
    algorithm: Algorithm,
) -> OtpResult<Code> {
    if secret.is_empty() {
        return Err(OtpError::SecretTooShort { len: 0, min: 1 });
    }
    check_digits(digits)?;

    // Step 1: Generate an HMAC value
    let hs = hmac(algorithm, secret, counter)?;

    // Step 2: Generate a 4-byte string (Dynamic Truncation)
    let sbits = dt(&hs);

    // Step 3: Compute an HOTP value
    let snum = u32::from_be_bytes(sbits);

    Ok(Code {
        value: snum % 10_u32.pow(digits),
        digits,
    })
}

fn hmac(algorithm: Algorithm, key: &[u8], counter: u64) -> OtpResult<Vec<u8>> {
    let msg = counter.to_be_bytes();
    match algorithm {
        Algorithm::Sha1 => mac::<Hmac<Sha1>>(key, &msg),
        Algorithm::Sha256 => mac::<Hmac<Sha256>>(key, &msg),
        Algorithm::Sha512 => mac::<Hmac<Sha512>>(key, &msg),
    }
}

fn mac<M: Mac + KeyInit>(key: &[u8], msg: &[u8]) -> OtpResult<Vec<u8>> {
    let mut mac = <M as Mac>::new_from_slice(key)?;
    mac.update(msg);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn dt(hs: &[u8]) -> [u8; 4] {
    let mut substr = dt_substr(hs, dt_offset(hs));
    substr[0] &= 0b0111_1111;
    substr
}

// The offset is at most 15, so offset + 4 stays inside any SHA digest.
fn dt_substr(hs: &[u8], offset: usize) -> [u8; 4] {
    let mut substr = [0u8; 4];
    substr.copy_from_slice(&hs[offset..offset + 4]);
    substr
}

fn dt_offset(hs: &[u8]) -> usize {
    (hs[hs.len() - 1] & 0b1111) as usize
}

/// HMAC-based one-time passcode
///
/// Uses a counter to generate the passcode. The counter is
/// incremented after a passcode is generated.
pub type Hotp = Otp<Counter>;

impl Hotp {
    /// Get a HOTP generator with the given `secret`, initial count, and which
    /// generates passcodes of `digits` using HMAC-SHA1.
    pub fn new(secret: Secret, initial_count: u64, digits: u32) -> Self {
        Otp {
            secret,
            generator: Counter {
                count: initial_count,
            },
            digits,
            algorithm: Algorithm::Sha1,
        }
    }

    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// The counter value the next call to [`Otp::get`] will use.
    pub fn count(&self) -> u64 {
        self.generator.count
    }
}

/// The backing type which implements the [`MovingFactor`] interface,
/// using a counter to generate the value bytes.
pub struct Counter {
    count: u64,
}

impl MovingFactor for Counter {
    fn counter(&mut self) -> OtpResult<u64> {
        let c = self.count;
        self.count = self.count.checked_add(1).ok_or_else(|| {
            OtpError::InvalidParameters("HOTP counter exhausted".to_string())
        })?;
        Ok(c)
    }
}

#[cfg(test)]
mod test {
    use hex::FromHex;
    use test_case::test_case;

    use super::{derive_code, dt, dt_offset, dt_substr, hmac, Hotp};
    use crate::{Algorithm, OtpError, Secret};

    const RFC_KEY: &[u8] = b"12345678901234567890";

    #[test]
    fn it_computes_correct_offset() {
        let s: [u8; 20] = hex_literal::hex!("1f8698690e02ca16618550ef7f19da8e945b555a");
        // Last byte is 0x5a, with low 4 bits 0xa
        assert_eq!(dt_offset(&s), 0xa);
    }

    #[test]
    fn it_computes_correct_4byte_substring() {
        let s: [u8; 20] = hex_literal::hex!("1f8698690e02ca16618550ef7f19da8e945b555a");
        let expected: [u8; 4] = hex_literal::hex!("50ef7f19");
        let actual = dt_substr(&s, dt_offset(&s));
        assert_eq!(actual, expected);
    }

    #[test]
    fn it_masks_the_top_bit() {
        let s: [u8; 20] = hex_literal::hex!("1f8698690e02ca166185ffef7f19da8e945b555a");
        let expected: [u8; 4] = hex_literal::hex!("7fef7f19");
        assert_eq!(dt(&s), expected);
    }

    #[test]
    fn it_truncates_at_the_end_of_a_long_digest() {
        let mut s = [0u8; 64];
        s[15..19].copy_from_slice(&[0xff, 0x01, 0x02, 0x03]);
        s[63] = 0x0f;
        assert_eq!(dt(&s), [0x7f, 0x01, 0x02, 0x03]);
    }

    // HMAC-SHA1 intermediate values from RFC 4226 appendix D
    #[test_case(0, "cc93cf18508d94934c64b65d8ba7667fb7cde4b0")]
    #[test_case(1, "75a48a19d4cbe100644e8ac1397eea747a2d33ab")]
    #[test_case(2, "0bacb7fa082fef30782211938bc1c5e70416ff44")]
    #[test_case(3, "66c28227d03a2d5529262ff016a1e6ef76557ece")]
    #[test_case(4, "a904c900a64b35909874b33e61c5938a8e15ed1c")]
    #[test_case(5, "a37e783d7b7233c083d4f62926c7a25f238d0316")]
    #[test_case(6, "bc9cd28561042c83f219324d3c607256c03272ae")]
    #[test_case(7, "a4fb960c0bc06e1eabb804e5b397cdc4b45596fa")]
    #[test_case(8, "1b3c89f65e6c9e883012052823443f048b4332db")]
    #[test_case(9, "1637409809a679dc698207310c8c7fc07290d9e5")]
    fn it_computes_correct_hmac(counter: u64, expected: &str) {
        let expected = <[u8; 20]>::from_hex(expected).unwrap();
        let hs = hmac(Algorithm::Sha1, RFC_KEY, counter).unwrap();
        assert_eq!(hs, expected);
    }

    #[test_case(Algorithm::Sha1, 20)]
    #[test_case(Algorithm::Sha256, 32)]
    #[test_case(Algorithm::Sha512, 64)]
    fn it_produces_full_length_digests(algorithm: Algorithm, len: usize) {
        assert_eq!(hmac(algorithm, RFC_KEY, 1).unwrap().len(), len);
    }

    // These test cases are copied from RFC 4226
    // https://datatracker.ietf.org/doc/html/rfc4226#appendix-D
    #[test_case(0, "755224")]
    #[test_case(1, "287082")]
    #[test_case(2, "359152")]
    #[test_case(3, "969429")]
    #[test_case(4, "338314")]
    #[test_case(5, "254676")]
    #[test_case(6, "287922")]
    #[test_case(7, "162583")]
    #[test_case(8, "399871")]
    #[test_case(9, "520489")]
    fn it_derives_correct_codes(counter: u64, expected: &str) {
        let code = derive_code(RFC_KEY, counter, 6, Algorithm::Sha1).unwrap();
        assert_eq!(code.to_string(), expected);
    }

    #[test]
    fn it_is_deterministic() {
        for counter in [0, 1, 56_666_666, u64::MAX] {
            let a = derive_code(RFC_KEY, counter, 8, Algorithm::Sha256).unwrap();
            let b = derive_code(RFC_KEY, counter, 8, Algorithm::Sha256).unwrap();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn it_zero_pads_codes() {
        // RFC 6238, T = 1111111109, SHA1, 8 digits
        let code = derive_code(RFC_KEY, 0x23523EC, 8, Algorithm::Sha1).unwrap();
        assert_eq!(code.value(), 7081804);
        assert_eq!(code.to_string(), "07081804");
    }

    #[test]
    fn it_rejects_an_empty_key() {
        assert_eq!(
            derive_code(&[], 0, 6, Algorithm::Sha1),
            Err(OtpError::SecretTooShort { len: 0, min: 1 })
        );
    }

    #[test_case(5)]
    #[test_case(9)]
    fn it_rejects_unsupported_digits(digits: u32) {
        assert!(matches!(
            derive_code(RFC_KEY, 0, digits, Algorithm::Sha1),
            Err(OtpError::InvalidParameters(_))
        ));
    }

    #[test]
    fn it_increments_the_counter() {
        let cases = vec![
            755224, 287082, 359152, 969429, 338314, 254676, 287922, 162583, 399871, 520489,
        ];
        let mut hotp = Hotp::new(Secret::from_bytes(RFC_KEY.to_vec()), 0, 6);
        for case in cases {
            let actual = hotp.get().unwrap();
            assert_eq!(actual.value(), case);
        }
        assert_eq!(hotp.count(), 10);
        assert_eq!(hotp.digits(), 6);
        assert_eq!(hotp.algorithm(), Algorithm::Sha1);
    }

    #[test]
    fn it_switches_algorithms() {
        let secret = Secret::from_bytes(RFC_KEY.to_vec());
        let mut sha1 = Hotp::new(secret.clone(), 0, 8);
        let mut sha512 = Hotp::new(secret, 0, 8).with_algorithm(Algorithm::Sha512);
        assert_eq!(sha512.algorithm(), Algorithm::Sha512);
        assert_ne!(sha1.get().unwrap(), sha512.get().unwrap());
    }

    #[test]
    fn it_reports_counter_exhaustion() {
        let mut hotp = Hotp::new(Secret::from_bytes(RFC_KEY.to_vec()), u64::MAX, 6);
        assert!(matches!(hotp.get(), Err(OtpError::InvalidParameters(_))));
    }
}
