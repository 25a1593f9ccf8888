use subtle::{Choice, ConstantTimeEq};
use unix_time::Instant;

use crate::config::check_step;
use crate::secret::check_length;
use crate::{derive_code, Code, MovingFactor, Otp, OtpError, OtpResult, Secret, TotpConfig};

/// Time step counter for the Unix time `now`: `(now - t0) / step`.
pub fn counter_at(now: u64, config: &TotpConfig) -> OtpResult<u64> {
    check_step(config.step)?;
    let elapsed = now.checked_sub(config.t0).ok_or_else(|| {
        OtpError::InvalidParameters(format!("time {now} is before t0 {}", config.t0))
    })?;
    Ok(elapsed / config.step)
}

/// Code valid at the Unix time `now`.
pub fn generate(secret: &Secret, now: u64, config: &TotpConfig) -> OtpResult<Code> {
    config.validate()?;
    check_length(secret.len(), config)?;
    let counter = counter_at(now, config)?;
    log::trace!("generating code for counter {counter}");
    derive_code(secret.as_bytes(), counter, config.digits, config.algorithm)
}

/// Seconds until the code valid at `now` expires, in `1..=step`.
pub fn remaining_seconds(now: u64, step: u64) -> OtpResult<u64> {
    check_step(step)?;
    Ok(step - now % step)
}

/// Seconds until the code valid at `now` expires, with steps counted from
/// `config.t0`.
pub fn remaining_at(now: u64, config: &TotpConfig) -> OtpResult<u64> {
    let elapsed = now.checked_sub(config.t0).ok_or_else(|| {
        OtpError::InvalidParameters(format!("time {now} is before t0 {}", config.t0))
    })?;
    remaining_seconds(elapsed, config.step)
}

/// Check `candidate` against every code within `config.window` steps of
/// `now`.
///
/// Every counter in the window is derived and compared in constant time,
/// whether or not an earlier one matched. A wrong code is `Ok(false)`.
pub fn verify(secret: &Secret, candidate: &str, now: u64, config: &TotpConfig) -> OtpResult<bool> {
    config.validate()?;
    check_length(secret.len(), config)?;
    let counter = counter_at(now, config)?;
    let first = counter.saturating_sub(config.window);
    let last = counter.saturating_add(config.window);
    log::trace!("verifying against counters {first}..={last}");

    let candidate = candidate.as_bytes();
    let mut matched = Choice::from(0);
    for c in first..=last {
        let code = derive_code(secret.as_bytes(), c, config.digits, config.algorithm)?;
        matched |= code.to_string().as_bytes().ct_eq(candidate);
    }
    Ok(matched.into())
}

/// Current Unix time in whole seconds.
pub fn unix_now() -> u64 {
    let elapsed = Instant::now() - Instant::at(0, 0);
    elapsed.as_secs()
}

/// Time-based one-time passcode.
///
/// Provides one-time passcodes that are valid within a window
/// of time after the passcode is generated. Each call reads the
/// clock once.
pub type Totp = Otp<Time>;

impl Totp {
    /// Get a TOTP generator reading the system clock.
    pub fn new(secret: Secret, config: TotpConfig) -> OtpResult<Self> {
        Totp::with_clock(secret, config, Box::new(unix_now))
    }

    /// Get a TOTP generator with a custom function to provide the
    /// "now" value, in Unix seconds.
    ///
    /// See [`Self::new`].
    pub fn with_clock(
        secret: Secret,
        config: TotpConfig,
        clock: Box<dyn Fn() -> u64 + Send + Sync>,
    ) -> OtpResult<Self> {
        config.validate()?;
        check_length(secret.len(), &config)?;
        Ok(Otp {
            secret,
            digits: config.digits,
            algorithm: config.algorithm,
            generator: Time { config, clock },
        })
    }

    pub fn config(&self) -> &TotpConfig {
        &self.generator.config
    }

    pub fn now(&self) -> u64 {
        (self.generator.clock)()
    }

    pub fn generate_at(&self, now: u64) -> OtpResult<Code> {
        generate(&self.secret, now, &self.generator.config)
    }

    pub fn verify_at(&self, candidate: &str, now: u64) -> OtpResult<bool> {
        verify(&self.secret, candidate, now, &self.generator.config)
    }

    pub fn verify(&self, candidate: &str) -> OtpResult<bool> {
        self.verify_at(candidate, self.now())
    }

    /// Seconds until the current code expires, counted from `t0`.
    pub fn remaining_seconds(&self) -> OtpResult<u64> {
        remaining_at(self.now(), &self.generator.config)
    }
}

/// The backing type which implements the [`MovingFactor`] interface,
/// using the current time to generate the value bytes.
pub struct Time {
    config: TotpConfig,
    clock: Box<dyn Fn() -> u64 + Send + Sync>,
}

impl MovingFactor for Time {
    fn counter(&mut self) -> OtpResult<u64> {
        counter_at((self.clock)(), &self.config)
    }
}
