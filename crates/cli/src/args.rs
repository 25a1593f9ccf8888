use std::net::SocketAddr;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use totp_engine::{Algorithm, TotpConfig};

use crate::input::SecretFormat;

#[derive(Parser, Debug)]
#[command(
    name = "totp",
    author,
    version,
    about = "Generate and verify time-based one-time passcodes"
)]
pub struct Cli {
    #[command(flatten)]
    pub params: ParamArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Code parameters shared by every subcommand.
#[derive(Args, Debug)]
pub struct ParamArgs {
    /// HMAC algorithm: SHA1, SHA256 or SHA512
    #[arg(long, global = true, env = "TOTP_ALGORITHM", default_value = "SHA1")]
    pub algorithm: Algorithm,

    /// Digits per code
    #[arg(long, global = true, env = "TOTP_DIGITS", default_value_t = 6)]
    pub digits: u32,

    /// Time step in seconds
    #[arg(long, global = true, env = "TOTP_STEP", default_value_t = 30)]
    pub step: u64,

    /// Steps of clock drift accepted on either side when verifying
    #[arg(long, global = true, env = "TOTP_WINDOW", default_value_t = 1)]
    pub window: u64,

    /// Reject secrets shorter than this many bytes
    #[arg(long, global = true, env = "TOTP_MIN_SECRET_BYTES", default_value_t = 10)]
    pub min_secret_bytes: usize,

    /// Read 1 as I and 0 as O in Base32 secrets (lossy)
    #[arg(long, global = true, env = "TOTP_NORMALIZE_CHARSET")]
    pub normalize_charset: bool,
}

impl ParamArgs {
    pub fn to_config(&self) -> anyhow::Result<TotpConfig> {
        let config = TotpConfig::default()
            .with_algorithm(self.algorithm)
            .with_digits(self.digits)
            .with_step(self.step)
            .with_window(self.window)
            .with_min_secret_bytes(self.min_secret_bytes)
            .with_normalize_charset(self.normalize_charset);
        config.validate().context("invalid code parameters")?;
        Ok(config)
    }
}

/// Where the shared secret comes from.
#[derive(Args, Debug)]
pub struct SecretArgs {
    /// Shared secret
    #[arg(
        long,
        env = "TOTP_SECRET",
        hide_env_values = true,
        required_unless_present = "uri",
        conflicts_with = "uri"
    )]
    pub secret: Option<String>,

    /// How to read --secret
    #[arg(long, value_enum, default_value_t = SecretFormat::Base32)]
    pub format: SecretFormat,

    /// otpauth://totp/ URI carrying the secret and its parameters
    #[arg(long)]
    pub uri: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the current code
    Generate {
        #[command(flatten)]
        secret: SecretArgs,

        /// Unix time to use instead of the system clock
        #[arg(long)]
        at: Option<u64>,
    },
    /// Check a code; exits with 2 when it is wrong
    Verify {
        #[command(flatten)]
        secret: SecretArgs,

        /// Code to check
        #[arg(long)]
        token: String,

        /// Unix time to use instead of the system clock
        #[arg(long)]
        at: Option<u64>,
    },
    /// Print the seconds left before the current code expires
    Remaining {
        /// Unix time to use instead of the system clock
        #[arg(long)]
        at: Option<u64>,
    },
    /// Show what an otpauth URI contains, without the secret
    Inspect {
        #[arg(long)]
        uri: String,
    },
    /// Serve the HTTP relay
    Serve {
        #[arg(long, env = "TOTP_BIND", default_value = "127.0.0.1:3001")]
        bind: SocketAddr,
    },
}
