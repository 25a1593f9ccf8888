use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use totp_engine::{generate, remaining_at, unix_now, verify, OtpAuthUri, Secret, TotpConfig};

mod args;
mod input;
mod relay;

use args::{Cli, Command, SecretArgs};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = cli.params.to_config()?;

    match cli.command {
        Command::Generate { secret, at } => {
            let (secret, config) = resolve_secret(&secret, &config)?;
            let now = at.unwrap_or_else(unix_now);
            let code = generate(&secret, now, &config).context("failed to generate code")?;
            let remaining = remaining_at(now, &config)?;
            println!("{code}");
            eprintln!("valid for {remaining}s");
        }
        Command::Verify { secret, token, at } => {
            let (secret, config) = resolve_secret(&secret, &config)?;
            let now = at.unwrap_or_else(unix_now);
            let valid = verify(&secret, &input::clean_token(&token), now, &config)
                .context("failed to verify code")?;
            if !valid {
                println!("invalid");
                return Ok(ExitCode::from(2));
            }
            println!("valid");
        }
        Command::Remaining { at } => {
            let now = at.unwrap_or_else(unix_now);
            println!("{}", remaining_at(now, &config)?);
        }
        Command::Inspect { uri } => {
            let uri = OtpAuthUri::parse(&uri)?;
            let config = uri.apply(&config)?;
            println!("issuer:    {}", uri.issuer().unwrap_or("-"));
            println!("account:   {}", uri.account());
            println!("algorithm: {}", config.algorithm);
            println!("digits:    {}", config.digits);
            println!("period:    {}s", config.step);
            let secret = uri.secret(&config)?;
            println!("secret:    {} bytes", secret.len());
        }
        Command::Serve { bind } => {
            relay::serve(bind, relay::RelayState::new(config)).await?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn resolve_secret(args: &SecretArgs, config: &TotpConfig) -> anyhow::Result<(Secret, TotpConfig)> {
    if let Some(uri) = &args.uri {
        return input::read_uri(uri, config).context("could not use otpauth uri");
    }
    let text = args.secret.as_deref().context("no secret given")?;
    let secret = input::read_secret(text, args.format, config).context("could not use secret")?;
    log::debug!("using {} byte secret", secret.len());
    Ok((secret, config.clone()))
}
