//! Development token tool
//!
//! Mints a buyer JWT signed with the configured secret, for driving the
//! payments API locally.
//!
//! Usage: `walletpay-token <user-id> [ttl-minutes] [name] [email]`

use anyhow::{bail, Context};
use chrono::Duration;
use walletpay_verifier::{infrastructure::adapters::AuthenticationAdapter, AppConfig};

const DEFAULT_TTL_MINUTES: i64 = 60;

fn main() {
    if let Err(e) = run() {
        eprintln!("walletpay-token: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let Some(user_id) = args.next() else {
        bail!("usage: walletpay-token <user-id> [ttl-minutes] [name] [email]");
    };
    let ttl_minutes = match args.next() {
        Some(raw) => raw.parse::<i64>().context("ttl-minutes must be a whole number")?,
        None => DEFAULT_TTL_MINUTES,
    };
    if ttl_minutes <= 0 {
        bail!("ttl-minutes must be positive");
    }
    let name = args.next();
    let email = args.next();

    let config = AppConfig::load().context("Failed to load configuration")?;
    if !config.security.development_mode {
        bail!("refusing to mint tokens outside development mode");
    }

    let token = AuthenticationAdapter::new(config.security.jwt)
        .issue_token(&user_id, name.as_deref(), email.as_deref(), Duration::minutes(ttl_minutes))
        .context("Failed to sign token")?;
    println!("{}", token);
    Ok(())
}
