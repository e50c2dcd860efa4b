use crate::auth::{DEFAULT_ALGORITHM, DEFAULT_TOKEN_TTL_MINUTES};
use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_SECRET_KEY: &str = "secret-key";
pub const ARG_ALGORITHM: &str = "algorithm";
pub const ARG_TOKEN_TTL_MINUTES: &str = "token-ttl-minutes";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SECRET_KEY)
                .long(ARG_SECRET_KEY)
                .help("Symmetric key used to sign and verify bearer tokens")
                .env("DOORMAN_SECRET_KEY")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_ALGORITHM)
                .long(ARG_ALGORITHM)
                .help("Token signing algorithm")
                .env("DOORMAN_ALGORITHM")
                .default_value(DEFAULT_ALGORITHM)
                .value_parser(["HS256", "HS384", "HS512"]),
        )
        .arg(
            Arg::new(ARG_TOKEN_TTL_MINUTES)
                .long(ARG_TOKEN_TTL_MINUTES)
                .help("Bearer token lifetime in minutes")
                .env("DOORMAN_TOKEN_TTL")
                .default_value("15")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}

#[derive(Debug)]
pub struct Options {
    pub secret_key: SecretString,
    pub algorithm: String,
    pub token_ttl_minutes: u64,
}

impl Options {
    /// Read the token signing options.
    ///
    /// # Errors
    /// Returns an error if the secret key is missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let secret_key = matches
            .get_one::<String>(ARG_SECRET_KEY)
            .cloned()
            .map(SecretString::from)
            .context("missing required argument: --secret-key")?;
        let algorithm = matches
            .get_one::<String>(ARG_ALGORITHM)
            .cloned()
            .unwrap_or_else(|| DEFAULT_ALGORITHM.to_string());
        let token_ttl_minutes = matches
            .get_one::<u64>(ARG_TOKEN_TTL_MINUTES)
            .copied()
            .unwrap_or(DEFAULT_TOKEN_TTL_MINUTES);

        Ok(Self {
            secret_key,
            algorithm,
            token_ttl_minutes,
        })
    }
}
