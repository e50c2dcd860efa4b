//! Map parsed CLI arguments to an action.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{auth, ARG_ALLOWED_ORIGINS, ARG_DSN, ARG_PORT, DEFAULT_ALLOWED_ORIGINS};
use anyhow::{Context, Result};

/// Split a comma separated origin list, dropping blanks.
fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>(ARG_DSN)
        .cloned()
        .context("missing required argument: --dsn")?;
    let allowed_origins = parse_origins(
        matches
            .get_one::<String>(ARG_ALLOWED_ORIGINS)
            .map_or(DEFAULT_ALLOWED_ORIGINS, String::as_str),
    );

    let auth_opts = auth::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        allowed_origins,
        secret_key: auth_opts.secret_key,
        algorithm: auth_opts.algorithm,
        token_ttl_minutes: auth_opts.token_ttl_minutes,
    }))
}
