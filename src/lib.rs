//! # Doorman
//!
//! User registration and stateless bearer-token authentication.
//!
//! ## Sessions
//!
//! `POST /token` checks a username and password against an Argon2id hash and
//! returns a signed JWT carrying `{sub, exp}`. Nothing about the token is
//! stored: every protected request re-verifies the signature and expiry and
//! then loads the user named by `sub`, so changes to the user (such as being
//! disabled) apply on the next request while the token itself cannot be
//! revoked before it expires.
//!
//! ## Storage
//!
//! Users and their things live in PostgreSQL, or in process memory when the
//! DSN is `memory://`.

pub mod api;
pub mod auth;
pub mod cli;
pub mod storage;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
