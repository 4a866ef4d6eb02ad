//! Key and certificate request generation driven through the openssl command-line toolkit
//!
//! A run reads a YAML configuration ([`config`]), samples files as a randomness hint
//! ([`entropy`]), prompts for a passphrase ([`prompt`]) and then invokes the toolkit
//! ([`toolkit`]) to create the key ([`keys`]) and the request or certificate ([`csrs`]).
//! [`workflow`] sequences the stages.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod config;
pub mod csrs;
pub mod entropy;
pub mod error;
pub mod keys;
pub mod prompt;
pub mod report;
pub mod toolkit;
pub mod workflow;
