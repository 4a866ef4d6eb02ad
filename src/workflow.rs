//! Sequencing of one key and request generation run

use std::ffi::OsString;

use log::info;
use rand::Rng;

use crate::config::{Config, ReqType};
use crate::csrs::{export_pkcs12, generate_request};
use crate::entropy::randomness_hint;
use crate::error::Result;
use crate::keys::{generate_key, restrict_permissions, strip_passphrase};
use crate::prompt::{prompt_passphrase, KeyPassphrase, SecretReader};
use crate::report::report;
use crate::toolkit::Runner;

/// Values shared by every stage of a run
#[derive(Debug)]
pub struct Context<'a> {
    /// settings for this run
    pub config: &'a Config,
    /// passphrase protecting the key
    pub passphrase: KeyPassphrase,
    /// sampled entropy files joined for `-rand`
    pub hint: OsString,
}

/// Create the key, make it unencrypted if requested and restrict its permissions
pub fn prepare_key(ctx: &Context<'_>, runner: &mut dyn Runner) -> Result<()> {
    generate_key(ctx, runner)?;
    if ctx.passphrase.is_placeholder() {
        strip_passphrase(ctx, runner)?;
    }
    restrict_permissions(&ctx.config.key_file)
}

/// Run the whole flow: sample entropy, prompt, then drive the toolkit.
///
/// Entropy files are checked before anything is prompted or written.
pub fn run<R: Rng + ?Sized>(
    config: &Config,
    rng: &mut R,
    runner: &mut dyn Runner,
    reader: &mut dyn SecretReader,
) -> Result<()> {
    let hint = randomness_hint(&config.random_files, rng)?;
    info!("random files: {}", hint.to_string_lossy());

    let passphrase = KeyPassphrase::from_entry(prompt_passphrase(reader)?);
    let ctx = Context {
        config,
        passphrase,
        hint,
    };

    prepare_key(&ctx, runner)?;
    generate_request(&ctx, runner)?;

    if config.req_type == ReqType::X509 {
        if let Some(p12) = &config.p12_file {
            export_pkcs12(&ctx, p12, runner, reader)?;
        }
    }

    report(config, !ctx.passphrase.is_placeholder());
    Ok(())
}
