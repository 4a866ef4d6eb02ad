//! Private key generation and hardening

use std::fs;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::Result;
use crate::toolkit::{OpensslCommand, Runner, KEY_PASS_VAR};
use crate::workflow::Context;

/// Generate an encrypted private key seeded with the randomness hint
pub fn generate_key(ctx: &Context<'_>, runner: &mut dyn Runner) -> Result<()> {
    let c = ctx.config;
    println!("creating new key {}", c.key_file.display());

    OpensslCommand::new(&c.openssl_path, &format!("gen{}", c.key_type))
        .arg(format!("-{}", c.key_cipher))
        .opt("-rand", &ctx.hint)
        .secret("-passout", KEY_PASS_VAR, ctx.passphrase.value())
        .opt("-out", &c.key_file)
        .arg(c.key_size.to_string())
        .run(runner)
}

/// Re-encode the key without encryption.
///
/// The toolkit writes into a temporary file next to the key, which then replaces the key in a
/// single rename. The temporary file is removed if the toolkit fails.
pub fn strip_passphrase(ctx: &Context<'_>, runner: &mut dyn Runner) -> Result<()> {
    let c = ctx.config;
    println!("removing passphrase from {}", c.key_file.display());

    let dir = match c.key_file.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let tmp = NamedTempFile::new_in(dir)?;

    OpensslCommand::new(&c.openssl_path, &c.key_type)
        .opt("-in", &c.key_file)
        .secret("-passin", KEY_PASS_VAR, ctx.passphrase.value())
        .opt("-out", tmp.path())
        .run(runner)?;

    tmp.persist(&c.key_file).map_err(|e| e.error)?;
    Ok(())
}

/// Clear all group and other permission bits on `path`
#[cfg(unix)]
pub fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(perms.mode() & !0o077);
    fs::set_permissions(path, perms)?;
    Ok(())
}

/// Clear all group and other permission bits on `path`
#[cfg(not(unix))]
pub fn restrict_permissions(path: &Path) -> Result<()> {
    fs::metadata(path)?;
    log::warn!(
        "cannot restrict permissions of {} on this platform",
        path.display()
    );
    Ok(())
}
