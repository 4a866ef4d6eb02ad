//! Summary of the files written by a run

use std::fs;
use std::path::Path;

use der::DecodePem;
use log::warn;
use x509_cert::request::CertReq;
use x509_cert::time::Validity;
use x509_cert::Certificate;

use crate::config::{Config, ReqType};

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Whole days between notBefore and notAfter
pub fn validity_days(validity: &Validity) -> u64 {
    let not_before = validity.not_before.to_unix_duration();
    let not_after = validity.not_after.to_unix_duration();
    not_after.saturating_sub(not_before).as_secs() / SECS_PER_DAY
}

/// One-line description of a PEM certificate
pub fn describe_certificate(pem: &[u8]) -> der::Result<String> {
    let cert = Certificate::from_pem(pem)?;
    let tbs = &cert.tbs_certificate;
    Ok(format!(
        "subject {}, valid for {} days",
        tbs.subject,
        validity_days(&tbs.validity)
    ))
}

/// One-line description of a PEM certificate request
pub fn describe_request(pem: &[u8]) -> der::Result<String> {
    let req = CertReq::from_pem(pem)?;
    Ok(format!("subject {}", req.info.subject))
}

/// Whether a PEM private key is stored encrypted.
///
/// Recognizes PKCS#8 `ENCRYPTED PRIVATE KEY` documents and the legacy OpenSSL
/// `Proc-Type: 4,ENCRYPTED` header.
pub fn key_is_encrypted(pem: &[u8]) -> bool {
    String::from_utf8_lossy(pem).contains("Proc-Type: 4,ENCRYPTED")
        || matches!(pem_rfc7468::decode_label(pem), Ok("ENCRYPTED PRIVATE KEY"))
}

/// Print what was written; inspection problems are only warnings
pub fn report(config: &Config, expect_encrypted: bool) {
    match fs::read(&config.key_file) {
        Ok(pem) => {
            let encrypted = key_is_encrypted(&pem);
            println!(
                "key {} ({})",
                config.key_file.display(),
                if encrypted { "encrypted" } else { "unencrypted" }
            );
            if encrypted != expect_encrypted {
                warn!(
                    "{} is unexpectedly {}",
                    config.key_file.display(),
                    if encrypted { "encrypted" } else { "unencrypted" }
                );
            }
        }
        Err(e) => warn!("cannot read {}: {}", config.key_file.display(), e),
    }

    let described = read_and(&config.req_file, |pem| match config.req_type {
        ReqType::X509 => describe_certificate(pem),
        ReqType::Csr => describe_request(pem),
    });
    if let Some(line) = described {
        println!("{} {}", config.req_file.display(), line);
    }

    if let Some(p12) = config.p12_file.as_ref().filter(|_| config.req_type == ReqType::X509) {
        if p12.exists() {
            println!("pkcs12 {}", p12.display());
        }
    }
}

fn read_and<F>(path: &Path, describe: F) -> Option<String>
where
    F: FnOnce(&[u8]) -> der::Result<String>,
{
    let pem = match fs::read(path) {
        Ok(pem) => pem,
        Err(e) => {
            warn!("cannot read {}: {}", path.display(), e);
            return None;
        }
    };
    match describe(&pem) {
        Ok(line) => Some(line),
        Err(e) => {
            warn!("cannot parse {}: {}", path.display(), e);
            None
        }
    }
}
