//! CSR and self-signed certificate generation

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Deserializer};

use crate::config::ReqType;
use crate::error::Result;
use crate::prompt::{prompt_passphrase, SecretReader};
use crate::toolkit::{OpensslCommand, Runner, EXPORT_PASS_VAR, KEY_PASS_VAR};
use crate::workflow::Context;

/// Subject attributes in the order they appear in openssl.cnf
pub const DN_KEYS: [&str; 7] = ["C", "ST", "L", "O", "OU", "CN", "emailAddress"];

/// Attribute value meaning "leave this attribute out"
pub const OMITTED: &str = ".";

/// Subject attributes keyed by their short name.
///
/// Deserializing merges the document's entries over [`DistinguishedName::default`], so keys the
/// document does not mention keep their default values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DistinguishedName(BTreeMap<String, Option<String>>);

impl Default for DistinguishedName {
    fn default() -> Self {
        let defaults = [
            ("C", "JP"),
            ("ST", OMITTED),
            ("L", "Academe"),
            ("O", "Sample University"),
            ("OU", OMITTED),
            ("CN", "idp.example.org"),
            ("emailAddress", OMITTED),
        ];
        Self(
            defaults
                .iter()
                .map(|(k, v)| (k.to_string(), Some(v.to_string())))
                .collect(),
        )
    }
}

impl<'de> Deserialize<'de> for DistinguishedName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let overrides = Option::<BTreeMap<String, Option<String>>>::deserialize(deserializer)?;
        let mut dn = Self::default();
        dn.0.extend(overrides.unwrap_or_default());
        Ok(dn)
    }
}

impl DistinguishedName {
    /// Value for `key`, if set
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.as_deref())
    }

    /// Set or clear `key`
    #[cfg(test)]
    pub(crate) fn set(&mut self, key: &str, value: Option<&str>) {
        self.0.insert(key.to_string(), value.map(str::to_string));
    }

    /// `-subj` argument: `/KEY=VALUE` for each present, non-omitted attribute in [`DN_KEYS`] order
    pub fn subject(&self) -> String {
        DN_KEYS
            .iter()
            .filter_map(|k| match self.get(k) {
                Some(v) if v != OMITTED => Some(format!("/{}={}", k, v)),
                _ => None,
            })
            .collect()
    }
}

/// Write a new CSR, or a self-signed certificate for [`ReqType::X509`], to `req_file`
pub fn generate_request(ctx: &Context<'_>, runner: &mut dyn Runner) -> Result<()> {
    let c = ctx.config;
    let x509 = c.req_type == ReqType::X509;
    let (what, extensions_flag) = if x509 {
        ("certificate", "-extensions")
    } else {
        ("csr", "-reqexts")
    };
    println!("creating new {} {}", what, c.req_file.display());

    OpensslCommand::new(&c.openssl_path, "req")
        .arg("-new")
        .flag_if(x509, "-x509")
        .opt_if(x509, "-days", c.req_days.to_string())
        .opt("-subj", c.cert_descriptions.subject())
        .opt("-key", &c.key_file)
        .opt("-out", &c.req_file)
        .arg(format!("-{}", c.digest))
        .opt_some("-config", c.openssl_conf.as_ref())
        .opt_some(extensions_flag, c.openssl_extensions.as_ref())
        .secret_some("-passin", KEY_PASS_VAR, ctx.passphrase.unlock())
        .run(runner)
}

/// Bundle the certificate and key into `p12_file` under a freshly prompted export passphrase
pub fn export_pkcs12(
    ctx: &Context<'_>,
    p12_file: &Path,
    runner: &mut dyn Runner,
    reader: &mut dyn SecretReader,
) -> Result<()> {
    let c = ctx.config;
    println!("creating new pkcs12 {}", p12_file.display());
    println!("enter export password");
    let export = prompt_passphrase(reader)?;

    OpensslCommand::new(&c.openssl_path, "pkcs12")
        .arg("-export")
        .opt("-in", &c.req_file)
        .opt("-inkey", &c.key_file)
        .opt("-out", p12_file)
        .secret("-passout", EXPORT_PASS_VAR, &export)
        .secret_some("-passin", KEY_PASS_VAR, ctx.passphrase.unlock())
        .run(runner)
}
