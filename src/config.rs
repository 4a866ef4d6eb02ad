//! Configuration file loading

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::debug;
use serde::Deserialize;

use crate::csrs::DistinguishedName;
use crate::error::{Error, Result};

/// Default location of the configuration file
pub const DEFAULT_CONFIG_FILE: &str = "config.yml";

/// Kind of artifact produced by `openssl req`
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ReqType {
    /// certificate signing request
    #[default]
    Csr,
    /// self-signed certificate
    X509,
}

impl fmt::Display for ReqType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReqType::Csr => f.write_str("csr"),
            ReqType::X509 => f.write_str("x509"),
        }
    }
}

/// Settings for one run.
///
/// Every field is optional in the YAML document; absent fields take the defaults below.
///
/// ```yaml
/// key_size: 2048
/// random_files:
/// - ~/Downloads/hoge
/// - /var/log
/// key_file: ./new_key.pem
/// req_file: ./new_csr.pem
/// req_type: x509
/// req_days: 30
/// p12_file: ./new.p12
/// cert_descriptions:
///   C: JP
///   ST: .
///   O: Osaka University
///   CN: idp01.auth.cmc.osaka-u.ac.jp
/// ```
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// key algorithm; `openssl gen<key_type>` creates the key
    #[serde(default = "default_key_type")]
    pub key_type: String,
    /// key length in bits
    #[serde(default = "default_key_size")]
    pub key_size: u32,
    /// cipher protecting the key file
    #[serde(default = "default_key_cipher")]
    pub key_cipher: String,
    /// digest used to sign the request
    #[serde(default = "default_digest")]
    pub digest: String,
    /// files and directories whose contents seed the toolkit's RNG
    #[serde(default = "default_random_files")]
    pub random_files: Vec<PathBuf>,
    /// private key output
    #[serde(default = "default_key_file")]
    pub key_file: PathBuf,
    /// request or certificate output
    #[serde(default = "default_req_file", alias = "csr_file")]
    pub req_file: PathBuf,
    /// PKCS#12 bundle output, only written for self-signed certificates
    #[serde(default)]
    pub p12_file: Option<PathBuf>,
    /// request or self-signed certificate
    #[serde(default)]
    pub req_type: ReqType,
    /// certificate validity, only used for self-signed certificates
    #[serde(default = "default_req_days")]
    pub req_days: u32,
    /// stream toolkit output to the terminal
    #[serde(default)]
    pub debug: bool,
    /// subject attributes
    #[serde(default)]
    pub cert_descriptions: DistinguishedName,
    /// passed to `openssl req -config`
    #[serde(default)]
    pub openssl_conf: Option<PathBuf>,
    /// extension section name in `openssl_conf`
    #[serde(default)]
    pub openssl_extensions: Option<String>,
    /// toolkit executable
    #[serde(default = "default_openssl_path")]
    pub openssl_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            key_type: default_key_type(),
            key_size: default_key_size(),
            key_cipher: default_key_cipher(),
            digest: default_digest(),
            random_files: default_random_files(),
            key_file: default_key_file(),
            req_file: default_req_file(),
            p12_file: None,
            req_type: ReqType::default(),
            req_days: default_req_days(),
            debug: false,
            cert_descriptions: DistinguishedName::default(),
            openssl_conf: None,
            openssl_extensions: None,
            openssl_path: default_openssl_path(),
        }
    }
}

fn default_key_type() -> String {
    "rsa".to_string()
}

fn default_key_size() -> u32 {
    2048
}

fn default_key_cipher() -> String {
    "des3".to_string()
}

fn default_digest() -> String {
    "sha256".to_string()
}

fn default_random_files() -> Vec<PathBuf> {
    vec![PathBuf::from("/etc/")]
}

fn default_key_file() -> PathBuf {
    PathBuf::from("new_key.pem")
}

fn default_req_file() -> PathBuf {
    PathBuf::from("new_csr.pem")
}

fn default_req_days() -> u32 {
    365
}

fn default_openssl_path() -> String {
    "openssl".to_string()
}

impl Config {
    /// Parse a YAML document. An empty document yields the defaults.
    pub fn from_yaml(path: &Path, text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load configuration from `path`.
    ///
    /// A missing file is not an error: the defaults are printed and used instead.
    pub fn load(path: &Path) -> Result<Self> {
        let read_err = |source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        };
        match fs::metadata(path) {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let config = Self::default();
                println!(
                    "config file {} is not found! using default values.",
                    path.display()
                );
                print!("{}", config.settings_listing());
                return Ok(config);
            }
            Err(e) => return Err(read_err(e)),
        }

        debug!("loading config from {}", path.display());
        let text = fs::read_to_string(path).map_err(read_err)?;
        Self::from_yaml(path, &text)
    }

    /// The settings a run will use, one `key: value` line each
    pub fn settings_listing(&self) -> String {
        let mut out = format!(
            "key_type: {}\nkey_size: {}\nkey_cipher: {}\ndigest: {}\nrandom_files:\n",
            self.key_type, self.key_size, self.key_cipher, self.digest
        );
        for f in &self.random_files {
            out.push_str(&format!("- {}\n", f.display()));
        }
        out.push_str(&format!(
            "key_file: {}\nreq_file: {}\nreq_type: {}\nreq_days: {}\ndebug: {}\n",
            self.key_file.display(),
            self.req_file.display(),
            self.req_type,
            self.req_days,
            self.debug
        ));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Config {
        Config::from_yaml(Path::new("test.yml"), text).unwrap()
    }

    #[test]
    fn empty_document_uses_defaults() {
        let c = parse("");
        assert_eq!(Config::default(), c);
        assert_eq!("rsa", c.key_type);
        assert_eq!(2048, c.key_size);
        assert_eq!("sha256", c.digest);
        assert_eq!(vec![PathBuf::from("/etc/")], c.random_files);
        assert_eq!(PathBuf::from("new_key.pem"), c.key_file);
        assert_eq!(PathBuf::from("new_csr.pem"), c.req_file);
        assert_eq!(ReqType::Csr, c.req_type);
        assert!(c.p12_file.is_none());
        assert!(!c.debug);
    }

    #[test]
    fn missing_fields_fall_back_individually() {
        let c = parse("key_size: 4096\ndigest: sha512\n");
        assert_eq!(4096, c.key_size);
        assert_eq!("sha512", c.digest);
        assert_eq!("rsa", c.key_type);
        assert_eq!("des3", c.key_cipher);
        assert_eq!(365, c.req_days);
        assert_eq!("openssl", c.openssl_path);
    }

    #[test]
    fn full_document() {
        let c = parse(
            r#"
key_type: rsa
key_size: 3072
random_files:
- /var/log
- /tmp/seed
key_file: out/key.pem
req_file: out/cert.pem
p12_file: out/bundle.p12
req_type: x509
req_days: 30
debug: true
openssl_conf: ./openssl.cnf
openssl_extensions: v3_req
cert_descriptions:
  O: Osaka University
  OU: Cybermedia Center
"#,
        );
        assert_eq!(3072, c.key_size);
        assert_eq!(2, c.random_files.len());
        assert_eq!(ReqType::X509, c.req_type);
        assert_eq!(30, c.req_days);
        assert_eq!(Some(PathBuf::from("out/bundle.p12")), c.p12_file);
        assert!(c.debug);
        assert_eq!(Some("v3_req".to_string()), c.openssl_extensions);
        assert_eq!(
            "/C=JP/L=Academe/O=Osaka University/OU=Cybermedia Center/CN=idp.example.org",
            c.cert_descriptions.subject()
        );
    }

    #[test]
    fn legacy_csr_file_key_is_accepted() {
        let c = parse("csr_file: legacy.pem\n");
        assert_eq!(PathBuf::from("legacy.pem"), c.req_file);
    }

    #[test]
    fn malformed_document_is_fatal() {
        let r = Config::from_yaml(Path::new("bad.yml"), "key_size: [1, 2\n");
        assert!(matches!(r, Err(Error::ConfigParse { .. })));

        let r = Config::from_yaml(Path::new("bad.yml"), "req_type: pem\n");
        assert!(matches!(r, Err(Error::ConfigParse { .. })));
    }

    #[test]
    fn missing_file_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let c = Config::load(&dir.path().join("absent.yml")).unwrap();
        assert_eq!(Config::default(), c);
    }

    #[test]
    fn listing_reflects_settings() {
        let c = Config {
            req_type: ReqType::X509,
            req_days: 30,
            key_cipher: "aes256".to_string(),
            ..Config::default()
        };
        let listing = c.settings_listing();
        assert!(listing.contains("req_type: x509\n"));
        assert!(listing.contains("req_days: 30\n"));
        assert!(listing.contains("key_cipher: aes256\n"));
        assert!(listing.contains("random_files:\n- /etc/\n"));

        let listing = Config::default().settings_listing();
        assert!(listing.contains("req_type: csr\n"));
        assert!(listing.contains("req_days: 365\n"));
        assert!(listing.contains("key_cipher: des3\n"));
    }

    #[test]
    fn unreadable_path_is_not_treated_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain");
        fs::write(&file, "").unwrap();

        // stat fails with "not a directory", not "not found"
        let r = Config::load(&file.join("config.yml"));
        assert!(matches!(r, Err(Error::ConfigRead { .. })));

        // a directory can be stat'ed but not read
        let r = Config::load(dir.path());
        assert!(matches!(r, Err(Error::ConfigRead { .. })));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        fs::write(&path, "req_type: x509\nreq_days: 10\n").unwrap();
        let c = Config::load(&path).unwrap();
        assert_eq!(ReqType::X509, c.req_type);
        assert_eq!(10, c.req_days);
    }
}
