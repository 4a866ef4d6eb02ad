//! Generates an RSA private key and a CSR or self-signed certificate with the openssl toolkit

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use env_logger::Builder;
use log::LevelFilter;

use csrgen::config::{Config, DEFAULT_CONFIG_FILE};
use csrgen::error::Result;
use csrgen::prompt::TerminalReader;
use csrgen::toolkit::SystemRunner;
use csrgen::workflow;

/// Arguments for the key and certificate request generator.
///
/// All settings come from a YAML configuration file; fields left out of the file take built-in
/// defaults, and a missing file means every default is used.
///
/// ```text
/// csrgen ./server.yml
/// ```
///
/// The run samples three files below `random_files` as a randomness hint, prompts for a key
/// passphrase (an empty passphrase leaves the key unencrypted), writes the key and then the CSR
/// or, with `req_type: x509`, a self-signed certificate. With `req_type: x509` and `p12_file`
/// set, a PKCS#12 bundle protected by a second passphrase is written as well.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct CsrGenArgs {
    /// Path of the YAML configuration file
    #[clap(default_value = DEFAULT_CONFIG_FILE)]
    pub config_file: PathBuf,
}

fn init_logging(debug: bool) {
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    let mut builder = Builder::new();
    builder.filter(None, level).parse_default_env().init();
}

fn run(args: &CsrGenArgs) -> Result<()> {
    let config = Config::load(&args.config_file)?;
    init_logging(config.debug);

    let mut rng = rand::thread_rng();
    let mut runner = SystemRunner::new(config.debug);
    let mut reader = TerminalReader;
    workflow::run(&config, &mut rng, &mut runner, &mut reader)
}

fn main() -> ExitCode {
    let args = CsrGenArgs::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
