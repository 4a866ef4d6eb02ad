//! Error type shared by every stage of the run

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Result alias used throughout csrgen
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal conditions that end a run
#[derive(Debug, Error)]
pub enum Error {
    /// The configuration file exists but could not be read
    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        /// path of the configuration file
        path: PathBuf,
        /// underlying I/O error
        source: std::io::Error,
    },

    /// The configuration file is not a valid document
    #[error("failed to parse config file {path}: {source}")]
    ConfigParse {
        /// path of the configuration file
        path: PathBuf,
        /// underlying YAML error
        source: serde_yaml::Error,
    },

    /// A configured entropy root could not be examined
    #[error("cannot read random file {path}: {source}")]
    EntropyRoot {
        /// the configured root
        path: PathBuf,
        /// underlying I/O error
        source: std::io::Error,
    },

    /// Fewer regular files were found than the sampler needs
    #[error("specify more than {required} files (found {found})")]
    InsufficientEntropy {
        /// number of regular files discovered
        found: usize,
        /// minimum number of files needed
        required: usize,
    },

    /// The sampled paths could not be joined into a single hint
    #[error("random file path cannot be passed to openssl: {0}")]
    EntropyHint(#[from] std::env::JoinPathsError),

    /// Standard input was closed while waiting for a passphrase
    #[error("input closed while reading passphrase")]
    PromptClosed,

    /// The toolkit executable could not be started
    #[error("failed to run {program}: {source}")]
    Spawn {
        /// program that failed to start
        program: String,
        /// underlying I/O error
        source: std::io::Error,
    },

    /// The toolkit exited unsuccessfully
    #[error("{program} {operation} failed with {status}")]
    Toolkit {
        /// program that was run
        program: String,
        /// toolkit subcommand, e.g. "req"
        operation: String,
        /// exit status reported by the child
        status: ExitStatus,
    },

    /// Any other filesystem error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Process exit code for this error.
    ///
    /// Toolkit failures propagate the child's own exit code; everything else exits with 1.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Toolkit { status, .. } => match status.code() {
                Some(code) if (1..=255).contains(&code) => code as u8,
                _ => 1,
            },
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_entropy_exits_with_one() {
        let e = Error::InsufficientEntropy {
            found: 2,
            required: 3,
        };
        assert_eq!(1, e.exit_code());
        assert_eq!("specify more than 3 files (found 2)", e.to_string());
    }

    #[cfg(unix)]
    #[test]
    fn toolkit_failure_propagates_exit_code() {
        use std::os::unix::process::ExitStatusExt;

        let e = Error::Toolkit {
            program: "openssl".to_string(),
            operation: "req".to_string(),
            status: ExitStatus::from_raw(3 << 8),
        };
        assert_eq!(3, e.exit_code());

        // killed by SIGKILL
        let e = Error::Toolkit {
            program: "openssl".to_string(),
            operation: "req".to_string(),
            status: ExitStatus::from_raw(9),
        };
        assert_eq!(1, e.exit_code());
    }
}
