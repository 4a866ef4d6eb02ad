//! Interactive passphrase entry

use std::fmt;
use std::io;

use crate::error::{Error, Result};

/// Protects a key transiently when the user asks for no passphrase; removed again before the key
/// is used for anything else
pub const PLACEHOLDER_PASSPHRASE: &str = "csrgen-transient-passphrase";

/// Source of secrets typed without echo
pub trait SecretReader {
    /// Show `prompt` and read one line without echoing it
    fn read_secret(&mut self, prompt: &str) -> io::Result<String>;
}

/// Reads from the controlling terminal
#[derive(Debug, Default)]
pub struct TerminalReader;

impl SecretReader for TerminalReader {
    fn read_secret(&mut self, prompt: &str) -> io::Result<String> {
        rpassword::prompt_password(prompt)
    }
}

fn read(reader: &mut dyn SecretReader, prompt: &str) -> Result<String> {
    reader.read_secret(prompt).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => Error::PromptClosed,
        _ => Error::Io(e),
    })
}

/// Ask for a passphrase twice until both entries agree. The result may be empty.
pub fn prompt_passphrase(reader: &mut dyn SecretReader) -> Result<String> {
    loop {
        let password = read(reader, "Password: ")?;
        let check = read(reader, "Retype Password: ")?;
        if password == check {
            return Ok(password);
        }
        println!("Passwords do not match, try again.");
    }
}

/// Passphrase protecting the generated key
#[derive(Clone, PartialEq, Eq)]
pub enum KeyPassphrase {
    /// the user's own passphrase; the key stays encrypted
    Chosen(String),
    /// the user entered nothing; the key is generated under [`PLACEHOLDER_PASSPHRASE`] and
    /// stripped afterwards
    Placeholder,
}

impl KeyPassphrase {
    /// Interpret an agreed entry; empty means no passphrase
    pub fn from_entry(entry: String) -> Self {
        if entry.is_empty() {
            KeyPassphrase::Placeholder
        } else {
            KeyPassphrase::Chosen(entry)
        }
    }

    /// Value used while generating the key
    pub fn value(&self) -> &str {
        match self {
            KeyPassphrase::Chosen(p) => p,
            KeyPassphrase::Placeholder => PLACEHOLDER_PASSPHRASE,
        }
    }

    /// Whether the generated key must be re-encoded without encryption
    pub fn is_placeholder(&self) -> bool {
        matches!(self, KeyPassphrase::Placeholder)
    }

    /// Value needed to read the key once it is final; `None` when it is unencrypted
    pub fn unlock(&self) -> Option<&str> {
        match self {
            KeyPassphrase::Chosen(p) => Some(p),
            KeyPassphrase::Placeholder => None,
        }
    }
}

impl fmt::Debug for KeyPassphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPassphrase::Chosen(_) => f.write_str("Chosen(..)"),
            KeyPassphrase::Placeholder => f.write_str("Placeholder"),
        }
    }
}

/// Replays fixed entries; used by tests across the crate
#[cfg(test)]
pub struct ScriptedReader {
    /// entries not yet consumed
    pub entries: std::collections::VecDeque<String>,
    /// prompts shown so far
    pub prompts: Vec<String>,
}

#[cfg(test)]
impl ScriptedReader {
    /// Reader that answers with `entries` in order, then reports end of input
    pub fn new(entries: &[&str]) -> Self {
        Self {
            entries: entries.iter().map(|e| e.to_string()).collect(),
            prompts: vec![],
        }
    }
}

#[cfg(test)]
impl SecretReader for ScriptedReader {
    fn read_secret(&mut self, prompt: &str) -> io::Result<String> {
        self.prompts.push(prompt.to_string());
        self.entries
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no more input"))
    }
}
