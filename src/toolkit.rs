//! Invocation of the external openssl toolkit
//!
//! Each toolkit call is assembled with [`OpensslCommand`] and executed exactly once through a
//! [`Runner`]. Passphrases never appear in the argument list; they are referenced as
//! `env:VAR` and handed to the child through its environment only.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::process::{Command, Stdio};

use log::{debug, error};

use crate::error::{Error, Result};

/// Environment variable carrying the key passphrase to the toolkit
pub const KEY_PASS_VAR: &str = "CSRGEN_KEY_PASS";

/// Environment variable carrying the PKCS#12 export passphrase to the toolkit
pub const EXPORT_PASS_VAR: &str = "CSRGEN_EXPORT_PASS";

/// A single toolkit invocation under construction
#[derive(Clone)]
pub struct OpensslCommand {
    program: String,
    operation: String,
    args: Vec<OsString>,
    secrets: Vec<(&'static str, String)>,
}

impl OpensslCommand {
    /// Start a `<program> <operation>` invocation, e.g. `openssl req`
    pub fn new(program: &str, operation: &str) -> Self {
        Self {
            program: program.to_string(),
            operation: operation.to_string(),
            args: vec![],
            secrets: vec![],
        }
    }

    /// Append a bare argument
    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Append a flag/value pair
    pub fn opt<S: AsRef<OsStr>>(self, flag: &str, value: S) -> Self {
        self.arg(flag).arg(value)
    }

    /// Append a flag when `cond` holds
    pub fn flag_if(self, cond: bool, flag: &str) -> Self {
        if cond {
            self.arg(flag)
        } else {
            self
        }
    }

    /// Append a flag/value pair when `cond` holds
    pub fn opt_if<S: AsRef<OsStr>>(self, cond: bool, flag: &str, value: S) -> Self {
        if cond {
            self.opt(flag, value)
        } else {
            self
        }
    }

    /// Append a flag/value pair when a value is configured
    pub fn opt_some<S: AsRef<OsStr>>(self, flag: &str, value: Option<S>) -> Self {
        match value {
            Some(v) => self.opt(flag, v),
            None => self,
        }
    }

    /// Append `flag env:<var>` and export `value` as `var` to the child
    pub fn secret(mut self, flag: &str, var: &'static str, value: &str) -> Self {
        self.secrets.push((var, value.to_string()));
        self.opt(flag, format!("env:{}", var))
    }

    /// Append a secret when `value` is present
    pub fn secret_some(self, flag: &str, var: &'static str, value: Option<&str>) -> Self {
        match value {
            Some(v) => self.secret(flag, var, v),
            None => self,
        }
    }

    /// Printable command line; contains no secret values
    pub fn command_line(&self) -> String {
        let mut line = format!("{} {}", self.program, self.operation);
        for a in &self.args {
            line.push(' ');
            line.push_str(&a.to_string_lossy());
        }
        line
    }

    /// Execute once through `runner`
    pub fn run(&self, runner: &mut dyn Runner) -> Result<()> {
        runner.run(self)
    }
}

// accessors for asserting on recorded invocations
#[cfg(test)]
impl OpensslCommand {
    /// Executable name
    pub(crate) fn program(&self) -> &str {
        &self.program
    }

    /// Toolkit subcommand
    pub(crate) fn operation(&self) -> &str {
        &self.operation
    }

    /// Arguments following the subcommand
    pub(crate) fn args(&self) -> &[OsString] {
        &self.args
    }

    /// Value exported as `var`, if any
    pub(crate) fn secret_value(&self, var: &str) -> Option<&str> {
        self.secrets
            .iter()
            .find(|(k, _)| *k == var)
            .map(|(_, v)| v.as_str())
    }

    /// Value following `flag` in the argument list
    pub(crate) fn value_of(&self, flag: &str) -> Option<&OsStr> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(|v| v.as_os_str())
    }

    /// Whether `flag` appears in the argument list
    pub(crate) fn has(&self, flag: &str) -> bool {
        self.args.iter().any(|a| a == flag)
    }
}

impl fmt::Debug for OpensslCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let vars: Vec<&str> = self.secrets.iter().map(|(k, _)| *k).collect();
        f.debug_struct("OpensslCommand")
            .field("program", &self.program)
            .field("operation", &self.operation)
            .field("args", &self.args)
            .field("secrets", &vars)
            .finish()
    }
}

/// Capability to execute a toolkit invocation and report its exit status
pub trait Runner {
    /// Run `cmd` to completion; a non-zero exit is an error
    fn run(&mut self, cmd: &OpensslCommand) -> Result<()>;
}

/// Runs invocations as child processes
#[derive(Debug, Default)]
pub struct SystemRunner {
    /// stream the child's output instead of capturing it
    pub verbose: bool,
}

impl SystemRunner {
    /// Create a runner; `verbose` streams toolkit output to the terminal
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl Runner for SystemRunner {
    fn run(&mut self, cmd: &OpensslCommand) -> Result<()> {
        debug!("running {}", cmd.command_line());

        let mut child = Command::new(&cmd.program);
        child
            .arg(&cmd.operation)
            .args(&cmd.args)
            .stdin(Stdio::null());
        for (var, value) in &cmd.secrets {
            child.env(var, value);
        }

        let spawn_err = |source| Error::Spawn {
            program: cmd.program.clone(),
            source,
        };
        let status = if self.verbose {
            child.status().map_err(spawn_err)?
        } else {
            let output = child.output().map_err(spawn_err)?;
            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                for line in stderr.lines() {
                    error!("{}: {}", cmd.operation, line);
                }
            }
            output.status
        };

        if status.success() {
            Ok(())
        } else {
            Err(Error::Toolkit {
                program: cmd.program.clone(),
                operation: cmd.operation.clone(),
                status,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_accumulates_in_order() {
        let cmd = OpensslCommand::new("openssl", "req")
            .arg("-new")
            .flag_if(false, "-x509")
            .opt_if(false, "-days", "30")
            .opt("-subj", "/CN=example")
            .opt_some("-config", None::<&str>)
            .opt_some("-config", Some("openssl.cnf"))
            .secret_some("-passin", KEY_PASS_VAR, None);
        assert_eq!(
            "openssl req -new -subj /CN=example -config openssl.cnf",
            cmd.command_line()
        );
        assert_eq!(Some(OsStr::new("openssl.cnf")), cmd.value_of("-config"));
        assert!(!cmd.has("-passin"));
    }

    #[test]
    fn secrets_stay_out_of_arguments() {
        let cmd = OpensslCommand::new("openssl", "genrsa").secret("-passout", KEY_PASS_VAR, "hunter2");
        assert_eq!("openssl genrsa -passout env:CSRGEN_KEY_PASS", cmd.command_line());
        assert_eq!(Some("hunter2"), cmd.secret_value(KEY_PASS_VAR));
        assert!(!format!("{:?}", cmd).contains("hunter2"));
    }

    #[cfg(unix)]
    #[test]
    fn system_runner_reports_exit_status() {
        let mut runner = SystemRunner::new(false);
        OpensslCommand::new("sh", "-c")
            .arg("exit 0")
            .run(&mut runner)
            .unwrap();

        let err = OpensslCommand::new("sh", "-c")
            .arg("exit 3")
            .run(&mut runner)
            .unwrap_err();
        assert_eq!(3, err.exit_code());
    }

    #[cfg(unix)]
    #[test]
    fn system_runner_exports_secrets() {
        let mut runner = SystemRunner::new(false);
        OpensslCommand::new("sh", "-c")
            .arg("test \"$CSRGEN_KEY_PASS\" = secret")
            .secret("-passin", KEY_PASS_VAR, "secret")
            .run(&mut runner)
            .unwrap();
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let mut runner = SystemRunner::new(false);
        let err = OpensslCommand::new("csrgen-no-such-program", "req")
            .run(&mut runner)
            .unwrap_err();
        assert!(matches!(err, Error::Spawn { .. }));
    }
}
