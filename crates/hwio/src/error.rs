use core::fmt;

use derive_more::{Display, Error, From};

use crate::category::IoCategory;
use crate::native::NativeError;

pub type Result<T> = core::result::Result<T, Error>;

/// Errors surfaced by the framework.
///
/// Registry and extension errors are programming errors and are returned to
/// the caller as-is. [`Error::Io`] carries the native collaborator's code and
/// message unchanged.
#[derive(Debug, Display, From, Error)]
pub enum Error {
    #[display("I/O instance [{id}] already exists")]
    AlreadyExists { id: String },
    #[display("I/O instance [{id}] not found")]
    NotFound { id: String },
    #[display("I/O instance [{id}] is closed")]
    Closed { id: String },
    #[display("I/O instance [{id}] is {actual}, requested {expected}")]
    TypeMismatch { id: String, expected: IoCategory, actual: IoCategory },
    #[display("no provider available for {category}")]
    ProviderUnavailable { category: IoCategory },
    #[display(
        "platform not found: {}",
        id.as_deref().unwrap_or("<auto-detect>")
    )]
    PlatformNotFound { id: Option<String> },
    #[display("platform [{id}] is already active")]
    AlreadyActivated { id: String },
    #[display("unable to load plugin [{plugin}]: {reason}")]
    ExtensionLoad { plugin: String, reason: String },
    #[display("plugin [{plugin}] failed to shut down: {reason}")]
    PluginShutdown { plugin: String, reason: String },
    #[display("invalid I/O id {id:?}")]
    InvalidId { id: String },
    #[display("invalid configuration: {reason}")]
    InvalidConfig { reason: String },
    #[display("context has been shut down")]
    ShutDown,
    #[display("shared bus failure: {reason}")]
    Bus { reason: String },

    // External
    #[from]
    Io(NativeError),
    #[from]
    Json(serde_json::Error),
}

impl From<bus_manager::BusError<NativeError>> for Error {
    fn from(value: bus_manager::BusError<NativeError>) -> Self {
        match value {
            bus_manager::BusError::FactoryError(e) => Error::Io(e),
            other => Error::Bus { reason: other.to_string() },
        }
    }
}

/// One plugin that could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginFailure {
    pub plugin: String,
    pub reason: String,
}

/// Aggregated plugin load failures. Other plugins still loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
pub struct ExtensionLoadReport {
    pub failures: Vec<PluginFailure>,
}

impl ExtensionLoadReport {
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub(crate) fn push(&mut self, plugin: &str, err: Error) {
        let reason = match err {
            Error::ExtensionLoad { reason, .. } => reason,
            other => other.to_string(),
        };
        self.failures.push(PluginFailure { plugin: plugin.to_owned(), reason });
    }
}

impl fmt::Display for ExtensionLoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} plugin(s) failed to load", self.failures.len())?;
        for failure in &self.failures {
            write!(f, "; [{}] {}", failure.plugin, failure.reason)?;
        }
        Ok(())
    }
}

/// Everything that went wrong while shutting a context down.
///
/// Shutdown keeps going past individual failures, so this lists each of them
/// together with the instance or plugin it came from.
#[derive(Debug, Default, Error)]
pub struct ShutdownReport {
    pub failures: Vec<(String, Error)>,
}

impl ShutdownReport {
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for ShutdownReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failure(s) during shutdown", self.failures.len())?;
        for (target, err) in &self.failures {
            write!(f, "; [{target}] {err}")?;
        }
        Ok(())
    }
}
