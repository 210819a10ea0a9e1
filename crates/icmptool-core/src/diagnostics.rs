use std::fmt::{Debug, Formatter};
use std::ops::Deref;
use std::sync::Arc;
use tracing::Level;

/// A sink for leveled diagnostic messages.
///
/// Probing reports operational events (socket fallback, send failures,
/// undecodable replies and the like) to a `Diagnostics` implementation
/// supplied at construction time rather than to a global logger.
///
/// # Example
///
/// ```
/// use icmptool_core::{Diagnostics, DiagnosticsHandle};
/// use tracing::Level;
///
/// struct Stderr;
///
/// impl Diagnostics for Stderr {
///     fn log(&self, level: Level, message: &str) {
///         eprintln!("[{level}] {message}");
///     }
/// }
///
/// let diagnostics = DiagnosticsHandle::new(Stderr);
/// diagnostics.warn("raw socket unavailable");
/// ```
pub trait Diagnostics: Send + Sync {
    /// Record a message at the given level.
    fn log(&self, level: Level, message: &str);

    fn error(&self, message: &str) {
        self.log(Level::ERROR, message);
    }

    fn warn(&self, message: &str) {
        self.log(Level::WARN, message);
    }

    fn info(&self, message: &str) {
        self.log(Level::INFO, message);
    }

    fn debug(&self, message: &str) {
        self.log(Level::DEBUG, message);
    }
}

/// Discards all messages.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDiagnostics;

impl Diagnostics for NoopDiagnostics {
    fn log(&self, _level: Level, _message: &str) {}
}

/// Forwards messages as `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn log(&self, level: Level, message: &str) {
        if level == Level::ERROR {
            tracing::error!("{message}");
        } else if level == Level::WARN {
            tracing::warn!("{message}");
        } else if level == Level::INFO {
            tracing::info!("{message}");
        } else if level == Level::DEBUG {
            tracing::debug!("{message}");
        } else {
            tracing::trace!("{message}");
        }
    }
}

/// A cheaply cloneable, shared [`Diagnostics`] sink.
///
/// Defaults to [`NoopDiagnostics`].
#[derive(Clone)]
pub struct DiagnosticsHandle(Arc<dyn Diagnostics>);

impl DiagnosticsHandle {
    pub fn new(diagnostics: impl Diagnostics + 'static) -> Self {
        Self(Arc::new(diagnostics))
    }
}

impl Default for DiagnosticsHandle {
    fn default() -> Self {
        Self::new(NoopDiagnostics)
    }
}

impl Deref for DiagnosticsHandle {
    type Target = dyn Diagnostics;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

impl Debug for DiagnosticsHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("DiagnosticsHandle")
    }
}
