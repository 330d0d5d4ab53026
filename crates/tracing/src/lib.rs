//! Tracing subscriber setup for the cvm binaries.
//!
//! A [`CvmTracer`] is assembled from one stdout layer and an optional file layer. Each layer
//! carries its own [`LayerInfo`], which selects the output [`LogFormat`], the default verbosity
//! directive and any additional `target=level` filters. Calling [`Tracer::init`] installs the
//! layers as the global subscriber.
//!
//! ```no_run
//! use cvm_tracing::{CvmTracer, LayerInfo, LogFormat, Tracer};
//!
//! let tracer = CvmTracer::new().with_stdout(LayerInfo::new(
//!     LogFormat::Terminal,
//!     "info".to_string(),
//!     String::new(),
//!     Some("always".to_string()),
//! ));
//! let _guard = tracer.init().expect("failed to initialise tracing");
//! ```

mod formatter;
mod layers;

pub use formatter::LogFormat;
pub use layers::{FileInfo, Layers};
pub use tracing_appender::non_blocking::WorkerGuard as FileWorkerGuard;
pub use tracing_subscriber;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// A tracer that can be installed as the global tracing subscriber.
pub trait Tracer {
    /// Installs the tracer. The returned guard, if any, must be held for as long as file logs
    /// should be flushed.
    fn init(self) -> eyre::Result<Option<FileWorkerGuard>>;
}

/// Configuration for a single logging layer.
#[derive(Debug, Clone)]
pub struct LayerInfo {
    format: LogFormat,
    default_directive: String,
    filters: String,
    color: Option<String>,
}

impl LayerInfo {
    /// Creates a new [`LayerInfo`].
    ///
    /// `default_directive` is applied when `RUST_LOG` is unset; `filters` is a comma separated
    /// list of extra directives; `color` is one of `always`, `auto` or `never`.
    pub fn new(
        format: LogFormat,
        default_directive: String,
        filters: String,
        color: Option<String>,
    ) -> Self {
        Self { format, default_directive, filters, color }
    }
}

impl Default for LayerInfo {
    fn default() -> Self {
        Self {
            format: LogFormat::Terminal,
            default_directive: "info".to_string(),
            filters: String::new(),
            color: Some("always".to_string()),
        }
    }
}

/// Tracer for the cvm binaries: a stdout layer plus an optional file layer.
#[derive(Debug, Clone, Default)]
pub struct CvmTracer {
    stdout: LayerInfo,
    file: Option<(LayerInfo, FileInfo)>,
}

impl CvmTracer {
    /// Creates a tracer with the default stdout layer and no file layer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the stdout layer configuration.
    pub fn with_stdout(mut self, config: LayerInfo) -> Self {
        self.stdout = config;
        self
    }

    /// Adds a file layer writing to `file_info`.
    pub fn with_file(mut self, config: LayerInfo, file_info: FileInfo) -> Self {
        self.file = Some((config, file_info));
        self
    }
}

impl Tracer for CvmTracer {
    fn init(self) -> eyre::Result<Option<FileWorkerGuard>> {
        let mut layers = Layers::new();

        layers.stdout(
            self.stdout.format,
            self.stdout.default_directive.parse()?,
            &self.stdout.filters,
            self.stdout.color,
        )?;

        let file_guard = match self.file {
            Some((config, file_info)) => {
                Some(layers.file(config.format, &config.filters, file_info)?)
            }
            None => None,
        };

        tracing_subscriber::registry().with(layers.into_inner()).try_init()?;
        Ok(file_guard)
    }
}
