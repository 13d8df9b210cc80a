use thiserror::Error;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt};

#[derive(Debug, Error)]
pub enum TracerError {
    #[error("Global tracing subscriber already set: {0}")]
    AlreadySet(#[from] tracing::subscriber::SetGlobalDefaultError),
}

pub struct TracerOptions {
    /// Level used when `RUST_LOG` does not specify one.
    pub default_level: LevelFilter,
    pub ansi: bool,
}

impl Default for TracerOptions {
    fn default() -> Self {
        Self {
            default_level: LevelFilter::INFO,
            ansi: true,
        }
    }
}

/// This object initialises the stdout tracer, given a TracerOptions struct.
/// It should be created once at the start of each component.
pub struct TracerEngine {
    default_level: LevelFilter,
}

impl TracerEngine {
    /// Initialises the stdout tracer for the component
    /// #Arguments
    /// * `options` - The caller-specified instance of TracerOptions.
    /// #Returns
    /// An instance of TracerEngine, or an error if a global subscriber is already installed.
    pub fn new(options: TracerOptions) -> Result<Self, TracerError> {
        let stdout_tracer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stdout)
            .with_ansi(options.ansi);

        // This filter is applied to the stdout tracer
        let log_filter = EnvFilter::builder()
            .with_default_directive(options.default_level.into())
            .from_env_lossy();

        let subscriber =
            tracing_subscriber::Registry::default().with(stdout_tracer.with_filter(log_filter));

        tracing::subscriber::set_global_default(subscriber)?;

        Ok(Self {
            default_level: options.default_level,
        })
    }

    pub fn default_level(&self) -> LevelFilter {
        self.default_level
    }
}
