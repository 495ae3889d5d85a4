//! Command Line Interface (CLI) arguments.

use clap::Parser;

/// Surface query service command line interface
#[derive(Clone, Debug, Parser)]
pub struct CommandLineArgs {
    /// The IP address on which the service should listen
    #[arg(long, default_value = "0.0.0.0", env = "SURFACE_QUERY_HOST")]
    pub host: String,
    /// The port to which the service should bind
    #[arg(long, default_value_t = 8080, env = "SURFACE_QUERY_PORT")]
    pub port: u16,
    /// Flag indicating whether HTTPS should be used
    #[arg(long, default_value_t = false, env = "SURFACE_QUERY_HTTPS")]
    pub https: bool,
    /// Path to the certificate file to be used for HTTPS encryption
    #[arg(
        long,
        default_value = "~/.config/surface-query/certs/cert.pem",
        env = "SURFACE_QUERY_CERT_FILE"
    )]
    pub cert_file: String,
    /// Path to the key file to be used for HTTPS encryption
    #[arg(
        long,
        default_value = "~/.config/surface-query/certs/key.pem",
        env = "SURFACE_QUERY_KEY_FILE"
    )]
    pub key_file: String,
    /// Maximum time in seconds to wait for operations to complete upon
    /// receiving `ctrl+c` signal.
    #[arg(long, default_value_t = 60, env = "SURFACE_QUERY_SHUTDOWN_TIMEOUT")]
    pub graceful_shutdown_timeout: u64,
    /// Whether to enable sending traces to Jaeger.
    #[arg(long, default_value_t = false, env = "SURFACE_QUERY_ENABLE_JAEGER")]
    pub enable_jaeger: bool,
    /// Blob fetch connection limit. Default is no limit.
    #[arg(long, env = "SURFACE_QUERY_FETCH_CONNECTION_LIMIT")]
    pub fetch_connection_limit: Option<usize>,
    /// Memory limit in bytes. Default is no limit.
    #[arg(long, env = "SURFACE_QUERY_MEMORY_LIMIT")]
    pub memory_limit: Option<usize>,
    /// Thread limit for CPU-bound tasks. Default is one less than the number
    /// of CPUs.
    #[arg(long, env = "SURFACE_QUERY_THREAD_LIMIT")]
    pub thread_limit: Option<usize>,
}

/// Returns parsed command line arguments.
pub fn parse() -> CommandLineArgs {
    CommandLineArgs::parse()
}
