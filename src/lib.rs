pub mod auth;
pub mod changelog;
pub mod cli;
pub mod cloud;
pub mod config;
pub mod errors;
pub mod ids;
pub mod layout;
pub mod lock;
pub mod model;
pub mod normalize;
pub mod ops;
pub mod publish;
pub mod rows;
pub mod rules;
pub mod server;
pub mod validate;
pub mod workbook;

pub use config::{CliArgs, RegistryConfig};
pub use lock::DocumentLock;
pub use model::{CellValue, Operation, OperationReport, RowError};
pub use ops::OperationContext;
pub use workbook::{MemoryWorkbook, Workbook, XlsxWorkbook};

use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Log to stderr, `info` unless `RUST_LOG` says otherwise.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    // A second initialisation (tests, embedding) keeps the first subscriber.
    let _ = tracing::subscriber::set_global_default(subscriber);
}
