pub mod agreement_file;
#[cfg(feature = "cli")]
pub mod cli;

pub use agreement_file::{AgreementFile, SourceConfig};
#[cfg(feature = "cli")]
pub use cli::{CliConfig, OutputFormat};
