//! Separator module: supervises the external stem-separation tool.
//!
//! The tool runs as a child process. Its stdout and stderr are merged into a
//! single stream of text lines, delivered while the process is still running,
//! which is the only progress channel the tool offers.
//!
//! # Example
//!
//! ```ignore
//! use karaoke_core::separator::{DemucsSeparator, Separator, SeparatorConfig};
//!
//! let separator = DemucsSeparator::new(SeparatorConfig::default());
//! separator.validate().await?;
//!
//! let mut process = separator.start(&input_path, &output_dir).await?;
//! while let Some(line) = process.next_line().await {
//!     println!("{}", line);
//! }
//! let outcome = process.wait().await?;
//! assert!(outcome.success());
//! ```

mod config;
mod demucs;
mod error;
mod traits;
mod types;

pub use config::SeparatorConfig;
pub use demucs::{DemucsProcess, DemucsSeparator};
pub use error::SeparatorError;
pub use traits::{SeparationProcess, Separator};
pub use types::ExitOutcome;
