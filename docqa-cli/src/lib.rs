//! # docqa-cli
//!
//! The `docqa` command: ingest documents into a vector collection and ask
//! questions about them, configured from the environment (and `.env`).
//!
//! ```text
//! docqa ingest --text-dir data/text_files --pdf-dir data/pdf --url https://example.com/post
//! docqa ask "What is an embedding?" --k 3
//! docqa chat
//! docqa drop
//! ```

pub mod backend;
pub mod cli;
pub mod render;
pub mod repl;
pub mod settings;
pub mod telemetry;

pub use cli::{Cli, Command};
pub use settings::Settings;
