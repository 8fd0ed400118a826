//! Input parsing, localized message tables, and the menu state machine.

pub mod engine;
pub mod input;
pub mod text;

pub use engine::{EngineSettings, MenuEngine, Reply, UssdRequest};
pub use input::{extract_token, ParseRule, EXIT_TOKEN};
