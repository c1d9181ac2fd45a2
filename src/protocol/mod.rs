//! Engine input protocol.
//!
//! Two dialects exist: the unified line-command dialect read from standard
//! input, and the settings-file dialect of older revisions.

pub mod command;
pub mod script;

pub use command::{parse_engine_command, EngineCommand, SearchMethod};
pub use script::{ProtocolScript, ScriptBuilder, SETTINGS_FLAG};
