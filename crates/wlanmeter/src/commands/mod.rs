//! Command handlers, one module per top-level action.

pub mod config_cmd;
pub mod measure;
