pub mod aggregate;
pub mod args;
pub mod compare;
pub mod context;
pub mod engine;
pub mod entry;
pub mod error;
pub mod json;
pub mod model;
pub mod modes;
pub mod progress;
pub mod report;
pub mod settings;
pub mod util;
pub mod walker;
