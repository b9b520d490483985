//! HTTP request handlers.

pub mod accounts;
pub mod admin;
pub mod common;
pub mod content;
pub mod settings;

pub use accounts::*;
pub use admin::*;
pub use common::*;
pub use content::*;
pub use settings::*;
