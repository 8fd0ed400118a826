//! USSD BMI calculator menu service.
//!
//! This library implements a session-oriented USSD menu: each keystroke from
//! the gateway arrives as a new HTTP request carrying the full accumulated
//! dialed string, and the server replies with prompt text behind a `CON`
//! (dialog continues) or `END` (dialog terminates) marker.
//!
//! # Dialog
//!
//! ```text
//! Welcome ──1/2──▶ Age ──▶ Weight ──▶ Height ──▶ Result ──1──▶ Tips
//!                                                   │
//!                                                   └──2──▶ History
//! ```
//!
//! "0" walks back one menu, "00" ends the dialog from anywhere.
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`bmi`]: BMI arithmetic and classification
//! - [`session`]: Session state and in-memory session store
//! - [`menu`]: Input parsing, localized texts, and the menu state machine
//! - [`storage`]: Postgres-backed persistence for records and session metadata
//! - [`api`]: HTTP endpoints for the gateway, health, and shutdown
//! - [`utils`]: Utility functions

pub mod api;
pub mod bmi;
pub mod config;
pub mod error;
pub mod menu;
pub mod metrics;
pub mod session;
pub mod storage;
pub mod utils;

pub use config::Config;
pub use error::{Result, UssdError};
