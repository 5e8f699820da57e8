//! Multi-tenant clinic management backend.
//!
//! Consultas move through a small lifecycle (`agendada` to `finalizada` or
//! `cancelada`); finalizing one settles its billable services in USD and VES
//! and feeds the finance report. Every row belongs to a clinic, and the clinic
//! is always taken from the caller's token.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod services;
pub mod state;

pub use error::{Error, Result};
