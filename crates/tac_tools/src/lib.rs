//! # Tactics Development Tools
//!
//! Command-line tools for content authors:
//! - Map, effects and campaign validation
//! - Campaign graph inspection
//! - Registry listings

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod list;
pub mod validate;
