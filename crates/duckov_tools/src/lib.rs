//! # Duckov Development Tools
//!
//! Command-line helpers for content authors:
//! - Content pack validation
//! - Catalog listing as JSON
//! - Save file inspection

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod catalog;
pub mod inspect;
pub mod validate;
