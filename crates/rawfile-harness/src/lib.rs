//! End-to-end harness for rawfile streams.
//!
//! This crate provides:
//! - Mode inspection: show the flag word a mode string produces
//! - File commands (`cat`, `write`, `copy`) that move every byte through
//!   [`rawfile_core::FdStream`]
//! - JSON reports describing what each command did

#![forbid(unsafe_code)]

pub mod commands;
pub mod report;

pub use commands::{HarnessError, cat, copy, flags, write_text};
pub use report::{FlagsReport, TransferReport};
