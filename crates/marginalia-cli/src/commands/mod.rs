//! Command handlers

pub mod config;
pub mod parse;
pub mod sync;
