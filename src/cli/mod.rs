//! Command implementations for the `kstate` binary.

pub mod commands;
