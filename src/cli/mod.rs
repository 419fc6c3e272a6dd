//! CLI support for the `avault` binary.

pub mod commands;
