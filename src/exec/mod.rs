// src/exec/mod.rs

//! Command execution layer.
//!
//! Unit phases never spawn processes themselves; they hand a
//! [`CommandRequest`] to a [`CommandRunner`]. Production code uses
//! [`ShellRunner`], tests swap in a recording fake.

pub mod runner;
pub mod shell;

pub use runner::{CommandFuture, CommandRequest, CommandRunner};
pub use shell::ShellRunner;
