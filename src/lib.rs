//! Shared plumbing for the job binaries.

pub mod cli;
