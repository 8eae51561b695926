//! Core modules shared by every command.
//!
//! Configuration, logging, errors, output rendering, repository discovery,
//! frontmatter handling, git plumbing and the validation gates live here.

pub mod assets;
pub mod config;
pub mod error;
pub mod frontmatter;
pub mod git;
pub mod logging;
pub mod output;
pub mod validate;
pub mod workspace;
