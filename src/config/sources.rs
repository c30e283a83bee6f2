//! Override sources, in increasing precedence.

pub mod environment;
pub mod file;
