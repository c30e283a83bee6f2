//! CLI domain: parse, route, output, and presentation only.
//! No domain logic; a single route table dispatches to the library.

mod output;
mod parse;
mod presentation;
mod route;

pub use output::map_error;
pub use parse::{Cli, Commands, OverrideArgs};
pub use route::RunContext;
