//! Overrides file source: a partial configuration in any format the config crate reads.

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::File;
use std::path::Path;

/// Add the overrides file to builder. A named file must exist.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    path: Option<&Path>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    match path {
        Some(path) => Ok(builder.add_source(File::from(path).required(true))),
        None => Ok(builder),
    }
}
