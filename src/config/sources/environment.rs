//! Environment source: KSPAWN_<FIELD>, with `__` between nested keys
//! (e.g. KSPAWN_RUNTIME_CONFIG__ENDPOINT).

use crate::config::EnvSource;
use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::Environment;

pub const ENV_PREFIX: &str = "KSPAWN";

/// Add environment overrides to builder.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    source: &EnvSource,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let environment = Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true);

    let environment = match source {
        EnvSource::Process => environment,
        EnvSource::Vars(vars) => environment.source(Some(vars.clone())),
        EnvSource::Disabled => return Ok(builder),
    };

    Ok(builder.add_source(environment))
}
