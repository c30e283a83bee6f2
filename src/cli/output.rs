//! CLI output: error mapping from domain errors to the CLI surface.

use crate::error::{ApiError, StoreError};

/// Map domain errors to a message for stderr, with a hint where one helps.
pub fn map_error(e: &ApiError) -> String {
    match e {
        ApiError::Store(StoreError::NotFound(cluster)) => format!(
            "{}\nhint: run `kspawn -c {} resolve --save` to create it",
            e, cluster
        ),
        _ => e.to_string(),
    }
}
