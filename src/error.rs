// src/error.rs
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures when registering capabilities. Probing and synthesis never fail.
#[derive(Debug, Error)]
pub enum Error {
    #[error("`{type_name}` has no observable identity; only named containers and scalars can carry capabilities")]
    Unidentifiable { type_name: &'static str },

    #[error("cases of `{type_name}` could not be turned into labels")]
    CaseLabels {
        type_name: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("placeholder for `{type_name}` could not be serialized")]
    Placeholder {
        type_name: &'static str,
        #[source]
        source: serde_json::Error,
    },
}
