use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::host::ScopeToken;

/// Conditions raised while binding a measure to its parent. None of them
/// are fatal: the affected measure degrades to a default value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    #[error("Type={value} not valid")]
    InvalidSelector { value: String },

    #[error("ParentName={name} not valid in {scope}")]
    UnresolvedBinding { scope: ScopeToken, name: String },

    #[error("parent {name} is already registered in {scope}")]
    DuplicateName { scope: ScopeToken, name: String },
}

/// Failures of the host runner: reading skins, settings and config files.
#[derive(Debug, Error)]
pub enum SkinError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("{}: {source}", path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: toml::ser::Error,
    },

    #[error("measure {measure}: unknown plugin {plugin}")]
    UnknownPlugin { measure: String, plugin: String },

    #[error("measure {name} is defined more than once")]
    DuplicateMeasure { name: String },
}
