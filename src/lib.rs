//! Skin measure plugins and the runner that hosts them.
//!
//! The interesting part is [`plugin::parent_child`]: measures that share one
//! block of values through a scoped [`plugin::registry::ParentRegistry`].
//! The other plugins are thin wrappers over [`host::MeasureHost`].

pub mod app;
pub mod error;
pub mod host;
pub mod model;
pub mod msg;
pub mod plugin;

pub use error::{BindingError, SkinError};
pub use host::{LogLevel, MeasureHost, OsVersion, ScopeToken};
pub use plugin::{Measure, MeasureHandle, ParentRegistry, PluginKind, PluginManager, SkinRuntime};
