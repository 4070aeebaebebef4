//! Parent/child measures sharing one block of values.
//!
//! A measure without a `ParentName` option becomes a parent: it registers a
//! record under its own name and fills the record's fields from `ValueA`,
//! `ValueB` and `ValueC` on every reload. Any other measure in the same skin
//! names that parent and exposes one of its fields, picked by `Type`.
//!
//! ```toml
//! [[measure]]
//! name = "mParent"
//! plugin = "ParentChild"
//! ValueA = 111
//! ValueB = 222
//! ValueC = 333
//! Type = "A"
//!
//! [[measure]]
//! name = "mChild1"
//! plugin = "ParentChild"
//! ParentName = "mParent"
//! Type = "B"
//! ```
//!
//! The link is resolved once, at creation, and never revisited.

use crate::error::BindingError;
use crate::host::{LogLevel, MeasureHost, ScopeToken};
use crate::plugin::Measure;
use crate::plugin::registry::{
    DependentId, ParentKey, ParentRecord, ParentRegistry, SharedRegistry,
};

/// Which parent field a measure exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selector {
    #[default]
    A,
    B,
    C,
}

impl Selector {
    pub fn parse(value: &str) -> Result<Self, BindingError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "a" => Ok(Selector::A),
            "b" => Ok(Selector::B),
            "c" => Ok(Selector::C),
            _ => Err(BindingError::InvalidSelector {
                value: value.to_string(),
            }),
        }
    }

    fn index(self) -> usize {
        match self {
            Selector::A => 0,
            Selector::B => 1,
            Selector::C => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingState {
    Unbound,
    BoundAsOwner(ParentKey),
    BoundAsReader(ParentKey),
    Unresolved,
}

impl BindingState {
    fn parent(&self) -> Option<ParentKey> {
        match self {
            BindingState::BoundAsOwner(key) | BindingState::BoundAsReader(key) => Some(*key),
            BindingState::Unbound | BindingState::Unresolved => None,
        }
    }
}

#[derive(Debug)]
pub struct ParentChildMeasure {
    id: DependentId,
    registry: SharedRegistry,
    state: BindingState,
    selector: Selector,
}

impl ParentChildMeasure {
    /// Create a measure and resolve its binding against `registry`.
    pub fn create(registry: SharedRegistry, host: &dyn MeasureHost) -> Self {
        let id = ParentRegistry::lock(&registry).next_dependent_id();
        let mut measure = Self {
            id,
            registry,
            state: BindingState::Unbound,
            selector: Selector::default(),
        };
        measure.bind(host);
        measure
    }

    pub fn state(&self) -> BindingState {
        self.state
    }

    pub fn selector(&self) -> Selector {
        self.selector
    }

    pub fn is_owner(&self) -> bool {
        matches!(self.state, BindingState::BoundAsOwner(_))
    }

    /// Re-read options. Parent fields are only written by the owner.
    pub fn configure(&mut self, host: &dyn MeasureHost) {
        match Selector::parse(&host.read_string("Type", "")) {
            Ok(selector) => self.selector = selector,
            Err(err) => host.log(LogLevel::Warning, &err.to_string()),
        }

        if let BindingState::BoundAsOwner(key) = self.state {
            let values = [
                host.read_int("ValueA", 0),
                host.read_int("ValueB", 0),
                host.read_int("ValueC", 0),
            ];
            ParentRegistry::lock(&self.registry).set_values(key, self.id, values);
        }
    }

    /// The selected parent field, or 0 when unbound or the parent is gone.
    pub fn value(&self) -> f64 {
        let Some(key) = self.state.parent() else {
            return 0.0;
        };

        ParentRegistry::lock(&self.registry)
            .values(key)
            .map(|values| f64::from(values[self.selector.index()]))
            .unwrap_or(0.0)
    }

    fn bind(&mut self, host: &dyn MeasureHost) {
        if self.state != BindingState::Unbound {
            return;
        }

        let parent_name = host.read_string("ParentName", "");
        let scope = host.scope();
        let result = {
            let mut registry = ParentRegistry::lock(&self.registry);
            resolve(&mut registry, self.id, scope, &host.measure_name(), parent_name.trim())
        };

        self.state = match result {
            Ok(state) => state,
            Err(err) => {
                host.log(LogLevel::Error, &err.to_string());
                BindingState::Unresolved
            }
        };
        tracing::debug!(
            measure = %host.measure_name(),
            %scope,
            state = ?self.state,
            "parent/child binding resolved"
        );
    }
}

fn resolve(
    registry: &mut ParentRegistry,
    id: DependentId,
    scope: ScopeToken,
    own_name: &str,
    parent_name: &str,
) -> Result<BindingState, BindingError> {
    if parent_name.is_empty() {
        let record = ParentRecord::new(scope, own_name, id);
        return registry.register(record).map(BindingState::BoundAsOwner);
    }

    registry
        .lookup(scope, parent_name)
        .map(BindingState::BoundAsReader)
        .ok_or_else(|| BindingError::UnresolvedBinding {
            scope,
            name: parent_name.to_string(),
        })
}

impl Drop for ParentChildMeasure {
    fn drop(&mut self) {
        if let BindingState::BoundAsOwner(key) = self.state {
            let removed = ParentRegistry::lock(&self.registry).remove_owned(key, self.id);
            if let Some(record) = removed {
                tracing::debug!(parent = %record.name, scope = %record.scope, "parent released");
            }
        }
    }
}

impl Measure for ParentChildMeasure {
    fn reload(&mut self, host: &dyn MeasureHost) {
        self.configure(host);
    }

    fn update(&mut self, _host: &dyn MeasureHost) -> f64 {
        self.value()
    }
}
