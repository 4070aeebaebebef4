pub mod data_handling;
pub mod manager;
pub mod parent_child;
pub mod registry;
pub mod rm_execute;
pub mod runtime;
pub mod section_variables;
pub mod system_version;

#[cfg(test)]
pub(crate) mod testing;

pub use manager::PluginManager;
pub use registry::{ParentRegistry, SharedRegistry};
pub use runtime::{MeasureHandle, SkinRuntime};

use crate::host::MeasureHost;

use data_handling::CounterMeasure;
use parent_child::ParentChildMeasure;
use rm_execute::TimerMeasure;
use section_variables::CaseMeasure;
use system_version::SystemVersionMeasure;

/// Lifecycle every measure plugin implements. Creation is plugin specific;
/// teardown happens on drop, with [`Measure::finalize`] run just before.
/// Measures are `Send` so a skin can be driven from its own thread.
pub trait Measure: Send {
    /// Re-read options. Called once after creation and on every skin reload.
    fn reload(&mut self, host: &dyn MeasureHost);

    fn update(&mut self, host: &dyn MeasureHost) -> f64;

    /// String value, for measures whose output is not a number.
    fn string_value(&self, _host: &dyn MeasureHost) -> Option<String> {
        None
    }

    /// Inline call such as `[&mString:ToUpper(text)]`.
    fn section_call(&mut self, _function: &str, _args: &[String]) -> Option<String> {
        None
    }

    fn finalize(&mut self, _host: &dyn MeasureHost) {}
}

/// Plugins known to the runtime, matched by the `plugin` key of a measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluginKind {
    ParentChild,
    DataHandling,
    RmExecute,
    SectionVariables,
    SystemVersion,
    Empty,
}

impl PluginKind {
    pub const ALL: [PluginKind; 6] = [
        PluginKind::ParentChild,
        PluginKind::DataHandling,
        PluginKind::RmExecute,
        PluginKind::SectionVariables,
        PluginKind::SystemVersion,
        PluginKind::Empty,
    ];

    /// Case-insensitive; a trailing `.dll` is ignored.
    pub fn parse(value: &str) -> Option<Self> {
        let lower = value.trim().to_ascii_lowercase();
        let stem = lower.strip_suffix(".dll").unwrap_or(&lower);

        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(stem))
    }

    pub fn name(&self) -> &'static str {
        match self {
            PluginKind::ParentChild => "ParentChild",
            PluginKind::DataHandling => "DataHandling",
            PluginKind::RmExecute => "RmExecute",
            PluginKind::SectionVariables => "SectionVariables",
            PluginKind::SystemVersion => "SystemVersion",
            PluginKind::Empty => "Empty",
        }
    }

    /// Construct a measure of this kind. Only parent/child measures touch
    /// the shared registry.
    pub fn create(self, registry: &SharedRegistry, host: &dyn MeasureHost) -> Box<dyn Measure> {
        match self {
            PluginKind::ParentChild => Box::new(ParentChildMeasure::create(registry.clone(), host)),
            PluginKind::DataHandling => Box::new(CounterMeasure::default()),
            PluginKind::RmExecute => Box::new(TimerMeasure::new()),
            PluginKind::SectionVariables => Box::new(CaseMeasure::default()),
            PluginKind::SystemVersion => Box::new(SystemVersionMeasure::default()),
            PluginKind::Empty => Box::new(EmptyMeasure),
        }
    }
}

/// Blank measure; a starting point that always reads 0.
#[derive(Debug, Default)]
pub struct EmptyMeasure;

impl Measure for EmptyMeasure {
    fn reload(&mut self, _host: &dyn MeasureHost) {}

    fn update(&mut self, _host: &dyn MeasureHost) -> f64 {
        0.0
    }
}
