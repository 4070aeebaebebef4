use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::sync::{Arc, Barrier};
use std::thread;

use skinmeasures::host::SettingsStore;
use skinmeasures::plugin::SharedRegistry;
use skinmeasures::plugin::parent_child::{BindingState, ParentChildMeasure};
use skinmeasures::{LogLevel, MeasureHost, OsVersion, ParentRegistry, PluginManager, ScopeToken};
use tempfile::TempDir;

struct TestHost {
    scope: ScopeToken,
    name: String,
    options: HashMap<String, String>,
    logs: RefCell<Vec<(LogLevel, String)>>,
}

impl TestHost {
    fn new(scope: u64, name: &str, options: &[(&str, &str)]) -> Self {
        Self {
            scope: ScopeToken::new(scope),
            name: name.to_string(),
            options: options
                .iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), v.to_string()))
                .collect(),
            logs: RefCell::new(Vec::new()),
        }
    }
}

impl MeasureHost for TestHost {
    fn read_string(&self, option: &str, default: &str) -> String {
        self.options
            .get(&option.to_ascii_lowercase())
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }

    fn read_int(&self, option: &str, default: i32) -> i32 {
        self.options
            .get(&option.to_ascii_lowercase())
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn scope(&self) -> ScopeToken {
        self.scope
    }

    fn measure_name(&self) -> String {
        self.name.clone()
    }

    fn log(&self, level: LogLevel, message: &str) {
        self.logs.borrow_mut().push((level, message.to_string()));
    }

    fn execute(&self, _command: &str) {}

    fn read_setting(&self, _section: &str, _key: &str) -> Option<String> {
        None
    }

    fn write_setting(&self, _section: &str, _key: &str, _value: &str) {}

    fn os_version(&self) -> Option<OsVersion> {
        None
    }
}

fn owner_host() -> TestHost {
    TestHost::new(
        1,
        "P",
        &[("ValueA", "111"), ("ValueB", "222"), ("ValueC", "333")],
    )
}

fn create(registry: &SharedRegistry, host: &TestHost) -> ParentChildMeasure {
    let mut measure = ParentChildMeasure::create(registry.clone(), host);
    measure.configure(host);
    measure
}

#[test]
fn readers_then_owner_teardown() {
    let registry = ParentRegistry::shared();
    let owner = create(&registry, &owner_host());
    let reader_a = create(&registry, &TestHost::new(1, "ra", &[("ParentName", "P"), ("Type", "A")]));
    let reader_c = create(&registry, &TestHost::new(1, "rc", &[("ParentName", "p"), ("Type", "c")]));

    assert_eq!(reader_a.value(), 111.0);
    assert_eq!(reader_c.value(), 333.0);

    drop(reader_a);
    drop(reader_c);
    assert_eq!(ParentRegistry::lock(&registry).len(), 1);
    drop(owner);
    assert!(ParentRegistry::lock(&registry).is_empty());
}

#[test]
fn owner_teardown_first() {
    let registry = ParentRegistry::shared();
    let owner = create(&registry, &owner_host());
    let reader_a = create(&registry, &TestHost::new(1, "ra", &[("ParentName", "P"), ("Type", "A")]));
    let reader_c = create(&registry, &TestHost::new(1, "rc", &[("ParentName", "P"), ("Type", "C")]));

    let before = (reader_a.value(), reader_c.value());
    assert_eq!(before, (111.0, 333.0));

    drop(owner);
    assert!(ParentRegistry::lock(&registry).is_empty());

    // Stale handles degrade to the neutral value instead of dangling.
    assert_eq!(reader_a.value(), 0.0);
    drop(reader_a);
    drop(reader_c);
    assert!(ParentRegistry::lock(&registry).is_empty());
}

#[test]
fn late_parent_never_binds() {
    let registry = ParentRegistry::shared();
    let early_host = TestHost::new(1, "early", &[("ParentName", "P"), ("Type", "B")]);
    let mut early = create(&registry, &early_host);
    assert_eq!(early.state(), BindingState::Unresolved);
    assert_eq!(early_host.logs.borrow()[0].0, LogLevel::Error);

    let _owner = create(&registry, &owner_host());
    early.configure(&early_host);
    assert_eq!(early.state(), BindingState::Unresolved);
    assert_eq!(early.value(), 0.0);
}

#[test]
fn concurrent_scopes_share_one_registry() {
    const SCOPES: u64 = 8;
    let registry = ParentRegistry::shared();
    let barrier = Arc::new(Barrier::new(SCOPES as usize));

    let workers: Vec<_> = (1..=SCOPES)
        .map(|scope| {
            let registry = registry.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                let value = (scope * 10).to_string();
                let owner_host = TestHost::new(scope, "Main", &[("ValueB", value.as_str())]);
                let owner = create(&registry, &owner_host);
                barrier.wait();

                let reader_host =
                    TestHost::new(scope, "reader", &[("ParentName", "MAIN"), ("Type", "B")]);
                let reader = create(&registry, &reader_host);
                let seen = reader.value();

                barrier.wait();
                drop(reader);
                drop(owner);
                seen
            })
        })
        .collect();

    for (scope, worker) in (1..=SCOPES).zip(workers) {
        assert_eq!(worker.join().unwrap(), (scope * 10) as f64);
    }
    assert!(ParentRegistry::lock(&registry).is_empty());
}

#[test]
fn skins_on_separate_threads() {
    let dir = TempDir::new().unwrap();
    let skin = r#"
[[measure]]
name = "mParent"
plugin = "ParentChild"
ValueA = 111
ValueC = 333

[[measure]]
name = "mChild"
plugin = "ParentChild"
ParentName = "mParent"
Type = "C"
"#;
    let paths: Vec<_> = (0..3)
        .map(|i| {
            let path = dir.path().join(format!("skin{i}.toml"));
            fs::write(&path, skin).unwrap();
            path
        })
        .collect();

    let mut manager = PluginManager::new(SettingsStore::in_memory());
    let runtimes = manager.load_all(&paths);
    assert_eq!(manager.parent_count(), 3);

    let workers: Vec<_> = runtimes
        .into_iter()
        .map(|mut runtime| {
            thread::spawn(move || {
                runtime.update_all();
                runtime.value_of("mChild")
            })
        })
        .collect();

    for worker in workers {
        assert_eq!(worker.join().unwrap(), Some(333.0));
    }
    assert_eq!(manager.parent_count(), 0);
}
