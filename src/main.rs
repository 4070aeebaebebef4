use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::{Result, anyhow};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing_subscriber::EnvFilter;

use skinmeasures::app::App;
use skinmeasures::host::SettingsStore;
use skinmeasures::model::config::{AppConfig, data_dir};
use skinmeasures::msg::Msg;
use skinmeasures::plugin::{PluginManager, SkinRuntime};

struct RunOptions {
    interval: Duration,
    max_ticks: u64,
    watch: bool,
    quit: Arc<AtomicBool>,
}

fn main() -> Result<()> {
    let config = AppConfig::load()?;

    // Initialize logging to file (stdout carries measure output)
    let log_dir = data_dir();
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "skinmeasures.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_filter));
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(filter)
        .init();

    tracing::info!("skinmeasures starting");

    let mut paths: Vec<PathBuf> = std::env::args_os().skip(1).map(PathBuf::from).collect();
    if paths.is_empty() {
        paths = config.skin_paths();
    }

    let settings = SettingsStore::open(config.settings_path())?;
    let mut manager = PluginManager::new(settings);
    let runtimes = manager.load_all(&paths);

    for notice in manager.startup_notifications(&runtimes) {
        println!("{notice}");
    }
    if runtimes.is_empty() {
        return Err(anyhow!("no skin could be loaded"));
    }

    let quit = Arc::new(AtomicBool::new(false));
    spawn_quit_listener(quit.clone());

    // One thread per skin; all of them share the manager's registry.
    let workers: Vec<_> = runtimes
        .into_iter()
        .map(|runtime| {
            let options = RunOptions {
                interval: config.update_interval(),
                max_ticks: config.general.max_ticks,
                watch: config.general.watch,
                quit: quit.clone(),
            };
            thread::spawn(move || run(runtime, options))
        })
        .collect();

    for worker in workers {
        match worker.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => eprintln!("skinmeasures error: {e:?}"),
            Err(_) => eprintln!("skinmeasures error: skin thread panicked"),
        }
    }

    manager.flush_settings()?;
    tracing::info!("skinmeasures stopped");
    Ok(())
}

fn run(runtime: SkinRuntime, options: RunOptions) -> Result<()> {
    let (tx, rx) = mpsc::channel::<Msg>();
    let skin_path = runtime.path.clone();
    let mut app = App::new(runtime, options.max_ticks);

    // Tick thread: periodic update, or quit once requested
    let tx_tick = tx.clone();
    let quit = options.quit.clone();
    let interval = options.interval;
    thread::spawn(move || {
        loop {
            thread::sleep(interval);
            let msg = if quit.load(Ordering::Relaxed) {
                Msg::Quit
            } else {
                Msg::Tick
            };
            if tx_tick.send(msg).is_err() {
                break;
            }
        }
    });

    if options.watch {
        spawn_file_watcher(skin_path, tx.clone());
    }

    // ── Main event loop ──
    loop {
        // Batch-drain all pending messages
        let first = rx.recv()?;
        app.update(first);

        while let Ok(msg) = rx.try_recv() {
            app.update(msg);
        }

        if app.should_quit {
            break;
        }

        for line in app.view() {
            println!("{line}");
        }
    }

    // Dropping the app finalizes every measure of the skin.
    drop(app);
    Ok(())
}

/// Typing `q` on stdin stops every skin after its current tick.
fn spawn_quit_listener(quit: Arc<AtomicBool>) {
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if line.trim().eq_ignore_ascii_case("q") {
                quit.store(true, Ordering::Relaxed);
                break;
            }
        }
    });
}

fn spawn_file_watcher(skin_path: PathBuf, tx: mpsc::Sender<Msg>) {
    // Editors often replace the file, so watch its directory instead.
    let Some(watch_dir) = skin_path.parent().map(PathBuf::from) else {
        return;
    };
    let watch_dir = if watch_dir.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        watch_dir
    };

    thread::spawn(move || {
        let tx_watch = tx.clone();
        let mut watcher: RecommendedWatcher =
            match notify::recommended_watcher(move |res: notify::Result<notify::Event>| match res {
                Ok(event) => {
                    if matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                        for path in event.paths {
                            if tx_watch.send(Msg::SkinChanged(path)).is_err() {
                                return;
                            }
                        }
                    }
                }
                Err(err) => {
                    tracing::warn!("file watcher error: {err}");
                }
            }) {
                Ok(w) => w,
                Err(err) => {
                    tracing::warn!("failed to initialize file watcher: {err}");
                    return;
                }
            };

        if let Err(err) = watcher.watch(&watch_dir, RecursiveMode::NonRecursive) {
            tracing::warn!("failed to watch skin dir {}: {err}", watch_dir.display());
            return;
        }

        loop {
            thread::park();
        }
    });
}
