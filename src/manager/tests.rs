use super::*;
use crate::event::Level;
use crate::serializer::{PlainSerializer, Serializer};
use crate::target::{FileTarget, FileTargetConfig, Route, Target};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use tempfile::TempDir;

/// Keeps written messages in memory and moves them to `flushed` on flush
struct Recorder {
    route: Route,
    pending: Mutex<Vec<String>>,
    flushed: Mutex<Vec<String>>,
    flushes: AtomicUsize,
}

impl Recorder {
    fn new(route: Route) -> Arc<Self> {
        Arc::new(Self {
            route,
            pending: Mutex::new(Vec::new()),
            flushed: Mutex::new(Vec::new()),
            flushes: AtomicUsize::new(0),
        })
    }

    fn pending(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    fn flushed(&self) -> Vec<String> {
        self.flushed.lock().unwrap().clone()
    }
}

impl Target for Recorder {
    fn route(&self) -> &Route {
        &self.route
    }

    fn write(&self, event: &Arc<LogEvent>, _serializer: &Arc<dyn Serializer>) {
        self.pending.lock().unwrap().push(event.render_message());
    }

    fn needs_flush(&self) -> bool {
        false
    }

    fn is_empty(&self) -> bool {
        self.pending() == 0
    }

    fn flush(&self) {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        let drained: Vec<String> = self.pending.lock().unwrap().drain(..).collect();
        self.flushed.lock().unwrap().extend(drained);
    }
}

/// Always asks to be flushed and panics when it is
struct Exploding {
    route: Route,
}

impl Target for Exploding {
    fn route(&self) -> &Route {
        &self.route
    }

    fn write(&self, _event: &Arc<LogEvent>, _serializer: &Arc<dyn Serializer>) {}

    fn needs_flush(&self) -> bool {
        true
    }

    fn is_empty(&self) -> bool {
        false
    }

    fn flush(&self) {
        panic!("flush exploded");
    }
}

fn plain() -> Arc<dyn Serializer> {
    Arc::new(PlainSerializer)
}

fn config_of(targets: &[Arc<Recorder>]) -> Config {
    Config::new(
        targets
            .iter()
            .map(|t| Layout::new(Arc::clone(t) as Arc<dyn Target>, plain()))
            .collect(),
    )
}

/// Scheduler that effectively never ticks, so only reload/stop flush
fn idle_manager(config: Config) -> Manager {
    Manager::with_tick(config, Duration::from_secs(3600)).unwrap()
}

fn message(level: Level, name: &str, text: &str) -> LogEvent {
    LogEvent::new(level, name).with_args(vec![json!(text)])
}

#[test]
fn test_manager_new() {
    let recorder = Recorder::new(Route::all());
    let manager = idle_manager(config_of(&[recorder]));
    assert_eq!(manager.layout_count(), 1);
    assert_eq!(manager.logger_count(), 0);
    assert!(!manager.is_stopped());
}

#[test]
fn test_get_logger_reuses_instance() {
    let manager = idle_manager(Config::default());

    let first = manager.get_logger("app");
    let second = manager.get_logger("app");
    let other = manager.get_logger("db");

    assert_eq!(first.name(), "app");
    assert_eq!(second.name(), "app");
    assert_eq!(other.name(), "db");
    assert_eq!(manager.logger_count(), 2);
}

#[test]
fn test_get_logger_concurrent_first_use() {
    let manager = Arc::new(idle_manager(Config::default()));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let manager = Arc::clone(&manager);
            thread::spawn(move || {
                for _ in 0..100 {
                    manager.get_logger("shared");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(manager.logger_count(), 1);
}

#[test]
fn test_write_event_routes_by_level() {
    let warnings = Recorder::new(Route::new("", Level::Warn, Level::Fatal));
    let everything = Recorder::new(Route::all());
    let manager = idle_manager(config_of(&[Arc::clone(&warnings), Arc::clone(&everything)]));

    manager.write_event(message(Level::Info, "app", "info"));
    manager.write_event(message(Level::Warn, "app", "warn"));

    assert_eq!(warnings.pending(), 1);
    assert_eq!(everything.pending(), 2);
}

#[test]
fn test_write_event_routes_by_name() {
    let db = Recorder::new(Route::new("db", Level::Trace, Level::Fatal));
    let manager = idle_manager(config_of(&[Arc::clone(&db)]));

    manager.write_event(message(Level::Info, "http", "skip"));
    manager.write_event(message(Level::Info, "db", "keep"));
    manager.stop();

    assert_eq!(db.flushed(), vec!["keep".to_string()]);
}

#[test]
fn test_no_io_on_write() {
    let recorder = Recorder::new(Route::all());
    let manager = idle_manager(config_of(&[Arc::clone(&recorder)]));

    manager.write_event(message(Level::Info, "app", "buffered"));

    assert_eq!(recorder.flushes.load(Ordering::SeqCst), 0);
    assert_eq!(recorder.pending(), 1);
}

#[test]
fn test_reload_flushes_old_config_first() {
    let old = Recorder::new(Route::all());
    let new = Recorder::new(Route::all());
    let manager = idle_manager(config_of(&[Arc::clone(&old)]));

    manager.write_event(message(Level::Info, "app", "before"));
    manager.reload(config_of(&[Arc::clone(&new)])).unwrap();

    assert_eq!(old.flushed(), vec!["before".to_string()]);
    assert_eq!(old.pending(), 0);

    manager.write_event(message(Level::Info, "app", "after"));
    assert_eq!(old.pending(), 0, "old targets are never written after a swap");
    assert_eq!(new.pending(), 1);

    manager.stop();
    assert_eq!(new.flushed(), vec!["after".to_string()]);
}

#[test]
fn test_reload_restarts_scheduler() {
    let temp_dir = TempDir::new().unwrap();
    let target = FileTarget::new(FileTargetConfig {
        root: temp_dir.path().to_path_buf(),
        cache_size: 1,
        ..FileTargetConfig::default()
    })
    .unwrap();
    let config = Config::new(vec![Layout::new(Arc::new(target), plain())]);

    let manager = Manager::with_tick(Config::default(), Duration::from_millis(10)).unwrap();
    manager.reload(config).unwrap();
    assert!(!manager.is_stopped());

    manager.write_event(message(Level::Info, "app", "flushed by the scheduler"));

    let mut waited = 0;
    while std::fs::read_dir(temp_dir.path()).unwrap().count() == 0 && waited < 200 {
        thread::sleep(Duration::from_millis(10));
        waited += 1;
    }
    assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 1);
}

#[test]
fn test_reload_after_stop_fails() {
    let manager = idle_manager(Config::default());
    manager.stop();
    assert!(matches!(
        manager.reload(Config::default()),
        Err(LogError::Stopped)
    ));
}

#[test]
fn test_failed_scheduler_restart_leaves_manager_stopped() {
    let mut lifecycle = Lifecycle::Stopped;
    let started = Err(LogError::Io(std::io::Error::new(
        std::io::ErrorKind::Other,
        "thread limit reached",
    )));

    assert!(matches!(resume(&mut lifecycle, started), Err(LogError::Io(_))));
    assert!(matches!(lifecycle, Lifecycle::Stopped));

    let router = Arc::new(Router::new(Config::default()));
    let scheduler = Scheduler::start(router, Duration::from_secs(3600)).unwrap();
    resume(&mut lifecycle, Ok(scheduler)).unwrap();
    match lifecycle {
        Lifecycle::Running(scheduler) => scheduler.stop(),
        Lifecycle::Stopped => panic!("scheduler should be running"),
    }
}

#[test]
fn test_stop_is_idempotent() {
    let recorder = Recorder::new(Route::all());
    let manager = idle_manager(config_of(&[Arc::clone(&recorder)]));

    manager.stop();
    manager.stop();

    assert!(manager.is_stopped());
    assert_eq!(recorder.flushes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_events_after_stop_are_not_flushed() {
    let recorder = Recorder::new(Route::all());
    let manager = idle_manager(config_of(&[Arc::clone(&recorder)]));

    manager.stop();
    manager.write_event(message(Level::Info, "app", "late"));
    drop(manager);

    assert_eq!(recorder.pending(), 1);
    assert!(recorder.flushed().is_empty());
}

#[test]
fn test_drop_flushes() {
    let recorder = Recorder::new(Route::all());
    let manager = idle_manager(config_of(&[Arc::clone(&recorder)]));

    manager.write_event(message(Level::Info, "app", "on drop"));
    drop(manager);

    assert_eq!(recorder.flushed(), vec!["on drop".to_string()]);
}

#[test]
fn test_panicking_target_does_not_block_others() {
    let recorder = Recorder::new(Route::all());
    let config = Config::new(vec![
        Layout::new(Arc::new(Exploding { route: Route::all() }), plain()),
        Layout::new(Arc::clone(&recorder) as Arc<dyn Target>, plain()),
    ]);
    let manager = Manager::with_tick(config, Duration::from_millis(5)).unwrap();

    // Let the scheduler hit the panicking target a few times
    thread::sleep(Duration::from_millis(50));

    manager.write_event(message(Level::Info, "app", "survives"));
    manager.stop();

    assert_eq!(recorder.flushed(), vec!["survives".to_string()]);
}

#[test]
fn test_flush_cycle_respects_needs_flush() {
    let recorder = Recorder::new(Route::all());
    let router = Router::new(config_of(&[Arc::clone(&recorder)]));

    router.write_event(message(Level::Info, "app", "x"));
    router.flush_cycle(false);
    assert_eq!(recorder.flushes.load(Ordering::SeqCst), 0);

    router.flush_cycle(true);
    assert_eq!(recorder.flushes.load(Ordering::SeqCst), 1);
    assert_eq!(recorder.flushed(), vec!["x".to_string()]);
}
