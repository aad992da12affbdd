use relaylog::event::{Level, LogEvent};
use relaylog::serializer::Serializer;
use relaylog::target::{FileTarget, FileTargetConfig, Target};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Writes the message text only, so line widths are exact
struct MessageOnly;

impl Serializer for MessageOnly {
    fn encode(&self, event: &LogEvent) -> Option<Vec<u8>> {
        Some(event.render_message().into_bytes())
    }
}

fn write_line(target: &FileTarget, width: usize) {
    let serializer: Arc<dyn Serializer> = Arc::new(MessageOnly);
    let event = Arc::new(LogEvent::new(Level::Info, "app").with_args(vec![json!("x".repeat(width - 1))]));
    target.write(&event, &serializer);
}

fn create_target(root: &Path, volume_size: u64) -> FileTarget {
    FileTarget::new(FileTargetConfig {
        root: root.to_path_buf(),
        suffix: "log".to_string(),
        volume_size,
        ..FileTargetConfig::default()
    })
    .unwrap()
}

fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

fn slice(root: &Path, n: u32) -> PathBuf {
    root.join(format!("{}-{}-log", today(), n))
}

#[test]
fn test_150_bytes_split_over_two_slices() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("out");
    let target = create_target(&root, 100);

    write_line(&target, 100);
    target.flush();
    write_line(&target, 50);
    target.flush();

    assert_eq!(fs::metadata(slice(&root, 0)).unwrap().len(), 100);
    assert_eq!(fs::metadata(slice(&root, 1)).unwrap().len(), 50);
    assert_eq!(target.current_slice(), 1);
}

#[test]
fn test_fresh_target_appends_to_existing_slice() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().to_path_buf();

    {
        let first = create_target(&root, 1000);
        write_line(&first, 40);
        first.flush();
    }

    let restarted = create_target(&root, 1000);
    write_line(&restarted, 60);
    restarted.flush();

    assert_eq!(
        fs::metadata(slice(&root, 0)).unwrap().len(),
        100,
        "restart must continue the existing file, not truncate it"
    );
    assert!(!slice(&root, 1).exists());
}

#[test]
fn test_empty_flush_creates_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let target = create_target(temp_dir.path(), 100);

    target.flush();
    target.flush();

    assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    assert!(target.current_file().is_none());
    assert!(target.is_empty());
}

#[test]
fn test_files_never_exceed_volume_below_cap() {
    let temp_dir = TempDir::new().unwrap();
    let target = create_target(temp_dir.path(), 100);
    let widths = [60, 60, 30, 80, 45, 20, 90, 50, 50, 99, 1];

    for width in widths {
        write_line(&target, width);
        target.flush();
    }

    let sizes: Vec<u64> = fs::read_dir(temp_dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().metadata().unwrap().len())
        .collect();
    for size in &sizes {
        assert!(*size <= 100, "slice of {} bytes exceeds the volume", size);
    }
    assert_eq!(sizes.iter().sum::<u64>(), widths.iter().sum::<usize>() as u64);
    assert_eq!(fs::metadata(slice(temp_dir.path(), 0)).unwrap().len(), 60);
    assert_eq!(fs::metadata(slice(temp_dir.path(), 1)).unwrap().len(), 90);
}
