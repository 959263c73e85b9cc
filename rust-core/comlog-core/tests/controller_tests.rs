// SPDX-License-Identifier: PMPL-1.0-or-later
//! Controller tests against real and fault-injecting storage.
//!
//! Covers the open/write failure throttles, failed wraps and syncs,
//! rotation naming under a scripted clock, sidecar failures, and reading
//! files back.

use std::fs;
use std::io::{self, Cursor, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};

use comlog_core::{
    read_records, verify_sidecar, Command, FileMode, FileStatus, LogController, LogEvent, LogFile,
    LogStorage, LoggerConfig, ManualClock, MetadataLayout, RotationPolicy, SidecarError,
    SidecarStatus, SyncMode, TimeBase, Timestamp, Validator,
};
use tempfile::TempDir;

const PAYLOAD: [u8; 4] = [0xde, 0xad, 0xbe, 0xef];

// ===========================================================================
// Fault-injecting storage
// ===========================================================================

#[derive(Debug, Default)]
struct Faults {
    fail_opens: bool,
    fail_writes: bool,
    fail_seeks: bool,
    fail_syncs: bool,
    opened: Vec<PathBuf>,
}

/// In-memory storage whose opens, writes, seeks and syncs can be made to fail.
#[derive(Debug, Clone, Default)]
struct FaultyStorage {
    faults: Arc<Mutex<Faults>>,
}

impl FaultyStorage {
    fn fail_opens(&self, fail: bool) {
        self.faults.lock().unwrap().fail_opens = fail;
    }

    fn fail_writes(&self, fail: bool) {
        self.faults.lock().unwrap().fail_writes = fail;
    }

    fn fail_seeks(&self, fail: bool) {
        self.faults.lock().unwrap().fail_seeks = fail;
    }

    fn fail_syncs(&self, fail: bool) {
        self.faults.lock().unwrap().fail_syncs = fail;
    }

    fn opened(&self) -> Vec<PathBuf> {
        self.faults.lock().unwrap().opened.clone()
    }
}

impl LogStorage for FaultyStorage {
    fn create(&mut self, path: &Path) -> io::Result<Box<dyn LogFile>> {
        let mut faults = self.faults.lock().unwrap();
        if faults.fail_opens {
            return Err(io::Error::new(io::ErrorKind::StorageFull, "no space"));
        }
        faults.opened.push(path.to_path_buf());
        Ok(Box::new(FaultyFile {
            faults: Arc::clone(&self.faults),
            contents: Cursor::new(Vec::new()),
        }))
    }
}

struct FaultyFile {
    faults: Arc<Mutex<Faults>>,
    contents: Cursor<Vec<u8>>,
}

impl Write for FaultyFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.faults.lock().unwrap().fail_writes {
            return Err(io::Error::new(io::ErrorKind::StorageFull, "no space"));
        }
        self.contents.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for FaultyFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        if self.faults.lock().unwrap().fail_seeks {
            return Err(io::Error::new(io::ErrorKind::Other, "seek failed"));
        }
        self.contents.seek(pos)
    }
}

impl LogFile for FaultyFile {
    fn sync(&mut self) -> io::Result<()> {
        if self.faults.lock().unwrap().fail_syncs {
            return Err(io::Error::new(io::ErrorKind::StorageFull, "no space"));
        }
        Ok(())
    }

    fn set_len(&mut self, len: u64) -> io::Result<()> {
        self.contents.get_mut().truncate(len as usize);
        Ok(())
    }
}

/// Validator that always fails to write its sidecar.
struct RefusingValidator;

impl Validator for RefusingValidator {
    fn extension(&self) -> &str {
        ".CRC32"
    }

    fn create_validation(&self, _log: &Path, sidecar: &Path) -> Result<(), SidecarError> {
        Err(SidecarError::SidecarUnwritable {
            path: sidecar.display().to_string(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "read-only"),
        })
    }
}

// ===========================================================================
// Helpers
// ===========================================================================

fn start_clock() -> ManualClock {
    ManualClock::new(Timestamp::new(TimeBase::None, 0, 9_876_543))
}

fn faulty_controller(
    rotation: RotationPolicy,
) -> (LogController, FaultyStorage, Receiver<LogEvent>) {
    faulty_controller_with(LoggerConfig::new("mem/test", 30).with_rotation(rotation))
}

fn faulty_controller_with(config: LoggerConfig) -> (LogController, FaultyStorage, Receiver<LogEvent>) {
    let storage = FaultyStorage::default();
    let (sender, receiver) = mpsc::channel();
    let controller = LogController::new(config)
        .unwrap()
        .with_clock(start_clock())
        .with_storage(storage.clone())
        .with_validator(None)
        .with_events(sender);
    (controller, storage, receiver)
}

fn drain(events: &Receiver<LogEvent>) -> Vec<LogEvent> {
    events.try_iter().collect()
}

/// Primary log files in `dir`, ordered by the seconds field of their name.
fn log_files_by_time(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<(u32, PathBuf)> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "com"))
        .map(|path| {
            let stem = path.file_stem().unwrap().to_string_lossy().to_string();
            let seconds = stem.rsplit('_').nth(1).unwrap().parse().unwrap();
            (seconds, path)
        })
        .collect();
    files.sort();
    files.into_iter().map(|(_, path)| path).collect()
}

// ===========================================================================
// Open failures
// ===========================================================================

#[test]
fn test_open_failures_report_once_until_success() {
    let (mut controller, storage, events) = faulty_controller(RotationPolicy::RotateNewFile);
    storage.fail_opens(true);

    for _ in 0..5 {
        controller.submit(&PAYLOAD);
        assert_eq!(controller.file_mode(), FileMode::Closed);
    }
    assert_eq!(
        drain(&events),
        vec![LogEvent::FileOpenError {
            status: FileStatus::NoSpace,
            file_name: "mem/test_0_0_9876543.com".to_string(),
        }]
    );

    // A success clears the latch.
    storage.fail_opens(false);
    controller.submit(&PAYLOAD);
    assert_eq!(controller.file_mode(), FileMode::Open);
    assert!(drain(&events).is_empty());

    // The next failure episode reports exactly once more.
    controller.force_close();
    storage.fail_opens(true);
    for _ in 0..3 {
        controller.submit(&PAYLOAD);
    }
    let open_errors = drain(&events)
        .into_iter()
        .filter(|event| matches!(event, LogEvent::FileOpenError { .. }))
        .count();
    assert_eq!(open_errors, 1);
}

#[test]
fn test_open_into_missing_directory() {
    let dir = TempDir::new().unwrap();
    let prefix = dir.path().join("no").join("such").join("dir").join("log");
    let (sender, events) = mpsc::channel();
    let mut controller = LogController::new(LoggerConfig::new(prefix.display().to_string(), 100))
        .unwrap()
        .with_clock(start_clock())
        .with_events(sender);

    controller.submit(&PAYLOAD);
    controller.submit(&PAYLOAD);

    assert_eq!(
        drain(&events),
        vec![LogEvent::FileOpenError {
            status: FileStatus::DoesntExist,
            file_name: format!("{}_0_0_9876543.com", prefix.display()),
        }]
    );
}

// ===========================================================================
// Write failures
// ===========================================================================

#[test]
fn test_write_failures_report_once_and_keep_file_open() {
    let (mut controller, storage, events) = faulty_controller(RotationPolicy::RotateNewFile);
    controller.submit(&PAYLOAD);
    assert_eq!(controller.byte_count(), 8);

    storage.fail_writes(true);
    for _ in 0..4 {
        controller.submit(&PAYLOAD);
        assert_eq!(controller.file_mode(), FileMode::Open);
    }
    assert_eq!(controller.byte_count(), 8);
    assert_eq!(
        drain(&events),
        vec![LogEvent::FileWriteError {
            status: FileStatus::NoSpace,
            bytes_written: 0,
            bytes_requested: 4,
            file_name: "mem/test_0_0_9876543.com".to_string(),
        }]
    );

    storage.fail_writes(false);
    controller.submit(&PAYLOAD);
    assert_eq!(controller.byte_count(), 16);

    storage.fail_writes(true);
    controller.submit(&PAYLOAD);
    controller.submit(&PAYLOAD);
    assert_eq!(drain(&events).len(), 1);
    assert_eq!(storage.opened().len(), 1);
}

#[test]
fn test_write_failure_is_recovered_by_operator_close() {
    let (mut controller, storage, events) = faulty_controller(RotationPolicy::WrapInPlace);
    controller.submit(&PAYLOAD);
    storage.fail_writes(true);
    controller.submit(&PAYLOAD);

    storage.fail_writes(false);
    controller.execute(Command::CloseFile).unwrap();
    controller.submit(&PAYLOAD);

    assert_eq!(controller.byte_count(), 8);
    assert_eq!(storage.opened(), vec![PathBuf::from("mem/test.com"); 2]);
    let kinds: Vec<&'static str> = drain(&events)
        .iter()
        .map(|event| match event {
            LogEvent::FileWriteError { .. } => "write_error",
            LogEvent::FileClosed { .. } => "closed",
            _ => "other",
        })
        .collect();
    assert_eq!(kinds, vec!["write_error", "closed"]);
}

// ===========================================================================
// Wrap and sync failures
// ===========================================================================

fn write_error(status: FileStatus, file_name: &str) -> LogEvent {
    LogEvent::FileWriteError {
        status,
        bytes_written: 0,
        bytes_requested: 0,
        file_name: file_name.to_string(),
    }
}

#[test]
fn test_failed_wrap_closes_and_reopens_same_name() {
    let (mut controller, storage, events) = faulty_controller(RotationPolicy::WrapInPlace);
    for _ in 0..3 {
        controller.submit(&PAYLOAD);
    }

    storage.fail_seeks(true);
    controller.submit(&PAYLOAD);

    assert_eq!(
        drain(&events),
        vec![
            write_error(FileStatus::Other, "mem/test.com"),
            LogEvent::FileClosed {
                file_name: "mem/test.com".to_string(),
            },
        ]
    );
    assert_eq!(storage.opened(), vec![PathBuf::from("mem/test.com"); 2]);
    assert_eq!(controller.file_mode(), FileMode::Open);
    assert_eq!(controller.byte_count(), 8);
}

#[test]
fn test_failed_wrap_shares_write_latch() {
    let (mut controller, storage, events) = faulty_controller(RotationPolicy::WrapInPlace);
    for _ in 0..3 {
        controller.submit(&PAYLOAD);
    }

    // The write into the reopened file fails too, inside the same episode.
    storage.fail_seeks(true);
    storage.fail_writes(true);
    controller.submit(&PAYLOAD);
    controller.submit(&PAYLOAD);

    let write_errors = drain(&events)
        .into_iter()
        .filter(|event| matches!(event, LogEvent::FileWriteError { .. }))
        .count();
    assert_eq!(write_errors, 1);
    assert_eq!(controller.byte_count(), 0);
}

#[test]
fn test_sync_failures_report_once_with_zero_counts() {
    let config = LoggerConfig::new("mem/test", 100).with_sync_mode(SyncMode::Fsync);
    let (mut controller, storage, events) = faulty_controller_with(config);
    controller.submit(&PAYLOAD);

    storage.fail_syncs(true);
    for _ in 0..3 {
        controller.submit(&PAYLOAD);
    }
    // The records themselves reached the file.
    assert_eq!(controller.byte_count(), 32);
    assert_eq!(
        drain(&events),
        vec![write_error(FileStatus::NoSpace, "mem/test_0_0_9876543.com")]
    );

    storage.fail_syncs(false);
    controller.submit(&PAYLOAD);
    storage.fail_syncs(true);
    controller.submit(&PAYLOAD);
    assert_eq!(drain(&events).len(), 1);
}

#[test]
fn test_sync_failure_on_close_is_reported_before_closed() {
    let config = LoggerConfig::new("mem/test", 100).with_sync_mode(SyncMode::Fsync);
    let (mut controller, storage, events) = faulty_controller_with(config);
    controller.submit(&PAYLOAD);

    storage.fail_syncs(true);
    controller.force_close();

    assert_eq!(
        drain(&events),
        vec![
            write_error(FileStatus::NoSpace, "mem/test_0_0_9876543.com"),
            LogEvent::FileClosed {
                file_name: "mem/test_0_0_9876543.com".to_string(),
            },
        ]
    );
}

#[test]
fn test_close_failure_inside_write_episode_is_not_repeated() {
    let config = LoggerConfig::new("mem/test", 100).with_sync_mode(SyncMode::Fsync);
    let (mut controller, storage, events) = faulty_controller_with(config);

    storage.fail_syncs(true);
    controller.submit(&PAYLOAD);
    controller.force_close();

    assert_eq!(
        drain(&events),
        vec![
            write_error(FileStatus::NoSpace, "mem/test_0_0_9876543.com"),
            LogEvent::FileClosed {
                file_name: "mem/test_0_0_9876543.com".to_string(),
            },
        ]
    );
}

// ===========================================================================
// Sidecars
// ===========================================================================

#[test]
fn test_sidecar_failure_is_reported_and_file_still_closes() {
    let (controller, _, events) = faulty_controller(RotationPolicy::RotateNewFile);
    let mut controller = controller.with_validator(Some(Box::new(RefusingValidator)));
    controller.submit(&PAYLOAD);
    controller.force_close();

    assert_eq!(controller.file_mode(), FileMode::Closed);
    assert_eq!(
        drain(&events),
        vec![
            LogEvent::SidecarValidationError {
                file_name: "mem/test_0_0_9876543.com".to_string(),
                sidecar_name: "mem/test_0_0_9876543.com.CRC32".to_string(),
                status: SidecarStatus::SidecarUnwritable,
            },
            LogEvent::FileClosed {
                file_name: "mem/test_0_0_9876543.com".to_string(),
            },
        ]
    );
}

#[test]
fn test_every_rotated_file_has_a_valid_sidecar() {
    let dir = TempDir::new().unwrap();
    let clock = start_clock();
    let prefix = dir.path().join("downlink").display().to_string();
    let mut controller = LogController::new(LoggerConfig::new(prefix, 30))
        .unwrap()
        .with_clock(clock.clone())
        .with_events(mpsc::channel().0);

    for _ in 0..10 {
        controller.submit(&PAYLOAD);
        clock.advance_seconds(1);
    }
    controller.force_close();

    let files = log_files_by_time(dir.path());
    assert_eq!(files.len(), 4);
    for file in &files {
        let sidecar = PathBuf::from(format!("{}.CRC32", file.display()));
        verify_sidecar(file, &sidecar).unwrap();
    }
}

// ===========================================================================
// Rotation naming and read-back
// ===========================================================================

#[test]
fn test_rotation_names_follow_clock_readings() {
    let dir = TempDir::new().unwrap();
    let clock = start_clock();
    let prefix = dir.path().join("pass").display().to_string();
    let mut controller = LogController::new(LoggerConfig::new(prefix.clone(), 30))
        .unwrap()
        .with_clock(clock.clone())
        .with_validator(None)
        .with_events(mpsc::channel().0);
    controller.set_record_infix("REC_1").unwrap();

    // Three records per file; the clock reads 10, 20, 30 at each open.
    let mut expected = Vec::new();
    for second in [10, 20, 30] {
        clock.set(Timestamp::new(TimeBase::Workstation, second, 42));
        expected.push(PathBuf::from(format!("{prefix}_REC_1_2_{second}_000042.com")));
        for _ in 0..3 {
            controller.submit(&PAYLOAD);
        }
    }
    controller.force_close();

    assert_eq!(log_files_by_time(dir.path()), expected);
    for file in &expected {
        assert_eq!(fs::metadata(file).unwrap().len(), 24);
    }
}

#[test]
fn test_records_read_back_across_rotations() {
    let dir = TempDir::new().unwrap();
    let clock = start_clock();
    let prefix = dir.path().join("rt").display().to_string();
    let config = LoggerConfig::new(prefix, 64).with_metadata(MetadataLayout::LengthOnly);
    let mut controller = LogController::new(config)
        .unwrap()
        .with_clock(clock.clone())
        .with_events(mpsc::channel().0);

    let payloads: Vec<Vec<u8>> = (0u8..40).map(|n| vec![n; usize::from(n % 13)]).collect();
    for payload in &payloads {
        controller.submit(payload);
        clock.advance_seconds(1);
    }
    controller.force_close();

    let mut recovered = Vec::new();
    for file in log_files_by_time(dir.path()) {
        assert!(fs::metadata(&file).unwrap().len() <= 64);
        recovered.extend(read_records(&file, MetadataLayout::LengthOnly).unwrap());
    }
    assert_eq!(recovered, payloads);
}

#[test]
fn test_config_file_drives_controller() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("comlog.json");
    let prefix = dir.path().join("cfg").display().to_string();
    fs::write(&config_path, config_json(&prefix)).unwrap();

    let config = LoggerConfig::from_json_file(&config_path).unwrap();
    assert_eq!(config.rotation, RotationPolicy::WrapInPlace);
    let mut controller = LogController::new(config)
        .unwrap()
        .with_events(mpsc::channel().0);
    controller.submit(b"abc");
    controller.force_close();

    let file = PathBuf::from(format!("{prefix}.bin"));
    assert_eq!(fs::read(&file).unwrap(), vec![0x00, 0x03, b'a', b'b', b'c']);
    verify_sidecar(&file, Path::new(&format!("{prefix}.bin.SHA256"))).unwrap();
}

fn config_json(prefix: &str) -> String {
    format!(
        r#"{{
            "file_prefix": {prefix:?},
            "max_file_size": 1024,
            "rotation": "wrap_in_place",
            "metadata": "length_only",
            "file_extension": ".bin",
            "sidecar": "sha256"
        }}"#
    )
}
