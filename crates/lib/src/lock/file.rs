//! File-based named locks for mutual exclusion across processes.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tracing::{debug, info};

use crate::consts::LOCK_POLL_INTERVAL;
use crate::lock::{LockError, LockMetadata, NamedLock};

/// One lock file per name inside a directory.
///
/// Locks are OS advisory locks on the open file, so they are dropped by the
/// kernel if the holding process dies.
#[derive(Debug, Clone)]
pub struct FileLocks {
  dir: PathBuf,
  acquire_timeout: Option<Duration>,
  poll_interval: Duration,
}

/// Ownership of one named file lock.
#[derive(Debug)]
pub struct FileLockGuard {
  file: File,
  name: String,
  path: PathBuf,
}

impl FileLockGuard {
  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn lock_path(&self) -> &Path {
    &self.path
  }

  /// Reads the lock metadata from the held file handle.
  ///
  /// Opening a second handle would fail on Windows due to mandatory locking.
  pub fn read_metadata(&self) -> io::Result<LockMetadata> {
    let mut file = &self.file;
    file.seek(SeekFrom::Start(0))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    serde_json::from_str(&contents).map_err(io::Error::other)
  }
}

impl Drop for FileLockGuard {
  fn drop(&mut self) {
    debug!(lock = %self.name, "lock released");
  }
}

impl FileLocks {
  pub fn new(dir: impl Into<PathBuf>) -> Self {
    Self {
      dir: dir.into(),
      acquire_timeout: None,
      poll_interval: LOCK_POLL_INTERVAL,
    }
  }

  /// Give up waiting after `timeout`. `None` waits forever.
  pub fn with_acquire_timeout(mut self, timeout: Option<Duration>) -> Self {
    self.acquire_timeout = timeout;
    self
  }

  pub fn with_poll_interval(mut self, interval: Duration) -> Self {
    self.poll_interval = interval;
    self
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  /// Path of the lock file backing `name`.
  pub fn lock_path(&self, name: &str) -> PathBuf {
    self.dir.join(format!("{}.lock", file_stem(name)))
  }

  fn open(&self, path: &Path) -> Result<File, LockError> {
    if !self.dir.exists() {
      std::fs::create_dir_all(&self.dir).map_err(|source| LockError::CreateDir {
        path: self.dir.clone(),
        source,
      })?;
    }

    OpenOptions::new()
      .read(true)
      .write(true)
      .create(true)
      .truncate(false)
      .open(path)
      .map_err(|source| LockError::OpenFile {
        path: path.to_path_buf(),
        source,
      })
  }
}

impl NamedLock for FileLocks {
  type Guard = FileLockGuard;

  async fn acquire(&self, name: &str) -> Result<FileLockGuard, LockError> {
    let path = self.lock_path(name);
    let file = self.open(&path)?;

    let start = Instant::now();
    let mut announced = false;

    loop {
      match try_lock(&file) {
        Ok(()) => break,
        Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
          if !announced {
            match read_holder(&path) {
              Some(holder) => info!(lock = %name, holder = %holder, "waiting for lock"),
              None => info!(lock = %name, "waiting for lock"),
            }
            announced = true;
          }

          if let Some(timeout) = self.acquire_timeout
            && start.elapsed() >= timeout
          {
            return Err(LockError::Timeout {
              name: name.to_string(),
              waited: start.elapsed(),
              holder: read_holder(&path),
            });
          }

          tokio::time::sleep(self.poll_interval).await;
        }
        Err(source) => {
          return Err(LockError::LockFailed {
            name: name.to_string(),
            source,
          });
        }
      }
    }

    write_metadata(&file, name).map_err(|source| LockError::WriteMetadata {
      name: name.to_string(),
      source,
    })?;

    debug!(lock = %name, waited = ?start.elapsed(), "lock acquired");

    Ok(FileLockGuard {
      file,
      name: name.to_string(),
      path,
    })
  }
}

/// Lock names are opaque strings. Bytes outside `[a-z0-9._-]` are
/// percent-encoded, so distinct names never share a lock file, even on
/// case-insensitive file systems.
fn file_stem(name: &str) -> String {
  let mut stem = String::with_capacity(name.len());
  for byte in name.bytes() {
    if byte.is_ascii_lowercase() || byte.is_ascii_digit() || matches!(byte, b'.' | b'-' | b'_') {
      stem.push(char::from(byte));
    } else {
      stem.push_str(&format!("%{:02X}", byte));
    }
  }
  stem
}

fn write_metadata(file: &File, name: &str) -> io::Result<()> {
  let metadata = LockMetadata {
    version: 1,
    name: name.to_string(),
    pid: std::process::id(),
    started_at_unix: SystemTime::now()
      .duration_since(UNIX_EPOCH)
      .unwrap_or_default()
      .as_secs(),
  };

  file.set_len(0)?;
  let mut writer = io::BufWriter::new(file);
  writer.seek(SeekFrom::Start(0))?;
  serde_json::to_writer_pretty(&mut writer, &metadata).map_err(io::Error::other)?;
  writer.flush()
}

fn read_holder(path: &Path) -> Option<LockMetadata> {
  let contents = std::fs::read_to_string(path).ok()?;
  serde_json::from_str(&contents).ok()
}

#[cfg(unix)]
fn try_lock(file: &File) -> io::Result<()> {
  use rustix::fs::{FlockOperation, flock};
  use std::os::unix::io::AsFd;

  flock(file.as_fd(), FlockOperation::NonBlockingLockExclusive)
    .map_err(|e| io::Error::from_raw_os_error(e.raw_os_error()))
}

#[cfg(windows)]
fn try_lock(file: &File) -> io::Result<()> {
  use std::os::windows::io::AsRawHandle;
  use windows_sys::Win32::Foundation::{ERROR_LOCK_VIOLATION, HANDLE};
  use windows_sys::Win32::Storage::FileSystem::{LOCKFILE_EXCLUSIVE_LOCK, LOCKFILE_FAIL_IMMEDIATELY, LockFileEx};

  let handle = file.as_raw_handle() as HANDLE;

  // SAFETY: OVERLAPPED is a plain data struct that is valid when zero-initialized.
  // LockFileEx is safe to call with a valid file handle and zeroed OVERLAPPED.
  let result = unsafe {
    let mut overlapped = std::mem::zeroed();
    LockFileEx(
      handle,
      LOCKFILE_FAIL_IMMEDIATELY | LOCKFILE_EXCLUSIVE_LOCK,
      0,
      1,
      0,
      &mut overlapped,
    )
  };

  if result == 0 {
    let err = io::Error::last_os_error();
    if err.raw_os_error() == Some(ERROR_LOCK_VIOLATION as i32) {
      return Err(io::Error::from(io::ErrorKind::WouldBlock));
    }
    Err(err)
  } else {
    Ok(())
  }
}
