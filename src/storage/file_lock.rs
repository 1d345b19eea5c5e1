use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use crate::core::error::{Error, ErrorKind, Result};

/// Advisory lock on `<experience file>.lock`, shared by every engine instance
/// pointing at the same file. Released on drop.
pub struct FileLock {
    pub file: File,
    pub path: PathBuf,
    pub exclusive: bool,
}

impl FileLock {
    pub fn lock_path(target: &Path) -> PathBuf {
        let mut name = target.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Blocks until the lock is granted. Shared locks only open an existing
    /// lock file read-only, so readers never need write access.
    pub fn acquire(target: &Path, exclusive: bool) -> Result<Self> {
        let path = Self::lock_path(target);

        let file = if exclusive {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            OpenOptions::new()
                .create(true)
                .read(true)
                .write(true)
                .truncate(false)
                .open(&path)?
        } else {
            File::open(&path)?
        };

        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            use libc::{flock, LOCK_EX, LOCK_SH};

            let fd = file.as_raw_fd();
            let operation = if exclusive { LOCK_EX } else { LOCK_SH };

            unsafe {
                if flock(fd, operation) != 0 {
                    return Err(Error::new(
                        ErrorKind::Locked,
                        format!("Failed to lock {}: {}", path.display(), std::io::Error::last_os_error()),
                    ));
                }
            }
        }

        Ok(FileLock { file, path, exclusive })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            use libc::{flock, LOCK_UN};

            let fd = self.file.as_raw_fd();
            unsafe {
                flock(fd, LOCK_UN);
            }
        }
    }
}
