use std::fs::{self, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

/// Client-side key-value storage: one small file per key in a data directory.
///
/// Reads never fail. A missing or unreadable entry reads as `None`, since
/// everything kept here can be regenerated or is non-critical.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    dir: PathBuf,
}

impl LocalStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        LocalStorage { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Maps a key to its file name. `[A-Za-z0-9.-]` is kept, `_` becomes
    /// `__` and every other byte becomes `_XX` (hex), so distinct keys never
    /// share a file. Keys that would name `.`, `..` or nothing are escaped
    /// in full.
    fn path_for(&self, key: &str) -> PathBuf {
        let special = key.is_empty() || key.chars().all(|c| c == '.');
        if special {
            let mut name = String::from("_.");
            for b in key.bytes() {
                name.push_str(&format!("_{:02X}", b));
            }
            return self.dir.join(name);
        }
        let mut name = String::with_capacity(key.len());
        for b in key.bytes() {
            match b {
                b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'.' | b'-' => name.push(b as char),
                b'_' => name.push_str("__"),
                _ => name.push_str(&format!("_{:02X}", b)),
            }
        }
        self.dir.join(name)
    }

    /// Returns the stored value for `key`.
    pub fn read(&self, key: &str) -> Option<String> {
        let path = self.path_for(key);
        if !path.exists() {
            return None;
        }
        let mut f = match OpenOptions::new().read(true).open(&path) {
            Ok(f) => f,
            Err(e) => {
                log::warn!("cannot open {}: {}", path.display(), e);
                return None;
            }
        };
        let mut s = String::new();
        if let Err(e) = f.read_to_string(&mut s) {
            log::warn!("cannot read {}: {}", path.display(), e);
            return None;
        }
        Some(s)
    }

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// Written to a sibling temp file then renamed over the target, so a
    /// reader never observes a half-written entry.
    pub fn write(&self, key: &str, value: &str) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push("_.tmp");
        let tmp = path.with_file_name(tmp_name);
        {
            let mut f = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp)?;
            f.write_all(value.as_bytes())?;
            f.sync_all()?;
        }
        fs::rename(&tmp, &path)
    }

    /// Deletes `key`. Removing an absent key is not an error.
    pub fn remove(&self, key: &str) -> io::Result<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}
