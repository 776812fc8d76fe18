// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! File-backed key-value store: one `<key>.json` file per key.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use super::{KvStore, StoreError};

#[derive(Debug, Clone)]
pub struct FileKv {
    dir: PathBuf,
}

impl FileKv {
    /// Open (and create if needed) a store rooted at `dir`.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        tracing::info!(path = %dir.display(), "Opened local store");
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KvStore for FileKv {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        // Write then rename so readers never see a partial value. Each writer
        // gets its own temp file.
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(value.as_bytes())?;
        tmp.persist(self.path_for(key)).map_err(|e| e.error)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let dir = tempfile::tempdir().unwrap();
        let kv = FileKv::open(dir.path().join("nested")).unwrap();

        assert_eq!(kv.get("a").unwrap(), None);

        kv.set("a", "{\"x\":1}").unwrap();
        assert_eq!(kv.get("a").unwrap().as_deref(), Some("{\"x\":1}"));

        kv.set("a", "{\"x\":2}").unwrap();
        assert_eq!(kv.get("a").unwrap().as_deref(), Some("{\"x\":2}"));
        let files: Vec<_> = fs::read_dir(dir.path().join("nested"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(files, vec![std::ffi::OsString::from("a.json")]);

        kv.remove("a").unwrap();
        assert_eq!(kv.get("a").unwrap(), None);

        // Removing a missing key is not an error
        kv.remove("a").unwrap();
    }

    #[test]
    fn test_concurrent_sets_on_one_key() {
        let dir = tempfile::tempdir().unwrap();
        let kv = FileKv::open(dir.path()).unwrap();

        std::thread::scope(|s| {
            for writer in 0..8 {
                let kv = &kv;
                s.spawn(move || {
                    for i in 0..100 {
                        kv.set("shared", &format!("{{\"writer\":{},\"i\":{}}}", writer, i))
                            .unwrap();
                    }
                });
            }
        });

        let last = kv.get("shared").unwrap().unwrap();
        assert!(last.ends_with("\"i\":99}"), "unexpected final value {}", last);
    }

    #[test]
    fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        FileKv::open(dir.path()).unwrap().set("k", "v").unwrap();

        let reopened = FileKv::open(dir.path()).unwrap();
        assert_eq!(reopened.get("k").unwrap().as_deref(), Some("v"));
    }
}
