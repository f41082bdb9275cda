//! Backing media for chunk content.
//!
//! A store only holds bytes. Which chunks are resident, and in what order
//! they leave, is decided by [`ChunkCache`](super::ChunkCache), so every
//! medium evicts identically.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use uuid::Uuid;

use super::CacheEpoch;
use crate::chunk::ChunkHash;

/// Chunk storage, chosen once when the cache is built.
#[derive(Debug)]
pub(crate) enum Store {
    Memory(HashMap<ChunkHash, Bytes>),
    Disk(DiskStore),
}

impl Store {
    pub(crate) fn memory() -> Self {
        Store::Memory(HashMap::new())
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Store::Memory(_) => "memory",
            Store::Disk(_) => "disk",
        }
    }

    pub(crate) fn get(&self, hash: &ChunkHash) -> io::Result<Option<Bytes>> {
        match self {
            Store::Memory(map) => Ok(map.get(hash).cloned()),
            Store::Disk(disk) => disk.get(hash),
        }
    }

    pub(crate) fn put(&mut self, hash: ChunkHash, data: Bytes) -> io::Result<()> {
        match self {
            Store::Memory(map) => {
                map.insert(hash, data);
                Ok(())
            }
            Store::Disk(disk) => disk.put(&hash, &data),
        }
    }

    pub(crate) fn remove(&mut self, hash: &ChunkHash) -> io::Result<()> {
        match self {
            Store::Memory(map) => {
                map.remove(hash);
                Ok(())
            }
            Store::Disk(disk) => disk.remove(hash),
        }
    }

    pub(crate) fn clear(&mut self) -> io::Result<()> {
        match self {
            Store::Memory(map) => {
                map.clear();
                Ok(())
            }
            Store::Disk(disk) => disk.purge(),
        }
    }
}

/// Content-addressed files under a directory owned by one store:
///
/// ```text
/// {root}/{epoch}/{instance}/{hash[0..2]}/{full_hash}
/// ```
///
/// `instance` is a fresh UUID per open, so stores built from the same root
/// and epoch never see each other's files. Files are immutable once renamed
/// into place. The instance directory is removed when the store is dropped.
#[derive(Debug)]
pub(crate) struct DiskStore {
    dir: PathBuf,
}

impl DiskStore {
    pub(crate) fn open(root: &Path, epoch: &CacheEpoch) -> io::Result<Self> {
        let dir = root
            .join(epoch.to_string())
            .join(Uuid::new_v4().simple().to_string());
        fs::create_dir_all(&dir)?;
        tracing::debug!(dir = %dir.display(), "disk chunk cache opened");
        Ok(Self { dir })
    }

    pub(crate) fn dir(&self) -> &Path {
        &self.dir
    }

    fn chunk_path(&self, hash: &ChunkHash) -> PathBuf {
        let hex = hash.to_hex();
        self.dir.join(&hex[0..2]).join(&hex)
    }

    fn get(&self, hash: &ChunkHash) -> io::Result<Option<Bytes>> {
        match fs::read(self.chunk_path(hash)) {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn put(&self, hash: &ChunkHash, data: &[u8]) -> io::Result<()> {
        let path = self.chunk_path(hash);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write to a temp file, then rename; readers never see a partial chunk.
        let tmp_path = path.with_extension("tmp");
        {
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(data)?;
        }
        fs::rename(&tmp_path, &path)
    }

    fn remove(&self, hash: &ChunkHash) -> io::Result<()> {
        match fs::remove_file(self.chunk_path(hash)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    fn purge(&self) -> io::Result<()> {
        match fs::remove_dir_all(&self.dir) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e),
            _ => {}
        }
        fs::create_dir_all(&self.dir)
    }
}

impl Drop for DiskStore {
    fn drop(&mut self) {
        match fs::remove_dir_all(&self.dir) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => {
                tracing::debug!(dir = %self.dir.display(), error = %e, "disk chunk cache not removed");
            }
            _ => {}
        }
    }
}
