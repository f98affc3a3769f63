//! Durable homes for evicted grid blocks.

use crate::block::{BlockRange, GridBlock};
use crate::codec::{decode_block, encode_block};
use crate::error::{AetherError, Result};
use crate::traits::Quantity;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Persistence interface used by the paged store.
///
/// Blocks are keyed by their minimum outer coordinate; saving a block supersedes any
/// earlier copy starting at the same coordinate.
pub trait BlockStorage<Q: Quantity> {
    fn save(&mut self, block: &GridBlock<Q>) -> Result<()>;

    fn load(&self, min_outer: i64) -> Result<Option<GridBlock<Q>>>;

    /// Ranges of every stored block, ascending.
    fn ranges(&self) -> Result<Vec<BlockRange>>;

    /// Writes every stored block as `minOuter=<a>_maxOuter=<b>.bin` files into `folder`.
    fn export_to(&self, folder: &Path) -> Result<()>;

    /// Removes every stored block.
    fn clear(&mut self) -> Result<()>;

    fn is_read_only(&self) -> bool {
        false
    }

    /// Switches a read-only storage to a writable location holding the same blocks.
    fn make_writable(&mut self) -> Result<()> {
        Ok(())
    }

    /// Where the blocks live, for error messages.
    fn location(&self) -> PathBuf;
}

/// One file per block inside a grid folder.
///
/// The folder is scanned once when opened; afterwards the stored ranges are tracked
/// in memory, so files added behind the storage's back are not seen.
#[derive(Debug, Clone)]
pub struct DirectoryStorage {
    folder: PathBuf,
    /// Working folder a read-only storage is copied into before its first write.
    promote_to: Option<PathBuf>,
    /// Stored ranges keyed by min outer coordinate.
    index: BTreeMap<i64, BlockRange>,
}

impl DirectoryStorage {
    /// Opens `folder` for writing, removing any blocks left by an earlier run.
    pub fn create(folder: impl Into<PathBuf>) -> Result<Self> {
        let folder = folder.into();
        fs::create_dir_all(&folder)?;
        let storage = Self {
            folder,
            promote_to: None,
            index: BTreeMap::new(),
        };
        storage.remove_block_files()?;
        Ok(storage)
    }

    /// Opens a backup's grid folder without ever writing to it. The first write
    /// copies its blocks into `working_folder` and continues there.
    pub fn open_read_only(
        folder: impl Into<PathBuf>,
        working_folder: impl Into<PathBuf>,
    ) -> Result<Self> {
        let folder = folder.into();
        if !folder.is_dir() {
            return Err(AetherError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("Missing grid folder at {}", folder.display()),
            )));
        }
        let mut storage = Self {
            folder,
            promote_to: Some(working_folder.into()),
            index: BTreeMap::new(),
        };
        storage.index = storage
            .block_files()?
            .into_iter()
            .map(|(range, _)| (range.min_outer, range))
            .collect();
        Ok(storage)
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    fn block_files(&self) -> Result<Vec<(BlockRange, PathBuf)>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.folder)? {
            let entry = entry?;
            let name = entry.file_name();
            if let Some(range) = name.to_str().and_then(BlockRange::parse_file_name) {
                files.push((range, entry.path()));
            }
        }
        files.sort_by_key(|(range, _)| *range);
        Ok(files)
    }

    fn remove_block_files(&self) -> Result<()> {
        let files = self.block_files()?;
        if !files.is_empty() {
            tracing::warn!(
                "Clearing {} grid block files from {}",
                files.len(),
                self.folder.display()
            );
        }
        for (_, path) in files {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    fn copy_block_files(&self, destination: &Path) -> Result<()> {
        fs::create_dir_all(destination)?;
        for range in self.index.values() {
            let name = range.file_name();
            fs::copy(self.folder.join(&name), destination.join(&name))?;
        }
        Ok(())
    }
}

impl<Q: Quantity> BlockStorage<Q> for DirectoryStorage {
    fn save(&mut self, block: &GridBlock<Q>) -> Result<()> {
        if self.promote_to.is_some() {
            return Err(AetherError::Io(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("Grid folder {} is read-only", self.folder.display()),
            )));
        }
        let range = block.range();
        let bytes = encode_block(block)?;
        let target = self.folder.join(range.file_name());
        let partial = target.with_extension("partial");
        fs::write(&partial, bytes)?;
        fs::rename(&partial, &target)?;
        if let Some(replaced) = self.index.insert(range.min_outer, range) {
            if replaced != range {
                fs::remove_file(self.folder.join(replaced.file_name()))?;
            }
        }
        tracing::debug!("Saved grid block {range} to {}", target.display());
        Ok(())
    }

    fn load(&self, min_outer: i64) -> Result<Option<GridBlock<Q>>> {
        let Some(&range) = self.index.get(&min_outer) else {
            return Ok(None);
        };
        let path = self.folder.join(range.file_name());
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::warn!("Grid block file {} disappeared", path.display());
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };
        let block: GridBlock<Q> = decode_block(&bytes)?;
        if block.range() != range {
            return Err(AetherError::Serialization(format!(
                "File {} holds block {}",
                path.display(),
                block.range()
            )));
        }
        tracing::debug!("Loaded grid block {range} from {}", path.display());
        Ok(Some(block))
    }

    fn ranges(&self) -> Result<Vec<BlockRange>> {
        Ok(self.index.values().copied().collect())
    }

    fn export_to(&self, folder: &Path) -> Result<()> {
        self.copy_block_files(folder)
    }

    fn clear(&mut self) -> Result<()> {
        if self.promote_to.is_some() {
            // the backup stays untouched, only the working copy would be cleared
            return Ok(());
        }
        self.remove_block_files()?;
        self.index.clear();
        Ok(())
    }

    fn is_read_only(&self) -> bool {
        self.promote_to.is_some()
    }

    fn make_writable(&mut self) -> Result<()> {
        let Some(working) = self.promote_to.take() else {
            return Ok(());
        };
        tracing::warn!(
            "Promoting read-only grid {} to working folder {}",
            self.folder.display(),
            working.display()
        );
        fs::create_dir_all(&working)?;
        let promoted = DirectoryStorage {
            folder: working,
            promote_to: None,
            index: self.index.clone(),
        };
        promoted.remove_block_files()?;
        self.copy_block_files(&promoted.folder)?;
        *self = promoted;
        Ok(())
    }

    fn location(&self) -> PathBuf {
        self.folder.clone()
    }
}

/// Keeps encoded blocks in memory. Blocks still go through the binary encoding so
/// eviction costs and round-trips behave as on disk.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    blocks: BTreeMap<i64, (BlockRange, Vec<u8>)>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total encoded size of the stored blocks.
    pub fn stored_bytes(&self) -> usize {
        self.blocks.values().map(|(_, bytes)| bytes.len()).sum()
    }
}

impl<Q: Quantity> BlockStorage<Q> for MemoryStorage {
    fn save(&mut self, block: &GridBlock<Q>) -> Result<()> {
        let range = block.range();
        self.blocks
            .insert(range.min_outer, (range, encode_block(block)?));
        tracing::debug!("Stored grid block {range} in memory");
        Ok(())
    }

    fn load(&self, min_outer: i64) -> Result<Option<GridBlock<Q>>> {
        self.blocks
            .get(&min_outer)
            .map(|(_, bytes)| decode_block(bytes))
            .transpose()
    }

    fn ranges(&self) -> Result<Vec<BlockRange>> {
        Ok(self.blocks.values().map(|(range, _)| *range).collect())
    }

    fn export_to(&self, folder: &Path) -> Result<()> {
        fs::create_dir_all(folder)?;
        for (range, bytes) in self.blocks.values() {
            fs::write(folder.join(range.file_name()), bytes)?;
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.blocks.clear();
        Ok(())
    }

    fn location(&self) -> PathBuf {
        PathBuf::from("<memory>")
    }
}
