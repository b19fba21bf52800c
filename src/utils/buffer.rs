use memmap2::{Mmap, MmapOptions};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::base::{Error, Result};

/// Read-only access to the bytes of a file, either resident or mapped.
/// All accesses are bounds checked; a bad range is a corruption error,
/// never a panic.
pub trait Buffer: Send + Sync {
    fn len(&self) -> usize;

    fn slice(&self, start: usize, end: usize) -> Result<&[u8]>;
}

fn check_range(path: &Path, len: usize, start: usize, end: usize) -> Result<()> {
    if start > end || end > len {
        return Err(Error::corruption(
            path,
            format!("range {}..{} outside of {} bytes", start, end, len),
        ));
    }
    Ok(())
}

/// Stores the data in memory
pub struct MemoryBuffer {
    path: PathBuf,
    data: Vec<u8>,
}

impl MemoryBuffer {
    pub fn open(path: &Path) -> Result<Self> {
        let mut file = File::options().read(true).open(path)?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        Ok(Self {
            path: path.to_path_buf(),
            data,
        })
    }
}

impl Buffer for MemoryBuffer {
    fn len(&self) -> usize {
        self.data.len()
    }

    fn slice(&self, start: usize, end: usize) -> Result<&[u8]> {
        check_range(&self.path, self.data.len(), start, end)?;
        Ok(&self.data[start..end])
    }
}

/// Uses a memory map
pub struct MmapBuffer {
    path: PathBuf,
    mmap: Mmap,
}

impl MmapBuffer {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::options().read(true).open(path)?;
        let mmap = unsafe { MmapOptions::new().map(&file)? };
        Ok(Self {
            path: path.to_path_buf(),
            mmap,
        })
    }
}

impl Buffer for MmapBuffer {
    fn len(&self) -> usize {
        self.mmap.len()
    }

    fn slice(&self, start: usize, end: usize) -> Result<&[u8]> {
        check_range(&self.path, self.mmap.len(), start, end)?;
        Ok(&self.mmap[start..end])
    }
}

/// Opens `path` with the requested access strategy
pub fn open_buffer(path: &Path, in_memory: bool) -> Result<Box<dyn Buffer>> {
    if in_memory {
        Ok(Box::new(MemoryBuffer::open(path)?))
    } else {
        Ok(Box::new(MmapBuffer::open(path)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_bounds_checked_slice() {
        let dir = temp_dir::TempDir::new().unwrap();
        let path = dir.path().join("data");
        File::create(&path)
            .unwrap()
            .write_all(&[1u8, 2, 3, 4])
            .unwrap();

        let buffer = MemoryBuffer::open(&path).unwrap();
        assert_eq!(buffer.slice(1, 3).unwrap(), &[2, 3]);
        assert!(buffer.slice(2, 5).is_err());
        assert!(buffer.slice(3, 2).is_err());
    }
}
