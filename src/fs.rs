//! Files and directories with promise-returning I/O.
//!
//! Every read and write is implemented once as a plain synchronous method on
//! [`File`]; the `*_async` variants run that same method on a task thread
//! through [`try_asynchronous`].
use std::{
    fs,
    io::{self, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use thiserror::Error;

use crate::{try_asynchronous, Promise};

#[derive(Debug, Error)]
pub enum FsError {
    #[error("path '{}' does not exist", .0.display())]
    NotFound(PathBuf),
    #[error("path '{}' is a directory, not a file", .0.display())]
    IsDirectory(PathBuf),
    #[error("path '{}' is not a directory", .0.display())]
    NotADirectory(PathBuf),
    #[error("path '{}' already exists", .0.display())]
    AlreadyExists(PathBuf),
    #[error("file not opened in {0} mode")]
    Mode(&'static str),
    #[error("offset {offset} out of bounds for file of size {len}")]
    OutOfRange { offset: u64, len: u64 },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// How a [`File`] may be accessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IoMode {
    ReadOnly,
    WriteOnly,
    #[default]
    ReadWrite,
}

impl IoMode {
    fn can_read(self) -> bool {
        self != IoMode::WriteOnly
    }

    fn can_write(self) -> bool {
        self != IoMode::ReadOnly
    }

    fn options(self) -> fs::OpenOptions {
        let mut options = fs::OpenOptions::new();
        options.read(self.can_read()).write(self.can_write());
        options
    }
}

/// An open file. Clones share the same handle and cursor.
#[derive(Debug, Clone)]
pub struct File {
    path: PathBuf,
    mode: IoMode,
    handle: Arc<Mutex<fs::File>>,
}

impl File {
    fn new(path: PathBuf, mode: IoMode, handle: fs::File) -> Self {
        Self {
            path,
            mode,
            handle: Arc::new(Mutex::new(handle)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, fs::File> {
        self.handle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> IoMode {
        self.mode
    }

    /// Current size of the file in bytes.
    pub fn len(&self) -> Result<u64, FsError> {
        Ok(self.lock().metadata()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, FsError> {
        Ok(self.len()? == 0)
    }

    /// Reads `size` bytes from the cursor; `0` or anything past the end
    /// reads to the end of the file.
    pub fn read(&self, size: usize) -> Result<Vec<u8>, FsError> {
        self.check_read()?;
        let mut file = self.lock();
        let len = file.metadata()?.len();
        let position = file.stream_position()?;
        let size = clamp(size, len.saturating_sub(position));
        read_exact(&mut file, size)
    }

    /// Writes `data` at the cursor and returns the number of bytes written.
    pub fn write(&self, data: &[u8]) -> Result<usize, FsError> {
        self.check_write()?;
        self.lock().write_all(data)?;
        Ok(data.len())
    }

    /// Reads `size` bytes starting at `offset`, which must lie inside the
    /// file. `0` or anything past the end reads to the end of the file.
    pub fn read_from(&self, offset: u64, size: usize) -> Result<Vec<u8>, FsError> {
        self.check_read()?;
        let mut file = self.lock();
        let len = file.metadata()?.len();
        if offset >= len {
            return Err(FsError::OutOfRange { offset, len });
        }
        file.seek(SeekFrom::Start(offset))?;
        read_exact(&mut file, clamp(size, len - offset))
    }

    /// Writes `data` starting at `offset`, which may be at most the current
    /// size of the file.
    pub fn write_from(&self, offset: u64, data: &[u8]) -> Result<usize, FsError> {
        self.check_write()?;
        let mut file = self.lock();
        let len = file.metadata()?.len();
        if offset > len {
            return Err(FsError::OutOfRange { offset, len });
        }
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(data)?;
        Ok(data.len())
    }

    pub fn read_async(&self, size: usize) -> Promise<Vec<u8>> {
        try_asynchronous(|file: File, size| file.read(size), (self.clone(), size))
    }

    pub fn write_async(&self, data: Vec<u8>) -> Promise<usize> {
        try_asynchronous(
            |file: File, data: Vec<u8>| file.write(&data),
            (self.clone(), data),
        )
    }

    pub fn read_from_async(&self, offset: u64, size: usize) -> Promise<Vec<u8>> {
        try_asynchronous(
            |file: File, offset, size| file.read_from(offset, size),
            (self.clone(), offset, size),
        )
    }

    pub fn write_from_async(&self, offset: u64, data: Vec<u8>) -> Promise<usize> {
        try_asynchronous(
            |file: File, offset, data: Vec<u8>| file.write_from(offset, &data),
            (self.clone(), offset, data),
        )
    }

    fn check_read(&self) -> Result<(), FsError> {
        if self.mode.can_read() {
            Ok(())
        } else {
            Err(FsError::Mode("read"))
        }
    }

    fn check_write(&self) -> Result<(), FsError> {
        if self.mode.can_write() {
            Ok(())
        } else {
            Err(FsError::Mode("write"))
        }
    }
}

fn clamp(size: usize, available: u64) -> usize {
    let available = usize::try_from(available).unwrap_or(usize::MAX);
    if size == 0 || size > available {
        available
    } else {
        size
    }
}

fn read_exact(file: &mut fs::File, size: usize) -> Result<Vec<u8>, FsError> {
    let mut buffer = vec![0; size];
    file.read_exact(&mut buffer)?;
    Ok(buffer)
}

/// A working directory that relative paths are resolved against.
#[derive(Debug, Clone)]
pub struct FileSystem {
    cwd: PathBuf,
}

impl FileSystem {
    /// Starts in the working directory of the process.
    pub fn new() -> Result<Self, FsError> {
        Ok(Self::with_root(std::env::current_dir()?))
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { cwd: root.into() }
    }

    pub fn pwd(&self) -> &Path {
        &self.cwd
    }

    fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        self.cwd.join(path)
    }

    /// Lists the entries of a directory, sorted by path.
    pub fn ls(&self, path: impl AsRef<Path>) -> Result<Vec<PathBuf>, FsError> {
        let path = self.existing_dir(path)?;
        let mut entries = fs::read_dir(&path)?
            .map(|entry| entry.map(|entry| entry.path()))
            .collect::<Result<Vec<_>, _>>()?;
        entries.sort();
        Ok(entries)
    }

    pub fn open(&self, path: impl AsRef<Path>, mode: IoMode) -> Result<File, FsError> {
        let path = self.resolve(path);
        if !path.exists() {
            return Err(FsError::NotFound(path));
        }
        if path.is_dir() {
            return Err(FsError::IsDirectory(path));
        }
        let handle = mode.options().open(&path)?;
        log::debug!("opened '{}' as {mode:?}", path.display());
        Ok(File::new(path, mode, handle))
    }

    /// Creates a new, empty file opened for reading and writing.
    pub fn create(&self, path: impl AsRef<Path>) -> Result<File, FsError> {
        let path = self.resolve(path);
        if path.exists() {
            return Err(FsError::AlreadyExists(path));
        }
        let mode = IoMode::ReadWrite;
        let handle = mode.options().create_new(true).open(&path)?;
        log::debug!("created '{}'", path.display());
        Ok(File::new(path, mode, handle))
    }

    pub fn mkdir(&self, path: impl AsRef<Path>) -> Result<PathBuf, FsError> {
        let path = self.resolve(path);
        if path.exists() {
            return Err(FsError::AlreadyExists(path));
        }
        fs::create_dir(&path)?;
        Ok(path)
    }

    /// Changes the working directory.
    pub fn cd(&mut self, path: impl AsRef<Path>) -> Result<&Path, FsError> {
        self.cwd = self.existing_dir(path)?;
        Ok(&self.cwd)
    }

    fn existing_dir(&self, path: impl AsRef<Path>) -> Result<PathBuf, FsError> {
        let path = self.resolve(path);
        if !path.exists() {
            return Err(FsError::NotFound(path));
        }
        if !path.is_dir() {
            return Err(FsError::NotADirectory(path));
        }
        Ok(path)
    }
}
