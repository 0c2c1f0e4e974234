//! Output sink with atomic tmp→rename

use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Chunk size for streaming copies (64KB)
const COPY_BUF_SIZE: usize = 64 * 1024;

/// Buffered file writer that only ever exposes complete files.
///
/// Data goes to `<final>.tmp`; [`finalize`](FileSink::finalize) flushes and
/// renames it into place. Dropping an unfinalized sink removes the tmp file,
/// so an error or early return never leaves a truncated file at the final
/// path.
pub struct FileSink {
    writer: Option<BufWriter<File>>,
    tmp_path: PathBuf,
    final_path: PathBuf,
    bytes_written: u64,
}

impl std::fmt::Debug for FileSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSink")
            .field("final_path", &self.final_path)
            .field("bytes_written", &self.bytes_written)
            .finish_non_exhaustive()
    }
}

impl FileSink {
    /// Open a sink for `final_path`, creating parent directories as needed
    pub fn create(final_path: &Path) -> io::Result<Self> {
        let tmp_path = tmp_path_for(final_path)?;
        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Clean up stale tmp file
        if tmp_path.exists() {
            fs::remove_file(&tmp_path)?;
        }

        let file = File::create(&tmp_path)?;
        Ok(Self {
            writer: Some(BufWriter::with_capacity(COPY_BUF_SIZE, file)),
            tmp_path,
            final_path: final_path.to_path_buf(),
            bytes_written: 0,
        })
    }

    pub fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| io::Error::other("sink already finalized"))?;
        writer.write_all(buf)?;
        self.bytes_written += buf.len() as u64;
        Ok(())
    }

    /// Stream `reader` into the sink chunk by chunk.
    ///
    /// `on_chunk` receives the running byte total after every chunk.
    pub fn copy_from(
        &mut self,
        reader: &mut dyn Read,
        mut on_chunk: impl FnMut(u64),
    ) -> io::Result<u64> {
        let mut buf = vec![0u8; COPY_BUF_SIZE];
        let start = self.bytes_written;
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            self.write_all(&buf[..n])?;
            on_chunk(self.bytes_written);
        }
        Ok(self.bytes_written - start)
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn final_path(&self) -> &Path {
        &self.final_path
    }

    /// Flush, sync and atomically rename tmp → final. Returns bytes written.
    pub fn finalize(mut self) -> io::Result<u64> {
        let writer = self
            .writer
            .take()
            .ok_or_else(|| io::Error::other("sink already finalized"))?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        drop(file);
        fs::rename(&self.tmp_path, &self.final_path)?;
        Ok(self.bytes_written)
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        if self.writer.take().is_some() {
            if let Err(e) = fs::remove_file(&self.tmp_path) {
                log::debug!("Could not remove {}: {e}", self.tmp_path.display());
            }
        } else if self.tmp_path.exists() {
            // finalize failed between close and rename
            let _ = fs::remove_file(&self.tmp_path);
        }
    }
}

fn tmp_path_for(final_path: &Path) -> io::Result<PathBuf> {
    let name = final_path.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("not a file path: {}", final_path.display()),
        )
    })?;
    let mut tmp_name = name.to_os_string();
    tmp_name.push(".tmp");
    Ok(final_path.with_file_name(tmp_name))
}

/// Recursively remove stale .tmp files under `root`. Returns how many were removed.
pub fn cleanup_tmp_files(root: &Path) -> io::Result<usize> {
    if !root.exists() {
        return Ok(0);
    }
    let mut removed = 0;
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            removed += cleanup_tmp_files(&path)?;
        } else if path.extension().is_some_and(|ext| ext == "tmp") {
            log::warn!("Removing stale tmp file: {}", path.display());
            fs::remove_file(&path)?;
            removed += 1;
        }
    }
    Ok(removed)
}
