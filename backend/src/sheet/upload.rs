//! Temporary storage for uploaded workbooks.
//!
//! Workbook readers need a seekable file with the right extension. The upload
//! is written to `<dir>/<uuid>-XXXXXX.<ext>` and removed when the guard is
//! closed or dropped, so error paths never leave files behind.

use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use uuid::Uuid;

/// An uploaded document held in a temporary file.
#[derive(Debug)]
pub struct TempUpload {
    file: NamedTempFile,
}

impl TempUpload {
    /// Write `bytes` to a fresh temporary file under `dir`, creating `dir` if needed.
    pub fn create(dir: &Path, extension: &str, bytes: &[u8]) -> io::Result<Self> {
        std::fs::create_dir_all(dir)?;

        let prefix = format!("{}-", Uuid::new_v4());
        let suffix = format!(".{}", extension);
        let mut file = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(&suffix)
            .tempfile_in(dir)?;

        file.write_all(bytes)?;
        file.flush()?;

        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Delete the file now, reporting removal errors instead of ignoring them.
    pub fn close(self) -> io::Result<()> {
        self.file.close()
    }
}
