//! Write-then-rename helpers so readers never observe a partial artifact.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use polars::prelude::*;
use serde::Serialize;
use tempfile::NamedTempFile;

use fraudlab_domain::{PipelineError, Result};

use crate::table_err;

/// Writes through `fill` into a temp file beside `path`, then renames it
/// over `path`. On error the destination is left untouched.
pub fn write_atomic<F>(path: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&mut File) -> Result<()>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| PipelineError::io(dir, e))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| PipelineError::io(dir, e))?;
    fill(tmp.as_file_mut())?;
    tmp.as_file_mut()
        .sync_all()
        .map_err(|e| PipelineError::io(tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| PipelineError::io(path, e.error))?;
    Ok(())
}

pub fn write_csv(path: &Path, frame: &mut DataFrame) -> Result<()> {
    write_atomic(path, |file| {
        CsvWriter::new(file)
            .include_header(true)
            .finish(frame)
            .map_err(table_err)
    })?;
    tracing::debug!(path = %path.display(), rows = frame.height(), "csv artifact written");
    Ok(())
}

/// Pretty JSON with two-space indentation.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let body = serde_json::to_string_pretty(value)?;
    write_atomic(path, |file| {
        file.write_all(body.as_bytes())
            .map_err(|e| PipelineError::io(path, e))
    })
}

/// One entry per line beneath a header line.
pub fn write_lines(path: &Path, header: &str, lines: &[String]) -> Result<()> {
    write_atomic(path, |file| {
        let mut out = BufWriter::new(file);
        writeln!(out, "{header}").map_err(|e| PipelineError::io(path, e))?;
        for line in lines {
            writeln!(out, "{line}").map_err(|e| PipelineError::io(path, e))?;
        }
        out.flush().map_err(|e| PipelineError::io(path, e))
    })
}
