use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

const HEADER: &[u8] = br#"{"horseLists":["#;
const FOOTER: &[u8] = b"]}\n";

/// Writes `{"horseLists":[...]}` one element at a time.
pub struct JsonArrayWriter<W: Write> {
    out: W,
    first: bool,
}

impl<W: Write> JsonArrayWriter<W> {
    pub fn start(mut out: W) -> Result<Self> {
        out.write_all(HEADER)?;
        Ok(JsonArrayWriter { out, first: true })
    }

    pub fn push<T: Serialize>(&mut self, entry: &T) -> Result<()> {
        if !self.first {
            self.out.write_all(b",")?;
        }
        serde_json::to_writer(&mut self.out, entry)?;
        self.first = false;
        Ok(())
    }

    pub fn finish(mut self) -> Result<W> {
        self.out.write_all(FOOTER)?;
        self.out.flush()?;
        Ok(self.out)
    }
}

/// Newline-delimited compact JSON, one value per line.
pub struct NdjsonWriter<W: Write> {
    out: W,
}

impl<W: Write> NdjsonWriter<W> {
    pub fn new(out: W) -> Self {
        NdjsonWriter { out }
    }

    pub fn push<T: Serialize>(&mut self, value: &T) -> Result<()> {
        serde_json::to_writer(&mut self.out, value)?;
        self.out.write_all(b"\n")?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

/// Create (truncating) a buffered file, making parent directories first.
pub fn create_file(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    Ok(BufWriter::new(file))
}
