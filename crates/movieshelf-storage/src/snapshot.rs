//! Collection export files: either one JSON document per line or a single
//! JSON array, optionally zstd-compressed (`.zst`).

use crate::mem::InMemoryStore;
use serde_json::Value;
use std::{
    fs::File,
    io::{BufRead, BufReader, Read},
    path::Path,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: {source}")]
    Line {
        line: usize,
        source: serde_json::Error,
    },
    #[error("json array: {0}")]
    Array(serde_json::Error),
    #[error("line {line}: expected a JSON object")]
    NotAnObject { line: usize },
}

fn open(path: &Path) -> std::io::Result<Box<dyn BufRead>> {
    let fh = File::open(path)?;
    let compressed = path.extension().is_some_and(|e| e == "zst");
    Ok(if compressed {
        Box::new(BufReader::new(zstd::stream::read::Decoder::new(fh)?))
    } else {
        Box::new(BufReader::new(fh))
    })
}

pub fn read_documents(path: &Path) -> Result<Vec<Value>, SnapshotError> {
    let mut reader = open(path)?;
    let starts_with_array = {
        let buf = reader.fill_buf()?;
        buf.iter()
            .find(|b| !b.is_ascii_whitespace())
            .is_some_and(|b| *b == b'[')
    };
    if starts_with_array {
        let mut raw = String::new();
        reader.read_to_string(&mut raw)?;
        let docs: Vec<Value> = serde_json::from_str(&raw).map_err(SnapshotError::Array)?;
        if let Some(pos) = docs.iter().position(|d| !d.is_object()) {
            return Err(SnapshotError::NotAnObject { line: pos + 1 });
        }
        return Ok(docs);
    }

    let mut out = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let doc: Value = serde_json::from_str(&line).map_err(|source| SnapshotError::Line {
            line: idx + 1,
            source,
        })?;
        if !doc.is_object() {
            return Err(SnapshotError::NotAnObject { line: idx + 1 });
        }
        out.push(doc);
    }
    Ok(out)
}

pub fn load_store(path: &Path) -> Result<InMemoryStore, SnapshotError> {
    let store = InMemoryStore::from_documents(read_documents(path)?);
    if store.is_empty() {
        tracing::warn!(path = %path.display(), "snapshot holds no documents");
    } else {
        tracing::info!(path = %path.display(), documents = store.len(), "loaded snapshot");
    }
    Ok(store)
}
