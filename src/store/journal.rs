//! File-backed store: a JSON-lines journal of put/delete operations.
//!
//! The whole table is held in memory; the journal is replayed on open and
//! appended to on every write. The file does not exist until the first
//! write. [`JournalStore::compact`] rewrites it as one `put` per live record
//! through a temp file and rename.
//!
//! Durability is best effort: lines are flushed but not fsynced, and a torn
//! final line is dropped on replay.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::RecordStore;
use crate::error::{IndexError, Result};
use crate::record::Record;
use crate::trie::Frequency;

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
enum JournalOp {
    Put { code: String, word: String, freq: Frequency },
    Delete { code: String, word: String },
}

pub struct JournalStore {
    path: PathBuf,
    table: BTreeMap<(String, String), Frequency>,
    writer: Option<BufWriter<File>>,
    /// Lines in the journal file, live or superseded.
    journal_lines: usize,
}

impl JournalStore {
    /// Open the journal at `path`, replaying it if present.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut store = Self {
            path,
            table: BTreeMap::new(),
            writer: None,
            journal_lines: 0,
        };
        if store.path.exists() && store.replay()? {
            // Appending after a partial line would glue two records together.
            store.compact()?;
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Journal lines that no longer describe a live record.
    pub fn garbage_lines(&self) -> usize {
        self.journal_lines.saturating_sub(self.table.len())
    }

    /// Load the journal. Returns true if a torn tail was dropped.
    fn replay(&mut self) -> Result<bool> {
        let reader = BufReader::new(File::open(&self.path)?);
        let lines: Vec<String> = reader.lines().collect::<std::io::Result<_>>()?;
        let last = lines.iter().rposition(|l| !l.trim().is_empty());
        let mut torn = false;

        for (lineno, line) in lines.iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let op = match serde_json::from_str::<JournalOp>(line) {
                Ok(op) => op,
                Err(e) if Some(lineno) == last => {
                    tracing::warn!(
                        path = %self.path.display(),
                        line = lineno + 1,
                        "dropping torn journal tail: {}",
                        e
                    );
                    torn = true;
                    break;
                }
                Err(e) => {
                    return Err(IndexError::Store(format!(
                        "{}:{}: {}",
                        self.path.display(),
                        lineno + 1,
                        e
                    )));
                }
            };
            self.apply(op);
            self.journal_lines += 1;
        }

        tracing::debug!(
            path = %self.path.display(),
            records = self.table.len(),
            lines = self.journal_lines,
            "journal replayed"
        );
        Ok(torn)
    }

    fn apply(&mut self, op: JournalOp) {
        match op {
            JournalOp::Put { code, word, freq } => {
                self.table.insert((word, code), freq);
            }
            JournalOp::Delete { code, word } => {
                self.table.remove(&(word, code));
            }
        }
    }

    /// Lazily open (and on first use, create) the journal for appending.
    fn writer(&mut self) -> Result<&mut BufWriter<File>> {
        if self.writer.is_none() {
            if let Some(parent) = self.path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)?;
            self.writer = Some(BufWriter::new(file));
        }
        match self.writer.as_mut() {
            Some(w) => Ok(w),
            None => Err(IndexError::Store("journal writer unavailable".to_string())),
        }
    }

    fn append(&mut self, ops: &[JournalOp]) -> Result<()> {
        let writer = self.writer()?;
        for op in ops {
            serde_json::to_writer(&mut *writer, op)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        self.journal_lines += ops.len();
        Ok(())
    }

    /// Rewrite the journal with one `put` per live record.
    pub fn compact(&mut self) -> Result<()> {
        self.writer = None;
        let tmp_path = self.path.with_extension("tmp");
        {
            let mut tmp = BufWriter::new(File::create(&tmp_path)?);
            for ((word, code), freq) in &self.table {
                let op = JournalOp::Put {
                    code: code.clone(),
                    word: word.clone(),
                    freq: *freq,
                };
                serde_json::to_writer(&mut tmp, &op)?;
                tmp.write_all(b"\n")?;
            }
            tmp.flush()?;
        }
        fs::rename(&tmp_path, &self.path)?;

        let dropped = self.garbage_lines();
        self.journal_lines = self.table.len();
        tracing::info!(
            path = %self.path.display(),
            records = self.table.len(),
            dropped,
            "journal compacted"
        );
        Ok(())
    }
}

impl RecordStore for JournalStore {
    fn fetch_all(&mut self) -> Result<Vec<Record>> {
        Ok(self
            .table
            .iter()
            .map(|((word, code), freq)| Record::new(code.as_str(), word.as_str(), *freq))
            .collect())
    }

    fn add(&mut self, record: &Record) -> Result<()> {
        self.add_many(std::slice::from_ref(record))
    }

    fn add_many(&mut self, records: &[Record]) -> Result<()> {
        let ops: Vec<JournalOp> = records
            .iter()
            .map(|r| JournalOp::Put {
                code: r.code.clone(),
                word: r.name.clone(),
                freq: r.frequency,
            })
            .collect();
        // Journal first: the table never runs ahead of the file.
        self.append(&ops)?;
        for op in ops {
            self.apply(op);
        }
        Ok(())
    }

    fn remove(&mut self, code: &str, name: &str) -> Result<()> {
        let op = JournalOp::Delete {
            code: code.to_string(),
            word: name.to_string(),
        };
        self.append(std::slice::from_ref(&op))?;
        self.apply(op);
        Ok(())
    }
}
