use csv::StringRecord;
use encoding_rs::Encoding;
use encoding_rs_io::DecodeReaderBytesBuilder;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to open {path:?}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("unknown text encoding label: {0}")]
    UnknownEncoding(String),
    #[error("malformed CSV in {path:?}: {source}")]
    Csv {
        path: PathBuf,
        source: csv::Error,
    },
}

/// Column-name index shared by every record of one file.
#[derive(Debug)]
struct HeaderIndex {
    by_name: HashMap<String, usize>,
}

impl HeaderIndex {
    fn new(headers: &StringRecord) -> Self {
        let mut by_name = HashMap::with_capacity(headers.len());
        for (idx, name) in headers.iter().enumerate() {
            // First header wins on duplicate column names.
            by_name.entry(name.trim().to_string()).or_insert(idx);
        }
        Self { by_name }
    }
}

/// One decoded CSV row with field access by declared column name.
///
/// Ragged rows are tolerated: a column the row does not reach reads as
/// absent, the same as a column the file never declared.
#[derive(Debug)]
pub struct Record {
    header: Arc<HeaderIndex>,
    fields: StringRecord,
}

impl Record {
    pub fn get(&self, column: &str) -> Option<&str> {
        let idx = *self.header.by_name.get(column)?;
        self.fields.get(idx)
    }

    /// Trimmed, non-empty field value.
    pub fn require(&self, column: &str) -> Option<&str> {
        let value = self.get(column)?.trim();
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }
}

/// Lazy, single-pass reader over a delimiter-separated file in a legacy
/// single-byte encoding. The whole file is never held in memory.
pub struct CsvDecoder {
    path: PathBuf,
    header: Arc<HeaderIndex>,
    records: csv::StringRecordsIntoIter<Box<dyn std::io::Read>>,
}

impl std::fmt::Debug for CsvDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsvDecoder")
            .field("path", &self.path)
            .field("header", &self.header)
            .finish_non_exhaustive()
    }
}

impl CsvDecoder {
    pub fn open(path: &Path, encoding_label: &str, delimiter: u8) -> Result<Self, DecodeError> {
        let encoding = Encoding::for_label(encoding_label.as_bytes())
            .ok_or_else(|| DecodeError::UnknownEncoding(encoding_label.to_string()))?;

        let file = File::open(path).map_err(|source| DecodeError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let transcoded: Box<dyn std::io::Read> = Box::new(
            DecodeReaderBytesBuilder::new()
                .encoding(Some(encoding))
                .build(BufReader::new(file)),
        );

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(transcoded);

        let headers = reader.headers().map_err(|source| DecodeError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        let header = Arc::new(HeaderIndex::new(headers));

        Ok(Self {
            path: path.to_path_buf(),
            header,
            records: reader.into_records(),
        })
    }
}

impl Iterator for CsvDecoder {
    type Item = Result<Record, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.records.next()?;
        Some(match next {
            Ok(fields) => Ok(Record {
                header: Arc::clone(&self.header),
                fields,
            }),
            Err(source) => Err(DecodeError::Csv {
                path: self.path.clone(),
                source,
            }),
        })
    }
}
