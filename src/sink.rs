use crate::errors::DataError;
use crate::models::{LogRecord, CSV_HEADER};
use crate::store::LogStore;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Consumer of parsed records for a single input.
pub trait Sink {
    fn write(&mut self, record: &LogRecord) -> Result<(), DataError>;

    /// Called once after the last record of an input.
    fn finish(&mut self) -> Result<(), DataError>;
}

/// Opens one sink per input file.
pub trait Destination {
    type Sink: Sink;

    /// Extension given to outputs named after their inputs in directory mode.
    fn extension(&self) -> &str;

    /// Whether each input in directory mode gets its own output named after it.
    fn per_input_outputs(&self) -> bool {
        true
    }

    /// Makes the output location ready before a directory of inputs is processed.
    fn prepare(&mut self) -> Result<(), DataError> {
        Ok(())
    }

    /// `name` is the output file name derived from the input in directory mode and `None` when
    /// a single file is converted.
    fn open(&mut self, name: Option<&str>) -> Result<Self::Sink, DataError>;
}

pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
    name: String,
}

impl CsvSink<File> {
    /// Creates the csv file (and any missing parent directories) and writes the header.
    pub fn create(path: &Path) -> Result<CsvSink<File>, DataError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| DataError::io(parent, e))?;
            }
        }

        let file = File::create(path).map_err(|e| DataError::io(path, e))?;
        CsvSink::from_writer(file, path.display().to_string())
    }
}

impl<W: Write> CsvSink<W> {
    pub fn from_writer(wtr: W, name: String) -> Result<CsvSink<W>, DataError> {
        let mut writer = csv::Writer::from_writer(wtr);
        writer
            .write_record(&CSV_HEADER)
            .map_err(|e| DataError::Csv(name.clone(), e))?;
        Ok(CsvSink { writer, name })
    }

    pub fn into_inner(self) -> Result<W, DataError> {
        let name = self.name;
        self.writer.into_inner().map_err(|e| {
            let err = e.error();
            DataError::IoFailure(name, io::Error::new(err.kind(), err.to_string()))
        })
    }
}

impl<W: Write> Sink for CsvSink<W> {
    fn write(&mut self, record: &LogRecord) -> Result<(), DataError> {
        self.writer
            .write_record(&record.fields())
            .map_err(|e| DataError::Csv(self.name.clone(), e))
    }

    fn finish(&mut self) -> Result<(), DataError> {
        self.writer
            .flush()
            .map_err(|e| DataError::IoFailure(self.name.clone(), e))
    }
}

/// Buffers records and hands them to the store in batches of `threshold`.
pub struct StoreSink<'a> {
    store: &'a LogStore,
    buffer: Vec<LogRecord>,
    threshold: usize,
}

impl<'a> StoreSink<'a> {
    pub fn new(store: &'a LogStore, threshold: usize) -> StoreSink<'a> {
        let threshold = threshold.max(1);
        StoreSink {
            store,
            buffer: Vec::with_capacity(threshold),
            threshold,
        }
    }

    fn flush_buffer(&mut self) -> Result<(), DataError> {
        self.store.save(&self.buffer)?;
        self.buffer.clear();
        Ok(())
    }
}

impl<'a> Sink for StoreSink<'a> {
    fn write(&mut self, record: &LogRecord) -> Result<(), DataError> {
        self.buffer.push(record.clone());
        if self.buffer.len() >= self.threshold {
            self.flush_buffer()?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), DataError> {
        self.flush_buffer()
    }
}

/// Writes `line: <record>` for every record, used for dry runs.
pub struct PrintSink<W: Write> {
    out: W,
}

impl<W: Write> PrintSink<W> {
    pub fn new(out: W) -> PrintSink<W> {
        PrintSink { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Sink for PrintSink<W> {
    fn write(&mut self, record: &LogRecord) -> Result<(), DataError> {
        writeln!(&mut self.out, "line: {}", record)
            .map_err(|e| DataError::IoFailure(String::from("stdout"), e))
    }

    fn finish(&mut self) -> Result<(), DataError> {
        self.out
            .flush()
            .map_err(|e| DataError::IoFailure(String::from("stdout"), e))
    }
}

/// A csv file in single-file mode, a directory of csv files in directory mode.
pub struct CsvDestination {
    path: PathBuf,
}

impl CsvDestination {
    pub fn new<P: Into<PathBuf>>(path: P) -> CsvDestination {
        CsvDestination { path: path.into() }
    }
}

impl Destination for CsvDestination {
    type Sink = CsvSink<File>;

    fn extension(&self) -> &str {
        "csv"
    }

    fn prepare(&mut self) -> Result<(), DataError> {
        fs::create_dir_all(&self.path).map_err(|e| DataError::io(&self.path, e))
    }

    fn open(&mut self, name: Option<&str>) -> Result<CsvSink<File>, DataError> {
        match name {
            Some(name) => CsvSink::create(&self.path.join(name)),
            None => CsvSink::create(&self.path),
        }
    }
}

/// Every input feeds the same store.
pub struct StoreDestination<'a> {
    store: &'a LogStore,
    threshold: usize,
}

impl<'a> StoreDestination<'a> {
    pub fn new(store: &'a LogStore, threshold: usize) -> StoreDestination<'a> {
        StoreDestination { store, threshold }
    }
}

impl<'a> Destination for StoreDestination<'a> {
    type Sink = StoreSink<'a>;

    fn extension(&self) -> &str {
        "db"
    }

    fn per_input_outputs(&self) -> bool {
        false
    }

    fn open(&mut self, name: Option<&str>) -> Result<StoreSink<'a>, DataError> {
        if let Some(name) = name {
            debug!("Records for {} go to the store", name);
        }
        Ok(StoreSink::new(self.store, self.threshold))
    }
}

pub struct PrintDestination;

impl Destination for PrintDestination {
    type Sink = PrintSink<io::Stdout>;

    fn extension(&self) -> &str {
        "txt"
    }

    fn per_input_outputs(&self) -> bool {
        false
    }

    fn open(&mut self, _name: Option<&str>) -> Result<PrintSink<io::Stdout>, DataError> {
        Ok(PrintSink::new(io::stdout()))
    }
}
