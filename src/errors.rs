use diesel::result::ConnectionError;
use diesel::result::Error as DsError;
use std::io;
use std::path::Path;

#[derive(Fail, Debug)]
pub enum DataError {
    #[fail(display = "No files with the expected suffix found in {}", _0)]
    NoInputFiles(String),

    #[fail(display = "Output {} was already written from {}", _0, _1)]
    OutputClash(String, String),

    #[fail(display = "I/O failure on {}: {}", _0, _1)]
    IoFailure(String, #[cause] io::Error),

    #[fail(display = "Unable to write csv {}: {}", _0, _1)]
    Csv(String, #[cause] csv::Error),

    #[fail(display = "Unable to connect to database {}: {}", _0, _1)]
    DbConn(String, #[cause] ConnectionError),

    #[fail(display = "Unable to execute query: {}: {}", _0, _1)]
    DbQuery(String, #[cause] DsError),
}

impl DataError {
    pub(crate) fn io(path: &Path, err: io::Error) -> DataError {
        DataError::IoFailure(path.display().to_string(), err)
    }
}
