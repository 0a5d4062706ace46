use ngxlog_core::store::Audit;
use std::path::{Path, PathBuf};
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
#[structopt(
    name = "ngxlog",
    about = "Converts nginx access logs to csv or persists them to SQLite"
)]
pub struct Opt {
    #[structopt(
        short = "i",
        long = "input",
        parse(from_os_str),
        help = "Log file, or directory containing log files"
    )]
    pub input: PathBuf,

    #[structopt(
        short = "o",
        long = "output",
        parse(from_os_str),
        help = "Output csv file, or directory for csv files when the input is a directory"
    )]
    pub output: Option<PathBuf>,

    #[structopt(
        long = "db",
        help = "Filepath to sqlite database. Logs are persisted there instead of written as csv"
    )]
    pub db: Option<String>,

    #[structopt(
        short = "d",
        long = "dry-run",
        help = "Print the parsed logs to stdout instead of writing them anywhere"
    )]
    pub dry_run: bool,

    #[structopt(
        short = "b",
        long = "buffer",
        help = "number of log lines to buffer before inserting into db",
        default_value = "10"
    )]
    pub buffer: usize,

    #[structopt(
        long = "suffix",
        help = "Suffix (case insensitive) of the files read from an input directory",
        default_value = ".log"
    )]
    pub suffix: String,

    #[structopt(
        long = "host-name",
        help = "Site the logs belong to, recorded with each row in the db",
        default_value = "-"
    )]
    pub host_name: String,

    #[structopt(
        long = "created-by",
        help = "Principal recorded as the creator of each row in the db",
        default_value = "system"
    )]
    pub created_by: String,
}

#[derive(Debug, PartialEq)]
pub enum Target<'a> {
    Csv(&'a Path),
    Db(&'a str),
    DryRun,
}

#[derive(Fail, Debug)]
pub enum OptError {
    #[fail(display = "Both --input and --output are required (or use --db / --dry-run)")]
    MissingOutput,
}

impl Opt {
    /// Where parsed records go. A dry run wins over the db, which wins over csv.
    pub fn target(&self) -> Result<Target<'_>, OptError> {
        if self.dry_run {
            Ok(Target::DryRun)
        } else if let Some(ref db) = self.db {
            Ok(Target::Db(db))
        } else if let Some(ref output) = self.output {
            Ok(Target::Csv(output))
        } else {
            Err(OptError::MissingOutput)
        }
    }

    pub fn audit(&self) -> Audit {
        Audit {
            host_name: self.host_name.clone(),
            created_by: self.created_by.clone(),
        }
    }
}
