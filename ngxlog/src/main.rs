#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

use chrono::prelude::*;
use diesel::prelude::*;
use env_logger::{Builder, Target as LogTarget};
use failure::Error;
use ngxlog_core::batch::{Batch, Mode, Report};
use ngxlog_core::errors::DataError;
use ngxlog_core::sink::{CsvDestination, PrintDestination, StoreDestination};
use ngxlog_core::store::LogStore;
use std::io::Write;
use structopt::StructOpt;

mod options;

use crate::options::{Opt, Target};

fn init_logging() -> Result<(), log::SetLoggerError> {
    Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] - {}",
                Local::now().format("%Y-%m-%dT%H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .parse_filters(&std::env::var("RUST_LOG").unwrap_or_else(|_| String::from("info")))
        .target(LogTarget::Stdout)
        .try_init()
}

fn main() {
    init_logging().expect("Logging to initialize");
    let opt = Opt::from_args();
    if let Err(e) = run(&opt) {
        error!("{}", e);
        std::process::exit(1);
    }

    println!("Conversion completed successfully!");
}

fn run(opt: &Opt) -> Result<(), Error> {
    let target = opt.target()?;
    let mode = Mode::detect(&opt.input)?;
    let batch = Batch::new(opt.suffix.as_str());

    match mode {
        Mode::Directory => info!("Processing log files in directory: {}", opt.input.display()),
        Mode::SingleFile => info!("Processing single log file: {}", opt.input.display()),
    }

    let report = match target {
        Target::Csv(output) => {
            info!("Output: {}", output.display());
            batch.run(&opt.input, &mut CsvDestination::new(output), mode)?
        }
        Target::DryRun => batch.run(&opt.input, &mut PrintDestination, mode)?,
        Target::Db(db) => {
            let conn = SqliteConnection::establish(db)
                .map_err(|e| DataError::DbConn(db.to_owned(), e))?;
            let store = LogStore::new(conn, opt.audit())?;
            let report = batch.run(
                &opt.input,
                &mut StoreDestination::new(&store, opt.buffer),
                mode,
            );
            store.close();
            report?
        }
    };

    if let Report::Directory(ref outcomes) = report {
        let failed = outcomes.iter().filter(|x| x.result.is_err()).count();
        if failed > 0 {
            warn!("{} of {} log files could not be processed", failed, outcomes.len());
        }
    }

    Ok(())
}
