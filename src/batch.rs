use crate::errors::DataError;
use crate::parser::parse_nginx_line;
use crate::sink::{Destination, Sink};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    SingleFile,
    Directory,
}

impl Mode {
    /// Directory mode when the path is a directory, single-file mode otherwise.
    pub fn detect(path: &Path) -> Result<Mode, DataError> {
        let meta = fs::metadata(path).map_err(|e| DataError::io(path, e))?;
        if meta.is_dir() {
            Ok(Mode::Directory)
        } else {
            Ok(Mode::SingleFile)
        }
    }
}

/// Line counts for one input. `lines` includes blank lines, which are neither parsed nor failed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub lines: usize,
    pub parsed: usize,
    pub failed: usize,
}

#[derive(Debug)]
pub struct FileOutcome {
    pub input: PathBuf,
    pub result: Result<Summary, DataError>,
}

#[derive(Debug)]
pub enum Report {
    File(Summary),
    Directory(Vec<FileOutcome>),
}

pub struct Batch {
    suffix: String,
}

impl Default for Batch {
    fn default() -> Batch {
        Batch::new(".log")
    }
}

impl Batch {
    pub fn new<S: Into<String>>(suffix: S) -> Batch {
        Batch {
            suffix: suffix.into(),
        }
    }

    pub fn run<D: Destination>(
        &self,
        source: &Path,
        dest: &mut D,
        mode: Mode,
    ) -> Result<Report, DataError> {
        match mode {
            Mode::SingleFile => self.convert_file(source, dest, None).map(Report::File),
            Mode::Directory => self.convert_directory(source, dest).map(Report::Directory),
        }
    }

    fn convert_file<D: Destination>(
        &self,
        input: &Path,
        dest: &mut D,
        name: Option<&str>,
    ) -> Result<Summary, DataError> {
        let file = File::open(input).map_err(|e| DataError::io(input, e))?;
        let mut sink = dest.open(name)?;
        let summary = process_reader(BufReader::new(file), input, &mut sink)?;

        info!("Input file: {}", input.display());
        info!("Successfully parsed: {} lines", summary.parsed);
        info!("Failed to parse: {} lines", summary.failed);
        info!("Total lines processed: {}", summary.lines);
        Ok(summary)
    }

    fn convert_directory<D: Destination>(
        &self,
        input_dir: &Path,
        dest: &mut D,
    ) -> Result<Vec<FileOutcome>, DataError> {
        let inputs = self.matching_files(input_dir)?;
        if inputs.is_empty() {
            return Err(DataError::NoInputFiles(input_dir.display().to_string()));
        }

        dest.prepare()?;

        info!("Found {} log files to process", inputs.len());
        let mut outcomes = Vec::with_capacity(inputs.len());
        // Keyed on the lowercased name so case-insensitive filesystems can't clash either
        let mut written: HashMap<String, PathBuf> = HashMap::new();
        for (input, stem) in inputs {
            let name = format!("{}.{}", stem, dest.extension());
            info!("Processing: {}", input.display());
            let clash = if dest.per_input_outputs() {
                written.get(&name.to_lowercase())
            } else {
                None
            };
            let result = match clash {
                Some(first) => Err(DataError::OutputClash(
                    name.clone(),
                    first.display().to_string(),
                )),
                None => {
                    written.insert(name.to_lowercase(), input.clone());
                    self.convert_file(&input, dest, Some(&name))
                }
            };
            if let Err(ref e) = result {
                error!("Error processing {}: {}", input.display(), e);
            }
            outcomes.push(FileOutcome { input, result });
        }

        Ok(outcomes)
    }

    /// Non-directory entries ending with the suffix, sorted by name, each paired with its name
    /// minus the suffix.
    fn matching_files(&self, dir: &Path) -> Result<Vec<(PathBuf, String)>, DataError> {
        let entries = fs::read_dir(dir).map_err(|e| DataError::io(dir, e))?;
        let mut result = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(ref e) => {
                    warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                    continue;
                }
            };

            match entry.file_type() {
                Ok(file_type) if file_type.is_dir() => continue,
                Ok(_) => {}
                Err(ref e) => {
                    warn!("Skipping {}: {}", entry.path().display(), e);
                    continue;
                }
            }

            let file_name = entry.file_name();
            let file_name = file_name.to_string_lossy();
            if let Some(stem) = strip_suffix_ignore_case(&file_name, &self.suffix) {
                result.push((entry.path(), String::from(stem)));
            }
        }

        result.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(result)
    }
}

fn strip_suffix_ignore_case<'a>(name: &'a str, suffix: &str) -> Option<&'a str> {
    let cut = name.len().checked_sub(suffix.len())?;
    if name.is_char_boundary(cut) && name[cut..].eq_ignore_ascii_case(suffix) {
        Some(&name[..cut])
    } else {
        None
    }
}

/// Parses every line of the reader into the sink. Blank lines are skipped, unparseable lines
/// are logged and counted. Invalid UTF-8 is replaced rather than rejected.
pub fn process_reader<R: BufRead, S: Sink>(
    mut reader: R,
    source: &Path,
    sink: &mut S,
) -> Result<Summary, DataError> {
    let mut summary = Summary::default();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .map_err(|e| DataError::io(source, e))?;
        if read == 0 {
            break;
        }

        summary.lines += 1;
        let line = String::from_utf8_lossy(&buf);
        if line.trim().is_empty() {
            continue;
        }

        match parse_nginx_line(&line) {
            Ok(record) => {
                sink.write(&record)?;
                summary.parsed += 1;
            }
            Err(ref e) => {
                summary.failed += 1;
                warn!(
                    "Failed to parse line {} of {}: {}",
                    summary.lines,
                    source.display(),
                    e
                );
            }
        }
    }

    sink.finish()?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{CsvDestination, CsvSink};
    use std::io::{Cursor, Write};
    use tempdir::TempDir;

    const GOOD: &str = r#"127.0.0.1 - - [10/Oct/2023:13:55:36 -0700] "GET /index.html HTTP/1.1" 200 2326 "-" "Mozilla/5.0""#;
    const COMMON: &str = r#"10.1.1.1 - - [10/Oct/2023:13:55:37 -0700] "HEAD / HTTP/1.0" 304 0"#;
    const HEADER: &str = "IP,Timestamp,RequestMethod,RequestURI,HTTPVersion,ResponseStatus,ResponseSize,Referer,UserAgent,RemoteUser";

    fn write_file(path: &Path, lines: &[&str]) {
        let mut f = File::create(path).unwrap();
        for line in lines {
            writeln!(f, "{}", line).unwrap();
        }
    }

    fn csv_over(input: &str) -> (Summary, String) {
        let mut sink = CsvSink::from_writer(Vec::new(), String::from("mem")).unwrap();
        let summary =
            process_reader(Cursor::new(input.as_bytes()), Path::new("mem"), &mut sink).unwrap();
        let out = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        (summary, out)
    }

    #[test]
    fn blank_lines_are_not_failures() {
        let input = format!("{}\n\n   \n\t\n{}\n", GOOD, COMMON);
        let (summary, out) = csv_over(&input);
        assert_eq!(
            summary,
            Summary {
                lines: 5,
                parsed: 2,
                failed: 0
            }
        );
        assert_eq!(out.lines().count(), 3);
    }

    #[test]
    fn unparseable_lines_counted_and_skipped() {
        let input = format!("{}\nnot a log line\n{}", GOOD, COMMON);
        let (summary, out) = csv_over(&input);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.parsed, 2);
        assert_eq!(summary.lines, 3);

        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines[0], HEADER);
        assert!(lines[1].starts_with("127.0.0.1,"));
        assert_eq!(
            lines[2],
            "10.1.1.1,10/Oct/2023:13:55:37 -0700,HEAD,/,HTTP/1.0,304,0,,,-"
        );
        assert!(!out.contains("not a log line"));
    }

    #[test]
    fn crlf_and_invalid_utf8_tolerated() {
        let mut input = Vec::new();
        input.extend_from_slice(GOOD.as_bytes());
        input.extend_from_slice(b"\r\n");
        input.extend_from_slice(b"10.0.0.1 - - [10/Oct/2023:13:55:36 +0000] \"GET /\xff HTTP/1.1\" 200 1\r\n");

        let mut sink = CsvSink::from_writer(Vec::new(), String::from("mem")).unwrap();
        let summary =
            process_reader(Cursor::new(input), Path::new("mem"), &mut sink).unwrap();
        assert_eq!(summary.parsed, 2);
        assert_eq!(summary.failed, 0);
    }

    #[test]
    fn single_file_mode() {
        let dir = TempDir::new("ngxlog-batch").unwrap();
        let input = dir.path().join("access.log");
        write_file(&input, &[GOOD, "", "garbage", COMMON]);
        let output = dir.path().join("out").join("access.csv");

        let mut dest = CsvDestination::new(&output);
        let report = Batch::default()
            .run(&input, &mut dest, Mode::SingleFile)
            .unwrap();
        match report {
            Report::File(summary) => assert_eq!(
                summary,
                Summary {
                    lines: 4,
                    parsed: 2,
                    failed: 1
                }
            ),
            x => panic!("unexpected report {:?}", x),
        }

        let csv = fs::read_to_string(&output).unwrap();
        assert_eq!(csv.lines().count(), 3);
        assert_eq!(csv.lines().next().unwrap(), HEADER);
    }

    #[test]
    fn missing_input_fails_before_output_is_created() {
        let dir = TempDir::new("ngxlog-batch").unwrap();
        let output = dir.path().join("out.csv");
        let mut dest = CsvDestination::new(&output);
        let result = Batch::default().run(
            &dir.path().join("missing.log"),
            &mut dest,
            Mode::SingleFile,
        );
        match result {
            Err(DataError::IoFailure(..)) => {}
            x => panic!("unexpected result {:?}", x),
        }
        assert!(!output.exists());
    }

    #[test]
    fn directory_mode_converts_matching_files() {
        let dir = TempDir::new("ngxlog-batch").unwrap();
        let input = dir.path().join("in");
        let output = dir.path().join("out");
        fs::create_dir(&input).unwrap();
        fs::create_dir(input.join("nested.log")).unwrap();
        write_file(&input.join("b.log"), &[COMMON]);
        write_file(&input.join("A.LOG"), &[GOOD, GOOD]);
        write_file(&input.join("notes.txt"), &[GOOD]);

        let mut dest = CsvDestination::new(&output);
        let report = Batch::default()
            .run(&input, &mut dest, Mode::Directory)
            .unwrap();

        let outcomes = match report {
            Report::Directory(outcomes) => outcomes,
            x => panic!("unexpected report {:?}", x),
        };
        let names: Vec<_> = outcomes
            .iter()
            .map(|x| x.input.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["A.LOG", "b.log"]);
        assert!(outcomes.iter().all(|x| x.result.is_ok()));

        let a = fs::read_to_string(output.join("A.csv")).unwrap();
        assert_eq!(a.lines().count(), 3);
        let b = fs::read_to_string(output.join("b.csv")).unwrap();
        assert_eq!(b.lines().count(), 2);
        assert!(!output.join("notes.csv").exists());
    }

    #[test]
    fn directory_mode_refuses_clashing_output_names() {
        let dir = TempDir::new("ngxlog-batch").unwrap();
        let input = dir.path().join("in");
        let output = dir.path().join("out");
        fs::create_dir(&input).unwrap();
        write_file(&input.join("x.Log"), &[GOOD, GOOD]);
        write_file(&input.join("x.log"), &[COMMON]);

        let mut dest = CsvDestination::new(&output);
        let outcomes = match Batch::default().run(&input, &mut dest, Mode::Directory) {
            Ok(Report::Directory(outcomes)) => outcomes,
            x => panic!("unexpected result {:?}", x),
        };

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].input.file_name().unwrap(), "x.Log");
        assert_eq!(outcomes[0].result.as_ref().unwrap().parsed, 2);
        match outcomes[1].result {
            Err(DataError::OutputClash(ref name, ref first)) => {
                assert_eq!(name, "x.csv");
                assert!(first.ends_with("x.Log"));
            }
            ref x => panic!("unexpected result {:?}", x),
        }

        let csv = fs::read_to_string(output.join("x.csv")).unwrap();
        assert_eq!(csv.lines().count(), 3);
        assert!(!csv.contains("10.1.1.1"));
    }

    #[test]
    fn directory_mode_shared_store_has_no_clashes() {
        use crate::sink::StoreDestination;
        use crate::store::{Audit, LogStore};
        use diesel::prelude::*;

        let dir = TempDir::new("ngxlog-batch").unwrap();
        write_file(&dir.path().join("x.Log"), &[GOOD, GOOD]);
        write_file(&dir.path().join("x.log"), &[COMMON]);

        let store = LogStore::new(
            SqliteConnection::establish(":memory:").unwrap(),
            Audit::default(),
        )
        .unwrap();
        let mut dest = StoreDestination::new(&store, 10);
        let outcomes = match Batch::default().run(dir.path(), &mut dest, Mode::Directory) {
            Ok(Report::Directory(outcomes)) => outcomes,
            x => panic!("unexpected result {:?}", x),
        };

        assert!(outcomes.iter().all(|x| x.result.is_ok()));
        assert_eq!(store.records().unwrap().len(), 3);
    }

    #[test]
    fn directory_mode_custom_suffix() {
        let dir = TempDir::new("ngxlog-batch").unwrap();
        let input = dir.path().join("in");
        fs::create_dir(&input).unwrap();
        write_file(&input.join("access.log.1"), &[GOOD]);
        write_file(&input.join("access.log"), &[GOOD]);

        let output = dir.path().join("out");
        let mut dest = CsvDestination::new(&output);
        Batch::new(".log.1")
            .run(&input, &mut dest, Mode::Directory)
            .unwrap();
        assert!(output.join("access.csv").exists());
        assert_eq!(fs::read_dir(&output).unwrap().count(), 1);
    }

    #[test]
    fn directory_without_matches_writes_nothing() {
        let dir = TempDir::new("ngxlog-batch").unwrap();
        let input = dir.path().join("in");
        fs::create_dir(&input).unwrap();
        write_file(&input.join("readme.txt"), &[GOOD]);
        let output = dir.path().join("out");

        let mut dest = CsvDestination::new(&output);
        match Batch::default().run(&input, &mut dest, Mode::Directory) {
            Err(ref e @ DataError::NoInputFiles(_)) => {
                assert_eq!(
                    e.to_string(),
                    format!(
                        "No files with the expected suffix found in {}",
                        input.display()
                    )
                )
            }
            x => panic!("unexpected result {:?}", x),
        }
        assert!(!output.exists());
    }

    #[cfg(unix)]
    #[test]
    fn directory_mode_survives_unreadable_file() {
        let dir = TempDir::new("ngxlog-batch").unwrap();
        let input = dir.path().join("in");
        let output = dir.path().join("out");
        fs::create_dir(&input).unwrap();
        write_file(&input.join("a.log"), &[GOOD]);
        std::os::unix::fs::symlink(dir.path().join("gone"), input.join("b.log")).unwrap();
        write_file(&input.join("c.log"), &[COMMON, GOOD]);

        let mut dest = CsvDestination::new(&output);
        let outcomes = match Batch::default().run(&input, &mut dest, Mode::Directory) {
            Ok(Report::Directory(outcomes)) => outcomes,
            x => panic!("unexpected result {:?}", x),
        };

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].result.is_ok());
        assert!(outcomes[1].result.is_err());
        assert_eq!(outcomes[2].result.as_ref().unwrap().parsed, 2);

        assert_eq!(fs::read_to_string(output.join("a.csv")).unwrap().lines().count(), 2);
        assert!(!output.join("b.csv").exists());
        assert_eq!(fs::read_to_string(output.join("c.csv")).unwrap().lines().count(), 3);
    }

    #[test]
    fn detect_mode() {
        let dir = TempDir::new("ngxlog-batch").unwrap();
        let file = dir.path().join("access.log");
        write_file(&file, &[GOOD]);
        assert_eq!(Mode::detect(dir.path()).unwrap(), Mode::Directory);
        assert_eq!(Mode::detect(&file).unwrap(), Mode::SingleFile);
        assert!(Mode::detect(&dir.path().join("missing")).is_err());
    }

    #[test]
    fn suffix_matching() {
        assert_eq!(strip_suffix_ignore_case("access.LOG", ".log"), Some("access"));
        assert_eq!(strip_suffix_ignore_case("access.log", ".log"), Some("access"));
        assert_eq!(strip_suffix_ignore_case(".log", ".log"), Some(""));
        assert_eq!(strip_suffix_ignore_case("log", ".log"), None);
        assert_eq!(strip_suffix_ignore_case("access.txt", ".log"), None);
        assert_eq!(strip_suffix_ignore_case("ünï.log", ".log"), Some("ünï"));
    }
}
