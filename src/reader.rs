//! Access to the event records of the input files
//!
//! The analysis only sees events through the `EventSource` interface. Input
//! files hold extracted event records, one JSON object per line, and are
//! chained together in the order given by the glob expansion.

use crate::{event::Event, Result};
use eyre::{ensure, WrapErr};
use globset::GlobBuilder;
use std::{
    fs::{self, File},
    io::{BufRead, BufReader, Seek, SeekFrom},
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

/// Narrow interface through which the analysis reads events
pub trait EventSource {
    /// Number of events available
    fn event_count(&self) -> usize;

    /// Load an event, replacing the previously loaded one
    fn load(&mut self, entry: usize) -> Result<&Event>;
}

impl EventSource for [Event] {
    fn event_count(&self) -> usize {
        self.len()
    }

    fn load(&mut self, entry: usize) -> Result<&Event> {
        let count = self.len();
        self.get(entry)
            .ok_or_else(|| eyre::eyre!("Event {} is out of range ({} events)", entry, count))
    }
}

/// Characters which make a path component a pattern
const GLOB_META: &[char] = &['*', '?', '[', '{'];

/// List the files matching a shell-style glob pattern, in sorted order
///
/// A leading `~` stands for the home directory. A malformed pattern, or one
/// which matches nothing, results in an empty list.
///
pub fn expand_glob(pattern: &str) -> Vec<PathBuf> {
    let pattern = expand_home(pattern);
    let matcher = match GlobBuilder::new(&pattern).literal_separator(true).build() {
        Ok(glob) => glob.compile_matcher(),
        Err(e) => {
            warn!("Ignoring malformed input pattern {}: {}", pattern, e);
            return Vec::new();
        }
    };

    // Split the pattern into a literal directory prefix and a pattern suffix
    let path = Path::new(&pattern);
    let mut base = PathBuf::new();
    let mut depth = 0;
    let mut recursive = false;
    let mut hidden = false;
    for component in path.components() {
        let text = component.as_os_str().to_string_lossy();
        if depth == 0 && !text.contains(GLOB_META) {
            base.push(component);
        } else {
            depth += 1;
            recursive |= text == "**";
            hidden |= text.starts_with('.');
        }
    }

    // Literal paths need no directory walk
    if depth == 0 {
        return if path.is_file() {
            vec![path.to_owned()]
        } else {
            warn!("No input file matches {}", pattern);
            Vec::new()
        };
    }

    let relative = base.as_os_str().is_empty();
    let root = if relative { Path::new(".") } else { base.as_path() };
    let max_depth = if recursive { usize::MAX } else { depth };
    let mut candidates = Vec::new();
    walk_files(root, max_depth, hidden, &mut candidates);

    let mut files = candidates
        .into_iter()
        .map(|file| match (relative, file.strip_prefix(".")) {
            (true, Ok(stripped)) => stripped.to_owned(),
            _ => file,
        })
        .filter(|file| matcher.is_match(file))
        .collect::<Vec<_>>();
    files.sort();
    if files.is_empty() {
        warn!("No input file matches {}", pattern);
    }
    files
}

/// Substitute the home directory for a leading `~`
fn expand_home(pattern: &str) -> String {
    match (pattern.strip_prefix('~'), std::env::var("HOME")) {
        (Some(rest), Ok(home)) if rest.is_empty() || rest.starts_with('/') => home + rest,
        _ => pattern.to_owned(),
    }
}

/// Collect the files found under a directory, down to some depth
///
/// Symbolic links to directories are not followed, which keeps link cycles
/// from being walked forever. Names starting with a dot are skipped unless
/// `hidden` is set, as shell globs do.
///
fn walk_files(dir: &Path, max_depth: usize, hidden: bool, files: &mut Vec<PathBuf>) {
    if max_depth == 0 {
        return;
    }
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Skipping unreadable directory {}: {}", dir.display(), e);
            return;
        }
    };
    for entry in entries.flatten() {
        if !hidden && entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        let path = entry.path();
        if file_type.is_dir() {
            walk_files(&path, max_depth - 1, hidden, files);
        } else if file_type.is_file() || (file_type.is_symlink() && path.is_file()) {
            files.push(path);
        }
    }
}

/// Location of one event record
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Entry {
    /// Index of the file in the chain
    file: usize,

    /// Byte offset of the record in the file
    offset: u64,

    /// Line number of the record in the file (starting at 1)
    line: usize,
}

/// Chain of event record files, indexed for random access
#[derive(Debug, Default)]
pub struct EventFiles {
    /// Files of the chain, in reading order
    paths: Vec<PathBuf>,

    /// Location of each event
    entries: Vec<Entry>,
}
//
impl EventFiles {
    /// Index the events of a set of files
    pub fn open(paths: Vec<PathBuf>) -> Result<Self> {
        let mut entries = Vec::new();
        for (file, path) in paths.iter().enumerate() {
            info!("Reading {}", path.display());
            let mut reader = BufReader::new(
                File::open(path).wrap_err_with(|| format!("Failed to open {}", path.display()))?,
            );
            let mut buffer = String::new();
            let mut offset = 0;
            let mut line = 0;
            loop {
                buffer.clear();
                let length = reader
                    .read_line(&mut buffer)
                    .wrap_err_with(|| format!("Failed to read {}", path.display()))?;
                if length == 0 {
                    break;
                }
                line += 1;
                if !buffer.trim().is_empty() {
                    entries.push(Entry { file, offset, line });
                }
                offset += length as u64;
            }
        }
        Ok(Self { paths, entries })
    }

    /// Number of events in the chain
    pub fn event_count(&self) -> usize {
        self.entries.len()
    }

    /// Files of the chain
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Set up a reader over these files
    ///
    /// Each reader has its own file handles, so several of them can be used
    /// concurrently.
    ///
    pub fn reader(&self) -> FileReader<'_> {
        FileReader {
            files: self,
            handles: (0..self.paths.len()).map(|_| None).collect(),
            buffer: String::new(),
            current: Event::default(),
        }
    }
}

/// Open input file, with the position of its read cursor
struct OpenFile {
    reader: BufReader<File>,
    position: u64,
}

/// Sequential or random access reader of an `EventFiles` chain
pub struct FileReader<'files> {
    /// Indexed chain of files
    files: &'files EventFiles,

    /// Lazily opened file handles
    handles: Vec<Option<OpenFile>>,

    /// Line buffer
    buffer: String,

    /// Most recently loaded event
    current: Event,
}
//
impl EventSource for FileReader<'_> {
    fn event_count(&self) -> usize {
        self.files.entries.len()
    }

    fn load(&mut self, entry: usize) -> Result<&Event> {
        ensure!(
            entry < self.event_count(),
            "Event {} is out of range ({} events)",
            entry,
            self.event_count()
        );
        let files = self.files;
        let Entry { file, offset, line } = files.entries[entry];
        let path = &files.paths[file];

        // Open the file on first use
        let handle = match &mut self.handles[file] {
            Some(handle) => handle,
            slot @ None => {
                let reader = BufReader::new(
                    File::open(path)
                        .wrap_err_with(|| format!("Failed to open {}", path.display()))?,
                );
                slot.insert(OpenFile {
                    reader,
                    position: 0,
                })
            }
        };

        // Only seek when not reading sequentially, as seeking drops the buffer
        if handle.position != offset {
            handle
                .reader
                .seek(SeekFrom::Start(offset))
                .wrap_err_with(|| format!("Failed to seek in {}", path.display()))?;
        }
        self.buffer.clear();
        let length = handle
            .reader
            .read_line(&mut self.buffer)
            .wrap_err_with(|| format!("Failed to read {}", path.display()))?;
        handle.position = offset + length as u64;

        self.current = serde_json::from_str(&self.buffer).wrap_err_with(|| {
            format!("Invalid event record at {}:{}", path.display(), line)
        })?;
        Ok(&self.current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(path: &Path, content: &str) {
        let mut file = File::create(path).expect("Temporary file should be writable");
        file.write_all(content.as_bytes())
            .expect("Temporary file should be writable");
    }

    #[test]
    fn glob_matches_files_in_sorted_order() {
        let dir = tempfile::tempdir().expect("Temporary directory");
        for name in ["b.jsonl", "a.jsonl", "c.txt"] {
            write_file(&dir.path().join(name), "");
        }
        std::fs::create_dir(dir.path().join("sub")).expect("Subdirectory");
        write_file(&dir.path().join("sub").join("d.jsonl"), "");

        let pattern = format!("{}/*.jsonl", dir.path().display());
        let files = expand_glob(&pattern);
        assert_eq!(
            files,
            vec![dir.path().join("a.jsonl"), dir.path().join("b.jsonl")]
        );

        let pattern = format!("{}/**/*.jsonl", dir.path().display());
        assert_eq!(expand_glob(&pattern).len(), 3);

        let literal = dir.path().join("c.txt");
        assert_eq!(expand_glob(&literal.to_string_lossy()), vec![literal]);
    }

    #[test]
    fn hidden_files_need_an_explicit_dot() {
        let dir = tempfile::tempdir().expect("Temporary directory");
        write_file(&dir.path().join("a.jsonl"), "");
        write_file(&dir.path().join(".b.jsonl"), "");
        std::fs::create_dir(dir.path().join(".cache")).expect("Subdirectory");
        write_file(&dir.path().join(".cache").join("c.jsonl"), "");

        let pattern = format!("{}/*.jsonl", dir.path().display());
        assert_eq!(expand_glob(&pattern), vec![dir.path().join("a.jsonl")]);
        let pattern = format!("{}/**/*.jsonl", dir.path().display());
        assert_eq!(expand_glob(&pattern), vec![dir.path().join("a.jsonl")]);
        let pattern = format!("{}/.*.jsonl", dir.path().display());
        assert_eq!(expand_glob(&pattern), vec![dir.path().join(".b.jsonl")]);
    }

    #[cfg(unix)]
    #[test]
    fn directory_link_cycles_are_not_followed() {
        let dir = tempfile::tempdir().expect("Temporary directory");
        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).expect("Subdirectory");
        write_file(&sub.join("a.jsonl"), "");
        std::os::unix::fs::symlink(dir.path(), sub.join("loop")).expect("Directory link");
        std::os::unix::fs::symlink(sub.join("a.jsonl"), dir.path().join("b.jsonl"))
            .expect("File link");

        let pattern = format!("{}/**/*.jsonl", dir.path().display());
        assert_eq!(
            expand_glob(&pattern),
            vec![dir.path().join("b.jsonl"), sub.join("a.jsonl")]
        );
    }

    #[test]
    fn bad_patterns_give_no_files() {
        assert!(expand_glob("/nonexistent/directory/*.jsonl").is_empty());
        assert!(expand_glob("/nonexistent/file.jsonl").is_empty());
        assert!(expand_glob("data/[unclosed*.jsonl").is_empty());
    }

    #[test]
    fn files_are_chained_and_randomly_accessible() {
        let dir = tempfile::tempdir().expect("Temporary directory");
        let first = dir.path().join("1.jsonl");
        let second = dir.path().join("2.jsonl");
        write_file(&first, "{\"number\": 10}\n\n{\"number\": 11}\n");
        write_file(
            &second,
            "{\"number\": 20, \"muons\": [{\"pt\": 80.0, \"charge\": -1}]}",
        );

        let files = EventFiles::open(vec![first, second]).expect("Readable files");
        assert_eq!(files.paths().len(), 2);
        assert_eq!(files.event_count(), 3);
        let mut reader = files.reader();
        assert_eq!(reader.event_count(), 3);
        let numbers = (0..3)
            .map(|i| reader.load(i).expect("Valid record").number)
            .collect::<Vec<_>>();
        assert_eq!(numbers, vec![10, 11, 20]);
        assert_eq!(reader.load(0).expect("Valid record").number, 10);
        assert_eq!(reader.load(2).expect("Valid record").muons[0].pt, 80.0);
        assert!(reader.load(3).is_err());
    }

    #[test]
    fn invalid_records_are_reported_with_their_location() {
        let dir = tempfile::tempdir().expect("Temporary directory");
        let path = dir.path().join("broken.jsonl");
        write_file(&path, "{\"number\": 1}\n{\"number\": \n");
        let files = EventFiles::open(vec![path]).expect("Readable file");
        let mut reader = files.reader();
        assert!(reader.load(0).is_ok());
        let error = format!("{:?}", reader.load(1).expect_err("Broken record"));
        assert!(error.contains("broken.jsonl:2"), "{error}");
    }

    #[test]
    fn missing_files_fail_to_open() {
        assert!(EventFiles::open(vec![PathBuf::from("/nonexistent/events.jsonl")]).is_err());
    }

    #[test]
    fn events_in_memory_are_a_source() {
        let mut events = vec![Event::default(); 2];
        let source: &mut [Event] = &mut events;
        assert_eq!(source.event_count(), 2);
        assert!(source.load(1).is_ok());
        assert!(source.load(2).is_err());
    }
}
