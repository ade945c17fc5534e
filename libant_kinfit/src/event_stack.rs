use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use super::error::EventStackError;
use super::event::Event;
use super::event_file::EventFile;

const EXTENSIONS: [&str; 2] = ["yml", "yaml"];

/// The collection of all event files of a run, read one after another.
///
/// Event files are read in the order of their sorted file names.
#[derive(Debug)]
pub struct EventStack {
    pub file_stack: VecDeque<PathBuf>,
    active_file: EventFile,
    pub total_stack_size_bytes: u64,
    read_bytes: u64,
    n_malformed: u64,
    is_ended: bool,
}

impl EventStack {
    /// Create a new EventStack for a given run directory
    pub fn new(path: &Path) -> Result<Self, EventStackError> {
        let (mut stack, bytes) = Self::get_file_stack(path)?;
        if let Some(file_path) = stack.pop_front() {
            let active_file = EventFile::new(&file_path)?;
            Ok(EventStack {
                file_stack: stack,
                n_malformed: active_file.n_malformed(),
                active_file,
                total_stack_size_bytes: bytes,
                read_bytes: 0,
                is_ended: false,
            })
        } else {
            Err(EventStackError::NoMatchingFiles(path.to_path_buf()))
        }
    }

    /// Get the next event in the file stack
    ///
    /// Returns a `Result<Option<Event>>`. The Option is None if the stack has
    /// no more data.
    pub fn get_next_event(&mut self) -> Result<Option<Event>, EventStackError> {
        loop {
            if self.is_ended {
                return Ok(None);
            }

            match self.active_file.get_next_event() {
                Some(event) => return Ok(Some(event)),
                None => self.move_to_next_file()?,
            }
        }
    }

    /// Fraction of the stack (in bytes) whose files have been completely read
    pub fn progress(&self) -> f32 {
        if self.total_stack_size_bytes == 0 {
            return 1.0;
        }
        self.read_bytes as f32 / self.total_stack_size_bytes as f32
    }

    /// Malformed event documents skipped in the files opened so far
    pub fn n_malformed(&self) -> u64 {
        self.n_malformed
    }

    /// Get all of the associated event files and put them in the stack
    fn get_file_stack(parent_path: &Path) -> Result<(VecDeque<PathBuf>, u64), EventStackError> {
        let mut file_list: Vec<PathBuf> = Vec::new();
        for item in parent_path.read_dir()? {
            let item_path = item?.path();
            let is_event_file = item_path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| EXTENSIONS.contains(&ext));
            if item_path.is_file() && is_event_file {
                file_list.push(item_path);
            }
        }

        if file_list.is_empty() {
            return Err(EventStackError::NoMatchingFiles(parent_path.to_path_buf()));
        }

        let mut total_stack_size_bytes = 0;
        for path in file_list.iter() {
            total_stack_size_bytes += path.metadata()?.len();
        }

        file_list.sort();
        let stack = file_list.into();

        Ok((stack, total_stack_size_bytes))
    }

    ///Move to the next file in the stack
    fn move_to_next_file(&mut self) -> Result<(), EventStackError> {
        self.read_bytes += self.active_file.get_size_bytes();
        loop {
            if let Some(next_file_path) = self.file_stack.pop_front() {
                let next_file = EventFile::new(&next_file_path)?;
                self.n_malformed += next_file.n_malformed();
                spdlog::debug!(
                    "Moving to event file {}",
                    next_file.get_filename().to_string_lossy()
                );
                if !next_file.is_eof() {
                    self.active_file = next_file;
                    return Ok(());
                }
                self.read_bytes += next_file.get_size_bytes();
            } else {
                self.is_ended = true;
                return Ok(());
            }
        }
    }
}
