use serde::Deserialize;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use super::error::EventFileError;
use super::event::Event;

/// A YAML file holding a stream of events, one document per event.
///
/// The file is parsed completely on open. Empty documents are skipped, documents that are
/// not a valid event are logged, counted and skipped.
#[derive(Debug)]
pub struct EventFile {
    file_path: PathBuf,
    events: VecDeque<Event>,
    n_malformed: u64,
    size_bytes: u64,
}

impl EventFile {
    pub fn new(path: &Path) -> Result<Self, EventFileError> {
        if !path.exists() {
            return Err(EventFileError::BadFilePath(path.to_path_buf()));
        }
        let size_bytes = path.metadata()?.len();
        let yaml_str = std::fs::read_to_string(path)?;

        let mut events = VecDeque::new();
        let mut n_malformed = 0;
        for (index, document) in serde_yaml::Deserializer::from_str(&yaml_str).enumerate() {
            // Broken YAML ends the stream, a document that is not an event is only skipped
            let value = match serde_yaml::Value::deserialize(document) {
                Ok(value) => value,
                Err(e) => {
                    spdlog::warn!(
                        "Stopped reading {} at malformed document {}: {}",
                        path.to_string_lossy(),
                        index,
                        e
                    );
                    n_malformed += 1;
                    break;
                }
            };
            match serde_yaml::from_value::<Option<Event>>(value) {
                Ok(Some(event)) => events.push_back(event),
                Ok(None) => (),
                Err(e) => {
                    spdlog::warn!(
                        "Skipping malformed document {} of {}: {}",
                        index,
                        path.to_string_lossy(),
                        e
                    );
                    n_malformed += 1;
                }
            }
        }

        Ok(Self {
            file_path: path.to_path_buf(),
            events,
            n_malformed,
            size_bytes,
        })
    }

    pub fn get_next_event(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    /// Number of documents that could not be read as an event
    pub fn n_malformed(&self) -> u64 {
        self.n_malformed
    }

    pub fn is_eof(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get_size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn get_filename(&self) -> &Path {
        &self.file_path
    }
}

/// Write events as a YAML document stream, the format read by [`EventFile`]
pub fn write_event_file(path: &Path, events: &[Event]) -> Result<(), EventFileError> {
    let mut yaml_str = String::new();
    for event in events.iter() {
        yaml_str.push_str("---\n");
        yaml_str.push_str(&serde_yaml::to_string(event)?);
    }
    std::fs::write(path, yaml_str)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::{etap_2g_event, etap_omega_event};

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.yml");
        let mut second = etap_2g_event();
        second.id = 1;
        second.is_mc = true;
        second.true_z_vertex = Some(-1.5);
        write_event_file(&path, &[etap_omega_event(), second.clone()]).unwrap();

        let mut file = EventFile::new(&path).unwrap();
        assert_eq!(file.n_malformed(), 0);
        assert!(file.get_size_bytes() > 0);
        assert_eq!(file.get_next_event().unwrap().candidates.len(), 5);
        assert_eq!(file.get_next_event().unwrap(), second);
        assert!(file.is_eof());
        assert!(file.get_next_event().is_none());
    }

    #[test]
    fn test_minimal_documents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.yml");
        let yaml = concat!(
            "---\nid: 4\ntagger_hits:\n",
            "  - channel: 2\n    photon_energy: 1400.0\n    time: 1.0\n",
            "---\n---\nid: 5\n",
        );
        std::fs::write(&path, yaml).unwrap();

        let mut file = EventFile::new(&path).unwrap();
        let event = file.get_next_event().unwrap();
        assert_eq!(event.id, 4);
        assert_eq!(event.tagger_hits[0].channel, 2);
        // no trigger information means no CB time
        assert!(event.trigger.cb_avg_time.is_nan());
        assert_eq!(file.get_next_event().unwrap().id, 5);
        assert!(file.is_eof());
    }

    #[test]
    fn test_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = EventFile::new(&dir.path().join("missing.yml"));
        assert!(matches!(missing, Err(EventFileError::BadFilePath(_))));

        let path = dir.path().join("broken.yml");
        std::fs::write(&path, "id: [1, 2\n").unwrap();
        let file = EventFile::new(&path).unwrap();
        assert!(file.is_eof());
        assert_eq!(file.n_malformed(), 1);
    }

    #[test]
    fn test_malformed_documents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.yml");
        let yaml = concat!(
            "---\nid: 1\n",
            "---\nid: oops\n",
            "---\nid: 2\ncandidates: 7\n",
            "---\nid: 3\n",
        );
        std::fs::write(&path, yaml).unwrap();

        let mut file = EventFile::new(&path).unwrap();
        assert_eq!(file.n_malformed(), 2);
        assert_eq!(file.get_next_event().unwrap().id, 1);
        assert_eq!(file.get_next_event().unwrap().id, 3);
        assert!(file.is_eof());
    }
}
