use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::analysis::records::{ReferenceRecord, RunSummary, SignalRecord};
use super::error::RecordWriterError;

/// Streams records to a YAML file, one document per record
#[derive(Debug)]
struct RecordStream {
    writer: BufWriter<File>,
    n_records: u64,
}

impl RecordStream {
    fn new(path: &Path) -> Result<Self, RecordWriterError> {
        Ok(Self {
            writer: BufWriter::new(File::create(path)?),
            n_records: 0,
        })
    }

    fn write<T: Serialize>(&mut self, record: &T) -> Result<(), RecordWriterError> {
        let yaml_str = serde_yaml::to_string(record)?;
        self.writer.write_all(b"---\n")?;
        self.writer.write_all(yaml_str.as_bytes())?;
        self.n_records += 1;
        Ok(())
    }
}

/// Writes the output of one run: the signal records, the reference records, and on close a
/// summary with the cut counters.
#[derive(Debug)]
pub struct RecordWriter {
    signal: RecordStream,
    reference: RecordStream,
    summary_path: PathBuf,
}

impl RecordWriter {
    pub fn new(
        signal_path: &Path,
        reference_path: &Path,
        summary_path: &Path,
    ) -> Result<Self, RecordWriterError> {
        Ok(Self {
            signal: RecordStream::new(signal_path)?,
            reference: RecordStream::new(reference_path)?,
            summary_path: summary_path.to_path_buf(),
        })
    }

    pub fn write_signal(&mut self, record: &SignalRecord) -> Result<(), RecordWriterError> {
        self.signal.write(record)
    }

    pub fn write_reference(&mut self, record: &ReferenceRecord) -> Result<(), RecordWriterError> {
        self.reference.write(record)
    }

    pub fn n_signal_records(&self) -> u64 {
        self.signal.n_records
    }

    pub fn n_reference_records(&self) -> u64 {
        self.reference.n_records
    }

    /// Flush the record streams and write the run summary
    pub fn close(mut self, summary: &RunSummary) -> Result<(), RecordWriterError> {
        self.signal.writer.flush()?;
        self.reference.writer.flush()?;
        std::fs::write(&self.summary_path, serde_yaml::to_string(summary)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::records::{CommonRecord, FitSummary};
    use crate::cut_counter::CutCounter;
    use crate::event::Event;
    use crate::synthetic::etap_2g_event;

    #[test]
    fn test_writer() {
        let dir = tempfile::tempdir().unwrap();
        let sig = dir.path().join("sig.yml");
        let refs = dir.path().join("ref.yml");
        let summary_path = dir.path().join("summary.yml");
        let mut writer = RecordWriter::new(&sig, &refs, &summary_path).unwrap();

        let event: Event = etap_2g_event();
        let record = SignalRecord {
            common: CommonRecord::new(&event, &event.tagger_hits[0], 1.0),
            kinfit: FitSummary {
                probability: 0.5,
                iterations: 3,
                z_vertex: 0.1,
            },
            anti_pi0pi0: None,
            anti_pi0eta: None,
            pi0: None,
            omega_pi0: None,
        };
        writer.write_signal(&record).unwrap();
        writer.write_signal(&record).unwrap();
        assert_eq!(writer.n_signal_records(), 2);
        assert_eq!(writer.n_reference_records(), 0);

        let mut cuts = CutCounter::new();
        cuts.fill("Seen");
        let summary = RunSummary {
            run_number: 1,
            events: 1,
            malformed_events: 0,
            signal_records: 2,
            reference_records: 0,
            event_cuts: cuts.snapshot(),
            signal_cuts: Vec::new(),
            reference_cuts: Vec::new(),
        };
        writer.close(&summary).unwrap();

        let yaml_str = std::fs::read_to_string(&sig).unwrap();
        assert_eq!(yaml_str.matches("---\n").count(), 2);
        assert!(yaml_str.contains("tagg_e: 1550.0"));
        assert_eq!(std::fs::read_to_string(&refs).unwrap(), "");
        let summary_str = std::fs::read_to_string(&summary_path).unwrap();
        assert!(summary_str.contains("label: Seen"));
    }
}
