use std::sync::mpsc::channel;

use libant_kinfit::config::Config;
use libant_kinfit::event::TaggerHit;
use libant_kinfit::event_file::write_event_file;
use libant_kinfit::process::process;
use libant_kinfit::synthetic::{etap_2g_event, etap_omega_event, two_pi0_event};

#[test]
fn test_process_runs() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();

    let run_dir = input.path().join("run_0002");
    std::fs::create_dir(&run_dir).unwrap();
    let mut random_hit = etap_2g_event();
    random_hit.id = 3;
    random_hit.tagger_hits[0] = TaggerHit::new(7, random_hit.tagger_hits[0].photon_energy, -30.0);
    write_event_file(&run_dir.join("part_0.yml"), &[two_pi0_event(), etap_omega_event()]).unwrap();
    write_event_file(&run_dir.join("part_1.yml"), &[etap_2g_event(), random_hit]).unwrap();

    let mut config = Config::default();
    config.input_path = input.path().to_path_buf();
    config.output_path = output.path().to_path_buf();
    config.first_run_number = 1;
    config.last_run_number = 3;

    let (tx, rx) = channel();
    let summaries = process(config, tx).unwrap();
    let statuses: Vec<_> = rx.try_iter().collect();
    assert_eq!(statuses.first().map(|s| s.progress), Some(0.0));
    assert_eq!(statuses.last().map(|s| s.progress), Some(1.0));
    assert!(statuses.iter().all(|s| s.run_number == 2));

    // runs 1 and 3 do not exist
    assert_eq!(summaries.len(), 1);
    let summary = &summaries[0];
    assert_eq!(summary.run_number, 2);
    assert_eq!(summary.events, 4);
    assert_eq!(summary.malformed_events, 0);
    assert_eq!(summary.signal_records, 1);
    assert_eq!(summary.reference_records, 2);
    assert_eq!(summary.event_cuts[0].label, "Seen");
    assert_eq!(summary.event_cuts[0].count, 4.0);

    let signal = std::fs::read_to_string(output.path().join("run_0002_sig.yml")).unwrap();
    assert_eq!(signal.matches("---\n").count(), 1);
    let reference = std::fs::read_to_string(output.path().join("run_0002_ref.yml")).unwrap();
    assert_eq!(reference.matches("---\n").count(), 2);
    assert!(reference.contains("tagg_ch: 7"));
    let summary = std::fs::read_to_string(output.path().join("run_0002_summary.yml")).unwrap();
    assert!(summary.contains("run_number: 2"));
    assert!(!output.path().join("run_0001_sig.yml").exists());
}

#[test]
fn test_malformed_event_is_skipped() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();

    let run_dir = input.path().join("run_0002");
    std::fs::create_dir(&run_dir).unwrap();
    write_event_file(&run_dir.join("part_0.yml"), &[etap_2g_event()]).unwrap();
    let broken = run_dir.join("part_1.yml");
    write_event_file(&broken, &[etap_omega_event()]).unwrap();
    let mut yaml = std::fs::read_to_string(&broken).unwrap();
    yaml.push_str("---\nid: oops\n");
    std::fs::write(&broken, yaml).unwrap();

    let run_dir = input.path().join("run_0003");
    std::fs::create_dir(&run_dir).unwrap();
    write_event_file(&run_dir.join("events.yml"), &[etap_2g_event()]).unwrap();

    let mut config = Config::default();
    config.input_path = input.path().to_path_buf();
    config.output_path = output.path().to_path_buf();
    config.first_run_number = 2;
    config.last_run_number = 3;

    let (tx, _rx) = channel();
    let summaries = process(config, tx).unwrap();
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].events, 2);
    assert_eq!(summaries[0].malformed_events, 1);
    assert_eq!(summaries[0].signal_records, 1);
    assert_eq!(summaries[0].reference_records, 1);
    assert_eq!(summaries[1].run_number, 3);
    assert_eq!(summaries[1].malformed_events, 0);
    assert_eq!(summaries[1].reference_records, 1);

    let summary = std::fs::read_to_string(output.path().join("run_0002_summary.yml")).unwrap();
    assert!(summary.contains("malformed_events: 1"));
    assert!(output.path().join("run_0003_ref.yml").exists());
}

#[test]
fn test_invalid_config() {
    let mut config = Config::default();
    config.reference.filter.n_photons = 4;
    let (tx, _rx) = channel();
    assert!(process(config, tx).is_err());
}

#[test]
fn test_missing_output_directory() {
    let input = tempfile::tempdir().unwrap();
    let run_dir = input.path().join("run_0000");
    std::fs::create_dir(&run_dir).unwrap();
    write_event_file(&run_dir.join("events.yml"), &[etap_2g_event()]).unwrap();

    let mut config = Config::default();
    config.input_path = input.path().to_path_buf();
    config.output_path = input.path().join("does_not_exist");
    let (tx, _rx) = channel();
    assert!(process(config, tx).is_err());
}
