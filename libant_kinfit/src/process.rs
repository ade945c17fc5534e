use std::sync::mpsc::Sender;

use super::analysis::records::RunSummary;
use super::analysis::EtapOmegaG;
use super::config::Config;
use super::error::ProcessorError;
use super::event_stack::EventStack;
use super::record_writer::RecordWriter;
use super::worker_status::WorkerStatus;

/// Minimum progress between two status messages
const FLUSH_FRAC: f32 = 0.01;

/// Analyse all events of one run.
///
/// Every run starts with fresh fitters and counters, so the summary of a run only depends on
/// its own events.
pub fn process_run(
    config: &Config,
    run_number: i32,
    tx: &Sender<WorkerStatus>,
) -> Result<RunSummary, ProcessorError> {
    let run_dir = config.get_run_directory(run_number)?;
    let mut stack = EventStack::new(&run_dir)?;
    spdlog::info!(
        "Found {} event files in {}",
        stack.file_stack.len() + 1,
        run_dir.to_string_lossy()
    );

    let mut analysis = EtapOmegaG::new(config)?;
    let mut writer = RecordWriter::new(
        &config.get_output_file_name(run_number, "sig")?,
        &config.get_output_file_name(run_number, "ref")?,
        &config.get_output_file_name(run_number, "summary")?,
    )?;

    tx.send(WorkerStatus::new(0.0, run_number))?;
    let mut last_progress: f32 = 0.0;
    let mut n_events: u64 = 0;
    while let Some(event) = stack.get_next_event()? {
        n_events += 1;
        let output = analysis.process_event(&event)?;
        for record in output.signal.iter() {
            writer.write_signal(record)?;
        }
        for record in output.reference.iter() {
            writer.write_reference(record)?;
        }

        let progress = stack.progress();
        if progress - last_progress > FLUSH_FRAC {
            last_progress = progress;
            tx.send(WorkerStatus::new(progress, run_number))?;
        }
    }

    let summary = RunSummary {
        run_number,
        events: n_events,
        malformed_events: stack.n_malformed(),
        signal_records: writer.n_signal_records(),
        reference_records: writer.n_reference_records(),
        event_cuts: analysis.cuts().snapshot(),
        signal_cuts: analysis.signal_cuts().snapshot(),
        reference_cuts: analysis.reference_cuts().snapshot(),
    };
    if summary.malformed_events > 0 {
        spdlog::warn!(
            "Run {} had {} malformed event documents, they were skipped.",
            run_number,
            summary.malformed_events
        );
    }
    writer.close(&summary)?;
    tx.send(WorkerStatus::new(1.0, run_number))?;
    spdlog::info!(
        "Run {} had {} events, {} signal and {} reference records.",
        run_number,
        summary.events,
        summary.signal_records,
        summary.reference_records
    );
    Ok(summary)
}

/// The function to be called by a separate thread (typically the CLI's worker).
/// Allows multiple runs to be processed
pub fn process(
    config: Config,
    tx: Sender<WorkerStatus>,
) -> Result<Vec<RunSummary>, ProcessorError> {
    config.validate()?;
    let mut summaries = Vec::new();
    for run in config.first_run_number..(config.last_run_number + 1) {
        if config.does_run_exist(run) {
            spdlog::info!("Processing run {}...", run);
            summaries.push(process_run(&config, run, &tx)?);
            spdlog::info!("Finished processing run {}.", run);
        } else {
            spdlog::info!("Run {} does not exist, skipping...", run);
        }
    }
    Ok(summaries)
}
