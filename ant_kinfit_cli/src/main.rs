use clap::{Arg, Command};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use indicatif_log_bridge::LogWrapper;
use std::error::Error;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, RecvTimeoutError};
use std::time::Duration;

use libant_kinfit::config::Config;
use libant_kinfit::event::TaggerHit;
use libant_kinfit::event_file::write_event_file;
use libant_kinfit::process::process;
use libant_kinfit::synthetic::{etap_2g_event, etap_omega_event, two_pi0_event};

fn make_template_config(path: &Path) -> Result<(), Box<dyn Error>> {
    let yaml_str = serde_yaml::to_string(&Config::default())?;
    let mut file = File::create(path)?;
    file.write_all(yaml_str.as_bytes())?;
    Ok(())
}

/// Write a configuration and one run of synthetic events into the directory of `path`
fn make_demo(path: &Path) -> Result<(), Box<dyn Error>> {
    let parent = path.parent().unwrap_or(Path::new("."));
    let input_path = parent.join("demo_input");
    let output_path = parent.join("demo_output");
    let run_dir = input_path.join("run_0001");
    std::fs::create_dir_all(&run_dir)?;
    std::fs::create_dir_all(&output_path)?;

    let mut events = Vec::new();
    // prompt, random and outside tagger times
    for time in [-2.0, 1.0, 25.0, -40.0, 80.0] {
        for mut event in [etap_omega_event(), etap_2g_event(), two_pi0_event()] {
            event.id = events.len() as u64;
            let hit = event.tagger_hits[0];
            event.tagger_hits[0] = TaggerHit::new(hit.channel, hit.photon_energy, time);
            events.push(event);
        }
    }
    write_event_file(&run_dir.join("events.yml"), &events)?;

    let config = Config {
        input_path,
        output_path,
        first_run_number: 1,
        last_run_number: 1,
        ..Default::default()
    };
    config.write_config_file(path)?;
    Ok(())
}

fn main() {
    // Create a cli
    let matches = Command::new("ant_kinfit_cli")
        .arg_required_else_help(true)
        .subcommand(Command::new("new").about("Make a template configuration yaml file"))
        .subcommand(
            Command::new("demo")
                .about("Make a configuration yaml file and a run of synthetic events next to it"),
        )
        .arg(
            Arg::new("path")
                .short('p')
                .long("path")
                .required(true)
                .help("Path to the configuration file"),
        )
        .get_matches();

    // Initialize feedback
    let logger = simplelog::TermLogger::new(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );

    let pb_manager = MultiProgress::new();

    LogWrapper::new(pb_manager.clone(), logger)
        .try_init()
        .expect("Could not create logging/progress!");

    // Parse the cli
    let config_path = match matches.get_one::<String>("path") {
        Some(path) => PathBuf::from(path),
        None => {
            log::error!("A path to the configuration file is required");
            return;
        }
    };

    match matches.subcommand() {
        Some(("new", _)) => {
            log::info!(
                "Making a template config at {}...",
                config_path.to_string_lossy()
            );
            match make_template_config(&config_path) {
                Ok(()) => log::info!("Done."),
                Err(e) => log::error!("{e}"),
            }
            return;
        }
        Some(("demo", _)) => {
            log::info!("Making a demo at {}...", config_path.to_string_lossy());
            match make_demo(&config_path) {
                Ok(()) => log::info!("Done."),
                Err(e) => log::error!("{e}"),
            }
            return;
        }
        _ => (),
    }

    // Load our config
    log::info!("Loading config from {}...", config_path.to_string_lossy());
    let config = match Config::read_config_file(&config_path) {
        Ok(c) => c,
        Err(e) => {
            log::error!("{e}");
            return;
        }
    };
    log::info!("Config successfully loaded.");
    log::info!("Input Path: {}", config.input_path.to_string_lossy());
    log::info!("Output Path: {}", config.output_path.to_string_lossy());
    log::info!(
        "First Run: {} Last Run: {}",
        config.first_run_number,
        config.last_run_number
    );
    log::info!(
        "Prompt: {:?} Random: {:?}",
        config.prompt_random.prompt,
        config.prompt_random.random
    );
    log::info!("MC Smearing: {}", config.mc_smear.is_some());

    // Setup the progress bar
    let pb = pb_manager.add(ProgressBar::new(100));
    if let Ok(style) = ProgressStyle::with_template("{msg} [{bar:40.cyan/blue}] {pos}%") {
        pb.set_style(style.progress_chars("=>-"));
    }
    let (tx, rx) = channel();
    // Spawn the task!
    let handle = std::thread::spawn(move || process(config, tx));

    loop {
        match rx.recv_timeout(Duration::from_millis(500)) {
            Ok(status) => {
                pb.set_message(format!("Run {}", status.run_number));
                pb.set_position((status.progress * 100.0) as u64);
            }
            Err(RecvTimeoutError::Timeout) => continue,
            // The worker dropped its sender, so it is done
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    match handle.join() {
        Ok(result) => match result {
            Ok(summaries) => {
                for summary in summaries.iter() {
                    log::info!(
                        "Run {}: {} events ({} malformed), {} signal records, {} reference records",
                        summary.run_number,
                        summary.events,
                        summary.malformed_events,
                        summary.signal_records,
                        summary.reference_records
                    );
                }
                log::info!("Successfully analysed {} runs!", summaries.len());
            }
            Err(e) => log::error!("Analysis failed with error: {e}"),
        },
        Err(_) => log::error!("Failed to join analysis task!"),
    }

    pb.finish();

    log::info!("Done.");
}
