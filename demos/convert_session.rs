use neurolab_importer::{load_session, metadata};
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let session_dir = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "data/FD4RAT1".to_string());

    // Subject metadata, when the directory is named after a known subject
    let subject = std::path::Path::new(&session_dir)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if let Some(meta) = metadata::session_metadata(&subject) {
        println!("Subject: {} ({})", meta.subject_folder, meta.rat_id);
        println!("Recorded: {}", meta.session_date);
        println!("{}", meta.session_description);
        println!();
    }

    let session = load_session(&session_dir)?;

    println!("Tetrode banks: {}", session.tetrodes.len());
    for tetrode in &session.tetrodes {
        println!("  {}", tetrode);
    }

    println!("\nEpochs: {}", session.epochs.len());
    for epoch in &session.epochs {
        println!(
            "  {:>8.1} – {:>8.1} s  {} ({})",
            epoch.start_time_sec,
            epoch.end_time_sec,
            epoch.task_type,
            epoch.task_type.description()
        );
    }

    println!("\nUnits: {}", session.units.len());
    for unit in session.units.iter().take(10) {
        println!(
            "  {} cluster {:>2}: {} spikes",
            unit.tetrode,
            unit.cluster_id,
            unit.spike_times.len()
        );
    }
    if session.units.len() > 10 {
        println!("  ... and {} more", session.units.len() - 10);
    }

    match &session.position {
        Some(trace) => {
            println!("\nPosition trace: {} samples", trace.len());
            if let (Some(first), Some(last)) = (trace.first(), trace.last()) {
                println!(
                    "  Time range: {:.3} to {:.3} seconds",
                    first.time_sec, last.time_sec
                );
            }
        }
        None => println!("\nNo position data in this session."),
    }

    println!("\nRate maps: {}", session.rate_maps.len());
    for row in session.rate_maps.iter().take(5) {
        println!(
            "  {} {} ({}, cell {})",
            row.tetrode, row.source_file, row.task_type, row.cell_number
        );
    }
    if session.rate_maps.len() > 5 {
        println!("  ... and {} more", session.rate_maps.len() - 5);
    }

    if !session.failures.is_empty() {
        println!("\nSkipped {} unparseable files:", session.failures.len());
        for failure in &session.failures {
            println!("  {}: {}", failure.path.display(), failure.error);
        }
    }

    Ok(())
}
