use neurolab_importer::types::{NeurolabError, TaskType, RMA_FILE_SIZE};
use neurolab_importer::{assemble_session, load_session, SessionOptions};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn cel_text(cluster: Option<i32>, start: &str, end: &str, fields: &str, rows: &[&str]) -> String {
    let mut text = String::from("% Program: xclust\n");
    if let Some(cluster) = cluster {
        text.push_str(&format!("% Cluster: {}\n", cluster));
    }
    text.push_str(&format!("% Start time: {}\n", start));
    text.push_str(&format!("% End time: {}\n", end));
    text.push_str(&format!("% fields: {}\n", fields));
    text.push_str("%%ENDHEADER\n");
    for row in rows {
        text.push_str(row);
        text.push('\n');
    }
    text
}

fn rma_bytes(first_rate: f32, first_occ: i32) -> Vec<u8> {
    let mut data = Vec::with_capacity(RMA_FILE_SIZE);
    data.extend_from_slice(&first_rate.to_be_bytes());
    data.resize(RMA_FILE_SIZE / 2, 0);
    data.extend_from_slice(&first_occ.to_be_bytes());
    data.resize(RMA_FILE_SIZE, 0);
    data
}

fn write(path: impl AsRef<Path>, content: impl AsRef<[u8]>) {
    fs::write(path, content).unwrap();
}

/// One session tree exercising every merge: two baseline spike files sharing
/// an epoch, a position-bearing Escher epoch, rate maps, and two broken
/// files that must be skipped without aborting anything.
fn build_session(root: &Path) {
    let tt0 = root.join("TT0");
    let tt2 = root.join("TT2");
    let tt10 = root.join("TT10");
    fs::create_dir_all(&tt0).unwrap();
    fs::create_dir_all(&tt2).unwrap();
    fs::create_dir_all(&tt10).unwrap();
    // Not a tetrode bank; must be ignored.
    fs::create_dir_all(root.join("NOTES")).unwrap();

    // TT0: cluster 3 recorded in two epochs, plus an untagged cluster.
    write(
        tt0.join("BL1CEL~3.CEL"),
        cel_text(Some(3), "0:00:00", "0:10:00", "time", &["1.0", "3.0"]),
    );
    write(
        tt0.join("ES1CEL~3.CEL"),
        cel_text(
            Some(3),
            "0:10:00",
            "0:20:00",
            "time pos_x pos_y",
            &["600.5 10 20", "605.0 11 21"],
        ),
    );
    write(
        tt0.join("BL2NOCL.CEL"),
        cel_text(None, "0:00:00", "0:10:00", "time", &["2.5"]),
    );

    // TT2: same baseline epoch seen from another bank, and a second
    // position file duplicating the 600.5 s tracker sample.
    write(
        tt2.join("BL1CEL~1.CELL"),
        cel_text(Some(1), "0:00:00", "0:10:00", "time", &["4.0", "2.0"]),
    );
    write(
        tt2.join("ES1CEL~1.CEL"),
        cel_text(
            Some(1),
            "0:10:00",
            "0:20:00",
            "time pos_x pos_y",
            &["600.5 99 99", "601.0 12 22"],
        ),
    );

    // TT10 sorts after TT2 numerically, before it lexicographically.
    write(
        tt10.join("MC1CEL~2.CEL"),
        cel_text(Some(2), "0:20:00", "0:30:00", "time", &["1300.0"]),
    );

    // Broken files: truncated header and truncated binary.
    write(tt0.join("ESBAD.CEL"), "% fields: time\n1.0\n");
    write(tt0.join("ESBAD.RMA"), vec![0u8; 100]);

    // Good rate maps, one per-cell and one task-level.
    write(tt0.join("ESCELL~3.RMA"), rma_bytes(4.5, 7));
    write(tt2.join("ES2BC0~1.RMA"), rma_bytes(1.0, 1));

    // Unrelated file; no recognized extension.
    write(tt0.join("README.TXT"), "not a recording\n");
}

#[test]
fn assembles_full_session() {
    let dir = TempDir::new().unwrap();
    build_session(dir.path());

    let session = load_session(dir.path()).unwrap();

    // Banks in numeric order, non-bank directories ignored.
    assert_eq!(session.tetrodes, vec!["TT0", "TT2", "TT10"]);

    // Three distinct epochs from six parseable spike files.
    assert_eq!(session.epochs.len(), 3);
    assert_eq!(session.epochs[0].start_time_sec, 0.0);
    assert_eq!(session.epochs[0].end_time_sec, 600.0);
    assert_eq!(session.epochs[0].task_type, TaskType::Baseline);
    assert_eq!(session.epochs[1].start_time_sec, 600.0);
    assert_eq!(session.epochs[1].task_type, TaskType::Escher);
    assert_eq!(session.epochs[2].start_time_sec, 1200.0);
    assert_eq!(session.epochs[2].task_type, TaskType::MagicCarpet);

    // Units ordered by (tetrode, cluster); TT0 cluster 3 merged across
    // epochs; the untagged file lands in the -1 bucket.
    let keys: Vec<(&str, i32)> = session
        .units
        .iter()
        .map(|u| (u.tetrode.as_str(), u.cluster_id))
        .collect();
    assert_eq!(
        keys,
        vec![("TT0", -1), ("TT0", 3), ("TT10", 2), ("TT2", 1)]
    );
    let tt0_cluster3 = &session.units[1];
    assert_eq!(tt0_cluster3.spike_times, vec![1.0, 3.0, 600.5, 605.0]);
    let tt2_cluster1 = &session.units[3];
    assert_eq!(tt2_cluster1.spike_times, vec![2.0, 4.0, 600.5, 601.0]);

    // Pooled position trace: TT0's 600.5 s sample wins over TT2's.
    let trace = session.position.as_ref().unwrap();
    let times: Vec<f64> = trace.iter().map(|s| s.time_sec).collect();
    assert_eq!(times, vec![600.5, 601.0, 605.0]);
    assert_eq!(trace[0].x, 10.0);
    assert_eq!(trace[0].y, 20.0);

    // One map row per parsed RMA file, in discovery order.
    assert_eq!(session.rate_maps.len(), 2);
    assert_eq!(session.rate_maps[0].tetrode, "TT0");
    assert_eq!(session.rate_maps[0].source_file, "ESCELL~3.RMA");
    assert_eq!(session.rate_maps[0].cell_number, 3);
    assert_eq!(session.rate_maps[0].rate_map[[0, 0]], 4.5);
    assert_eq!(session.rate_maps[0].occupancy_map[[0, 0]], 7);
    assert_eq!(session.rate_maps[1].tetrode, "TT2");
    assert_eq!(session.rate_maps[1].cell_number, -1);

    // Both broken files recorded, neither aborted the batch.
    assert_eq!(session.failures.len(), 2);
    assert!(session.failures.iter().any(|f| {
        matches!(f.error, NeurolabError::MissingEndHeader(_))
            && f.path.file_name().unwrap() == "ESBAD.CEL"
    }));
    assert!(session.failures.iter().any(|f| {
        matches!(
            f.error,
            NeurolabError::UnexpectedBinarySize { actual: 100, .. }
        ) && f.path.file_name().unwrap() == "ESBAD.RMA"
    }));
}

#[test]
fn split_roots_keep_maps_separate_from_spikes() {
    let raw = TempDir::new().unwrap();
    let analyzed = TempDir::new().unwrap();

    let raw_tt0 = raw.path().join("TT0");
    fs::create_dir_all(&raw_tt0).unwrap();
    write(
        raw_tt0.join("BL1CEL~1.CEL"),
        cel_text(Some(1), "0:00:00", "0:10:00", "time", &["1.0"]),
    );

    let analyzed_tt0 = analyzed.path().join("TT0");
    fs::create_dir_all(&analyzed_tt0).unwrap();
    write(analyzed_tt0.join("BLCELL~1.RMA"), rma_bytes(2.0, 3));

    let session =
        assemble_session(raw.path(), analyzed.path(), &SessionOptions::default()).unwrap();
    assert_eq!(session.units.len(), 1);
    assert_eq!(session.rate_maps.len(), 1);
    assert_eq!(session.rate_maps[0].source_file, "BLCELL~1.RMA");
}

#[test]
fn missing_spike_root_is_an_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("FD4RAT9");
    match load_session(&missing) {
        Err(NeurolabError::SessionRootNotFound(path)) => assert_eq!(path, missing),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn missing_map_root_yields_empty_table() {
    let raw = TempDir::new().unwrap();
    let raw_tt0 = raw.path().join("TT0");
    fs::create_dir_all(&raw_tt0).unwrap();
    write(
        raw_tt0.join("BL1CEL~1.CEL"),
        cel_text(Some(1), "0:00:00", "0:10:00", "time", &["1.0"]),
    );

    let session = assemble_session(
        raw.path(),
        raw.path().join("ANALYZED_MISSING"),
        &SessionOptions::default(),
    )
    .unwrap();
    assert_eq!(session.units.len(), 1);
    assert!(session.rate_maps.is_empty());
}

#[test]
fn stub_mode_limits_files_per_bank() {
    let dir = TempDir::new().unwrap();
    let tt0 = dir.path().join("TT0");
    fs::create_dir_all(&tt0).unwrap();
    for i in 1..=4 {
        write(
            tt0.join(format!("BL{}CEL~{}.CEL", i, i)),
            cel_text(Some(i), "0:00:00", "0:10:00", "time", &[&format!("{}.0", i)]),
        );
    }

    let stubbed =
        assemble_session(dir.path(), dir.path(), &SessionOptions { stub: true }).unwrap();
    // Filename order: BL1, BL2 kept; BL3, BL4 dropped.
    assert_eq!(stubbed.units.len(), 2);
    assert_eq!(stubbed.units[0].cluster_id, 1);
    assert_eq!(stubbed.units[1].cluster_id, 2);

    let full = load_session(dir.path()).unwrap();
    assert_eq!(full.units.len(), 4);
}

#[test]
fn session_without_position_columns_has_no_trace() {
    let dir = TempDir::new().unwrap();
    let tt0 = dir.path().join("TT0");
    fs::create_dir_all(&tt0).unwrap();
    write(
        tt0.join("BL1CEL~1.CEL"),
        cel_text(Some(1), "0:00:00", "0:10:00", "time", &["1.0", "2.0"]),
    );

    let session = load_session(dir.path()).unwrap();
    assert!(session.position.is_none());
    assert_eq!(session.units.len(), 1);
}
