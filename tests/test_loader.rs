//! Integration test: row-limited loading of gzip and plain samples

use flate2::write::GzEncoder;
use flate2::Compression;
use kolosal_bench::data::{load_sample, SampleLoader};
use kolosal_bench::KolosalError;
use std::io::Write;
use std::path::Path;
use tempfile::tempdir;

/// HIGGS layout: scientific-notation label, then features
fn higgs_lines(n: usize) -> String {
    let mut out = String::new();
    for i in 0..n {
        let label = if i % 3 == 0 { "1.000000000000000000e+00" } else { "0.000000000000000000e+00" };
        out.push_str(&format!("{},{:.6e},{:.6e},{:.6e}\n", label, i as f64 * 0.5, -(i as f64), 1.0 / (i + 1) as f64));
    }
    out
}

fn write_gzip(path: &Path, text: &str) {
    let mut encoder = GzEncoder::new(std::fs::File::create(path).unwrap(), Compression::default());
    encoder.write_all(text.as_bytes()).unwrap();
    encoder.finish().unwrap();
}

#[test]
fn test_row_limit_truncates_gzip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("HIGGS.csv.gz");
    write_gzip(&path, &higgs_lines(500));

    let dataset = load_sample(&path, 120).unwrap();
    assert_eq!(dataset.n_rows(), 120);
    assert_eq!(dataset.n_features(), 3);
    assert_eq!(dataset.labels().len(), dataset.features().nrows());
    assert_eq!(dataset.class_counts()[&1], 40);
    assert_eq!(dataset.features()[[2, 0]], 1.0);
}

#[test]
fn test_row_limit_larger_than_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("small.csv.gz");
    write_gzip(&path, &higgs_lines(30));

    let dataset = load_sample(&path, 1_000_000).unwrap();
    assert_eq!(dataset.n_rows(), 30);
}

#[test]
fn test_gzip_detected_by_content_not_extension() {
    let dir = tempdir().unwrap();
    let compressed = dir.path().join("sample.dat");
    write_gzip(&compressed, &higgs_lines(10));
    let plain = dir.path().join("sample.csv.gz");
    std::fs::write(&plain, higgs_lines(10)).unwrap();

    assert_eq!(load_sample(&compressed, 10).unwrap().n_rows(), 10);
    assert_eq!(load_sample(&plain, 10).unwrap().n_rows(), 10);
}

#[test]
fn test_missing_file_is_unavailable() {
    let dir = tempdir().unwrap();
    let err = load_sample(dir.path().join("HIGGS.csv.gz"), 100).unwrap_err();
    assert!(matches!(err, KolosalError::DataUnavailable { .. }));
}

#[test]
fn test_zero_row_limit() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("x.csv");
    std::fs::write(&path, higgs_lines(3)).unwrap();
    assert!(matches!(load_sample(&path, 0), Err(KolosalError::InvalidInput(_))));
}

#[test]
fn test_non_integral_label_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.csv");
    std::fs::write(&path, "0.5,1.0,2.0\n1.0,3.0,4.0\n").unwrap();
    assert!(matches!(load_sample(&path, 10), Err(KolosalError::DataError(_))));
}

#[test]
fn test_label_in_last_column() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("last.csv");
    std::fs::write(&path, "0.1,0.2,1\n0.3,0.4,0\n0.5,0.6,1\n").unwrap();

    let dataset = SampleLoader::new().with_label_column(2).load_sample(&path, 10).unwrap();
    assert_eq!(dataset.n_features(), 2);
    assert_eq!(dataset.labels().to_vec(), vec![1, 0, 1]);
}

#[test]
fn test_integer_looking_column_turning_fractional() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("late_decimals.csv");
    let mut text = String::new();
    for i in 0..150 {
        let feature = if i < 120 { format!("{}", i % 3) } else { format!("{}.5", i % 3) };
        text.push_str(&format!("{},{},{}\n", i % 2, feature, i));
    }
    std::fs::write(&path, text).unwrap();

    let dataset = load_sample(&path, 1000).unwrap();
    assert_eq!(dataset.n_rows(), 150);
    assert_eq!(dataset.features()[[119, 0]], 2.0);
    assert_eq!(dataset.features()[[121, 0]], 1.5);
    assert_eq!(dataset.features()[[149, 1]], 149.0);
}
