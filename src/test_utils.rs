//! Test utilities: synthetic signal fixtures and tolerance comparison.

use std::fmt::Write as _;

use chrono::NaiveDate;

/// Write a CSV fixture whose value column is produced by `f(k)` for the
/// k-th sample. Returns the file path.
pub fn signal_csv(tag: &str, n: usize, fs: f64, f: impl Fn(usize) -> f64) -> String {
    let t0 = NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let mut content = String::with_capacity(n * 32);
    for k in 0..n {
        let ts = t0 + chrono::Duration::milliseconds((k as f64 * 1000.0 / fs).round() as i64);
        writeln!(content, "{},{}", ts.format("%Y-%m-%d %H:%M:%S%.3f"), f(k)).unwrap();
    }
    let path = std::env::temp_dir().join(format!(
        "heterodyne_fixture_{}_{}.csv",
        std::process::id(),
        tag
    ));
    std::fs::write(&path, content).unwrap();
    path.to_string_lossy().into_owned()
}

/// A pure sine fixture: `sin(2 pi freq k / fs)`.
pub fn sine_csv(tag: &str, n: usize, fs: f64, freq: f64) -> String {
    signal_csv(tag, n, fs, |k| {
        (2.0 * std::f64::consts::PI * freq * k as f64 / fs).sin()
    })
}

/// Largest elementwise difference between two equal-length vectors.
pub fn max_abs_diff(a: &[f64], b: &[f64]) -> f64 {
    assert_eq!(a.len(), b.len(), "length mismatch");
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}
