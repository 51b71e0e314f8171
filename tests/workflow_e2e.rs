//! End-to-end scenarios over the time-frequency workflow facade.
//!
//! Each test drives the public verbs exactly as a presentation layer
//! would and asserts on the analysed output, not just on "it ran".

use std::f64::consts::PI;
use std::fmt::Write as _;

use chrono::{NaiveDate, NaiveDateTime};
use heterodyne::nodes::{SignalFilter, Slicer};
use heterodyne::{FilterType, FlowError, Graph, Node, TimeFrequencyWorkflow};

fn t0() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn stamp(sec: i64) -> NaiveDateTime {
    t0() + chrono::Duration::seconds(sec)
}

/// Write a 1 Hz CSV fixture with values from `f(k)`.
fn signal_csv(tag: &str, n: usize, f: impl Fn(usize) -> f64) -> String {
    let mut content = String::with_capacity(n * 32);
    for k in 0..n {
        let ts = t0() + chrono::Duration::seconds(k as i64);
        writeln!(content, "{},{}", ts.format("%Y-%m-%d %H:%M:%S%.3f"), f(k)).unwrap();
    }
    let path = std::env::temp_dir().join(format!(
        "heterodyne_e2e_{}_{}.csv",
        std::process::id(),
        tag
    ));
    std::fs::write(&path, content).unwrap();
    path.to_string_lossy().into_owned()
}

fn slow_sine_csv(tag: &str) -> String {
    signal_csv(tag, 1000, |k| (2.0 * PI * 0.01 * k as f64).sin())
}

#[test]
fn scenario_load_and_disjoint_slices() {
    let path = slow_sine_csv("scenario1");
    let mut wf = TimeFrequencyWorkflow::new().unwrap();
    wf.load_data(&path).unwrap();
    wf.set_slice_parameters(100.0, 0.0).unwrap();

    assert!((wf.get_sampling_rate().unwrap() - 1.0).abs() < 1e-9);
    let slice = wf.get_slice_data().unwrap();
    assert_eq!(slice.num_slices, 10);
    assert_eq!(slice.value.len(), 100);
    assert_eq!(slice.slice_points, 100);
    assert_eq!(slice.step_points, 100);
}

#[test]
fn scenario_third_slice_starts_at_200_seconds() {
    let path = slow_sine_csv("scenario2");
    let mut wf = TimeFrequencyWorkflow::new().unwrap();
    wf.load_data(&path).unwrap();
    wf.set_slice_parameters(100.0, 0.0).unwrap();
    wf.set_current_slice(3).unwrap();

    let slice = wf.get_slice_data().unwrap();
    assert_eq!(slice.slice_index, (201, 300));
    assert_eq!(slice.time[0], stamp(200));
    assert!(
        slice.slice_time_range.starts_with("2024-01-01 00:03:20.000"),
        "{}",
        slice.slice_time_range
    );
}

#[test]
fn scenario_spectrum_peaks_at_tone_frequency() {
    let path = slow_sine_csv("scenario3");
    let mut wf = TimeFrequencyWorkflow::new().unwrap();
    wf.load_data(&path).unwrap();
    wf.set_slice_parameters(100.0, 0.0).unwrap();
    wf.set_frequency_range((0.005, 0.02)).unwrap();

    let spectrum = wf.get_spectrum_data().unwrap();
    assert_eq!(spectrum.freq_range, (0.005, 0.02));
    let peak = spectrum
        .p1_plot
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
        .unwrap();
    // 100-sample window, factor 8: 1024 bins across 1 Hz.
    let bin_width = 1.0 / 1024.0;
    assert!(
        (spectrum.f_plot[peak] - 0.01).abs() <= bin_width + 1e-12,
        "peak at {} Hz",
        spectrum.f_plot[peak]
    );
}

#[test]
fn scenario_waterfall_keeps_last_five_windows() {
    let path = slow_sine_csv("scenario4");
    let mut wf = TimeFrequencyWorkflow::new().unwrap();
    wf.load_data(&path).unwrap();
    wf.set_slice_parameters(100.0, 0.0).unwrap();
    wf.set_waterfall_history_size(5).unwrap();

    for i in 1..=10 {
        wf.set_current_slice(i).unwrap();
    }

    let data = wf.get_waterfall_data().unwrap();
    assert_eq!(data.size, 5);
    assert_eq!(data.history.len(), 5);
    assert_eq!(data.log_history.len(), 5);
    // Rows are the spectra of windows 6..10; the zero seed row has long
    // been evicted.
    let expected_times: Vec<NaiveDateTime> =
        (5..10).map(|i| stamp(i * 100)).collect();
    assert_eq!(data.times, expected_times);
    assert!(data.history.iter().all(|row| row.iter().any(|&v| v > 0.0)));
}

#[test]
fn scenario_lowpass_attenuates_injected_tone_by_40_db() {
    // Wanted 0.01 Hz tone plus a 0.4 Hz contaminant of equal amplitude.
    let path = signal_csv("scenario5", 1000, |k| {
        let t = k as f64;
        (2.0 * PI * 0.01 * t).sin() + (2.0 * PI * 0.4 * t).sin()
    });
    let mut wf = TimeFrequencyWorkflow::new().unwrap();
    wf.load_data(&path).unwrap();
    wf.set_slice_parameters(1000.0, 0.0).unwrap();
    wf.set_filter_parameters(true, FilterType::LowPass, 0.05).unwrap();

    let slice = wf.get_slice_data().unwrap();
    assert_eq!(slice.value.len(), 1000);
    assert_eq!(wf.filter_info().unwrap(), "lowpass, cutoff=0.05 Hz");

    // Project the filtered window onto the contaminant frequency; with
    // > 40 dB attenuation, less than 1% of its unit amplitude survives.
    let n = slice.value.len() as f64;
    let (mut re, mut im) = (0.0, 0.0);
    for (k, v) in slice.value.iter().enumerate() {
        let phase = 2.0 * PI * 0.4 * k as f64;
        re += v * phase.cos();
        im += v * phase.sin();
    }
    let amplitude = 2.0 * (re * re + im * im).sqrt() / n;
    assert!(amplitude < 0.01, "0.4 Hz tone survives at {amplitude}");
}

#[test]
fn scenario_closing_edge_into_cycle_is_rejected() {
    let mut graph = Graph::new();
    graph.add_node(Node::new("f", SignalFilter::boxed())).unwrap();
    graph.add_node(Node::new("s", Slicer::boxed())).unwrap();
    graph.connect("f", "time", "s", "time").unwrap();

    let edges_before = graph.edge_count();
    let result = graph.connect("s", "time", "f", "time");
    assert!(matches!(result, Err(FlowError::CycleIntroduced { .. })));
    assert_eq!(graph.edge_count(), edges_before);
}

#[test]
fn identical_parameter_sequences_are_bit_identical() {
    let path = slow_sine_csv("determinism");
    let run = || {
        let mut wf = TimeFrequencyWorkflow::new().unwrap();
        wf.load_data(&path).unwrap();
        wf.set_slice_parameters(100.0, 0.5).unwrap();
        wf.set_frequency_range((0.0, 0.05)).unwrap();
        wf.set_current_slice(7).unwrap();
        (
            wf.get_slice_data().unwrap().value,
            wf.get_spectrum_data().unwrap().p1_plot,
        )
    };
    let (value_a, spec_a) = run();
    let (value_b, spec_b) = run();
    assert_eq!(value_a, value_b);
    assert_eq!(spec_a, spec_b);
}

#[test]
fn errors_leave_previous_outputs_intact() {
    let path = slow_sine_csv("error_recovery");
    let mut wf = TimeFrequencyWorkflow::new().unwrap();
    wf.load_data(&path).unwrap();
    wf.set_slice_parameters(100.0, 0.0).unwrap();
    let good = wf.get_spectrum_data().unwrap();

    // An invalid band aborts the pass at the spectrum node.
    assert!(matches!(
        wf.set_frequency_range((0.4, 0.3)),
        Err(FlowError::ValidationError { .. })
    ));

    // A valid band brings the pipeline back without reloading.
    wf.set_frequency_range((0.005, 0.02)).unwrap();
    let recovered = wf.get_spectrum_data().unwrap();
    assert!(!recovered.f_plot.is_empty());
    assert_ne!(good.freq_range, recovered.freq_range);
}
