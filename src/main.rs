//! Heterodyne CLI - run one analysis pass over a data file and print a
//! summary of what the pipeline sees.

use clap::Parser;
use heterodyne::{FilterType, TimeFrequencyWorkflow};

#[derive(Parser)]
#[command(name = "heterodyne")]
#[command(about = "Time-frequency analysis of long scalar signals", long_about = None)]
struct Cli {
    /// Input file of `timestamp,value` rows
    input: String,

    /// Window duration in seconds
    #[arg(long, default_value_t = 86_400.0)]
    slice_duration: f64,

    /// Overlap ratio in [0, 1)
    #[arg(long, default_value_t = 0.5)]
    overlap: f64,

    /// Lower edge of the analysed band in Hz
    #[arg(long, default_value_t = 0.0)]
    fmin: f64,

    /// Upper edge of the analysed band in Hz
    #[arg(long, default_value_t = 0.001)]
    fmax: f64,

    /// Window to analyse (1-based, clamped)
    #[arg(long, default_value_t = 1)]
    slice: u32,

    /// Enable the low-pass stage with this cutoff in Hz
    #[arg(long, conflicts_with = "mean_window")]
    lowpass: Option<f64>,

    /// Enable the mean-downsample stage with this window size
    #[arg(long)]
    mean_window: Option<u32>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let mut wf = TimeFrequencyWorkflow::new()?;
    wf.load_data(&cli.input)?;
    wf.set_slice_parameters(cli.slice_duration, cli.overlap)?;
    if let Some(cutoff) = cli.lowpass {
        wf.set_filter_parameters(true, FilterType::LowPass, cutoff)?;
    } else if let Some(window) = cli.mean_window {
        wf.set_filter_parameters(true, FilterType::MeanDownsample, window as f64)?;
    }
    wf.set_frequency_range((cli.fmin, cli.fmax))?;
    wf.set_current_slice(cli.slice)?;

    let fs = wf.get_sampling_rate()?;
    let slice = wf.get_slice_data()?;
    let spectrum = wf.get_spectrum_data()?;

    println!("sampling rate: {fs:.6} Hz");
    println!(
        "windows: {} x {} samples (step {})",
        slice.num_slices, slice.slice_points, slice.step_points
    );
    println!("window {}: {}", slice.current_slice, slice.slice_time_range);
    let info = wf.filter_info()?;
    if !info.is_empty() {
        println!("filter: {info}");
    }
    if let Some((i, peak)) = spectrum
        .p1_plot
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
    {
        println!(
            "spectral peak: {:.6} Hz (magnitude {:.3e})",
            spectrum.f_plot[i], peak
        );
    }

    Ok(())
}
