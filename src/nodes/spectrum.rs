//! Spectrum node: zoom-FFT magnitude spectrum over a frequency band.
//!
//! The window is demeaned, heterodyned down by the band's centre
//! frequency, zero-padded to `next_pow2(N) * fft_size_factor` and FFT'd.
//! After an fftshift the frequency axis is re-centred on the band, and
//! only bins inside `[fmin, fmax]` are kept. Padding far beyond the
//! window length buys fine frequency resolution inside a narrow band
//! without touching the sample rate.

use rustfft::{num_complex::Complex, FftPlanner};
use tracing::debug;

use crate::error::Result;
use crate::node::{NodeBehavior, NodeIo, PortDecl};
use crate::port::{PortKind, PortValue, Spectrum};

pub struct ZoomSpectrum;

impl ZoomSpectrum {
    pub fn boxed() -> Box<Self> {
        Box::new(Self)
    }
}

impl NodeBehavior for ZoomSpectrum {
    fn type_name(&self) -> &'static str {
        "Spectrum"
    }

    fn parameter_schema(&self) -> &'static [PortDecl] {
        &[
            ("freq_range", PortKind::Pair),
            ("fft_size_factor", PortKind::Scalar),
        ]
    }

    fn input_schema(&self) -> &'static [PortDecl] {
        &[("value", PortKind::Real), ("fs", PortKind::Scalar)]
    }

    fn output_schema(&self) -> &'static [PortDecl] {
        &[
            ("f_plot", PortKind::Real),
            ("P1_plot", PortKind::Real),
            ("freq_range", PortKind::Pair),
            ("spectrum", PortKind::Spectrum),
        ]
    }

    fn default_parameters(&self) -> Vec<(&'static str, PortValue)> {
        vec![
            ("freq_range", PortValue::Pair(0.0, 0.001)),
            ("fft_size_factor", PortValue::Scalar(8.0)),
        ]
    }

    fn execute(&mut self, io: &mut NodeIo<'_>) -> Result<()> {
        let value = io.real_input("value")?;
        let fs = io.scalar_input("fs")?;
        let (fmin, fmax) = io.pair_param("freq_range")?;
        let factor = io.uint_param("fft_size_factor")?;

        if factor < 1 {
            return Err(io.invalid("fft_size_factor must be >= 1"));
        }
        if !(0.0 <= fmin && fmin < fmax && fmax <= fs / 2.0) {
            return Err(io.invalid(format!(
                "freq_range ({fmin}, {fmax}) must satisfy 0 <= fmin < fmax <= fs/2 = {}",
                fs / 2.0
            )));
        }
        let n = value.len();
        if n == 0 {
            return Err(io.invalid("cannot analyse an empty window"));
        }

        let mean = value.iter().sum::<f64>() / n as f64;
        let f_c = (fmin + fmax) / 2.0;

        let m = n.next_power_of_two() * factor as usize;
        let mut buffer: Vec<Complex<f64>> = Vec::with_capacity(m);
        for (k, v) in value.iter().enumerate() {
            let phase = -2.0 * std::f64::consts::PI * f_c * k as f64 / fs;
            buffer.push(Complex::new(v - mean, 0.0) * Complex::new(phase.cos(), phase.sin()));
        }
        buffer.resize(m, Complex::new(0.0, 0.0));

        let mut planner = FftPlanner::<f64>::new();
        planner.plan_fft_forward(m).process(&mut buffer);
        // fftshift: zero frequency moves to the middle of the axis.
        buffer.rotate_left(m / 2);

        let half = (m / 2) as f64;
        let mut f_plot = Vec::new();
        let mut p1_plot = Vec::new();
        for (i, bin) in buffer.iter().enumerate() {
            let freq = (i as f64 - half) * fs / m as f64 + f_c;
            if freq >= fmin && freq <= fmax {
                // Both vectors carry the epsilon floor so log plots of
                // either axis stay finite.
                f_plot.push(freq.max(f64::MIN_POSITIVE));
                p1_plot.push((bin.norm() / n as f64).max(f64::MIN_POSITIVE));
            }
        }

        debug!(n, m, bins = f_plot.len(), "zoom spectrum computed");

        io.emit(
            "spectrum",
            PortValue::Spectrum(Spectrum {
                freqs: f_plot.clone(),
                mags: p1_plot.clone(),
                band: (fmin, fmax),
            }),
        );
        io.emit("f_plot", PortValue::Real(f_plot));
        io.emit("P1_plot", PortValue::Real(p1_plot));
        io.emit("freq_range", PortValue::Pair(fmin, fmax));
        Ok(())
    }
}
