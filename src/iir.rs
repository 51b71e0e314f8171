//! Butterworth low-pass design and zero-phase application.
//!
//! An order-N Butterworth low-pass is realised as a cascade of biquad
//! second-order sections (one single-pole section absorbs the odd pole
//! for odd orders). Section Q values come from the Butterworth pole
//! angles, so the cascade matches the classic analog prototype through
//! the bilinear transform. Zero-phase response is obtained by running the
//! cascade forward and backward over an odd-reflection extension of the
//! signal, which suppresses edge transients.

use biquad::{Biquad, Coefficients, DirectForm2Transposed, ToHertz, Type};

/// A designed Butterworth low-pass, applied with zero phase.
#[derive(Debug, Clone)]
pub struct ZeroPhaseLowPass {
    sections: Vec<Coefficients<f64>>,
}

impl ZeroPhaseLowPass {
    /// Design an order-`order` Butterworth low-pass with the given cutoff.
    ///
    /// Returns `None` when the parameters cannot produce a stable design
    /// (`order` of zero, or a cutoff outside `(0, fs/2)`).
    pub fn design(order: u32, cutoff_hz: f64, fs: f64) -> Option<Self> {
        if order == 0 || !(cutoff_hz > 0.0 && cutoff_hz < fs / 2.0) {
            return None;
        }
        let n = order as usize;
        let mut sections = Vec::with_capacity(n / 2 + 1);

        if n % 2 == 1 {
            // The real pole of an odd-order Butterworth.
            let coeffs = Coefficients::<f64>::from_params(
                Type::SinglePoleLowPass,
                fs.hz(),
                cutoff_hz.hz(),
                biquad::Q_BUTTERWORTH_F64,
            )
            .ok()?;
            sections.push(coeffs);
            for k in 1..=(n - 1) / 2 {
                let q = 1.0 / (2.0 * (std::f64::consts::PI * k as f64 / n as f64).cos());
                let coeffs =
                    Coefficients::<f64>::from_params(Type::LowPass, fs.hz(), cutoff_hz.hz(), q)
                        .ok()?;
                sections.push(coeffs);
            }
        } else {
            for k in 0..n / 2 {
                let angle = std::f64::consts::PI * (2 * k + 1) as f64 / (2 * n) as f64;
                let q = 1.0 / (2.0 * angle.sin());
                let coeffs =
                    Coefficients::<f64>::from_params(Type::LowPass, fs.hz(), cutoff_hz.hz(), q)
                        .ok()?;
                sections.push(coeffs);
            }
        }

        Some(Self { sections })
    }

    fn run_cascade(&self, input: &[f64]) -> Vec<f64> {
        let mut data = input.to_vec();
        for coeffs in &self.sections {
            let mut section = DirectForm2Transposed::<f64>::new(*coeffs);
            for sample in data.iter_mut() {
                *sample = section.run(*sample);
            }
        }
        data
    }

    /// Forward-backward filtering. Output length equals input length.
    pub fn apply(&self, x: &[f64]) -> Vec<f64> {
        let n = x.len();
        if n < 2 {
            return x.to_vec();
        }
        let pad = (3 * (2 * self.sections.len() + 1)).min(n - 1);

        // Odd reflection about both endpoints.
        let mut ext = Vec::with_capacity(n + 2 * pad);
        for i in (1..=pad).rev() {
            ext.push(2.0 * x[0] - x[i]);
        }
        ext.extend_from_slice(x);
        for j in 1..=pad {
            ext.push(2.0 * x[n - 1] - x[n - 1 - j]);
        }

        let mut y = self.run_cascade(&ext);
        y.reverse();
        let mut y = self.run_cascade(&y);
        y.reverse();

        y[pad..pad + n].to_vec()
    }
}
