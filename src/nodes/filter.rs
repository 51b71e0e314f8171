//! Filter node: pass-through, mean-downsample-and-resample, or zero-phase
//! Butterworth low-pass.
//!
//! The mean mode deliberately downsamples and then linearly interpolates
//! back onto the original sample grid, so the output keeps the input
//! length (it is a smoother, not a decimator). One numeric parameter per
//! mode is active: `window` for mean, `cutoff_freq` for low-pass.

use tracing::debug;

use crate::error::Result;
use crate::iir::ZeroPhaseLowPass;
use crate::node::{NodeBehavior, NodeIo, PortDecl};
use crate::port::{PortKind, PortValue};

/// The two active filtering modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    MeanDownsample = 1,
    LowPass = 2,
}

impl FilterType {
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(FilterType::MeanDownsample),
            2 => Some(FilterType::LowPass),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

pub struct SignalFilter;

impl SignalFilter {
    pub fn boxed() -> Box<Self> {
        Box::new(Self)
    }
}

impl NodeBehavior for SignalFilter {
    fn type_name(&self) -> &'static str {
        "Filter"
    }

    fn parameter_schema(&self) -> &'static [PortDecl] {
        &[
            ("enable", PortKind::Bool),
            ("filter_type", PortKind::Scalar),
            ("window", PortKind::Scalar),
            ("cutoff_freq", PortKind::Scalar),
            ("filter_order", PortKind::Scalar),
        ]
    }

    fn input_schema(&self) -> &'static [PortDecl] {
        &[
            ("time", PortKind::Time),
            ("value", PortKind::Real),
            ("fs", PortKind::Scalar),
        ]
    }

    fn output_schema(&self) -> &'static [PortDecl] {
        &[
            ("time", PortKind::Time),
            ("value", PortKind::Real),
            ("fs", PortKind::Scalar),
            ("is_filtered", PortKind::Bool),
            ("filter_type", PortKind::Scalar),
            ("filter_info", PortKind::Text),
        ]
    }

    fn default_parameters(&self) -> Vec<(&'static str, PortValue)> {
        vec![
            ("enable", PortValue::Bool(false)),
            ("filter_type", PortValue::Scalar(FilterType::MeanDownsample as u8 as f64)),
            ("window", PortValue::Scalar(5.0)),
            ("cutoff_freq", PortValue::Scalar(0.01)),
            ("filter_order", PortValue::Scalar(4.0)),
        ]
    }

    fn execute(&mut self, io: &mut NodeIo<'_>) -> Result<()> {
        let time = io.time_input("time")?.to_vec();
        let value = io.real_input("value")?.to_vec();
        let fs = io.scalar_input("fs")?;
        let enable = io.bool_param("enable")?;
        let type_code = io.uint_param("filter_type")?;

        let (filtered, info) = if !enable {
            (value, String::new())
        } else {
            let filter_type = FilterType::from_code(type_code)
                .ok_or_else(|| io.invalid(format!("unknown filter_type {type_code}")))?;
            match filter_type {
                FilterType::MeanDownsample => {
                    let window = io.uint_param("window")?;
                    if window < 1 {
                        return Err(io.invalid("window must be an integer >= 1"));
                    }
                    debug!(window, "mean downsample");
                    (
                        mean_downsample_resample(&value, window as usize),
                        format!("mean downsample, window={window}"),
                    )
                }
                FilterType::LowPass => {
                    let cutoff = io.scalar_param("cutoff_freq")?;
                    let order = io.uint_param("filter_order")?;
                    if order < 1 {
                        return Err(io.invalid("filter_order must be >= 1"));
                    }
                    if !(cutoff > 0.0 && cutoff < fs / 2.0) {
                        return Err(io.invalid(format!(
                            "cutoff_freq must lie in (0, fs/2) = (0, {})",
                            fs / 2.0
                        )));
                    }
                    let lp = ZeroPhaseLowPass::design(order, cutoff, fs)
                        .ok_or_else(|| io.invalid("low-pass design failed"))?;
                    debug!(cutoff, order, "zero-phase low-pass");
                    (lp.apply(&value), format!("lowpass, cutoff={cutoff} Hz"))
                }
            }
        };

        io.emit("time", PortValue::Time(time));
        io.emit("value", PortValue::Real(filtered));
        io.emit("fs", PortValue::Scalar(fs));
        io.emit("is_filtered", PortValue::Bool(enable));
        io.emit("filter_type", PortValue::Scalar(type_code as f64));
        io.emit("filter_info", PortValue::Text(info));
        Ok(())
    }
}

/// Block means of size `w`, linearly resampled back to the input length.
///
/// The block count is `max(1, n / w)` and the last block absorbs any
/// remainder, averaged over however many samples remain. The means sit on
/// evenly spaced abscissae spanning the full grid and are interpolated
/// (extrapolated linearly past the end means) onto every original sample.
fn mean_downsample_resample(x: &[f64], w: usize) -> Vec<f64> {
    let n = x.len();
    if n == 0 || w <= 1 {
        return x.to_vec();
    }

    let m = (n / w).max(1);
    let mut means = Vec::with_capacity(m);
    for b in 0..m {
        let start = b * w;
        let end = if b == m - 1 { n } else { (b + 1) * w };
        let block = &x[start..end];
        means.push(block.iter().sum::<f64>() / block.len() as f64);
    }

    if m == 1 {
        return vec![means[0]; n];
    }

    // Abscissae linspace(1, n, m) against targets 1..=n, both 1-based.
    let step = (n as f64 - 1.0) / (m as f64 - 1.0);
    (1..=n)
        .map(|t| {
            let t = t as f64;
            let j = (((t - 1.0) / step).floor() as usize).min(m - 2);
            let x0 = 1.0 + j as f64 * step;
            means[j] + (means[j + 1] - means[j]) * (t - x0) / step
        })
        .collect()
}
