//! Slicer node: cuts the signal into overlapping windows and exposes one
//! window at a time.
//!
//! Window and step sizes are derived from a duration in seconds and an
//! overlap ratio. The selected slice index is 1-based and clamps into the
//! valid range, so a stale index from a previous, longer signal never
//! fails -- it lands on the last window instead.

use tracing::debug;

use crate::error::Result;
use crate::node::{NodeBehavior, NodeIo, PortDecl};
use crate::nodes::loader::TIME_FORMAT;
use crate::port::{PortKind, PortValue};

pub struct Slicer;

impl Slicer {
    pub fn boxed() -> Box<Self> {
        Box::new(Self)
    }
}

impl NodeBehavior for Slicer {
    fn type_name(&self) -> &'static str {
        "Slicer"
    }

    fn parameter_schema(&self) -> &'static [PortDecl] {
        &[
            ("slice_duration", PortKind::Scalar),
            ("overlap_ratio", PortKind::Scalar),
            ("current_slice", PortKind::Scalar),
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
            ("num_slices", PortKind::Scalar),
            ("slice_start_times", PortKind::TextList),
            ("current_slice", PortKind::Scalar),
            ("slice_index", PortKind::Pair),
            ("slice_time_range", PortKind::Text),
            ("slice_points", PortKind::Scalar),
            ("step_points", PortKind::Scalar),
        ]
    }

    fn default_parameters(&self) -> Vec<(&'static str, PortValue)> {
        vec![
            // One day per window, half overlapping, first window selected.
            ("slice_duration", PortValue::Scalar(86_400.0)),
            ("overlap_ratio", PortValue::Scalar(0.5)),
            ("current_slice", PortValue::Scalar(1.0)),
        ]
    }

    fn execute(&mut self, io: &mut NodeIo<'_>) -> Result<()> {
        let time = io.time_input("time")?;
        let value = io.real_input("value")?;
        let fs = io.scalar_input("fs")?;
        let duration = io.scalar_param("slice_duration")?;
        let overlap = io.scalar_param("overlap_ratio")?;

        if time.len() != value.len() {
            return Err(io.invalid(format!(
                "time and value lengths differ ({} vs {})",
                time.len(),
                value.len()
            )));
        }
        let n = value.len();
        if n == 0 {
            return Err(io.invalid("cannot slice an empty signal"));
        }
        if !(duration > 0.0) {
            return Err(io.invalid("slice_duration must be positive"));
        }
        if !(0.0..1.0).contains(&overlap) {
            return Err(io.invalid("overlap_ratio must lie in [0, 1)"));
        }

        let slice_points = (duration * fs).round() as usize;
        if slice_points < 1 {
            return Err(io.invalid("slice_duration is shorter than one sample"));
        }
        let step_points = (slice_points as f64 * (1.0 - overlap)).round() as usize;
        if step_points < 1 {
            return Err(io.invalid("overlap_ratio leaves an empty step"));
        }

        let num_slices = if n >= slice_points {
            (n - slice_points) / step_points + 1
        } else {
            1
        };

        let requested = io.uint_param("current_slice")? as usize;
        let current = requested.clamp(1, num_slices);

        // 1-based inclusive window bounds.
        let start = (current - 1) * step_points + 1;
        let end = (start + slice_points - 1).min(n);

        let mut start_times: Vec<String> = Vec::new();
        for i in 0..num_slices {
            let label = time[i * step_points].format("%Y-%m-%d").to_string();
            if !start_times.contains(&label) {
                start_times.push(label);
            }
        }

        let window_time = time[start - 1..end].to_vec();
        let window_value = value[start - 1..end].to_vec();
        let range = format!(
            "{} - {}",
            window_time[0].format(TIME_FORMAT),
            window_time[window_time.len() - 1].format(TIME_FORMAT)
        );

        debug!(current, num_slices, start, end, "window selected");

        io.emit("time", PortValue::Time(window_time));
        io.emit("value", PortValue::Real(window_value));
        io.emit("fs", PortValue::Scalar(fs));
        io.emit("num_slices", PortValue::Scalar(num_slices as f64));
        io.emit("slice_start_times", PortValue::TextList(start_times));
        io.emit("current_slice", PortValue::Scalar(current as f64));
        io.emit("slice_index", PortValue::Pair(start as f64, end as f64));
        io.emit("slice_time_range", PortValue::Text(range));
        io.emit("slice_points", PortValue::Scalar(slice_points as f64));
        io.emit("step_points", PortValue::Scalar(step_points as f64));
        Ok(())
    }
}
