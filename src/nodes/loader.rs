//! DataLoader node: delimited text file -> time vector, value vector and
//! sampling rate.
//!
//! Rows are `timestamp,value` with millisecond timestamps. Row order in
//! the file does not matter; both vectors are sorted jointly by time and
//! the sampling rate is the reciprocal of the median inter-sample gap,
//! which tolerates a few duplicate or jittered stamps.

use std::fs;
use std::io::ErrorKind;

use chrono::NaiveDateTime;
use tracing::info;

use crate::error::{FlowError, Result};
use crate::node::{NodeBehavior, NodeIo, PortDecl};
use crate::port::{PortKind, PortValue};

/// Timestamp layout accepted in the first column.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

pub struct DataLoader;

impl DataLoader {
    pub fn boxed() -> Box<Self> {
        Box::new(Self)
    }
}

impl NodeBehavior for DataLoader {
    fn type_name(&self) -> &'static str {
        "DataLoader"
    }

    fn parameter_schema(&self) -> &'static [PortDecl] {
        &[("filename", PortKind::Text)]
    }

    fn input_schema(&self) -> &'static [PortDecl] {
        &[]
    }

    fn output_schema(&self) -> &'static [PortDecl] {
        &[
            ("time", PortKind::Time),
            ("value", PortKind::Real),
            ("fs", PortKind::Scalar),
        ]
    }

    fn default_parameters(&self) -> Vec<(&'static str, PortValue)> {
        vec![("filename", PortValue::Text(String::new()))]
    }

    fn execute(&mut self, io: &mut NodeIo<'_>) -> Result<()> {
        let filename = io.text_param("filename")?.trim().to_string();
        if filename.is_empty() {
            return Err(FlowError::MissingParameter {
                node: io.node_name().to_string(),
                name: "filename".to_string(),
            });
        }

        let content = fs::read_to_string(&filename).map_err(|e| match e.kind() {
            ErrorKind::NotFound => FlowError::FileNotFound {
                path: filename.clone(),
            },
            _ => FlowError::Io {
                path: filename.clone(),
                message: e.to_string(),
            },
        })?;

        let mut rows: Vec<(NaiveDateTime, f64)> = Vec::new();
        for (i, line) in content.lines().enumerate() {
            let line_no = i + 1;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Some((ts_field, value_field)) = line.split_once(',') else {
                // An optional header is tolerated on the first line only.
                if i == 0 {
                    continue;
                }
                return Err(FlowError::ParseError {
                    line: line_no,
                    message: format!("expected 'timestamp,value', got '{line}'"),
                });
            };

            let ts = match NaiveDateTime::parse_from_str(ts_field.trim(), TIME_FORMAT) {
                Ok(ts) => ts,
                Err(_) if i == 0 => continue,
                Err(e) => {
                    return Err(FlowError::ParseError {
                        line: line_no,
                        message: format!("bad timestamp '{}': {e}", ts_field.trim()),
                    })
                }
            };
            let value: f64 = value_field.trim().parse().map_err(|e| FlowError::ParseError {
                line: line_no,
                message: format!("bad value '{}': {e}", value_field.trim()),
            })?;
            rows.push((ts, value));
        }

        if rows.len() < 2 {
            return Err(io.invalid(format!(
                "'{filename}' must contain at least two data rows, found {}",
                rows.len()
            )));
        }

        // Joint sort by time; the sort is stable so duplicate stamps keep
        // their file order.
        rows.sort_by_key(|(ts, _)| *ts);

        let mut gaps: Vec<f64> = rows
            .windows(2)
            .map(|w| w[1].0.signed_duration_since(w[0].0).num_milliseconds() as f64 / 1000.0)
            .collect();
        gaps.sort_by(|a, b| a.total_cmp(b));
        let median = if gaps.len() % 2 == 1 {
            gaps[gaps.len() / 2]
        } else {
            (gaps[gaps.len() / 2 - 1] + gaps[gaps.len() / 2]) / 2.0
        };
        if median <= 0.0 {
            return Err(io.invalid("median sampling interval is zero"));
        }
        let fs = 1.0 / median;

        info!(rows = rows.len(), fs, file = %filename, "signal loaded");

        let (time, value): (Vec<_>, Vec<_>) = rows.into_iter().unzip();
        io.emit("time", PortValue::Time(time));
        io.emit("value", PortValue::Real(value));
        io.emit("fs", PortValue::Scalar(fs));
        Ok(())
    }
}
