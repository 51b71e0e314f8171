//! Waterfall node: a fixed-capacity FIFO of past spectra and their
//! timestamps.
//!
//! Each execution appends the incoming spectrum as a new row and evicts
//! from the head once the buffer exceeds `history_size`. Appending into
//! an empty buffer first seeds an all-zero row; the seed row ages out
//! through ordinary FIFO eviction like any other. A re-execution that
//! delivers the exact spectrum and timestamp already sitting at the tail
//! appends nothing, so re-selecting the current window or resizing the
//! buffer never duplicates rows. The rolling buffer lives in the node's
//! parameter map, so it survives between passes without the node holding
//! hidden state.

use tracing::debug;

use crate::error::Result;
use crate::node::{Node, NodeBehavior, NodeIo, PortDecl};
use crate::port::{PortKind, PortValue, SpectrumHistory};

pub struct Waterfall;

impl Waterfall {
    pub fn boxed() -> Box<Self> {
        Box::new(Self)
    }
}

impl NodeBehavior for Waterfall {
    fn type_name(&self) -> &'static str {
        "Waterfall"
    }

    fn parameter_schema(&self) -> &'static [PortDecl] {
        &[
            ("history_size", PortKind::Scalar),
            ("history", PortKind::History),
        ]
    }

    fn input_schema(&self) -> &'static [PortDecl] {
        &[
            ("spectrum", PortKind::Real),
            ("time_point", PortKind::Time),
        ]
    }

    fn output_schema(&self) -> &'static [PortDecl] {
        &[
            ("history", PortKind::History),
            ("times", PortKind::Time),
            ("size", PortKind::Scalar),
            ("log_history", PortKind::History),
        ]
    }

    fn default_parameters(&self) -> Vec<(&'static str, PortValue)> {
        vec![
            ("history_size", PortValue::Scalar(20.0)),
            ("history", PortValue::History(SpectrumHistory::default())),
        ]
    }

    fn execute(&mut self, io: &mut NodeIo<'_>) -> Result<()> {
        let capacity = io.uint_param("history_size")?;
        if capacity < 2 {
            return Err(io.invalid("history_size must be >= 2"));
        }
        let row = io.real_input("spectrum")?.to_vec();
        let time_point = *io
            .time_input("time_point")?
            .first()
            .ok_or_else(|| io.invalid("time_point is empty"))?;

        let mut history = io.history_param("history")?.clone();
        let duplicate = history.rows.last() == Some(&row)
            && history.times.last() == Some(&time_point);

        if !duplicate {
            if let Some(width) = history.width() {
                if width != row.len() {
                    return Err(io.invalid(format!(
                        "spectrum width {} does not match history width {width}",
                        row.len()
                    )));
                }
            }
            if history.is_empty() {
                // Seed row; evicted by the FIFO like any other row.
                history.rows.push(vec![0.0; row.len()]);
                history.times.push(time_point);
            }
            history.rows.push(row);
            history.times.push(time_point);
        }
        while history.rows.len() > capacity as usize {
            history.rows.remove(0);
            history.times.remove(0);
        }

        debug!(rows = history.len(), capacity, appended = !duplicate, "waterfall updated");

        let log_rows: Vec<Vec<f64>> = history
            .rows
            .iter()
            .map(|r| {
                r.iter()
                    .map(|&v| v.max(f64::MIN_POSITIVE).log10())
                    .collect()
            })
            .collect();
        let times = history.times.clone();
        let size = history.len() as f64;

        io.store_parameter("history", PortValue::History(history.clone()));
        io.emit("times", PortValue::Time(times.clone()));
        io.emit("size", PortValue::Scalar(size));
        io.emit(
            "log_history",
            PortValue::History(SpectrumHistory {
                rows: log_rows,
                times,
            }),
        );
        io.emit("history", PortValue::History(history));
        Ok(())
    }
}

/// Empty the rolling buffer. Marks the node dirty, so the next pass
/// starts a fresh history (seed row included).
pub fn clear_history(node: &mut Node) -> Result<()> {
    node.set_parameter("history", PortValue::History(SpectrumHistory::default()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FlowError;
    use crate::port::Timestamp;
    use chrono::NaiveDate;

    fn stamp(sec: u32) -> Timestamp {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, sec)
            .unwrap()
    }

    fn waterfall_node() -> Node {
        Node::new("waterfall", Waterfall::boxed())
    }

    fn append(node: &mut Node, row: Vec<f64>, sec: u32) {
        node.set_input("spectrum", PortValue::Real(row)).unwrap();
        node.set_input("time_point", PortValue::Time(vec![stamp(sec)]))
            .unwrap();
        node.execute().unwrap();
    }

    #[test]
    fn test_first_append_seeds_zero_row() {
        let mut node = waterfall_node();
        append(&mut node, vec![1.0, 2.0], 0);

        let history = node.peek_output("history").unwrap().as_history().unwrap().clone();
        assert_eq!(history.rows.len(), 2);
        assert_eq!(history.rows[0], vec![0.0, 0.0]);
        assert_eq!(history.rows[1], vec![1.0, 2.0]);
        assert_eq!(history.times, vec![stamp(0), stamp(0)]);
        assert_eq!(node.peek_output("size").unwrap().as_scalar(), Some(2.0));
    }

    #[test]
    fn test_fifo_caps_at_history_size() {
        let mut node = waterfall_node();
        node.set_parameter("history_size", PortValue::Scalar(3.0))
            .unwrap();
        for i in 0..5 {
            append(&mut node, vec![i as f64; 2], i);
        }

        let history = node.peek_output("history").unwrap().as_history().unwrap().clone();
        assert_eq!(history.rows.len(), 3);
        // Zero seed and the two oldest rows have been evicted.
        assert_eq!(history.rows[0], vec![2.0, 2.0]);
        assert_eq!(history.rows[2], vec![4.0, 4.0]);
        assert_eq!(history.times, vec![stamp(2), stamp(3), stamp(4)]);
    }

    #[test]
    fn test_replayed_tail_is_not_duplicated() {
        let mut node = waterfall_node();
        append(&mut node, vec![1.0], 0);
        append(&mut node, vec![2.0], 1);
        assert_eq!(node.peek_output("size").unwrap().as_scalar(), Some(3.0));

        // Same spectrum and timestamp again: the tail already holds it.
        append(&mut node, vec![2.0], 1);
        assert_eq!(node.peek_output("size").unwrap().as_scalar(), Some(3.0));

        // Same values at a new timestamp is a genuine new row.
        append(&mut node, vec![2.0], 2);
        assert_eq!(node.peek_output("size").unwrap().as_scalar(), Some(4.0));
    }

    #[test]
    fn test_width_mismatch_rejected() {
        let mut node = waterfall_node();
        append(&mut node, vec![1.0, 2.0], 0);

        node.set_input("spectrum", PortValue::Real(vec![1.0, 2.0, 3.0]))
            .unwrap();
        node.set_input("time_point", PortValue::Time(vec![stamp(1)]))
            .unwrap();
        assert!(matches!(
            node.execute(),
            Err(FlowError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_log_history_stays_finite() {
        let mut node = waterfall_node();
        append(&mut node, vec![1.0, 10.0], 0);

        let log = node.peek_output("log_history").unwrap().as_history().unwrap().clone();
        // Seed row is exactly zero; the log view clamps it to a finite floor.
        assert!(log.rows[0].iter().all(|v| v.is_finite()));
        assert!((log.rows[1][0] - 0.0).abs() < 1e-12);
        assert!((log.rows[1][1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_shrinking_capacity_truncates_from_head() {
        let mut node = waterfall_node();
        for i in 0..6 {
            append(&mut node, vec![i as f64], i);
        }
        // Seed + six rows, capacity 20: all retained so far.
        assert_eq!(node.peek_output("size").unwrap().as_scalar(), Some(7.0));

        node.set_parameter("history_size", PortValue::Scalar(2.0))
            .unwrap();
        node.execute().unwrap();
        let history = node.peek_output("history").unwrap().as_history().unwrap().clone();
        assert_eq!(history.rows.len(), 2);
        assert_eq!(history.rows[1], vec![5.0]);

        // Resizing again appends nothing and keeps the contents.
        node.set_parameter("history_size", PortValue::Scalar(2.0))
            .unwrap();
        node.execute().unwrap();
        let again = node.peek_output("history").unwrap().as_history().unwrap().clone();
        assert_eq!(again, history);
    }

    #[test]
    fn test_clear_history_rearms_seed_row() {
        let mut node = waterfall_node();
        for i in 0..4 {
            append(&mut node, vec![i as f64], i);
        }
        clear_history(&mut node).unwrap();
        assert!(node.dirty());

        append(&mut node, vec![9.0], 10);
        let history = node.peek_output("history").unwrap().as_history().unwrap().clone();
        assert_eq!(history.rows.len(), 2);
        assert_eq!(history.rows[0], vec![0.0]);
        assert_eq!(history.rows[1], vec![9.0]);
    }

    #[test]
    fn test_history_size_below_two_rejected() {
        let mut node = waterfall_node();
        node.set_parameter("history_size", PortValue::Scalar(1.0))
            .unwrap();
        node.set_input("spectrum", PortValue::Real(vec![1.0])).unwrap();
        node.set_input("time_point", PortValue::Time(vec![stamp(0)]))
            .unwrap();
        assert!(matches!(
            node.execute(),
            Err(FlowError::ValidationError { .. })
        ));
    }
}
