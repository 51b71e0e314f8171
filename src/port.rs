//! Port values: the tagged union that flows along graph edges.
//!
//! Every parameter, input and output of a node is one of these variants.
//! Ports are typed: edges are only accepted between ports whose declared
//! kinds agree, and parameter setters reject values of the wrong variant.

use chrono::NaiveDateTime;

/// Timestamps carry millisecond precision and no timezone.
pub type Timestamp = NaiveDateTime;

/// A magnitude spectrum over a frequency band.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    /// Frequency axis in Hz, ascending.
    pub freqs: Vec<f64>,
    /// Magnitudes, same length as `freqs`.
    pub mags: Vec<f64>,
    /// The (fmin, fmax) band the spectrum was computed over.
    pub band: (f64, f64),
}

/// A rolling matrix of past spectra and the timestamp of each row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpectrumHistory {
    /// One row per retained spectrum, oldest first.
    pub rows: Vec<Vec<f64>>,
    /// Row timestamps, parallel to `rows`.
    pub times: Vec<Timestamp>,
}

impl SpectrumHistory {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Width of the stored rows, if any row exists.
    pub fn width(&self) -> Option<usize> {
        self.rows.first().map(|r| r.len())
    }
}

/// The value carried by one port.
#[derive(Debug, Clone, PartialEq)]
pub enum PortValue {
    /// A vector of timestamps.
    Time(Vec<Timestamp>),
    /// A vector of real samples.
    Real(Vec<f64>),
    /// A single real number. Integer-valued parameters travel as scalars
    /// and are rounded on read.
    Scalar(f64),
    /// An ordered pair, e.g. a frequency band or an index range.
    Pair(f64, f64),
    /// A magnitude spectrum.
    Spectrum(Spectrum),
    /// A rolling spectrum history.
    History(SpectrumHistory),
    /// A flag.
    Bool(bool),
    /// A string.
    Text(String),
    /// A list of strings, e.g. slice start dates.
    TextList(Vec<String>),
}

/// The variant of a port, used for edge and parameter type checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortKind {
    Time,
    Real,
    Scalar,
    Pair,
    Spectrum,
    History,
    Bool,
    Text,
    TextList,
}

impl std::fmt::Display for PortKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PortKind::Time => "Time",
            PortKind::Real => "Real",
            PortKind::Scalar => "Scalar",
            PortKind::Pair => "Pair",
            PortKind::Spectrum => "Spectrum",
            PortKind::History => "History",
            PortKind::Bool => "Bool",
            PortKind::Text => "Text",
            PortKind::TextList => "TextList",
        };
        f.write_str(name)
    }
}

impl PortValue {
    pub fn kind(&self) -> PortKind {
        match self {
            PortValue::Time(_) => PortKind::Time,
            PortValue::Real(_) => PortKind::Real,
            PortValue::Scalar(_) => PortKind::Scalar,
            PortValue::Pair(_, _) => PortKind::Pair,
            PortValue::Spectrum(_) => PortKind::Spectrum,
            PortValue::History(_) => PortKind::History,
            PortValue::Bool(_) => PortKind::Bool,
            PortValue::Text(_) => PortKind::Text,
            PortValue::TextList(_) => PortKind::TextList,
        }
    }

    pub fn as_time(&self) -> Option<&[Timestamp]> {
        match self {
            PortValue::Time(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<&[f64]> {
        match self {
            PortValue::Real(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            PortValue::Scalar(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_pair(&self) -> Option<(f64, f64)> {
        match self {
            PortValue::Pair(a, b) => Some((*a, *b)),
            _ => None,
        }
    }

    pub fn as_spectrum(&self) -> Option<&Spectrum> {
        match self {
            PortValue::Spectrum(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_history(&self) -> Option<&SpectrumHistory> {
        match self {
            PortValue::History(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PortValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            PortValue::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_text_list(&self) -> Option<&[String]> {
        match self {
            PortValue::TextList(v) => Some(v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_discriminants() {
        assert_eq!(PortValue::Scalar(1.0).kind(), PortKind::Scalar);
        assert_eq!(PortValue::Real(vec![]).kind(), PortKind::Real);
        assert_eq!(PortValue::Bool(true).kind(), PortKind::Bool);
        assert_eq!(PortValue::Pair(0.0, 1.0).kind(), PortKind::Pair);
        assert_ne!(PortValue::Text(String::new()).kind(), PortKind::TextList);
    }

    #[test]
    fn test_typed_accessors() {
        let v = PortValue::Scalar(2.5);
        assert_eq!(v.as_scalar(), Some(2.5));
        assert!(v.as_real().is_none());

        let v = PortValue::Real(vec![1.0, 2.0]);
        assert_eq!(v.as_real().unwrap().len(), 2);
        assert!(v.as_scalar().is_none());
    }

    #[test]
    fn test_history_width() {
        let mut h = SpectrumHistory::default();
        assert!(h.is_empty());
        assert_eq!(h.width(), None);

        h.rows.push(vec![0.0; 4]);
        assert_eq!(h.width(), Some(4));
        assert_eq!(h.len(), 1);
    }
}
