//! Processing node implementations for the time-frequency workflow.
//!
//! Each node lives in its own file and implements [`crate::node::NodeBehavior`]:
//!
//! - [`loader::DataLoader`] - delimited text file -> time, value, sampling rate
//! - [`filter::SignalFilter`] - pass-through, mean downsample, or zero-phase low-pass
//! - [`slicer::Slicer`] - overlapping windows, one exposed at a time
//! - [`spectrum::ZoomSpectrum`] - zoom-FFT magnitude spectrum over a band
//! - [`waterfall::Waterfall`] - rolling FIFO of past spectra

pub mod filter;
pub mod loader;
pub mod slicer;
pub mod spectrum;
pub mod waterfall;

pub use filter::{FilterType, SignalFilter};
pub use loader::DataLoader;
pub use slicer::Slicer;
pub use spectrum::ZoomSpectrum;
pub use waterfall::Waterfall;
