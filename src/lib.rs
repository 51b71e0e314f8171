//! # Heterodyne - interactive time-frequency analysis
//!
//! Heterodyne is a dataflow engine for exploring long, uniformly-sampled
//! scalar signals in the time-frequency plane. A signal is loaded from a
//! delimited text file and pushed through a small pipeline of processing
//! stages -- filtering, windowed slicing, a zoom-FFT spectrum and a
//! rolling spectrogram -- whose parameters can be edited live. Changing a
//! parameter invalidates only the affected downstream work; everything
//! upstream keeps its memoized outputs.
//!
//! ## Architecture
//!
//! - [`graph`] - generic node-graph engine: typed ports, dirty-bit
//!   propagation, on-demand topological execution, per-node memoization
//! - [`node`] - node base (parameters, inputs, outputs, dirty flag) and
//!   the [`node::NodeBehavior`] trait nodes implement
//! - [`port`] - the tagged [`port::PortValue`] union carried by every port
//! - [`nodes`] - the five workflow nodes: loader, filter, slicer,
//!   spectrum, waterfall
//! - [`workflow`] - the [`workflow::TimeFrequencyWorkflow`] facade that
//!   wires the pipeline and exposes parameter-set / output-get verbs
//! - [`iir`] - Butterworth low-pass design and zero-phase application
//!
//! ## Quick start
//!
//! ```no_run
//! use heterodyne::{FilterType, TimeFrequencyWorkflow};
//!
//! # fn main() -> heterodyne::Result<()> {
//! let mut wf = TimeFrequencyWorkflow::new()?;
//! wf.load_data("tide_gauge.csv")?;
//!
//! // One-day windows, half overlapping, low-pass smoothed.
//! wf.set_slice_parameters(86_400.0, 0.5)?;
//! wf.set_filter_parameters(true, FilterType::LowPass, 0.01)?;
//! wf.set_frequency_range((0.0, 0.001))?;
//!
//! // Step through windows; the waterfall accumulates each spectrum.
//! for i in 1..=10 {
//!     wf.set_current_slice(i)?;
//! }
//!
//! let spectrum = wf.get_spectrum_data()?;
//! let waterfall = wf.get_waterfall_data()?;
//! println!("{} bins, {} history rows", spectrum.f_plot.len(), waterfall.size);
//! # Ok(())
//! # }
//! ```
//!
//! ## Building custom graphs
//!
//! The workflow facade is one wiring of the generic engine. Any
//! [`node::NodeBehavior`] implementation can be registered in a
//! [`graph::Graph`] and connected port-to-port; the engine handles
//! ordering, cycle rejection, dirty propagation and memoization.

pub mod error;
pub mod graph;
pub mod iir;
pub mod node;
pub mod nodes;
pub mod port;
pub mod workflow;

#[cfg(test)]
pub mod test_utils;

pub use error::{FlowError, Result};
pub use graph::Graph;
pub use node::{Node, NodeBehavior, NodeIo};
pub use nodes::FilterType;
pub use port::{PortKind, PortValue, Spectrum, SpectrumHistory, Timestamp};
pub use workflow::{SliceData, SpectrumData, TimeFrequencyWorkflow, WaterfallData};
