//! Time-frequency workflow facade.
//!
//! Wires the five processing nodes into the standard pipeline
//!
//! ```text
//! loader -> filter -> slicer -> spectrum -> waterfall
//! ```
//!
//! and exposes parameter-set / output-get verbs over it. Every verb ends
//! with a graph execute, so callers always observe a consistent pipeline;
//! engine errors bubble out unchanged. Outputs come back as plain records
//! a presentation layer can render (or serialize) directly.

use serde::Serialize;
use tracing::info;

use crate::error::{FlowError, Result};
use crate::graph::Graph;
use crate::node::Node;
use crate::nodes::{DataLoader, FilterType, SignalFilter, Slicer, Waterfall, ZoomSpectrum};
use crate::port::{PortValue, SpectrumHistory, Timestamp};

const LOADER: &str = "loader";
const FILTER: &str = "filter";
const SLICER: &str = "slicer";
const SPECTRUM: &str = "spectrum";
const WATERFALL: &str = "waterfall";

/// The currently selected window and its slicing context.
#[derive(Debug, Clone, Serialize)]
pub struct SliceData {
    pub time: Vec<Timestamp>,
    pub value: Vec<f64>,
    pub fs: f64,
    pub num_slices: u32,
    pub current_slice: u32,
    /// 1-based inclusive sample bounds of the window.
    pub slice_index: (u32, u32),
    pub slice_time_range: String,
    /// Distinct window start dates, in order.
    pub slice_start_times: Vec<String>,
    pub slice_points: u32,
    pub step_points: u32,
}

/// The zoom-FFT spectrum of the current window.
#[derive(Debug, Clone, Serialize)]
pub struct SpectrumData {
    pub f_plot: Vec<f64>,
    pub p1_plot: Vec<f64>,
    pub freq_range: (f64, f64),
}

/// The rolling spectrogram history.
#[derive(Debug, Clone, Serialize)]
pub struct WaterfallData {
    pub history: Vec<Vec<f64>>,
    pub log_history: Vec<Vec<f64>>,
    pub times: Vec<Timestamp>,
    pub size: u32,
}

/// Facade over the five-node analysis graph.
pub struct TimeFrequencyWorkflow {
    graph: Graph,
}

impl TimeFrequencyWorkflow {
    /// Build the pipeline. Nothing executes until data is loaded.
    pub fn new() -> Result<Self> {
        let mut graph = Graph::new();
        graph.add_node(Node::new(LOADER, DataLoader::boxed()))?;
        graph.add_node(Node::new(FILTER, SignalFilter::boxed()))?;
        graph.add_node(Node::new(SLICER, Slicer::boxed()))?;
        graph.add_node(Node::new(SPECTRUM, ZoomSpectrum::boxed()))?;
        graph.add_node(Node::new(WATERFALL, Waterfall::boxed()))?;

        for port in ["time", "value", "fs"] {
            graph.connect(LOADER, port, FILTER, port)?;
            graph.connect(FILTER, port, SLICER, port)?;
        }
        graph.connect(SLICER, "value", SPECTRUM, "value")?;
        graph.connect(SLICER, "fs", SPECTRUM, "fs")?;
        graph.connect(SPECTRUM, "P1_plot", WATERFALL, "spectrum")?;
        // The waterfall stamps each spectrum with its window's start time.
        graph.connect(SLICER, "time", WATERFALL, "time_point")?;

        Ok(Self { graph })
    }

    /// Point the loader at a data file and run the pipeline.
    pub fn load_data(&mut self, path: &str) -> Result<()> {
        info!(path, "loading data");
        self.graph
            .set_parameter(LOADER, "filename", PortValue::Text(path.to_string()))?;
        self.graph.execute()
    }

    /// Change window duration (seconds) and overlap ratio. The waterfall
    /// history is cleared: its rows would otherwise mix window lengths.
    pub fn set_slice_parameters(&mut self, duration: f64, overlap: f64) -> Result<()> {
        self.graph
            .set_parameter(SLICER, "slice_duration", PortValue::Scalar(duration))?;
        self.graph
            .set_parameter(SLICER, "overlap_ratio", PortValue::Scalar(overlap))?;
        self.clear_waterfall()?;
        self.graph.execute()
    }

    /// Configure the filter stage. `param` is the window size for
    /// mean-downsample and the cutoff frequency in Hz for low-pass.
    pub fn set_filter_parameters(
        &mut self,
        enable: bool,
        filter_type: FilterType,
        param: f64,
    ) -> Result<()> {
        self.graph
            .set_parameter(FILTER, "enable", PortValue::Bool(enable))?;
        self.graph.set_parameter(
            FILTER,
            "filter_type",
            PortValue::Scalar(filter_type.code() as f64),
        )?;
        match filter_type {
            FilterType::MeanDownsample => {
                self.graph
                    .set_parameter(FILTER, "window", PortValue::Scalar(param))?;
            }
            FilterType::LowPass => {
                self.graph
                    .set_parameter(FILTER, "cutoff_freq", PortValue::Scalar(param))?;
            }
        }
        self.graph.execute()
    }

    /// Change the analysed frequency band. Clears the waterfall history,
    /// since the spectrum width changes with the band.
    pub fn set_frequency_range(&mut self, range: (f64, f64)) -> Result<()> {
        self.graph
            .set_parameter(SPECTRUM, "freq_range", PortValue::Pair(range.0, range.1))?;
        self.clear_waterfall()?;
        self.graph.execute()
    }

    /// Resize the waterfall FIFO. Shrinking truncates the buffer from the
    /// head; the pass this triggers appends nothing new.
    pub fn set_waterfall_history_size(&mut self, k: u32) -> Result<()> {
        if k < 2 {
            return Err(FlowError::ValidationError {
                node: WATERFALL.to_string(),
                message: "history_size must be >= 2".to_string(),
            });
        }
        self.graph
            .set_parameter(WATERFALL, "history_size", PortValue::Scalar(k as f64))?;
        self.graph.execute()
    }

    /// Select a window (1-based; clamped by the slicer). Playback is just
    /// this verb called repeatedly.
    pub fn set_current_slice(&mut self, index: u32) -> Result<()> {
        self.graph
            .set_parameter(SLICER, "current_slice", PortValue::Scalar(index as f64))?;
        self.graph.execute()
    }

    /// Drop all computed outputs and the waterfall buffer, then re-run
    /// from whatever parameters are currently set.
    pub fn reset(&mut self) -> Result<()> {
        self.clear_waterfall()?;
        self.graph.reset_all();
        self.graph.execute()
    }

    fn clear_waterfall(&mut self) -> Result<()> {
        self.graph.set_parameter(
            WATERFALL,
            "history",
            PortValue::History(SpectrumHistory::default()),
        )
    }

    fn unexpected(&self, node: &str, port: &str) -> FlowError {
        FlowError::ValidationError {
            node: node.to_string(),
            message: format!("output '{port}' has an unexpected variant"),
        }
    }

    fn scalar_out(&mut self, node: &str, port: &str) -> Result<f64> {
        self.graph
            .get_node_output(node, port)?
            .as_scalar()
            .ok_or_else(|| self.unexpected(node, port))
    }

    fn real_out(&mut self, node: &str, port: &str) -> Result<Vec<f64>> {
        let value = self.graph.get_node_output(node, port)?;
        value
            .as_real()
            .map(<[f64]>::to_vec)
            .ok_or_else(|| self.unexpected(node, port))
    }

    /// Current window plus slicing context.
    pub fn get_slice_data(&mut self) -> Result<SliceData> {
        self.graph.execute()?;
        let time = self
            .graph
            .get_node_output(SLICER, "time")?
            .as_time()
            .map(<[Timestamp]>::to_vec)
            .ok_or_else(|| self.unexpected(SLICER, "time"))?;
        let value = self.real_out(SLICER, "value")?;
        let fs = self.scalar_out(SLICER, "fs")?;
        let num_slices = self.scalar_out(SLICER, "num_slices")? as u32;
        let current_slice = self.scalar_out(SLICER, "current_slice")? as u32;
        let (start, end) = self
            .graph
            .get_node_output(SLICER, "slice_index")?
            .as_pair()
            .ok_or_else(|| self.unexpected(SLICER, "slice_index"))?;
        let slice_time_range = self
            .graph
            .get_node_output(SLICER, "slice_time_range")?
            .as_text()
            .map(str::to_string)
            .ok_or_else(|| self.unexpected(SLICER, "slice_time_range"))?;
        let slice_start_times = self
            .graph
            .get_node_output(SLICER, "slice_start_times")?
            .as_text_list()
            .map(<[String]>::to_vec)
            .ok_or_else(|| self.unexpected(SLICER, "slice_start_times"))?;
        let slice_points = self.scalar_out(SLICER, "slice_points")? as u32;
        let step_points = self.scalar_out(SLICER, "step_points")? as u32;

        Ok(SliceData {
            time,
            value,
            fs,
            num_slices,
            current_slice,
            slice_index: (start as u32, end as u32),
            slice_time_range,
            slice_start_times,
            slice_points,
            step_points,
        })
    }

    /// Spectrum of the current window.
    pub fn get_spectrum_data(&mut self) -> Result<SpectrumData> {
        self.graph.execute()?;
        let spectrum = self
            .graph
            .get_node_output(SPECTRUM, "spectrum")?
            .as_spectrum()
            .cloned()
            .ok_or_else(|| self.unexpected(SPECTRUM, "spectrum"))?;
        Ok(SpectrumData {
            f_plot: spectrum.freqs,
            p1_plot: spectrum.mags,
            freq_range: spectrum.band,
        })
    }

    /// Rolling spectrogram history.
    pub fn get_waterfall_data(&mut self) -> Result<WaterfallData> {
        self.graph.execute()?;
        let history = self
            .graph
            .get_node_output(WATERFALL, "history")?
            .as_history()
            .cloned()
            .ok_or_else(|| self.unexpected(WATERFALL, "history"))?;
        let log_history = self
            .graph
            .get_node_output(WATERFALL, "log_history")?
            .as_history()
            .cloned()
            .ok_or_else(|| self.unexpected(WATERFALL, "log_history"))?;
        let size = self.scalar_out(WATERFALL, "size")? as u32;
        Ok(WaterfallData {
            history: history.rows,
            log_history: log_history.rows,
            times: history.times,
            size,
        })
    }

    /// Effective sampling rate after the filter stage.
    pub fn get_sampling_rate(&mut self) -> Result<f64> {
        self.graph.execute()?;
        self.scalar_out(SLICER, "fs")
    }

    /// Human-readable description of the active filter, empty when the
    /// filter is disabled.
    pub fn filter_info(&mut self) -> Result<String> {
        self.graph.execute()?;
        self.graph
            .get_node_output(FILTER, "filter_info")?
            .as_text()
            .map(str::to_string)
            .ok_or_else(|| self.unexpected(FILTER, "filter_info"))
    }
}
