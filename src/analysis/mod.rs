//! Analyses run by the binary. Each one reads its fields, composites them by
//! QBO phase and returns named arrays ready to be written out.

pub mod cold_extremes;
pub mod partition;
pub mod stationarity;
pub mod vortex;

pub use {
    cold_extremes::cold_extremes, partition::partition, stationarity::stationarity,
    vortex::vortex_location,
};

use {
    crate::{error::Result, utils::write_array},
    log::info,
    ndarray::ArrayD,
    rayon::prelude::*,
    std::path::Path,
};

/// Named array produced by an analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub name: String,
    pub data: ArrayD<f64>,
}

impl Output {
    pub fn new<S: Into<String>>(name: S, data: ArrayD<f64>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

/// Result of an analysis.
pub trait Report {
    /// Directory name under the output root
    fn name(&self) -> &'static str;

    fn outputs(&self) -> Vec<Output>;

    /// Writes every output as `<root>/<name>/<output>.r8`.
    fn write(&self, root: &Path) -> Result<()> {
        let directory = root.join(self.name());

        self.outputs()
            .par_iter()
            .try_for_each(|output| write_array(&directory, &output.name, output.data.view()))?;

        info!("Wrote {} outputs to {}", self.name(), directory.display());

        Ok(())
    }
}

/// Looks up an output by name.
pub fn find<'a>(outputs: &'a [Output], name: &str) -> Option<&'a Output> {
    outputs.iter().find(|o| o.name == name)
}
