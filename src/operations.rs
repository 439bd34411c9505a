//! Series summaries.
//!
//! Each summary is implemented as a struct that implements the
//! [Summary](crate::operation::Summary) trait.

use crate::error::PipelineError;
use crate::models::Measurement;
use crate::operation::Summary;

use ndarray::ArrayView1;

/// Arithmetic mean of the samples.
pub struct Mean {}

impl Summary for Mean {
    const NAME: &'static str = "mean";

    fn summarize(measurement: Measurement, samples: &[f64]) -> Result<f64, PipelineError> {
        // mean() is None for an empty view.
        ArrayView1::from(samples)
            .mean()
            .ok_or(PipelineError::EmptySeries { measurement })
    }
}
