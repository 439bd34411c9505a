use crate::error::PipelineError;
use crate::models::Measurement;

/// Trait for series summaries.
///
/// This forms the contract between the pipeline and the reduction applied to each record's series.
/// Implementations must be pure: the same samples always give the same value.
pub trait Summary {
    /// Name of the summary, used in logs.
    const NAME: &'static str;

    /// Reduce a series to a single value.
    ///
    /// # Arguments
    ///
    /// * `measurement`: Measurement the samples belong to, used in errors
    /// * `samples`: Samples of the series, in order
    fn summarize(measurement: Measurement, samples: &[f64]) -> Result<f64, PipelineError>;
}
