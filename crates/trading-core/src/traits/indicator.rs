//! Indicator trait definitions.

use crate::error::IndicatorError;

/// Batch indicator over a contiguous price slice.
///
/// Output is aligned with the input: `calculate(data)[i]` belongs to
/// `data[i]`, and values before [`Indicator::warmup`] are not meaningful.
pub trait Indicator: Send + Sync {
    /// Calculate indicator values for the given data.
    fn calculate(&self, data: &[f64]) -> Vec<f64>;

    /// Number of leading values inside the warm-up window.
    fn warmup(&self) -> usize;

    /// Get the name of the indicator.
    fn name(&self) -> &str;

    /// Reject inputs too short to leave the warm-up window.
    fn validate_data(&self, data: &[f64]) -> Result<(), IndicatorError> {
        if data.len() <= self.warmup() {
            return Err(IndicatorError::InvalidParameter(format!(
                "{} needs more than {} points, have {}",
                self.name(),
                self.warmup(),
                data.len()
            )));
        }
        Ok(())
    }
}
