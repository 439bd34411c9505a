//! Fixed-width value buckets.

/// Width of every bucket.
pub const BUCKET_WIDTH: i64 = 10;

/// A half-open interval `[min, max)` of width [BUCKET_WIDTH].
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Bucket {
    /// Inclusive lower bound
    pub min: i64,
    /// Exclusive upper bound
    pub max: i64,
}

impl Bucket {
    /// Returns the bucket of width [BUCKET_WIDTH] that a value falls into.
    ///
    /// See [Bucket::with_width].
    pub fn containing(value: f64) -> Option<Self> {
        Self::with_width(value, BUCKET_WIDTH)
    }

    /// Returns the bucket of the given width that a value falls into.
    ///
    /// The quotient `value / width` is truncated toward zero rather than floored, so for negative
    /// values the bucket does not contain the value: `-5` maps to `[0, 10)`. For non-negative
    /// values the two are equivalent and `min <= value < max` holds.
    ///
    /// Returns `None` for non-finite values and for values whose bounds do not fit in an `i64`.
    ///
    /// # Arguments
    ///
    /// * `value`: Value to bucket
    /// * `width`: Bucket width, greater than zero
    pub fn with_width(value: f64, width: i64) -> Option<Self> {
        debug_assert!(width > 0, "bucket width must be positive");
        let index = (value / width as f64).trunc();
        // i64::MAX as f64 rounds up to 2^63, which is itself out of range.
        if !index.is_finite() || index < i64::MIN as f64 || index >= i64::MAX as f64 {
            return None;
        }
        let min = (index as i64).checked_mul(width)?;
        let max = min.checked_add(width)?;
        Some(Bucket { min, max })
    }
}
