/// Outcome of classifying every pixel of one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MaskResult {
    /// Pixels the classifier accepted.
    pub matching: usize,
    /// Pixels examined (`width * height`).
    pub total: usize,
}

impl MaskResult {
    /// Share of matching pixels; 0.0 for an empty frame.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.matching as f64 / self.total as f64
        }
    }
}
