//! Lifecycle of a filter run.

/// State of the sequential filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterState {
    /// Holding the initial prior, no frame processed yet.
    #[default]
    Init,
    /// At least one frame processed.
    Running,
    /// The frame sequence is exhausted or a fatal error stopped the run.
    Finished,
}
