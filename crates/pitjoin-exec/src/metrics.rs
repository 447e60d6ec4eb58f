//! Per-view pipeline counters.
//!
//! Emitted as trace events only; exporters belong in the embedding binary.

/// What one feature view pipeline read and kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewStats {
    pub view: String,
    /// Source rows before any filtering.
    pub scanned: usize,
    /// Entity rows that received a feature row.
    pub resolved: usize,
}

impl ViewStats {
    pub fn new(view: impl Into<String>, scanned: usize, resolved: usize) -> Self {
        Self {
            view: view.into(),
            scanned,
            resolved,
        }
    }

    /// Fraction of scanned rows that survived the pipeline.
    pub fn selectivity(&self) -> f64 {
        if self.scanned == 0 {
            0.0
        } else {
            self.resolved as f64 / self.scanned as f64
        }
    }

    #[cfg(feature = "tracing")]
    pub fn emit(&self) {
        let span = tracing::span!(tracing::Level::TRACE, "pitjoin.view", view = %self.view);
        let _entered = span.enter();
        tracing::trace!(
            scanned = self.scanned,
            resolved = self.resolved,
            selectivity = self.selectivity(),
            "view metrics"
        );
    }

    #[cfg(not(feature = "tracing"))]
    pub fn emit(&self) {}
}
