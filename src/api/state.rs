use crate::engine::Aggregator;

/// Shared state for all handlers. The aggregator's sources are read-only
/// after construction, so no locking is needed.
pub struct AppState {
    pub aggregator: Aggregator,
}

impl AppState {
    pub fn new(aggregator: Aggregator) -> Self {
        Self { aggregator }
    }
}
