#![forbid(unsafe_code)]

use lumen_store::StoreConfig;

use crate::trace::TraceConfig;

/// Tutorial configuration.
#[derive(Debug, Clone)]
pub struct DemoConfig {
    /// Records created by the startup hook.
    pub fixture_count: usize,
    /// Record selected when the client starts, if any.
    pub initial_item: Option<u64>,
    pub store: StoreConfig,
    pub trace: TraceConfig,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            fixture_count: 3,
            initial_item: Some(1),
            store: StoreConfig::default(),
            trace: TraceConfig::default(),
        }
    }
}

impl DemoConfig {
    #[must_use]
    pub fn with_fixture_count(mut self, count: usize) -> Self {
        self.fixture_count = count;
        self
    }

    #[must_use]
    pub fn with_initial_item(mut self, item: Option<u64>) -> Self {
        self.initial_item = item;
        self
    }

    #[must_use]
    pub fn with_store(mut self, store: StoreConfig) -> Self {
        self.store = store;
        self
    }

    #[must_use]
    pub fn with_trace(mut self, trace: TraceConfig) -> Self {
        self.trace = trace;
        self
    }
}
