use serde::{Deserialize, Serialize};

/// Bytes of response data held in memory per chunk.
pub const DEFAULT_CHUNK_BUDGET: usize = 1 << 24;

/// Knobs of a single import. Missing fields take their default when loaded
/// from JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    /// Contributor name recorded in the ledger.
    pub name: Option<String>,
    /// Write the five point sections. Without them the output only carries
    /// the header and the ledger, and the new challenge stays pending.
    pub materialize_points: bool,
    pub chunk_budget: usize,
}

impl Default for ImportOptions {
    fn default() -> Self {
        ImportOptions {
            name: None,
            materialize_points: true,
            chunk_budget: DEFAULT_CHUNK_BUDGET,
        }
    }
}

impl ImportOptions {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn metadata_only(mut self) -> Self {
        self.materialize_points = false;
        self
    }

    pub fn with_chunk_budget(mut self, chunk_budget: usize) -> Self {
        self.chunk_budget = chunk_budget;
        self
    }
}
