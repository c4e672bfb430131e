use serde::{Deserialize, Serialize};
use std::fmt;

/// Terminal size in character cells, as fit to the viewport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionGeometry {
    #[serde(rename = "cols")]
    pub columns: u16,
    pub rows: u16,
}

impl SessionGeometry {
    pub const fn new(columns: u16, rows: u16) -> Self {
        Self { columns, rows }
    }
}

impl Default for SessionGeometry {
    fn default() -> Self {
        Self::new(80, 24)
    }
}

impl fmt::Display for SessionGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.columns, self.rows)
    }
}
