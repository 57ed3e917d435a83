//! Stable references to screen and scrollback rows
//!
//! A `LineRef` names a row by region and line id rather than by position,
//! so it keeps following its line while the buffers scroll; a main-screen
//! reference transparently becomes a scrollback reference once its line
//! scrolls off the top. The offset is only a resolution hint.

use serde::{Deserialize, Serialize};

use crate::line::LineId;

/// Which buffer a row lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    /// The visible grid, row 0 at the top
    MainScreen,
    /// The history, row 0 being the newest saved line
    Scrollback,
}

/// A stable handle to one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRef {
    pub(crate) region: Region,
    pub(crate) id: LineId,
    /// Last known position inside the region; revalidated on use
    pub(crate) hint: usize,
}

impl LineRef {
    pub(crate) fn new(region: Region, id: LineId, hint: usize) -> Self {
        Self { region, id, hint }
    }

    /// The region this reference last resolved into.
    pub fn region(&self) -> Region {
        self.region
    }

    /// Identity of the referenced line.
    pub fn id(&self) -> LineId {
        self.id
    }
}
