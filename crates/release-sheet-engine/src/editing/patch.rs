use crate::editing::DirtyFields;
use crate::model::BlockId;

/// Result of applying a command
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    /// Blocks whose rendering changed, including newly inserted ones
    pub changed: Vec<BlockId>,
    /// Blocks that no longer exist
    pub removed: Vec<BlockId>,
    /// Document fields touched by the command
    pub fields: DirtyFields,
    /// Caret after the edit, as a global character offset
    pub new_caret: Option<usize>,
    pub version: u64,
}

impl Patch {
    /// Whether the command changed anything at all
    pub fn is_noop(&self) -> bool {
        self.fields.is_empty()
    }
}
