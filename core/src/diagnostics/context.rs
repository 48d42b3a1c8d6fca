use super::RelatedInfo;
use crate::syntax::Anchor;

/// Context information for error messages.
///
/// Points at a second location that explains the primary diagnostic,
/// such as an overload candidate or the line that opened a block.
#[derive(Debug, Clone)]
pub enum Context {
    /// Overload candidate considered during resolution
    Candidate { signature: String, anchor: Anchor },
    /// Where an enclosing block starts
    BlockStartsHere { indent: u32, anchor: Anchor },
}

impl Context {
    /// Convert to a RelatedInfo for diagnostic display
    pub fn to_related_info(&self) -> RelatedInfo {
        match self {
            Context::Candidate { signature, anchor } => RelatedInfo {
                anchor: anchor.clone(),
                message: format!("candidate: {}", signature),
            },
            Context::BlockStartsHere { indent, anchor } => RelatedInfo {
                anchor: anchor.clone(),
                message: format!("enclosing block is indented {} columns", indent),
            },
        }
    }
}
