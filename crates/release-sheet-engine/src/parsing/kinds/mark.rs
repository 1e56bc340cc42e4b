use crate::model::Mark;

/// Mark tags with owned tag names.
///
/// Several tags read as the same mark; each mark writes one canonical tag.
pub struct MarkTag;

impl MarkTag {
    pub const BOLD: &'static [&'static str] = &["strong", "b"];
    pub const ITALIC: &'static [&'static str] = &["em", "i"];
    pub const UNDERLINE: &'static [&'static str] = &["u"];

    pub fn classify(name: &str) -> Option<Mark> {
        if Self::BOLD.contains(&name) {
            Some(Mark::Bold)
        } else if Self::ITALIC.contains(&name) {
            Some(Mark::Italic)
        } else if Self::UNDERLINE.contains(&name) {
            Some(Mark::Underline)
        } else {
            None
        }
    }

    /// Tag written when serializing `mark`
    pub fn canonical(mark: Mark) -> &'static str {
        match mark {
            Mark::Bold => Self::BOLD[0],
            Mark::Italic => Self::ITALIC[0],
            Mark::Underline => Self::UNDERLINE[0],
        }
    }
}
