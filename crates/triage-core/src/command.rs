//! Keystroke commands — everything the dispatcher can be asked to do.

/// One command per physical key press; multi-key sequences are not supported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Next,
    Previous,
    SeekForward,
    SeekBackward,
    /// Jump to division `n` (1-based) of the configured number of divisions.
    SeekFraction(u32),
    PauseResume,
    Like,
    /// File the current track into the sibling whose label starts with this
    /// (lowercase) character.
    FileToSibling(char),
}

impl Command {
    /// Map a printable keystroke. Transport keys are reserved and shadow any
    /// sibling label sharing their initial (the terminal layer reserves `q`
    /// the same way, before this mapping); remaining lowercase letters fall
    /// through to sibling filing.
    pub fn from_char(c: char, divisions: u32) -> Option<Self> {
        match c {
            'n' => Some(Self::Next),
            'p' => Some(Self::Previous),
            ' ' => Some(Self::PauseResume),
            'l' => Some(Self::Like),
            '0'..='9' => {
                let n = c.to_digit(10)?;
                (1..=divisions).contains(&n).then_some(Self::SeekFraction(n))
            }
            c if c.is_ascii_lowercase() => Some(Self::FileToSibling(c)),
            _ => None,
        }
    }
}
