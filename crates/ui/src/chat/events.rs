/// Emitted when the user asks to send the current input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submit {
    pub question: String,
}

impl Submit {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
        }
    }
}

/// Emitted when the user wants to choose a file to attach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PickAttachment;

/// Emitted when the user discards the staged file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClearAttachment;
