use thiserror::Error;

/// Errors surfaced by the exploration engine.
///
/// Transient failures (OCR, input) are reported back to the step loop as
/// `StepOutcome::Paused`; nothing here aborts a run.
#[derive(Debug, Error)]
pub enum ExplorerError {
    #[error("Screen capture failed: {0}")]
    OcrFailed(String),

    #[error("Input actuation failed: {0}")]
    InputFailed(String),

    #[error("Component definition error: {0}")]
    DefinitionParse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
