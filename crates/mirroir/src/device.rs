//! Device-facing capabilities
//!
//! The explorer observes the target through a [`ScreenDescriber`] and
//! drives it through an [`InputActuator`]. Both are async: the concrete
//! implementations block on an OCR pipeline and a mirroring bridge that
//! may take seconds per call.

use async_trait::async_trait;

use crate::errors::ExplorerError;
use crate::types::ScreenDescription;

/// Produces an OCR-derived description of whatever is currently on
/// screen.
#[async_trait]
pub trait ScreenDescriber: Send + Sync {
    /// Describe the current screen. `skip_ocr` asks for a cheap capture
    /// (screenshot and hints only) when the caller does not need text.
    async fn describe(&self, skip_ocr: bool) -> Result<ScreenDescription, ExplorerError>;
}

/// Physical input into the mirrored device.
#[async_trait]
pub trait InputActuator: Send + Sync {
    async fn tap(&self, x: f64, y: f64) -> Result<(), ExplorerError>;

    async fn swipe(
        &self,
        from_x: f64,
        from_y: f64,
        to_x: f64,
        to_y: f64,
        duration_ms: u64,
    ) -> Result<(), ExplorerError>;

    async fn double_tap(&self, x: f64, y: f64) -> Result<(), ExplorerError>;

    async fn long_press(&self, x: f64, y: f64) -> Result<(), ExplorerError>;

    async fn press_key(&self, key: &str, modifiers: &[String]) -> Result<(), ExplorerError>;

    async fn type_text(&self, text: &str) -> Result<(), ExplorerError>;

    async fn shake(&self) -> Result<(), ExplorerError>;

    async fn launch_app(&self, name: &str) -> Result<(), ExplorerError>;

    async fn open_url(&self, url: &str) -> Result<(), ExplorerError>;
}
