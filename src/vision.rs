//! Ingredient detection — opaque image collaborator.
//!
//! The grocery intake path appends whatever item names the detector
//! returns; recognition itself is someone else's problem.

use async_trait::async_trait;

use crate::error::GenerationError;

/// Opaque detector: image bytes in, detected item names out.
#[async_trait]
pub trait IngredientDetector: Send + Sync {
    async fn detect(&self, image: &[u8]) -> Result<Vec<String>, GenerationError>;
}
