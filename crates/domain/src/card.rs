use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::deploy::Face;
use crate::error::DomainError;
use crate::ids::CardId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardSummary {
    pub id: CardId,
    pub name: String,
    /// Both faces show the same layout
    pub same_both_sides: bool,
}

/// Rendered bytes for one face, ready for the transport
#[derive(Debug, Clone, PartialEq)]
pub struct CardContent {
    pub card_id: CardId,
    pub face: Face,
    pub bytes: Vec<u8>,
}

/// Resolves cards and renders their faces.
///
/// Rendering is owned by the card service; this core only asks for bytes.
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait CardContentProvider: Send + Sync {
    async fn find_card(&self, id: &CardId) -> Result<Option<CardSummary>, DomainError>;

    async fn render(&self, id: &CardId, face: Face) -> Result<CardContent, DomainError>;
}
