use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use domain::card::{CardContent, CardContentProvider, CardSummary};
use domain::{CardId, DomainError, Face};

/// A card defined in configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CardConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub same_both_sides: bool,
    /// Text for side A; the card name when omitted
    #[serde(default)]
    pub side_a: Option<String>,
    #[serde(default)]
    pub side_b: Option<String>,
}

/// Serves cards from a fixed catalogue. Faces render to UTF-8 text frames.
pub struct StaticCardProvider {
    cards: HashMap<CardId, CardConfig>,
}

impl StaticCardProvider {
    pub fn new(cards: Vec<CardConfig>) -> Result<Self, DomainError> {
        let mut catalogue = HashMap::with_capacity(cards.len());
        for card in cards {
            let id = CardId::new(card.id.clone())
                .map_err(|e| DomainError::InvalidConfiguration(format!("Card {}: {e}", card.id)))?;
            if catalogue.insert(id, card.clone()).is_some() {
                return Err(DomainError::InvalidConfiguration(format!(
                    "Duplicate card id: {}",
                    card.id
                )));
            }
        }
        Ok(Self { cards: catalogue })
    }

    fn text(card: &CardConfig, face: Face) -> &str {
        let side = match face {
            Face::A => card.side_a.as_deref(),
            Face::B if card.same_both_sides => card.side_a.as_deref(),
            Face::B => card.side_b.as_deref(),
        };
        side.unwrap_or(&card.name)
    }
}

#[async_trait]
impl CardContentProvider for StaticCardProvider {
    async fn find_card(&self, id: &CardId) -> Result<Option<CardSummary>, DomainError> {
        Ok(self.cards.get(id).map(|card| CardSummary {
            id: id.clone(),
            name: card.name.clone(),
            same_both_sides: card.same_both_sides,
        }))
    }

    async fn render(&self, id: &CardId, face: Face) -> Result<CardContent, DomainError> {
        let card = self
            .cards
            .get(id)
            .ok_or_else(|| DomainError::not_found("Card", id))?;
        Ok(CardContent {
            card_id: id.clone(),
            face,
            bytes: Self::text(card, face).as_bytes().to_vec(),
        })
    }
}
