use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use domain::card::{CardContent, CardContentProvider, CardSummary};
use domain::{AttemptId, DeployAttempt, DeploySide, Device, DeviceId, DomainError, NameplateStore};

use super::request::{DeployOutcome, DeployRequest};
use crate::connection::{ConnectionManager, SessionLease};
use crate::unit_of_work::UnitOfWork;

/// Drives deploy attempts from request to terminal state.
///
/// Everything that can reject a request (device, card, attempt state) is
/// checked before the radio is touched. Once transmission starts, transport
/// failures are recorded on the attempt instead of being raised.
pub struct DeployOrchestrator {
    store: Arc<dyn NameplateStore>,
    cards: Arc<dyn CardContentProvider>,
    connections: Arc<ConnectionManager>,
}

impl DeployOrchestrator {
    pub fn new(
        store: Arc<dyn NameplateStore>,
        cards: Arc<dyn CardContentProvider>,
        connections: Arc<ConnectionManager>,
    ) -> Self {
        Self {
            store,
            cards,
            connections,
        }
    }

    async fn device(&self, id: &DeviceId) -> Result<Device, DomainError> {
        self.store
            .find_device(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Device", id))
    }

    async fn attempt(&self, id: &AttemptId) -> Result<DeployAttempt, DomainError> {
        self.store
            .find_attempt(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Deploy attempt", id))
    }

    pub async fn deploy(
        &self,
        uow: &UnitOfWork,
        request: &DeployRequest,
    ) -> Result<DeployOutcome, DomainError> {
        let located = self.device(&request.device_id).await?;
        let card = self
            .cards
            .find_card(&request.card_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Card", &request.card_id))?;

        // Held until the unit of work ends so concurrent deploys to this
        // device see each other's committed attempts.
        let mut lease = self.connections.acquire(&located.original_address).await?;
        let mut device = self.device(&request.device_id).await?;

        let now = Utc::now();
        let mut attempt = match &request.attempt_id {
            Some(id) => self.resumable(id, request).await?,
            None => DeployAttempt::new(
                device.id,
                card.id.clone(),
                request.side,
                request.scheduled_at,
                uow.actor().id.clone(),
                now,
            ),
        };

        if request.attempt_id.is_none() && attempt.is_deferred(now) {
            info!(
                attempt_id = %attempt.id,
                device = %device.name,
                scheduled_at = ?attempt.scheduled_at,
                "⏰ Deploy scheduled"
            );
            uow.save_attempt(&attempt);
            uow.hold(lease);
            return Ok(DeployOutcome {
                success: true,
                scheduled: true,
                device_status: device.status,
                attempt,
            });
        }

        attempt.begin_transmission(&uow.actor().id, now)?;
        let frames = self.render(&card, attempt.side).await?;

        let result = transmit(&mut lease, &frames).await;
        let done = Utc::now();
        match result {
            Ok(()) => {
                attempt.succeed(done);
                device.set_current_card(card.id.clone(), done);
                info!(
                    attempt_id = %attempt.id,
                    device = %device.name,
                    card = %card.id,
                    side = attempt.side.code(),
                    retry = attempt.retry_count,
                    "✅ Card deployed"
                );
            }
            Err(message) => {
                warn!(
                    attempt_id = %attempt.id,
                    device = %device.name,
                    card = %card.id,
                    error = %message,
                    "❌ Deploy failed"
                );
                attempt.fail(message, done);
            }
        }
        device.set_status(lease.status(), done);

        uow.save_attempt(&attempt);
        uow.save_device(&device);
        uow.hold(lease);

        Ok(DeployOutcome {
            success: attempt.is_success(),
            scheduled: false,
            device_status: device.status,
            attempt,
        })
    }

    /// Loads an attempt to re-drive and checks it belongs to the request
    async fn resumable(
        &self,
        id: &AttemptId,
        request: &DeployRequest,
    ) -> Result<DeployAttempt, DomainError> {
        let attempt = self.attempt(id).await?;
        if attempt.device_id != request.device_id
            || attempt.card_id != request.card_id
            || attempt.side != request.side
        {
            return Err(DomainError::Validation(format!(
                "Deploy attempt {id} targets a different device, card or side"
            )));
        }
        Ok(attempt)
    }

    /// Renders every face up front. Cards with identical faces render once.
    async fn render(
        &self,
        card: &CardSummary,
        side: DeploySide,
    ) -> Result<Vec<CardContent>, DomainError> {
        let mut frames: Vec<CardContent> = Vec::with_capacity(side.faces().len());
        for &face in side.faces() {
            let frame = match frames.first() {
                Some(first) if card.same_both_sides => CardContent {
                    face,
                    ..first.clone()
                },
                _ => self.cards.render(&card.id, face).await?,
            };
            frames.push(frame);
        }
        Ok(frames)
    }

    /// Cancels an attempt that is still waiting for its scheduled time.
    pub async fn cancel(&self, uow: &UnitOfWork, id: &AttemptId) -> Result<DeployAttempt, DomainError> {
        let attempt = self.attempt(id).await?;
        let lease = match self.store.find_device(&attempt.device_id).await? {
            Some(device) => Some(self.connections.acquire(&device.original_address).await?),
            None => None,
        };

        let mut attempt = self.attempt(id).await?;
        attempt.cancel(Utc::now())?;
        uow.save_attempt(&attempt);
        if let Some(lease) = lease {
            uow.hold(lease);
        }
        info!(attempt_id = %attempt.id, "Scheduled deploy cancelled");
        Ok(attempt)
    }
}

/// Connects if needed and sends the frames in order. Stops at the first
/// failing face and names it in the message.
async fn transmit(lease: &mut SessionLease, frames: &[CardContent]) -> Result<(), String> {
    lease.connect().await.map_err(|e| e.to_string())?;
    for frame in frames {
        lease
            .transmit(frame.face, frame)
            .await
            .map_err(|e| format!("side {}: {e}", frame.face))?;
    }
    Ok(())
}
