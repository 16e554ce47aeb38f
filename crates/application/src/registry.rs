use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use domain::{Device, DeviceId, DeviceUpdate, DomainError, NameplateStore};

use crate::unit_of_work::UnitOfWork;

/// Reads and mutates registered devices. Writes go through the caller's
/// unit of work, which holds the device's session lease.
pub struct DeviceRegistry {
    store: Arc<dyn NameplateStore>,
}

impl DeviceRegistry {
    pub fn new(store: Arc<dyn NameplateStore>) -> Self {
        Self { store }
    }

    pub async fn get(&self, id: &DeviceId) -> Result<Device, DomainError> {
        self.store
            .find_device(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Device", id))
    }

    pub async fn find_by_address(&self, address: &str) -> Result<Option<Device>, DomainError> {
        self.store.find_device_by_address(address).await
    }

    /// Devices ordered by custom index (unset last), then name
    pub async fn list(&self) -> Result<Vec<Device>, DomainError> {
        let mut devices = self.store.list_devices().await?;
        devices.sort_by(|a, b| {
            match (a.custom_index, b.custom_index) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            }
            .then_with(|| a.name.cmp(&b.name))
        });
        Ok(devices)
    }

    pub async fn update(
        &self,
        uow: &UnitOfWork,
        id: &DeviceId,
        update: &DeviceUpdate,
    ) -> Result<Device, DomainError> {
        if update.is_empty() {
            return Err(DomainError::Validation("Nothing to update".to_string()));
        }
        let mut device = self.get(id).await?;
        device.apply_update(update, Utc::now())?;
        uow.save_device(&device);
        Ok(device)
    }

    /// Removes a device record. Deploy history is kept.
    ///
    /// Refused while the device has pending attempts.
    pub async fn delete(&self, uow: &UnitOfWork, id: &DeviceId) -> Result<Device, DomainError> {
        let device = self.get(id).await?;
        let pending = self.store.count_pending_attempts(id).await?;
        if pending > 0 {
            return Err(DomainError::Conflict(format!(
                "Device {} has {pending} pending deploy attempt(s)",
                device.name
            )));
        }
        uow.delete_device(device.id);
        info!(device_id = %device.id, name = %device.name, "Device removed from registry");
        Ok(device)
    }
}
