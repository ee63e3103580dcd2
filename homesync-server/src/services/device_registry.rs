use std::sync::Arc;

use homesync_api::provider::ExternalDevice;
use sqlx::Error;
use time::OffsetDateTime;

use crate::configs::Storage;
use crate::models::{Device, DeviceSnapshot};
use crate::repositories::DeviceRepository;

/// Sole write path for device rows.
///
/// No ownership checks happen here; callers compare `device.user_id` with the requester.
#[derive(Clone)]
pub struct DeviceRegistry {
    devices: DeviceRepository,
}

impl DeviceRegistry {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self {
            devices: DeviceRepository::new(storage),
        }
    }

    pub async fn upsert_from_sync(
        &self,
        user_id: i32,
        external: &ExternalDevice,
        snapshot: &DeviceSnapshot,
    ) -> Result<Device, Error> {
        let mut tx = self.devices.get_pool().begin().await?;
        let device = self
            .devices
            .upsert(user_id, external, snapshot, OffsetDateTime::now_utc(), &mut tx)
            .await?;
        tx.commit().await?;

        Ok(device)
    }

    /// Upserts a whole sync batch in one transaction: either every device is written or none.
    pub async fn upsert_batch(
        &self,
        user_id: i32,
        batch: &[(ExternalDevice, DeviceSnapshot)],
    ) -> Result<Vec<Device>, Error> {
        let now = OffsetDateTime::now_utc();
        let mut tx = self.devices.get_pool().begin().await?;
        let mut devices = Vec::with_capacity(batch.len());

        for (external, snapshot) in batch {
            let device = self
                .devices
                .upsert(user_id, external, snapshot, now, &mut tx)
                .await?;
            devices.push(device);
        }

        tx.commit().await?;

        Ok(devices)
    }

    pub async fn find_by_external_id(&self, external_id: &str) -> Result<Option<Device>, Error> {
        self.devices.find_by_external_id(external_id).await
    }

    pub async fn find_by_internal_id(&self, id: i32) -> Result<Option<Device>, Error> {
        self.devices.find_by_id(id).await
    }

    pub async fn find_by_user(&self, user_id: i32) -> Result<Vec<Device>, Error> {
        self.devices.find_by_user_id(user_id).await
    }

    /// Merges `update` into the stored snapshot and bumps the timestamp.
    /// Returns `None` for unknown external ids; nothing is created.
    pub async fn apply_status(
        &self,
        external_id: &str,
        update: &DeviceSnapshot,
    ) -> Result<Option<Device>, Error> {
        let mut tx = self.devices.get_pool().begin().await?;

        let Some(mut device) = self.devices.find_by_external_id_in(external_id, &mut tx).await? else {
            return Ok(None);
        };

        let now = OffsetDateTime::now_utc();
        device.status.0.merge(update);
        self.devices
            .update_status(device.id, &device.status.0, now, &mut tx)
            .await?;
        tx.commit().await?;

        device.updated_at = now;

        Ok(Some(device))
    }
}
