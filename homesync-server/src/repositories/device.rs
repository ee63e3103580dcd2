use std::sync::Arc;

use homesync_api::provider::ExternalDevice;
use sqlx::types::Json;
use sqlx::{Error, Pool, Sqlite, Transaction};
use time::OffsetDateTime;

use crate::configs::Storage;
use crate::models::{Device, DeviceSnapshot};

#[derive(Clone)]
pub struct DeviceRepository {
    storage: Arc<Storage>,
}

impl DeviceRepository {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    pub fn get_pool(&self) -> &Pool<Sqlite> {
        self.storage.get_pool()
    }
}

impl DeviceRepository {
    /// Inserts the device or refreshes its mutable fields when the external id is known.
    /// Ownership and creation time of an existing row are left untouched.
    pub async fn upsert(
        &self,
        user_id: i32,
        item: &ExternalDevice,
        snapshot: &DeviceSnapshot,
        now: OffsetDateTime,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<Device, Error> {
        let icon = (!item.icon.is_empty()).then(|| item.icon.clone());

        let device: Device = sqlx::query_as(
            r#"
            INSERT INTO devices (
                external_id, user_id, name, category, product_id, product_name,
                icon, online, status, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (external_id) DO UPDATE SET
                name = excluded.name,
                category = excluded.category,
                product_id = excluded.product_id,
                product_name = excluded.product_name,
                icon = excluded.icon,
                online = excluded.online,
                status = excluded.status,
                updated_at = excluded.updated_at
            RETURNING *
            "#,
        )
        .bind(&item.id)
        .bind(user_id)
        .bind(&item.name)
        .bind(&item.category)
        .bind(&item.product_id)
        .bind(&item.product_name)
        .bind(icon)
        .bind(item.online)
        .bind(Json(snapshot))
        .bind(now)
        .bind(now)
        .fetch_one(&mut **transaction)
        .await?;

        Ok(device)
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<Device>, Error> {
        let device: Option<Device> = sqlx::query_as("SELECT * FROM devices WHERE id = $1")
            .bind(id)
            .fetch_optional(self.storage.get_pool())
            .await?;

        Ok(device)
    }

    pub async fn find_by_external_id(&self, external_id: &str) -> Result<Option<Device>, Error> {
        let device: Option<Device> =
            sqlx::query_as("SELECT * FROM devices WHERE external_id = $1")
                .bind(external_id)
                .fetch_optional(self.storage.get_pool())
                .await?;

        Ok(device)
    }

    pub async fn find_by_external_id_in(
        &self,
        external_id: &str,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<Option<Device>, Error> {
        let device: Option<Device> =
            sqlx::query_as("SELECT * FROM devices WHERE external_id = $1")
                .bind(external_id)
                .fetch_optional(&mut **transaction)
                .await?;

        Ok(device)
    }

    pub async fn find_by_user_id(&self, user_id: i32) -> Result<Vec<Device>, Error> {
        let devices: Vec<Device> =
            sqlx::query_as("SELECT * FROM devices WHERE user_id = $1 ORDER BY name")
                .bind(user_id)
                .fetch_all(self.storage.get_pool())
                .await?;

        Ok(devices)
    }

    pub async fn update_status(
        &self,
        id: i32,
        snapshot: &DeviceSnapshot,
        now: OffsetDateTime,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<(), Error> {
        sqlx::query(
            r#"
            UPDATE devices
            SET status = $1, updated_at = $2
            WHERE id = $3
            "#,
        )
        .bind(Json(snapshot))
        .bind(now)
        .bind(id)
        .execute(&mut **transaction)
        .await?;

        Ok(())
    }
}
