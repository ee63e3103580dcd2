use std::sync::Arc;

use sqlx::{Error, Pool, Sqlite, Transaction};

use crate::configs::Storage;
use crate::models::DeviceLog;

#[derive(Clone)]
pub struct DeviceLogRepository {
    storage: Arc<Storage>,
}

impl DeviceLogRepository {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    pub fn get_pool(&self) -> &Pool<Sqlite> {
        self.storage.get_pool()
    }
}

impl DeviceLogRepository {
    pub async fn create(
        &self,
        item: &DeviceLog,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<i32, Error> {
        let id = sqlx::query(
            r#"
            INSERT INTO device_logs (device_id, user_id, event_type, command, value, event_data, timestamp)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(item.device_id)
        .bind(item.user_id)
        .bind(&item.event_type)
        .bind(&item.command)
        .bind(&item.value)
        .bind(&item.event_data)
        .bind(item.timestamp)
        .execute(&mut **transaction)
        .await?
        .last_insert_rowid();

        Ok(id as i32)
    }

    /// Newest entries first, optionally narrowed to one device.
    pub async fn find_recent_by_user(
        &self,
        user_id: i32,
        device_id: Option<i32>,
        limit: i64,
    ) -> Result<Vec<DeviceLog>, Error> {
        let logs: Vec<DeviceLog> = sqlx::query_as(
            r#"
            SELECT * FROM device_logs
            WHERE user_id = $1 AND ($2 IS NULL OR device_id = $2)
            ORDER BY timestamp DESC, id DESC
            LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(device_id)
        .bind(limit)
        .fetch_all(self.storage.get_pool())
        .await?;

        Ok(logs)
    }
}

#[cfg(test)]
mod tests {
    use time::{Duration, OffsetDateTime};

    use crate::tests::*;

    use super::*;

    fn entry(device_id: i32, user_id: i32, command: &str, timestamp: OffsetDateTime) -> DeviceLog {
        DeviceLog {
            id: 0,
            device_id,
            user_id,
            event_type: "manual_control".to_string(),
            command: Some(command.to_string()),
            value: Some("true".to_string()),
            event_data: None,
            timestamp,
        }
    }

    #[tokio::test]
    async fn test_recent_logs_are_newest_first_and_capped() {
        let storage = setup_test_db().await;
        let user = create_test_user(storage.clone(), "owner@example.com", None).await;
        let device = create_test_device(storage.clone(), user.id, "dev1", "Lamp").await;
        let repo = DeviceLogRepository::new(storage.clone());

        let start = OffsetDateTime::now_utc();
        let mut tx = repo.get_pool().begin().await.unwrap();
        for i in 0..5 {
            let log = entry(device.id, user.id, &format!("cmd{i}"), start + Duration::seconds(i));
            repo.create(&log, &mut tx).await.unwrap();
        }
        tx.commit().await.unwrap();

        let logs = repo.find_recent_by_user(user.id, None, 3).await.unwrap();

        let commands: Vec<&str> = logs.iter().filter_map(|l| l.command.as_deref()).collect();
        assert_eq!(commands, vec!["cmd4", "cmd3", "cmd2"]);
    }

    #[tokio::test]
    async fn test_recent_logs_filtered_by_device() {
        let storage = setup_test_db().await;
        let user = create_test_user(storage.clone(), "owner@example.com", None).await;
        let lamp = create_test_device(storage.clone(), user.id, "dev1", "Lamp").await;
        let plug = create_test_device(storage.clone(), user.id, "dev2", "Plug").await;
        let repo = DeviceLogRepository::new(storage.clone());

        let now = OffsetDateTime::now_utc();
        let mut tx = repo.get_pool().begin().await.unwrap();
        repo.create(&entry(lamp.id, user.id, "lamp", now), &mut tx).await.unwrap();
        repo.create(&entry(plug.id, user.id, "plug", now), &mut tx).await.unwrap();
        tx.commit().await.unwrap();

        let logs = repo.find_recent_by_user(user.id, Some(plug.id), 100).await.unwrap();

        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].command.as_deref(), Some("plug"));
        assert!(repo.find_recent_by_user(user.id + 1, None, 100).await.unwrap().is_empty());
    }
}
