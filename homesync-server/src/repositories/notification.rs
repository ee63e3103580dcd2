use std::sync::Arc;

use sqlx::{Error, Pool, Sqlite, Transaction};

use crate::configs::Storage;
use crate::models::Notification;

#[derive(Clone)]
pub struct NotificationRepository {
    storage: Arc<Storage>,
}

impl NotificationRepository {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    pub fn get_pool(&self) -> &Pool<Sqlite> {
        self.storage.get_pool()
    }
}

impl NotificationRepository {
    pub async fn create(
        &self,
        item: &Notification,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<i32, Error> {
        let id = sqlx::query(
            r#"
            INSERT INTO notifications (user_id, title, message, notification_type, is_read, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(item.user_id)
        .bind(&item.title)
        .bind(&item.message)
        .bind(&item.notification_type)
        .bind(item.is_read)
        .bind(item.created_at)
        .execute(&mut **transaction)
        .await?
        .last_insert_rowid();

        Ok(id as i32)
    }

    pub async fn find_recent_by_user(&self, user_id: i32, limit: i64) -> Result<Vec<Notification>, Error> {
        let notifications: Vec<Notification> = sqlx::query_as(
            r#"
            SELECT * FROM notifications
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.storage.get_pool())
        .await?;

        Ok(notifications)
    }

    /// Returns `false` when no notification with that id belongs to the user.
    pub async fn mark_read(
        &self,
        id: i32,
        user_id: i32,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<bool, Error> {
        let result = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&mut **transaction)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;

    use crate::tests::*;

    use super::*;

    #[tokio::test]
    async fn test_mark_read_requires_owner() {
        let storage = setup_test_db().await;
        let owner = create_test_user(storage.clone(), "owner@example.com", None).await;
        let other = create_test_user(storage.clone(), "other@example.com", None).await;
        let repo = NotificationRepository::new(storage.clone());

        let notification = Notification {
            id: 0,
            user_id: owner.id,
            title: "Devices Synced".to_string(),
            message: "Successfully synced 1 devices from Tuya Cloud".to_string(),
            notification_type: "success".to_string(),
            is_read: false,
            created_at: OffsetDateTime::now_utc(),
        };

        let mut tx = repo.get_pool().begin().await.unwrap();
        let id = repo.create(&notification, &mut tx).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = repo.get_pool().begin().await.unwrap();
        assert!(!repo.mark_read(id, other.id, &mut tx).await.unwrap());
        assert!(repo.mark_read(id, owner.id, &mut tx).await.unwrap());
        tx.commit().await.unwrap();

        let found = repo.find_recent_by_user(owner.id, 50).await.unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].is_read);
    }
}
