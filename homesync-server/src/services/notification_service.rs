use std::sync::Arc;

use homesync_api::restful::NotificationResponse;
use time::OffsetDateTime;

use crate::configs::Storage;
use crate::models::{Notification, NotificationKind};
use crate::repositories::NotificationRepository;

use super::event_notifier::{EventNotifier, NOTIFICATION_CREATED, Topic};

pub const NOTIFICATION_LIMIT: i64 = 50;

#[derive(Clone)]
pub struct NotificationService {
    notifications: NotificationRepository,
    notifier: Arc<EventNotifier>,
}

impl NotificationService {
    pub fn new(storage: Arc<Storage>, notifier: Arc<EventNotifier>) -> Self {
        Self {
            notifications: NotificationRepository::new(storage),
            notifier,
        }
    }

    /// Stores a notification and pushes it to the user's topic.
    /// A failed write is logged and yields `None`; callers carry on.
    pub async fn create(
        &self,
        user_id: i32,
        title: &str,
        message: &str,
        kind: NotificationKind,
    ) -> Option<Notification> {
        let mut notification = Notification {
            id: 0,
            user_id,
            title: title.to_string(),
            message: message.to_string(),
            notification_type: kind.to_string(),
            is_read: false,
            created_at: OffsetDateTime::now_utc(),
        };

        let result = async {
            let mut tx = self.notifications.get_pool().begin().await?;
            let id = self.notifications.create(&notification, &mut tx).await?;
            tx.commit().await?;
            Ok::<_, sqlx::Error>(id)
        }
        .await;

        match result {
            Ok(id) => notification.id = id,
            Err(e) => {
                tracing::error!(user_id, title, "Failed to create notification: {}", e);
                return None;
            }
        }

        let payload = serde_json::to_value(NotificationResponse::from(notification.clone()))
            .unwrap_or_default();
        self.notifier
            .publish(&Topic::User(user_id), NOTIFICATION_CREATED, payload)
            .await;

        Some(notification)
    }

    pub async fn recent(&self, user_id: i32) -> Result<Vec<Notification>, sqlx::Error> {
        self.notifications
            .find_recent_by_user(user_id, NOTIFICATION_LIMIT)
            .await
    }

    /// `false` when the notification does not exist or belongs to someone else.
    pub async fn mark_read(&self, id: i32, user_id: i32) -> Result<bool, sqlx::Error> {
        let mut tx = self.notifications.get_pool().begin().await?;
        let updated = self.notifications.mark_read(id, user_id, &mut tx).await?;
        tx.commit().await?;

        Ok(updated)
    }
}
