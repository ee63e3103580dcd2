use std::sync::Arc;

use sqlx::{Error, Sqlite, Transaction};

use crate::configs::Storage;
use crate::models::AutomationRule;

#[derive(Clone)]
pub struct AutomationRuleRepository {
    storage: Arc<Storage>,
}

impl AutomationRuleRepository {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }
}

impl AutomationRuleRepository {
    pub async fn create(
        &self,
        item: &AutomationRule,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<i32, Error> {
        let id = sqlx::query(
            r#"
            INSERT INTO automation_rules (
                user_id, name, description, trigger_conditions, actions, is_active, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(item.user_id)
        .bind(&item.name)
        .bind(&item.description)
        .bind(&item.trigger_conditions)
        .bind(&item.actions)
        .bind(item.is_active)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&mut **transaction)
        .await?
        .last_insert_rowid();

        Ok(id as i32)
    }

    pub async fn find_active_by_user(&self, user_id: i32) -> Result<Vec<AutomationRule>, Error> {
        let rules: Vec<AutomationRule> = sqlx::query_as(
            "SELECT * FROM automation_rules WHERE user_id = $1 AND is_active = TRUE ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(self.storage.get_pool())
        .await?;

        Ok(rules)
    }
}
