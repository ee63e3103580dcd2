use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use time::OffsetDateTime;

use super::{StatusValue, Table};

const DEFAULT_NOTIFY_MESSAGE: &str = "Automation rule executed";

/// Expected value per data point code.
pub type TriggerConditions = IndexMap<String, StatusValue>;

/// Action attached to a rule, in the order it was authored.
#[derive(Debug, Clone, PartialEq)]
pub enum AutomationAction {
    /// Creates a user notification with the given message.
    Notify { message: String },
    /// Kind without an executor; skipped at run time.
    Unsupported { kind: String, parameter: Value },
}

impl AutomationAction {
    pub fn from_entry(kind: &str, parameter: Value) -> Self {
        match kind {
            "notify" => {
                let message = match parameter {
                    Value::String(message) => message,
                    Value::Null => DEFAULT_NOTIFY_MESSAGE.to_string(),
                    other => other.to_string(),
                };
                AutomationAction::Notify { message }
            }
            _ => AutomationAction::Unsupported {
                kind: kind.to_string(),
                parameter,
            },
        }
    }

    pub fn kind(&self) -> &str {
        match self {
            AutomationAction::Notify { .. } => "notify",
            AutomationAction::Unsupported { kind, .. } => kind,
        }
    }
}

/// Rule as stored; definitions stay raw JSON so one malformed rule cannot break loading the rest.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AutomationRule {
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub trigger_conditions: Json<Value>,
    pub actions: Json<Value>,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl AutomationRule {
    pub fn conditions(&self) -> Result<TriggerConditions, serde_json::Error> {
        TriggerConditions::deserialize(&self.trigger_conditions.0)
    }

    pub fn action_list(&self) -> Result<Vec<AutomationAction>, serde_json::Error> {
        let entries = IndexMap::<String, Value>::deserialize(&self.actions.0)?;

        Ok(entries
            .into_iter()
            .map(|(kind, parameter)| AutomationAction::from_entry(&kind, parameter))
            .collect())
    }
}

#[derive(Clone)]
pub struct AutomationRuleTable;

impl Table for AutomationRuleTable {
    fn name(&self) -> &'static str {
        "automation_rules"
    }

    fn create(&self) -> String {
        String::from(
            r#"
            CREATE TABLE IF NOT EXISTS automation_rules (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                name VARCHAR(255) NOT NULL,
                description TEXT,
                trigger_conditions TEXT NOT NULL DEFAULT '{}',
                actions TEXT NOT NULL DEFAULT '{}',
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMP NOT NULL,
                updated_at TIMESTAMP NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_automation_rules_user_id ON automation_rules (user_id);
            "#,
        )
    }

    fn dispose(&self) -> String {
        String::from("DROP TABLE IF EXISTS automation_rules;")
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec!["users"]
    }
}
