use std::sync::Arc;

use serde_json::{Map, Value};

use crate::models::{AutomationAction, AutomationRule, Device, DeviceSnapshot, NotificationKind, TriggerConditions};

use super::notification_service::NotificationService;

const AUTOMATION_TITLE: &str = "Automation Triggered";

/// A rule whose conditions matched, with its actions already parsed.
#[derive(Debug, Clone)]
pub struct MatchedRule<'a> {
    pub rule: &'a AutomationRule,
    pub conditions: TriggerConditions,
    pub actions: Vec<AutomationAction>,
}

/// Result of running one fired rule.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleOutcome {
    pub rule_id: i32,
    pub rule_name: String,
    pub conditions: TriggerConditions,
    /// Kinds of the actions that ran, in order.
    pub executed: Vec<String>,
    /// Kinds without an executor.
    pub skipped: Vec<String>,
}

impl RuleOutcome {
    /// Audit payload of an automation trigger.
    pub fn event_data(&self) -> Value {
        let conditions: Map<String, Value> = self
            .conditions
            .iter()
            .map(|(code, value)| (code.clone(), value.to_json()))
            .collect();

        serde_json::json!({
            "rule_id": self.rule_id,
            "rule_name": self.rule_name,
            "conditions": conditions,
            "actions": self.executed,
        })
    }
}

/// Any-match: one condition code present in the snapshot with an equal string form is enough.
/// Codes missing from the snapshot never match.
pub fn conditions_match(conditions: &TriggerConditions, snapshot: &DeviceSnapshot) -> bool {
    conditions.iter().any(|(code, expected)| {
        snapshot
            .get(code)
            .is_some_and(|actual| actual.matches(expected))
    })
}

/// Rules fired by `snapshot`, in input order. Rules whose conditions cannot be parsed are skipped.
pub fn matching_rules<'a>(snapshot: &DeviceSnapshot, rules: &'a [AutomationRule]) -> Vec<MatchedRule<'a>> {
    rules
        .iter()
        .filter_map(|rule| {
            let conditions = match rule.conditions() {
                Ok(conditions) => conditions,
                Err(e) => {
                    tracing::warn!(rule_id = rule.id, "Skipping rule with unreadable conditions: {}", e);
                    return None;
                }
            };

            if !conditions_match(&conditions, snapshot) {
                return None;
            }

            let actions = rule.action_list().unwrap_or_else(|e| {
                tracing::warn!(rule_id = rule.id, "Rule actions unreadable, nothing to run: {}", e);
                Vec::new()
            });

            Some(MatchedRule {
                rule,
                conditions,
                actions,
            })
        })
        .collect()
}

#[derive(Clone)]
pub struct AutomationEvaluator {
    notifications: Arc<NotificationService>,
}

impl AutomationEvaluator {
    pub fn new(notifications: Arc<NotificationService>) -> Self {
        Self { notifications }
    }

    /// Runs the actions of every rule fired by `snapshot` for `device`'s owner.
    pub async fn evaluate(
        &self,
        device: &Device,
        snapshot: &DeviceSnapshot,
        rules: &[AutomationRule],
    ) -> Vec<RuleOutcome> {
        let mut outcomes = Vec::new();

        for matched in matching_rules(snapshot, rules) {
            let mut outcome = RuleOutcome {
                rule_id: matched.rule.id,
                rule_name: matched.rule.name.clone(),
                conditions: matched.conditions,
                executed: Vec::new(),
                skipped: Vec::new(),
            };

            for action in matched.actions {
                match action {
                    AutomationAction::Notify { message } => {
                        self.notifications
                            .create(device.user_id, AUTOMATION_TITLE, &message, NotificationKind::Info)
                            .await;
                        outcome.executed.push("notify".to_string());
                    }
                    AutomationAction::Unsupported { kind, .. } => {
                        tracing::warn!(rule_id = outcome.rule_id, kind = %kind, "Unknown action kind skipped");
                        outcome.skipped.push(kind);
                    }
                }
            }

            tracing::info!(
                rule_id = outcome.rule_id,
                device = %device.external_id,
                "Automation rule fired"
            );
            outcomes.push(outcome);
        }

        outcomes
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use sqlx::types::Json;
    use time::OffsetDateTime;

    use crate::models::StatusValue;
    use crate::services::event_notifier::EventNotifier;
    use crate::tests::*;

    use super::*;

    fn rule(id: i32, conditions: Value, actions: Value) -> AutomationRule {
        let now = OffsetDateTime::now_utc();
        AutomationRule {
            id,
            user_id: 1,
            name: format!("rule {id}"),
            description: None,
            trigger_conditions: Json(conditions),
            actions: Json(actions),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn snapshot(entries: &[(&str, StatusValue)]) -> DeviceSnapshot {
        let mut snapshot = DeviceSnapshot::new();
        for (code, value) in entries {
            snapshot.insert(*code, value.clone());
        }
        snapshot
    }

    #[test]
    fn test_any_condition_is_enough() {
        let rules = vec![rule(1, json!({ "switch": "true", "bright_value": 10 }), json!({}))];
        let snap = snapshot(&[("switch", StatusValue::Text("true".into()))]);

        assert_eq!(matching_rules(&snap, &rules).len(), 1);
    }

    #[test]
    fn test_string_form_comparison() {
        let rules = vec![
            rule(1, json!({ "switch": "true" }), json!({})),
            rule(2, json!({ "bright_value": "255" }), json!({})),
            rule(3, json!({ "switch": "True" }), json!({})),
        ];
        let snap = snapshot(&[
            ("switch", StatusValue::Bool(true)),
            ("bright_value", StatusValue::from_json(&json!(255)).unwrap()),
        ]);

        let fired: Vec<i32> = matching_rules(&snap, &rules).iter().map(|m| m.rule.id).collect();
        assert_eq!(fired, vec![1, 2]);
    }

    #[test]
    fn test_absent_codes_never_match() {
        let rules = vec![rule(1, json!({ "countdown": 0 }), json!({ "notify": "x" }))];
        let snap = snapshot(&[("switch", StatusValue::Bool(false))]);

        assert!(matching_rules(&snap, &rules).is_empty());
        assert!(!conditions_match(&TriggerConditions::new(), &snap));
    }

    #[test]
    fn test_unreadable_conditions_are_skipped() {
        let rules = vec![
            rule(1, json!(["switch"]), json!({})),
            rule(2, json!({ "switch": false }), json!({})),
        ];
        let snap = snapshot(&[("switch", StatusValue::Bool(false))]);

        let fired: Vec<i32> = matching_rules(&snap, &rules).iter().map(|m| m.rule.id).collect();
        assert_eq!(fired, vec![2]);
    }

    #[tokio::test]
    async fn test_unknown_actions_do_not_stop_notify() {
        let storage = setup_test_db().await;
        let user = create_test_user(storage.clone(), "owner@example.com", None).await;
        let device = create_test_device(storage.clone(), user.id, "dev1", "Lamp").await;
        let notifications = Arc::new(NotificationService::new(storage.clone(), Arc::new(EventNotifier::new())));
        let evaluator = AutomationEvaluator::new(notifications.clone());

        let rules = vec![rule(
            1,
            json!({ "switch": "true" }),
            json!({ "scene": "evening", "notify": "Lamp on" }),
        )];
        let snap = snapshot(&[("switch", StatusValue::Text("true".into()))]);

        let outcomes = evaluator.evaluate(&device, &snap, &rules).await;

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].executed, vec!["notify".to_string()]);
        assert_eq!(outcomes[0].skipped, vec!["scene".to_string()]);
        assert_eq!(outcomes[0].event_data()["conditions"]["switch"], "true");

        let stored = notifications.recent(user.id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].title, AUTOMATION_TITLE);
        assert_eq!(stored[0].message, "Lamp on");
    }
}
