use crate::models::{
    AutomationRuleTable, DeviceLogTable, DeviceTable, NotificationTable, Table, UserTable,
};

/// Owns the table definitions in creation order: every table comes after the tables it references.
pub struct SchemaManager {
    tables: Vec<Box<dyn Table>>,
}

impl SchemaManager {
    pub fn new(tables: Vec<Box<dyn Table>>) -> Self {
        Self {
            tables: order_by_dependencies(tables),
        }
    }

    pub fn create_schema(&self) -> Vec<String> {
        self.tables.iter().map(|table| table.create()).collect()
    }

    pub fn dispose_schema(&self) -> Vec<String> {
        self.tables.iter().rev().map(|table| table.dispose()).collect()
    }
}

/// Stable topological order. Tables are static definitions, so a cycle is a programming error.
fn order_by_dependencies(mut pending: Vec<Box<dyn Table>>) -> Vec<Box<dyn Table>> {
    let mut ordered: Vec<Box<dyn Table>> = Vec::with_capacity(pending.len());

    while !pending.is_empty() {
        let ready = pending.iter().position(|table| {
            table
                .dependencies()
                .iter()
                .all(|dep| ordered.iter().any(|done| done.name() == *dep))
        });

        match ready {
            Some(index) => ordered.push(pending.remove(index)),
            None => {
                let names: Vec<_> = pending.iter().map(|table| table.name()).collect();
                panic!("unresolvable table dependencies: {names:?}");
            }
        }
    }

    ordered
}

impl Default for SchemaManager {
    fn default() -> Self {
        SchemaManager::new(vec![
            Box::new(UserTable),
            Box::new(DeviceTable),
            Box::new(DeviceLogTable),
            Box::new(NotificationTable),
            Box::new(AutomationRuleTable),
        ])
    }
}
