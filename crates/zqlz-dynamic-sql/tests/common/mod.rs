//! Common test utilities and fixtures

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use minijinja::value::{Object, ObjectRepr, Value};
use zqlz_dynamic_sql::{PropertyAccess, RenderedTemplate, TemplateRenderer, ValueType};

/// Initialize logging for tests if not already initialized
pub fn initialize_logging() {
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::from_default_env()
                    .add_directive("zqlz_dynamic_sql=trace".parse().unwrap()),
            )
            .with_test_writer()
            .finish();

        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

pub fn json_param(value: serde_json::Value) -> Value {
    Value::from_serialize(&value)
}

/// Resolved input values of `rendered`, in marker order.
pub fn bound_values(renderer: &TemplateRenderer, rendered: &RenderedTemplate) -> Vec<Value> {
    rendered
        .resolve_values(renderer.engine())
        .unwrap()
        .into_iter()
        .map(|bound| bound.value)
        .collect()
}

/// A domain object that is not a plain mapping.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: i64,
    pub owner: String,
    pub tags: Vec<String>,
}

impl Object for Account {
    fn repr(self: &Arc<Self>) -> ObjectRepr {
        ObjectRepr::Plain
    }

    fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
        match key.as_str()? {
            "id" => Some(Value::from(self.id)),
            "owner" => Some(Value::from(self.owner.clone())),
            "tags" => Some(Value::from(self.tags.clone())),
            _ => None,
        }
    }
}

/// Property accessor over [`Account`] that declares field types and
/// records every read.
#[derive(Debug)]
pub struct AccountAccessor {
    account: Arc<Account>,
    pub reads: Mutex<Vec<String>>,
}

impl AccountAccessor {
    pub fn new(account: Account) -> Self {
        Self {
            account: Arc::new(account),
            reads: Mutex::new(Vec::new()),
        }
    }

    pub fn parameter(&self) -> Value {
        Value::from_object(Account::clone(&self.account))
    }
}

impl PropertyAccess for AccountAccessor {
    fn has_readable(&self, path: &str) -> bool {
        matches!(path, "id" | "owner" | "tags")
    }

    fn read(&self, path: &str) -> Option<Value> {
        self.reads.lock().unwrap().push(path.to_string());
        self.account.get_value(&Value::from(path))
    }

    fn declared_type_of(&self, path: &str) -> ValueType {
        match path {
            "id" => ValueType::Integer,
            "owner" => ValueType::String,
            "tags" => ValueType::Sequence,
            _ => ValueType::Any,
        }
    }
}
