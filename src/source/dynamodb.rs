use super::adapter::{Page, SourceError, TablePages};
use super::row::{FieldValue, Row};
use super::watermark::QueryWindow;
use crate::config::types::SourceConfig;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_dynamodb::config::Region;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use std::collections::HashMap;

const FILTER_EXPRESSION: &str = "#ts > :last_ts AND #ts <= :current_ts";

pub type Item = HashMap<String, AttributeValue>;

/// DynamoDB table read with filtered `Scan` requests.
#[derive(Clone)]
pub struct DynamoTable {
    client: Client,
    table: String,
    timestamp_field: String,
}

impl DynamoTable {
    #[tracing::instrument(level = "debug", skip(cfg), fields(table = %cfg.table))]
    pub async fn connect(cfg: &SourceConfig) -> Self {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(cfg.region.clone()));

        if let (Some(key), Some(secret)) = (&cfg.access_key_id, &cfg.secret_access_key) {
            loader = loader.credentials_provider(Credentials::new(
                key.clone(),
                secret.clone(),
                None,
                None,
                "hourly_export_static",
            ));
        }

        if let Some(endpoint) = &cfg.endpoint {
            loader = loader.endpoint_url(endpoint);
        }

        let shared = loader.load().await;

        Self::new(Client::new(&shared), cfg)
    }

    pub fn new(client: Client, cfg: &SourceConfig) -> Self {
        Self {
            client,
            table: cfg.table.clone(),
            timestamp_field: cfg.timestamp_field.clone(),
        }
    }
}

#[async_trait]
impl TablePages for DynamoTable {
    type Cursor = Item;

    fn table_name(&self) -> &str {
        &self.table
    }

    fn timestamp_field(&self) -> &str {
        &self.timestamp_field
    }

    #[tracing::instrument(level = "debug", skip(self, cursor), fields(table = %self.table, window = %window))]
    async fn scan_page(
        &self,
        window: &QueryWindow,
        cursor: Option<Item>,
    ) -> Result<Page<Item>, SourceError> {
        let resp = self
            .client
            .scan()
            .table_name(&self.table)
            .filter_expression(FILTER_EXPRESSION)
            .expression_attribute_names("#ts", &self.timestamp_field)
            .expression_attribute_values(":last_ts", AttributeValue::S(window.lower.to_string()))
            .expression_attribute_values(":current_ts", AttributeValue::S(window.upper.to_string()))
            .set_exclusive_start_key(cursor)
            .send()
            .await
            .map_err(|e| SourceError::Scan {
                table: self.table.clone(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        let rows = resp
            .items
            .unwrap_or_default()
            .into_iter()
            .map(item_to_row)
            .collect();
        let next = resp.last_evaluated_key.filter(|key| !key.is_empty());

        Ok(Page { rows, next })
    }
}

/// Convert an item into a row with fields ordered by name. Items come back as
/// unordered maps, so sorting keeps the rendered column order stable.
pub fn item_to_row(item: Item) -> Row {
    let mut fields: Vec<(String, AttributeValue)> = item.into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));
    fields
        .into_iter()
        .map(|(name, value)| (name, to_field_value(&value)))
        .collect()
}

pub fn to_field_value(value: &AttributeValue) -> FieldValue {
    match value {
        AttributeValue::S(s) => FieldValue::Text(s.clone()),
        AttributeValue::N(n) => FieldValue::Number(n.clone()),
        AttributeValue::Bool(b) => FieldValue::Bool(*b),
        AttributeValue::Null(_) => FieldValue::Null,
        other => FieldValue::Text(to_json(other).to_string()),
    }
}

fn to_json(value: &AttributeValue) -> serde_json::Value {
    use serde_json::Value;

    match value {
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::N(n) => n
            .parse::<serde_json::Number>()
            .map(Value::Number)
            .unwrap_or_else(|_| Value::String(n.clone())),
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::B(blob) => Value::String(hex(blob.as_ref())),
        AttributeValue::Ss(items) => items.iter().cloned().map(Value::String).collect(),
        AttributeValue::Ns(items) => items
            .iter()
            .map(|n| to_json(&AttributeValue::N(n.clone())))
            .collect(),
        AttributeValue::Bs(items) => items
            .iter()
            .map(|b| Value::String(hex(b.as_ref())))
            .collect(),
        AttributeValue::L(items) => items.iter().map(to_json).collect(),
        AttributeValue::M(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            Value::Object(
                keys.into_iter()
                    .map(|k| (k.clone(), to_json(&map[k])))
                    .collect(),
            )
        }
        _ => Value::Null,
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
