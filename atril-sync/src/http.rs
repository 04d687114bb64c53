//! Client for a PostgREST record store (the hosted Supabase REST API).
//!
//! Tables live under `{url}/rest/v1/<table>`; every request carries the
//! project key both as `apikey` and as a bearer token.

use std::collections::BTreeSet;

use atril_core::ledger::InventoryPatch;
use atril_core::{InventoryRecord, MovementRecord, StudentEntry};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::StoreError;
use crate::store::{Store, Table, without_id};

/// PostgREST filter matching every row of a text-keyed table.
const ALL_INVENTORY: (&str, &str) = ("id", "neq.placeholder");
const ALL_HISTORY: (&str, &str) = ("id", "not.is.null");

#[derive(Debug, Clone)]
pub struct HttpStore {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct MovementUpdate<'a> {
    #[serde(rename = "fechaRetorno")]
    return_date: Option<&'a str>,
    status: &'a str,
}

impl HttpStore {
    pub fn new(url: &str, api_key: &str) -> Result<Self, StoreError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(api_key)
            .map_err(|_| StoreError::Unavailable("api key is not a valid header value".into()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|_| StoreError::Unavailable("api key is not a valid header value".into()))?;
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| StoreError::Unavailable(format!("building http client: {e}")))?;
        Ok(Self {
            client,
            base_url: url.trim_end_matches('/').to_string(),
        })
    }

    fn request(&self, method: Method, table: Table) -> RequestBuilder {
        let url = format!("{}/rest/v1/{}", self.base_url, table.name());
        self.client.request(method, url)
    }

    async fn send(&self, table: Table, req: RequestBuilder) -> Result<Response, StoreError> {
        let resp = req
            .send()
            .await
            .map_err(|source| StoreError::Http { table, source })?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::Status {
                table,
                status: status.as_u16(),
                body,
            });
        }
        debug!(%table, %status, "store request ok");
        Ok(resp)
    }

    async fn execute(&self, table: Table, req: RequestBuilder) -> Result<(), StoreError> {
        self.send(table, req.header("Prefer", "return=minimal"))
            .await
            .map(|_| ())
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: Table,
        order: Option<&str>,
    ) -> Result<Vec<T>, StoreError> {
        let mut req = self.request(Method::GET, table).query(&[("select", "*")]);
        if let Some(order) = order {
            req = req.query(&[("order", order)]);
        }
        let resp = self.send(table, req).await?;
        resp.json()
            .await
            .map_err(|source| StoreError::Decode { table, source })
    }

    fn insert_inventory_request(
        &self,
        records: &[InventoryRecord],
    ) -> Result<RequestBuilder, StoreError> {
        let (columns, rows) = uniform_rows(Table::Inventory, records)?;
        Ok(self
            .request(Method::POST, Table::Inventory)
            .query(&[("columns", columns)])
            .json(&rows))
    }
}

/// Rows for a bulk insert, all carrying the same keys.
///
/// An array body must use one key set for every object, so keys missing
/// from a row are sent as null. Returns the comma-joined column list too.
fn uniform_rows<T: Serialize>(table: Table, rows: &[T]) -> Result<(String, Vec<Value>), StoreError> {
    let mut values = rows
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| StoreError::Encode { table, source })?;

    let columns: BTreeSet<String> = values
        .iter()
        .filter_map(Value::as_object)
        .flat_map(|obj| obj.keys().cloned())
        .collect();
    for obj in values.iter_mut().filter_map(Value::as_object_mut) {
        for column in &columns {
            obj.entry(column.as_str()).or_insert(Value::Null);
        }
    }

    let columns = columns.into_iter().collect::<Vec<_>>().join(",");
    Ok((columns, values))
}

fn eq(id: &str) -> String {
    format!("eq.{id}")
}

impl Store for HttpStore {
    async fn delete_all_inventory(&self) -> Result<(), StoreError> {
        let req = self
            .request(Method::DELETE, Table::Inventory)
            .query(&[ALL_INVENTORY]);
        self.execute(Table::Inventory, req).await
    }

    async fn insert_inventory(&self, records: &[InventoryRecord]) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }
        let req = self.insert_inventory_request(records)?;
        self.execute(Table::Inventory, req).await
    }

    async fn select_inventory(&self) -> Result<Vec<InventoryRecord>, StoreError> {
        self.select(Table::Inventory, None).await
    }

    async fn update_inventory(&self, patch: &InventoryPatch) -> Result<(), StoreError> {
        let req = self
            .request(Method::PATCH, Table::Inventory)
            .query(&[("id", eq(&patch.id))])
            .json(patch);
        self.execute(Table::Inventory, req).await
    }

    async fn upsert_students(&self, students: &[StudentEntry]) -> Result<(), StoreError> {
        let rows: Vec<StudentEntry> = students
            .iter()
            .map(|s| {
                let mut row = without_id(s);
                row.name = row.name.trim().to_uppercase();
                row
            })
            .collect();
        let req = self
            .request(Method::POST, Table::Students)
            .query(&[("on_conflict", "name")])
            .header("Prefer", "resolution=merge-duplicates")
            .json(&rows);
        self.execute(Table::Students, req).await
    }

    async fn select_students(&self) -> Result<Vec<StudentEntry>, StoreError> {
        self.select(Table::Students, Some("name.asc")).await
    }

    async fn insert_student(&self, student: &StudentEntry) -> Result<(), StoreError> {
        let req = self
            .request(Method::POST, Table::Students)
            .json(&[without_id(student)]);
        self.execute(Table::Students, req).await
    }

    async fn update_student(&self, student: &StudentEntry) -> Result<(), StoreError> {
        let req = self
            .request(Method::PATCH, Table::Students)
            .query(&[("id", eq(&student.id))])
            .json(&without_id(student));
        self.execute(Table::Students, req).await
    }

    async fn delete_student(&self, id: &str) -> Result<(), StoreError> {
        let req = self
            .request(Method::DELETE, Table::Students)
            .query(&[("id", eq(id))]);
        self.execute(Table::Students, req).await
    }

    async fn insert_movement(&self, movement: &MovementRecord) -> Result<(), StoreError> {
        let req = self.request(Method::POST, Table::History).json(movement);
        self.execute(Table::History, req).await
    }

    async fn update_movement(&self, movement: &MovementRecord) -> Result<(), StoreError> {
        let body = MovementUpdate {
            return_date: movement.return_date.as_deref(),
            status: movement.status.as_str(),
        };
        let req = self
            .request(Method::PATCH, Table::History)
            .query(&[("id", eq(&movement.id))])
            .json(&body);
        self.execute(Table::History, req).await
    }

    async fn select_history(&self) -> Result<Vec<MovementRecord>, StoreError> {
        self.select(Table::History, Some("created_at.desc")).await
    }

    async fn delete_all_history(&self) -> Result<(), StoreError> {
        let req = self
            .request(Method::DELETE, Table::History)
            .query(&[ALL_HISTORY]);
        self.execute(Table::History, req).await
    }
}
