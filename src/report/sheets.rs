// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Google Sheets v4 REST implementation of [`ReportBackend`].
//!
//! A report is a spreadsheet and a table is one of its sheets. Tables are
//! always addressed by their numeric `sheetId` for writes; reads go through
//! A1 ranges built from the sheet title.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

use super::backend::{BackendResult, CellRange, ReportBackend, TableId, TableInfo};
use crate::common::config::AppConfig;
use crate::error::{BackendError, ConfigError, Error};

/// Supplies the bearer token for each request. Acquiring and refreshing it
/// is the caller's business.
pub trait TokenSource: Send + Sync {
    fn token(&self) -> BackendResult<String>;
}

/// A fixed, externally obtained access token.
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl TokenSource for StaticToken {
    fn token(&self) -> BackendResult<String> {
        Ok(self.0.clone())
    }
}

#[derive(Deserialize)]
struct SheetProperties {
    #[serde(rename = "sheetId")]
    sheet_id: TableId,
    #[serde(default)]
    title: String,
}

#[derive(Deserialize)]
struct Sheet {
    properties: SheetProperties,
}

#[derive(Deserialize)]
struct SpreadsheetSheets {
    #[serde(default)]
    sheets: Vec<Sheet>,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Option<Vec<Vec<Value>>>,
}

#[derive(Deserialize)]
struct CreatedSpreadsheet {
    #[serde(rename = "spreadsheetId")]
    spreadsheet_id: String,
}

pub struct SheetsBackend {
    client: reqwest::Client,
    base: Url,
    tokens: Box<dyn TokenSource>,
}

impl SheetsBackend {
    pub fn new(api_base: &str, tokens: Box<dyn TokenSource>) -> Result<Self, Error> {
        let base = Url::parse(api_base).map_err(|e| ConfigError::Invalid {
            key: "report.api_base",
            message: e.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(ConfigError::Invalid {
                key: "report.api_base",
                message: format!("{api_base} cannot be used as a base URL"),
            }
            .into());
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(AppConfig::CONNECTION_TIMEOUT_SECS))
            .pool_idle_timeout(Duration::from_secs(AppConfig::POOL_IDLE_TIMEOUT_SECS))
            .tcp_keepalive(Duration::from_secs(AppConfig::TCP_KEEPALIVE_SECS))
            .build()
            .map_err(BackendError::from)?;

        Ok(Self {
            client,
            base,
            tokens,
        })
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> BackendResult<Value> {
        let token = self.tokens.token()?;
        let response = request.bearer_auth(token).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(status_error(status.as_u16(), &body));
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| BackendError::Decode(e.to_string()))
    }

    async fn batch_update(&self, report_id: &str, requests: Value) -> BackendResult<Value> {
        let url = self.url(&["spreadsheets", &format!("{report_id}:batchUpdate")]);
        self.send(self.client.post(url).json(&json!({ "requests": requests })))
            .await
    }

    /// Make sure the report exists and return the id to use.
    ///
    /// A missing or rejected id leads to a new spreadsheet titled `title`;
    /// transport problems are returned as errors instead.
    pub async fn ensure_report(&self, report_id: Option<&str>, title: &str) -> BackendResult<String> {
        if let Some(id) = report_id {
            let mut url = self.url(&["spreadsheets", id]);
            url.query_pairs_mut().append_pair("fields", "spreadsheetId");
            match self.send(self.client.get(url)).await {
                Ok(_) => return Ok(id.to_string()),
                Err(BackendError::NotFound(message))
                | Err(BackendError::Status {
                    status: 400,
                    message,
                }) => {
                    tracing::error!(op = "ensure_report", "Report id {id} is invalid: {message}");
                }
                Err(e) => return Err(e),
            }
        }

        let new_id = self.create_report(title).await?;
        tracing::warn!(op = "ensure_report", "Created new report {new_id} titled {title:?}");
        Ok(new_id)
    }

    async fn create_report(&self, title: &str) -> BackendResult<String> {
        let mut url = self.url(&["spreadsheets"]);
        url.query_pairs_mut().append_pair("fields", "spreadsheetId");
        let body = json!({ "properties": { "title": title } });
        let value = self.send(self.client.post(url).json(&body)).await?;
        let created: CreatedSpreadsheet =
            serde_json::from_value(value).map_err(|e| BackendError::Decode(e.to_string()))?;
        Ok(created.spreadsheet_id)
    }
}

fn status_error(status: u16, body: &str) -> BackendError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string());
    if status == 404 {
        BackendError::NotFound(message)
    } else {
        BackendError::Status { status, message }
    }
}

fn cell_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn add_sheet_request(title: &str) -> Value {
    json!([{ "addSheet": { "properties": { "title": title } } }])
}

fn rename_sheet_request(id: TableId, title: &str) -> Value {
    json!([{
        "updateSheetProperties": {
            "properties": { "sheetId": id, "title": title },
            "fields": "title"
        }
    }])
}

fn update_cells_request(id: TableId, row: usize, column: usize, values: &[String]) -> Value {
    let cells: Vec<Value> = values
        .iter()
        .map(|v| json!({ "userEnteredValue": { "stringValue": v } }))
        .collect();
    json!([{
        "updateCells": {
            "start": { "sheetId": id, "rowIndex": row, "columnIndex": column },
            "rows": [{ "values": cells }],
            "fields": "userEnteredValue"
        }
    }])
}

#[async_trait]
impl ReportBackend for SheetsBackend {
    async fn list_tables(&self, report_id: &str) -> BackendResult<Vec<TableInfo>> {
        let mut url = self.url(&["spreadsheets", report_id]);
        url.query_pairs_mut()
            .append_pair("fields", "sheets.properties(sheetId,title)");
        let value = self.send(self.client.get(url)).await?;
        let parsed: SpreadsheetSheets =
            serde_json::from_value(value).map_err(|e| BackendError::Decode(e.to_string()))?;
        Ok(parsed
            .sheets
            .into_iter()
            .map(|sheet| TableInfo {
                id: sheet.properties.sheet_id,
                title: sheet.properties.title,
            })
            .collect())
    }

    async fn create_table(&self, report_id: &str, title: &str) -> BackendResult<TableId> {
        let reply = self
            .batch_update(report_id, add_sheet_request(title))
            .await?;
        reply["replies"][0]["addSheet"]["properties"]["sheetId"]
            .as_i64()
            .ok_or_else(|| BackendError::Decode("addSheet reply without sheetId".to_string()))
    }

    async fn rename_table(&self, report_id: &str, id: TableId, title: &str) -> BackendResult<()> {
        self.batch_update(report_id, rename_sheet_request(id, title))
            .await
            .map(|_| ())
    }

    async fn read_range(
        &self,
        report_id: &str,
        range: &CellRange,
    ) -> BackendResult<Option<Vec<Vec<String>>>> {
        let url = self.url(&["spreadsheets", report_id, "values", &range.to_a1()]);
        let value = self.send(self.client.get(url)).await?;
        let parsed: ValueRange =
            serde_json::from_value(value).map_err(|e| BackendError::Decode(e.to_string()))?;
        Ok(parsed
            .values
            .filter(|rows| !rows.is_empty())
            .map(|rows| {
                rows.iter()
                    .map(|row| row.iter().map(cell_to_string).collect())
                    .collect()
            }))
    }

    async fn write_cells(
        &self,
        report_id: &str,
        table_id: TableId,
        row: usize,
        column: usize,
        values: &[String],
    ) -> BackendResult<()> {
        self.batch_update(report_id, update_cells_request(table_id, row, column, values))
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(base: &str) -> SheetsBackend {
        SheetsBackend::new(base, Box::new(StaticToken::new("tok"))).unwrap()
    }

    #[test]
    fn test_url_building_encodes_range() {
        let backend = backend("https://sheets.googleapis.com/v4");
        let range = CellRange::report_columns("My db");
        let url = backend.url(&["spreadsheets", "abc", "values", &range.to_a1()]);
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/abc/values/'My%20db'!A1:D"
        );
    }

    #[test]
    fn test_url_building_with_trailing_slash() {
        let backend = backend("http://localhost:8080/v4/");
        let url = backend.url(&["spreadsheets", "abc:batchUpdate"]);
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/v4/spreadsheets/abc:batchUpdate"
        );
    }

    #[test]
    fn test_invalid_base_is_config_error() {
        let result = SheetsBackend::new("not a url", Box::new(StaticToken::new("t")));
        assert!(matches!(result, Err(Error::Config(ConfigError::Invalid { .. }))));
    }

    #[test]
    fn test_status_error_parsing() {
        let body = r#"{"error": {"code": 404, "message": "Requested entity was not found.", "status": "NOT_FOUND"}}"#;
        assert!(matches!(
            status_error(404, body),
            BackendError::NotFound(m) if m == "Requested entity was not found."
        ));

        match status_error(503, "backend unavailable") {
            BackendError::Status { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "backend unavailable");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_update_cells_request_shape() {
        let request = update_cells_request(42, 3, 0, &["a".to_string(), "b".to_string()]);
        let update = &request[0]["updateCells"];
        assert_eq!(update["start"]["sheetId"], 42);
        assert_eq!(update["start"]["rowIndex"], 3);
        assert_eq!(update["start"]["columnIndex"], 0);
        assert_eq!(
            update["rows"][0]["values"][1]["userEnteredValue"]["stringValue"],
            "b"
        );
        assert_eq!(update["fields"], "userEnteredValue");
    }

    #[test]
    fn test_sheet_requests_shape() {
        let add = add_sheet_request("Server1");
        assert_eq!(add[0]["addSheet"]["properties"]["title"], "Server1");

        let rename = rename_sheet_request(0, "Server1");
        assert_eq!(rename[0]["updateSheetProperties"]["properties"]["sheetId"], 0);
        assert_eq!(rename[0]["updateSheetProperties"]["fields"], "title");
    }

    #[test]
    fn test_value_range_decoding() {
        let parsed: ValueRange =
            serde_json::from_str(r#"{"range": "'S'!A1:D1", "majorDimension": "ROWS"}"#).unwrap();
        assert!(parsed.values.is_none());

        let parsed: ValueRange =
            serde_json::from_str(r#"{"values": [["Server", 1.5, null]]}"#).unwrap();
        let row: Vec<String> = parsed.values.unwrap()[0].iter().map(cell_to_string).collect();
        assert_eq!(row, vec!["Server", "1.5", ""]);
    }

    #[test]
    fn test_sheets_decoding() {
        let parsed: SpreadsheetSheets = serde_json::from_str(
            r#"{"sheets": [{"properties": {"sheetId": 0, "title": "Sheet1"}},
                           {"properties": {"sheetId": 1520, "title": "Server2"}}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.sheets.len(), 2);
        assert_eq!(parsed.sheets[1].properties.sheet_id, 1520);
    }
}
