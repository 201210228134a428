use serde::Deserialize;
use serde_json::Value;
use std::fmt;

use crate::error::{Result, RetrieverError};

/// Fallback for required display fields the service left out
pub const UNKNOWN: &str = "unknown";

/// The two policy services queried per run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    /// Secure Cloud Access
    Sca,
    /// Secure Infrastructure Access
    Sia,
}

impl Service {
    pub const ALL: [Service; 2] = [Service::Sca, Service::Sia];

    /// Short tag used in headers and the summary line.
    pub fn tag(&self) -> &'static str {
        match self {
            Service::Sca => "SCA",
            Service::Sia => "SIA",
        }
    }

    /// Host label under the tenant subdomain. SIA is served by `uap`.
    pub fn host_label(&self) -> &'static str {
        match self {
            Service::Sca => "sca",
            Service::Sia => "uap",
        }
    }

    pub fn field_map(&self) -> FieldMap {
        match self {
            Service::Sca => FieldMap::SCA,
            Service::Sia => FieldMap::SIA,
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// How a service encodes the policy status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusStyle {
    /// Numeric flag where `1` means active
    ActiveFlag,
    /// Free text passed through as-is
    Text,
}

/// JSON pointers locating each display field inside a service response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMap {
    /// Array of policies in the response body
    pub collection: &'static str,
    /// Server-reported total, when present
    pub total: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub status: &'static str,
    pub status_style: StatusStyle,
    pub id: &'static str,
}

impl FieldMap {
    pub const SCA: FieldMap = FieldMap {
        collection: "/hits",
        total: "/total",
        name: "/name",
        description: "/description",
        status: "/status",
        status_style: StatusStyle::ActiveFlag,
        id: "/policyId",
    };

    pub const SIA: FieldMap = FieldMap {
        collection: "/results",
        total: "/total",
        name: "/metadata/name",
        description: "/metadata/description",
        status: "/metadata/status/status",
        status_style: StatusStyle::Text,
        id: "/metadata/policyId",
    };

    /// Map a full response body into records plus the reported total.
    ///
    /// A body without the collection key is an empty listing; a collection
    /// that is not an array is malformed.
    pub fn extract(&self, body: &Value) -> Result<(Vec<PolicyRecord>, Option<u64>)> {
        if !body.is_object() {
            return Err(RetrieverError::api("response body is not a JSON object"));
        }

        let records = match body.pointer(self.collection) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items.iter().map(|item| self.record(item)).collect(),
            Some(_) => {
                return Err(RetrieverError::api(format!(
                    "'{}' in response is not an array",
                    self.collection.trim_start_matches('/')
                )))
            }
        };

        let total = body.pointer(self.total).and_then(Value::as_u64);

        Ok((records, total))
    }

    /// Map one policy object. Missing fields fall back instead of failing.
    pub fn record(&self, item: &Value) -> PolicyRecord {
        let status = match (self.status_style, item.pointer(self.status)) {
            (_, None) | (_, Some(Value::Null)) => UNKNOWN.to_string(),
            (StatusStyle::ActiveFlag, Some(Value::Number(n))) => {
                if n.as_i64() == Some(1) {
                    "Active".to_string()
                } else {
                    "Inactive".to_string()
                }
            }
            (_, Some(other)) => display_value(other),
        };

        PolicyRecord {
            name: text_at(item, self.name).unwrap_or_else(|| UNKNOWN.to_string()),
            description: text_at(item, self.description),
            status,
            id: text_at(item, self.id).unwrap_or_else(|| UNKNOWN.to_string()),
        }
    }
}

fn text_at(item: &Value, pointer: &str) -> Option<String> {
    match item.pointer(pointer) {
        None | Some(Value::Null) => None,
        Some(value) => Some(display_value(value)),
    }
}

/// Strings are shown without quotes; anything else in its JSON form.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// A single access policy as displayed to the user
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PolicyRecord {
    #[serde(default = "unknown")]
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default = "unknown")]
    pub status: String,

    #[serde(default = "unknown", alias = "policyId")]
    pub id: String,
}

fn unknown() -> String {
    UNKNOWN.to_string()
}

impl PolicyRecord {
    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }
}

impl fmt::Display for PolicyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Name: {} / Description: {} / Status: {} / Policy ID: {}",
            self.name,
            self.description(),
            self.status,
            self.id
        )
    }
}

/// Outcome of querying one service
#[derive(Debug, Clone)]
pub struct RetrievalResult {
    pub service: Service,
    pub records: Vec<PolicyRecord>,
    /// Total as reported by the service, which may exceed `records.len()`
    pub reported_total: Option<u64>,
    /// Human-readable reason when the retrieval failed
    pub error: Option<String>,
}

impl RetrievalResult {
    pub fn success(service: Service, records: Vec<PolicyRecord>, reported_total: Option<u64>) -> Self {
        RetrievalResult {
            service,
            records,
            reported_total,
            error: None,
        }
    }

    pub fn failure(service: Service, error: &RetrieverError) -> Self {
        RetrievalResult {
            service,
            records: Vec::new(),
            reported_total: None,
            error: Some(error.to_string()),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    /// Number of policies counted towards the summary.
    pub fn count(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fixture_renders_single_line() {
        let record: PolicyRecord = serde_json::from_str(
            r#"{"name":"AWS Admin Access","description":"Cloud admin policy","status":"Active","id":"a1b2c3d4"}"#,
        )
        .expect("fixture should deserialize");

        assert_eq!(
            record.to_string(),
            "Name: AWS Admin Access / Description: Cloud admin policy / Status: Active / Policy ID: a1b2c3d4"
        );
    }

    #[test]
    fn test_record_defaults_for_absent_fields() {
        let record: PolicyRecord = serde_json::from_str(r#"{"policyId":"p-1"}"#).unwrap();
        assert_eq!(record.name, "unknown");
        assert_eq!(record.description, None);
        assert_eq!(record.status, "unknown");
        assert_eq!(record.id, "p-1");
        assert_eq!(
            record.to_string(),
            "Name: unknown / Description:  / Status: unknown / Policy ID: p-1"
        );
    }

    #[test]
    fn test_sca_field_map() {
        let body = json!({
            "hits": [
                {"name": "AWS Admin", "description": "Admin", "status": 1, "policyId": "sca-1"},
                {"name": "GCP Read", "status": 0, "policyId": "sca-2"}
            ],
            "total": 2
        });

        let (records, total) = FieldMap::SCA.extract(&body).unwrap();
        assert_eq!(total, Some(2));
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].status, "Active");
        assert_eq!(records[0].id, "sca-1");
        assert_eq!(records[1].status, "Inactive");
        assert_eq!(records[1].description, None);
    }

    #[test]
    fn test_sia_field_map() {
        let body = json!({
            "results": [{
                "metadata": {
                    "name": "DB Access",
                    "description": "Postgres prod",
                    "status": {"status": "Validating"},
                    "policyId": "sia-1"
                }
            }],
            "total": 1
        });

        let (records, total) = FieldMap::SIA.extract(&body).unwrap();
        assert_eq!(total, Some(1));
        assert_eq!(
            records[0].to_string(),
            "Name: DB Access / Description: Postgres prod / Status: Validating / Policy ID: sia-1"
        );
    }

    #[test]
    fn test_sia_record_without_metadata() {
        let record = FieldMap::SIA.record(&json!({"unexpected": true}));
        assert_eq!(record.name, "unknown");
        assert_eq!(record.status, "unknown");
        assert_eq!(record.id, "unknown");
    }

    #[test]
    fn test_sca_textual_status_passes_through() {
        let record = FieldMap::SCA.record(&json!({"name": "x", "status": "Expired", "policyId": 42}));
        assert_eq!(record.status, "Expired");
        assert_eq!(record.id, "42");
    }

    #[test]
    fn test_missing_collection_is_empty() {
        let (records, total) = FieldMap::SCA.extract(&json!({"total": 0})).unwrap();
        assert!(records.is_empty());
        assert_eq!(total, Some(0));
    }

    #[test]
    fn test_non_array_collection_is_api_error() {
        let result = FieldMap::SIA.extract(&json!({"results": "nope"}));
        assert!(matches!(result, Err(RetrieverError::ApiError { .. })));

        let result = FieldMap::SCA.extract(&json!([1, 2, 3]));
        assert!(matches!(result, Err(RetrieverError::ApiError { .. })));
    }

    #[test]
    fn test_service_tags() {
        assert_eq!(Service::Sca.tag(), "SCA");
        assert_eq!(Service::Sia.host_label(), "uap");
        assert_eq!(Service::Sia.to_string(), "SIA");
    }

    #[test]
    fn test_failure_result_counts_zero() {
        let result = RetrievalResult::failure(Service::Sia, &RetrieverError::api("boom"));
        assert!(!result.succeeded());
        assert_eq!(result.count(), 0);
        assert_eq!(result.error.as_deref(), Some("API error: boom"));
    }
}
