//! HTTP client for the remote data service.
//!
//! Wire shapes:
//!
//! ```text
//! POST {base}/                                  → { "res_id": "..." }
//! GET  {base}/{res}/db/{coll}/find?query=&projection=
//! POST {base}/{res}/db/{coll}/insert            body { "document": ... }
//! POST {base}/{res}/keep-alive
//! ```
//!
//! Data responses arrive in a `{ status, result }` envelope; status 0
//! is success and anything else surfaces as [`ServiceError::Remote`].

use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::service::{DataService, ResourceId, ServiceError};

#[derive(Debug, Deserialize)]
struct CreateResponse {
    #[serde(default)]
    res_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpResponse {
    status: i64,
    #[serde(default)]
    result: JsonValue,
}

/// Blocking [`DataService`] over HTTP.
pub struct HttpDataService {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpDataService {
    /// `base_url` may carry a trailing slash; it is normalized away.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client: reqwest::blocking::Client::new(), base_url }
    }

    fn collection_url(&self, resource: &ResourceId, collection: &str, operation: &str) -> String {
        format!("{}/{}/db/{}/{}", self.base_url, resource, collection, operation)
    }

    fn unwrap_envelope(response: OpResponse) -> Result<JsonValue, ServiceError> {
        if response.status == 0 {
            Ok(response.result)
        } else {
            Err(ServiceError::Remote {
                status: response.status,
                message: response.result.to_string(),
            })
        }
    }
}

fn transport(err: reqwest::Error) -> ServiceError {
    ServiceError::Transport(err.to_string())
}

impl DataService for HttpDataService {
    fn create_resource(&self) -> Result<ResourceId, ServiceError> {
        let response: CreateResponse = self
            .client
            .post(format!("{}/", self.base_url))
            .send()
            .map_err(transport)?
            .error_for_status()
            .map_err(transport)?
            .json()
            .map_err(transport)?;
        match response.res_id {
            Some(id) => {
                tracing::debug!(res_id = %id, "resource created");
                Ok(ResourceId::new(id))
            }
            None => Err(ServiceError::Malformed("creation response carried no res_id".to_string())),
        }
    }

    fn find(
        &self,
        resource: &ResourceId,
        collection: &str,
        filter: Option<&JsonValue>,
        projection: Option<&JsonValue>,
    ) -> Result<Vec<JsonValue>, ServiceError> {
        let url = self.collection_url(resource, collection, "find");
        // Omitted arguments stay out of the query string entirely.
        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(filter) = filter {
            params.push(("query", filter.to_string()));
        }
        if let Some(projection) = projection {
            params.push(("projection", projection.to_string()));
        }
        tracing::debug!(%url, params = params.len(), "find request");
        let response: OpResponse = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .map_err(transport)?
            .error_for_status()
            .map_err(transport)?
            .json()
            .map_err(transport)?;
        match Self::unwrap_envelope(response)? {
            JsonValue::Array(documents) => Ok(documents),
            other => Err(ServiceError::Malformed(format!("find result is not an array: {other}"))),
        }
    }

    fn insert(
        &self,
        resource: &ResourceId,
        collection: &str,
        document: &JsonValue,
    ) -> Result<(), ServiceError> {
        let url = self.collection_url(resource, collection, "insert");
        tracing::debug!(%url, "insert request");
        let response: OpResponse = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "document": document }))
            .send()
            .map_err(transport)?
            .error_for_status()
            .map_err(transport)?
            .json()
            .map_err(transport)?;
        Self::unwrap_envelope(response).map(|_| ())
    }

    fn keep_alive(&self, resource: &ResourceId) -> Result<(), ServiceError> {
        let url = format!("{}/{}/keep-alive", self.base_url, resource);
        self.client
            .post(&url)
            .send()
            .map_err(transport)?
            .error_for_status()
            .map_err(transport)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_collection_url_normalizes_base() {
        let service = HttpDataService::new("http://localhost:8080/mws/");
        let url = service.collection_url(&ResourceId::new("res-7"), "crabs", "find");
        assert_eq!(url, "http://localhost:8080/mws/res-7/db/crabs/find");
    }

    #[test]
    fn test_envelope_status_zero_is_success() {
        let response: OpResponse =
            serde_json::from_value(json!({ "status": 0, "result": [1, 2] })).unwrap();
        let result = HttpDataService::unwrap_envelope(response).unwrap();
        assert_eq!(result, json!([1, 2]));
    }

    #[test]
    fn test_envelope_nonzero_status_is_remote_error() {
        let response: OpResponse =
            serde_json::from_value(json!({ "status": 4, "result": "no such ns" })).unwrap();
        match HttpDataService::unwrap_envelope(response) {
            Err(ServiceError::Remote { status, .. }) => assert_eq!(status, 4),
            other => panic!("expected remote error, got {other:?}"),
        }
    }

    #[test]
    fn test_envelope_result_defaults_to_null() {
        let response: OpResponse = serde_json::from_value(json!({ "status": 0 })).unwrap();
        assert_eq!(HttpDataService::unwrap_envelope(response).unwrap(), JsonValue::Null);
    }
}
