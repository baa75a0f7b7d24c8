//! Direct-call request description.

use std::borrow::Cow;
use std::time::Duration;

use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

/// What business code asks for: service, method, path, optional JSON body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectRequest {
    service_id: String,
    method: String,
    path: String,
    body: Option<Value>,
    timeout: Option<Duration>,
}

impl DirectRequest {
    pub fn new(
        service_id: impl Into<String>,
        method: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            service_id: service_id.into(),
            method: method.into(),
            path: path.into(),
            body: None,
            timeout: None,
        }
    }

    pub fn get(service_id: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(service_id, "GET", path)
    }

    pub fn post(service_id: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(service_id, "POST", path)
    }

    /// Attach a JSON body.
    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Serialize `body` and attach it.
    pub fn json<B: Serialize + ?Sized>(self, body: &B) -> Result<Self, serde_json::Error> {
        Ok(self.body(serde_json::to_value(body)?))
    }

    /// Per-call timeout, overriding the configured default.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The trimmed path with a leading `/`. This is the path sent on the
    /// wire, covered by the signature and used for the endpoint label.
    pub fn wire_path(&self) -> Cow<'_, str> {
        let path = self.path.trim();
        if path.starts_with('/') {
            Cow::Borrowed(path)
        } else {
            Cow::Owned(format!("/{}", path))
        }
    }

    pub fn body_value(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub fn timeout_value(&self) -> Option<Duration> {
        self.timeout
    }

    /// Check the required fields and parse the method.
    pub(crate) fn validate(&self) -> Result<Method, String> {
        if self.service_id.trim().is_empty() {
            return Err("serviceId is required".to_string());
        }
        if self.path.trim().is_empty() {
            return Err("path is required".to_string());
        }
        let method = self.method.trim();
        if method.is_empty() {
            return Err("method is required".to_string());
        }
        Method::from_bytes(method.to_ascii_uppercase().as_bytes())
            .map_err(|_| format!("invalid method '{}'", method))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_path_has_leading_slash() {
        assert_eq!(DirectRequest::get("svc", "api/v1/items").wire_path(), "/api/v1/items");
        assert_eq!(DirectRequest::get("svc", " /api/v1/items ").wire_path(), "/api/v1/items");
        assert_eq!(DirectRequest::get("svc", "/x").wire_path(), "/x");
    }

    #[test]
    fn test_validate() {
        let m = DirectRequest::new("svc", "post", "/api/v1/x").validate().unwrap();
        assert_eq!(m, Method::POST);

        assert!(DirectRequest::new("", "GET", "/x").validate().is_err());
        assert!(DirectRequest::new("svc", "GET", " ").validate().is_err());
        assert!(DirectRequest::new("svc", "", "/x").validate().is_err());
        assert!(DirectRequest::new("svc", "GE T", "/x").validate().is_err());
    }

    #[test]
    fn test_json_body() {
        #[derive(Serialize)]
        struct Notify {
            x: u32,
        }
        let req = DirectRequest::post("svc", "/api/v1/notify")
            .json(&Notify { x: 1 })
            .unwrap();
        assert_eq!(req.body_value(), Some(&json!({"x": 1})));
    }
}
