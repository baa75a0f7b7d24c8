//! Direct-call header names and construction.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::observability::tracing::TraceContext;
use crate::security::signing::AuthContext;

pub const X_DIRECT_CALL: &str = "x-direct-call";
pub const X_TRACE_ID: &str = "x-trace-id";
pub const X_SOURCE_SERVICE: &str = "x-source-service";
pub const X_TIMESTAMP: &str = "x-timestamp";
pub const X_NONCE: &str = "x-nonce";
pub const X_SIGNATURE: &str = "x-signature";

/// Value of `X-Direct-Call` marking a gateway bypass.
pub const DIRECT_CALL_MARKER: &str = "true";

/// Build the headers for one physical attempt.
///
/// `auth` is `None` when signing soft-failed; the request then goes out
/// with the marker and tracing headers only.
pub fn build_headers(trace: &TraceContext, auth: Option<&AuthContext>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    insert(&mut headers, X_DIRECT_CALL, DIRECT_CALL_MARKER);
    insert(&mut headers, X_TRACE_ID, &trace.trace_id);
    insert(&mut headers, X_SOURCE_SERVICE, &trace.source_service);

    if let Some(auth) = auth {
        insert(&mut headers, X_TIMESTAMP, &auth.timestamp.to_string());
        insert(&mut headers, X_NONCE, &auth.nonce);
        insert(&mut headers, X_SIGNATURE, &auth.signature);
    }
    headers
}

fn insert(headers: &mut HeaderMap, name: &'static str, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(v) => {
            headers.insert(HeaderName::from_static(name), v);
        }
        Err(_) => {
            tracing::warn!(header = name, "Dropping header with invalid value");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trace() -> TraceContext {
        TraceContext {
            trace_id: "abc123".into(),
            source_service: "order-service".into(),
        }
    }

    #[test]
    fn test_all_six_headers() {
        let auth = AuthContext {
            timestamp: 1_700_000_000_000,
            nonce: "n1".into(),
            body_hash: "h".into(),
            signature: "c2ln".into(),
        };
        let headers = build_headers(&trace(), Some(&auth));

        assert_eq!(headers.len(), 6);
        assert_eq!(headers["X-Direct-Call"], "true");
        assert_eq!(headers["X-Trace-Id"], "abc123");
        assert_eq!(headers["X-Source-Service"], "order-service");
        assert_eq!(headers["X-Timestamp"], "1700000000000");
        assert_eq!(headers["X-Nonce"], "n1");
        assert_eq!(headers["X-Signature"], "c2ln");
    }

    #[test]
    fn test_unsigned_keeps_marker_and_trace() {
        let headers = build_headers(&trace(), None);
        assert_eq!(headers.len(), 3);
        assert!(headers.contains_key(X_DIRECT_CALL));
        assert!(!headers.contains_key(X_SIGNATURE));
    }
}
