//! Correlation id propagation.
//!
//! The trace id travels in an explicit [`CallContext`] owned by the caller.
//! A call that finds no id generates one and writes it back, so nested
//! calls made with the same context share it.

/// Per-operation context handed to every direct call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallContext {
    trace_id: Option<String>,
}

impl CallContext {
    /// A context with no trace id yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// A context continuing an existing trace, e.g. from an inbound `X-Trace-Id`.
    /// Blank ids are ignored.
    pub fn with_trace_id(trace_id: impl Into<String>) -> Self {
        let trace_id = trace_id.into();
        Self {
            trace_id: (!trace_id.trim().is_empty()).then_some(trace_id),
        }
    }

    pub fn trace_id(&self) -> Option<&str> {
        self.trace_id.as_deref()
    }
}

/// Tracing fields sent with a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceContext {
    pub trace_id: String,
    pub source_service: String,
}

impl TraceContext {
    /// Take the trace id from `ctx`, generating and storing one if absent.
    pub fn resolve(ctx: &mut CallContext, source_service: &str) -> Self {
        let trace_id = ctx
            .trace_id
            .get_or_insert_with(|| uuid::Uuid::new_v4().simple().to_string())
            .clone();
        Self {
            trace_id,
            source_service: source_service.to_string(),
        }
    }
}
