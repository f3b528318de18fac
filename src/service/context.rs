use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
/// Request-scoped diagnostics, written by the dispatcher and logged once per request.
pub struct RequestContext {
    pub request_id: String,
    /// Every argument key sent to a validated `online_score` call,
    /// including keys whose value was `null` or empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has: Option<Vec<String>>,
    /// Number of client ids requested from `clients_interests`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nclients: Option<usize>,
}

impl RequestContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            ..Self::default()
        }
    }
}
