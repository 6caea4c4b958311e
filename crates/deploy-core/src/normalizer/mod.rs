//! Webhook normalization
//!
//! Turns heterogeneous inbound deployment webhooks into typed events with
//! deterministic target topics. Dispatch happens on the `type` discriminator;
//! payloads without a known discriminator are treated as the legacy
//! `{project, status}` shape.

use serde_json::{Map, Value};

use crate::error::NormalizationError;
use crate::events::{Event, EventType};
use crate::value_objects::Topic;

/// Result of normalizing a webhook
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedEvent {
    event: Event,
    topics: Vec<Topic>,
}

impl NormalizedEvent {
    fn new(event: Event) -> Self {
        let topics = event.target_topics();
        Self { event, topics }
    }

    #[must_use]
    pub fn event(&self) -> &Event {
        &self.event
    }

    #[must_use]
    pub fn event_type(&self) -> EventType {
        self.event.event_type()
    }

    /// Topics the event is routed to, deployment topic first
    #[must_use]
    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    #[must_use]
    pub fn into_event(self) -> Event {
        self.event
    }
}

/// Normalize a raw webhook payload
///
/// # Errors
/// Returns `NormalizationError::InvalidPayload` when the payload is not an
/// object or lacks the correlation fields its discriminator requires
pub fn normalize(raw: &Value) -> Result<NormalizedEvent, NormalizationError> {
    let Value::Object(fields) = raw else {
        return Err(NormalizationError::invalid("payload must be a JSON object"));
    };

    let event = match fields.get("type").and_then(Value::as_str) {
        Some(kind @ ("step_started" | "step_completed" | "step_manual")) => {
            step_event(kind, fields)?
        }
        Some("deployment_completed") => deployment_completed(fields)?,
        Some("log_entry") => stream_event(EventType::LogEntry, fields)?,
        Some("metrics_update") => stream_event(EventType::MetricsUpdate, fields)?,
        _ => legacy_event(fields)?,
    };

    Ok(NormalizedEvent::new(event))
}

fn step_event(kind: &str, fields: &Map<String, Value>) -> Result<Event, NormalizationError> {
    let deployment_id = id_field(fields, "deployment_id")
        .ok_or_else(|| NormalizationError::invalid("step event requires deployment_id"))?;
    let project_id = id_field(fields, "project");

    let mut payload = fields.clone();
    if !payload.contains_key("step_status") {
        let status = match kind {
            "step_started" => "running",
            "step_completed" => "completed",
            _ => "manual",
        };
        payload.insert("stepStatus".to_string(), Value::from(status));
    }

    Ok(Event::new(EventType::StepUpdated, Value::Object(payload))
        .correlated(project_id, Some(deployment_id)))
}

fn deployment_completed(fields: &Map<String, Value>) -> Result<Event, NormalizationError> {
    let deployment_id = id_field(fields, "id")
        .or_else(|| id_field(fields, "deployment_id"))
        .ok_or_else(|| {
            NormalizationError::invalid("deployment_completed requires id or deployment_id")
        })?;
    let project_id = id_field(fields, "project");

    Ok(
        Event::new(EventType::DeploymentCompleted, Value::Object(fields.clone()))
            .correlated(project_id, Some(deployment_id)),
    )
}

fn stream_event(
    event_type: EventType,
    fields: &Map<String, Value>,
) -> Result<Event, NormalizationError> {
    let deployment_id = id_field(fields, "deployment_id");
    let project_id = id_field(fields, "project");
    if deployment_id.is_none() && project_id.is_none() {
        return Err(NormalizationError::invalid(format!(
            "{event_type} requires deployment_id or project"
        )));
    }

    Ok(Event::new(event_type, Value::Object(fields.clone())).correlated(project_id, deployment_id))
}

fn legacy_event(fields: &Map<String, Value>) -> Result<Event, NormalizationError> {
    let project_id = id_field(fields, "project");
    let status = fields.get("status").and_then(Value::as_str);

    if project_id.is_none() && status.is_none() {
        return Err(NormalizationError::invalid(
            "unrecognized payload: expected a type discriminator or project/status",
        ));
    }

    let event_type = match status {
        Some("success") => EventType::DeploymentCompleted,
        Some("failed") => EventType::DeploymentFailed,
        _ => EventType::DeploymentUpdated,
    };

    Ok(Event::new(event_type, Value::Object(fields.clone())).correlated(project_id, None))
}

/// Read an identifier that may be sent as a string or a number
fn id_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
