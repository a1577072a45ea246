//! Normalization of backend payloads into canonical records.
//!
//! The backend answers the same question in several shapes. Everything that
//! comes off the wire passes through here exactly once, so the rest of the
//! workspace only ever sees [`PhoneNumber`], [`Trunk`], [`Agent`] and
//! [`ScheduledEvent`] with every optional field defaulted.
//!
//! Phone number sources, in priority order:
//!
//! 1. Organization-scoped list (`{phone_numbers: [...]}`, a bare array,
//!    `{assigned: [...]}` or `{data: ...}` wrappers).
//! 2. Legacy per-agent map (`{agent_prefix: {phone_number, ...}}`), accepted
//!    wherever an organization list is expected. The map key becomes the
//!    agent id when the record does not carry one.
//! 3. Available pool, used by [`reconcile`] only when the organization list
//!    is empty.

use std::collections::HashSet;

use serde_json::{Map, Value};
use tracing::warn;

use crate::types::{Agent, PhoneNumber, ScheduledEvent, Transport, Trunk, UNASSIGNED};

/// Which source produced the canonical view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PhoneSource {
    Organization,
    AvailablePool,
    #[default]
    Empty,
}

/// Canonical phone number view plus the derived assignable pool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciled {
    /// De-duplicated canonical records.
    pub numbers: Vec<PhoneNumber>,
    /// Unassigned numbers that may be offered for assignment.
    pub available: Vec<PhoneNumber>,
    pub source: PhoneSource,
}

/// Pick the canonical view from the two fetched sources.
///
/// A non-empty organization list is taken as-is. The assignable numbers
/// always come from the pool alone, minus numbers the organization list
/// already holds. An empty organization list falls back to the pool with
/// every assignment cleared.
pub fn reconcile(organization: Vec<PhoneNumber>, pool: Vec<PhoneNumber>) -> Reconciled {
    let organization = dedup(organization);

    if !organization.is_empty() {
        let known: HashSet<&str> = organization
            .iter()
            .map(|p| p.phone_number.as_str())
            .collect();
        let available = dedup(pool)
            .into_iter()
            .filter(|p| !known.contains(p.phone_number.as_str()))
            .map(unassigned)
            .collect();
        return Reconciled {
            numbers: organization,
            available,
            source: PhoneSource::Organization,
        };
    }

    let pool: Vec<PhoneNumber> = dedup(pool).into_iter().map(unassigned).collect();
    let source = if pool.is_empty() {
        PhoneSource::Empty
    } else {
        PhoneSource::AvailablePool
    };
    Reconciled {
        available: pool.clone(),
        numbers: pool,
        source,
    }
}

fn unassigned(mut phone: PhoneNumber) -> PhoneNumber {
    phone.set_agent(None);
    phone
}

fn dedup(numbers: Vec<PhoneNumber>) -> Vec<PhoneNumber> {
    let mut seen = HashSet::new();
    numbers
        .into_iter()
        .filter(|p| seen.insert(p.phone_number.clone()))
        .collect()
}

/// Parse an organization-scoped phone number response in any known shape.
pub fn organization_numbers(body: &Value, organization_id: &str) -> Vec<PhoneNumber> {
    let numbers = match body {
        Value::Array(items) => records(items, None),
        Value::Object(obj) => {
            if let Some(inner) = obj.get("data") {
                return organization_numbers(inner, organization_id);
            }
            match obj.get("phone_numbers").or_else(|| obj.get("assigned")) {
                Some(Value::Array(items)) => records(items, None),
                Some(Value::Object(map)) => legacy_agent_map(map),
                Some(_) => Vec::new(),
                None => match obj.get("agents") {
                    Some(Value::Object(map)) => legacy_agent_map(map),
                    _ if looks_like_agent_map(obj) => legacy_agent_map(obj),
                    _ => Vec::new(),
                },
            }
        }
        _ => Vec::new(),
    };

    numbers
        .into_iter()
        .map(|mut p| {
            if p.organization_id.is_empty() {
                p.organization_id = organization_id.to_string();
            }
            p
        })
        .collect()
}

/// Parse the available pool response. Pool records never carry an agent.
pub fn available_numbers(body: &Value) -> Vec<PhoneNumber> {
    list(body, "phone_numbers")
        .map(|items| records(items, None))
        .unwrap_or_default()
        .into_iter()
        .map(unassigned)
        .collect()
}

/// Normalize a legacy `{agent_prefix: record}` map.
pub fn legacy_agent_map(map: &Map<String, Value>) -> Vec<PhoneNumber> {
    let mut numbers = Vec::new();
    for (prefix, value) in map {
        match value {
            Value::Object(_) => numbers.extend(phone_record(value, Some(prefix.as_str()))),
            Value::String(number) if !number.trim().is_empty() => {
                numbers.push(PhoneNumber::new(number.trim()).with_agent(prefix.clone()));
            }
            Value::Array(items) => numbers.extend(records(items, Some(prefix.as_str()))),
            _ => {}
        }
    }
    numbers
}

fn looks_like_agent_map(obj: &Map<String, Value>) -> bool {
    !obj.is_empty()
        && obj.values().all(|v| match v {
            Value::Object(inner) => number_field(inner).is_some(),
            _ => false,
        })
}

fn records(items: &[Value], agent_hint: Option<&str>) -> Vec<PhoneNumber> {
    items
        .iter()
        .filter_map(|item| phone_record(item, agent_hint))
        .collect()
}

fn number_field(obj: &Map<String, Value>) -> Option<String> {
    ["phone_number", "number", "phone"]
        .iter()
        .find_map(|key| string(obj, key))
}

fn string(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn flag(obj: &Map<String, Value>, key: &str) -> bool {
    obj.get(key).and_then(Value::as_bool).unwrap_or(false)
}

/// Normalize one phone record. Returns `None` when no number is present.
pub fn phone_record(value: &Value, agent_hint: Option<&str>) -> Option<PhoneNumber> {
    let obj = value.as_object()?;
    let Some(number) = number_field(obj) else {
        warn!("Skipping phone record without a number");
        return None;
    };

    let agent_id = string(obj, "agent_id")
        .filter(|id| id != UNASSIGNED)
        .or_else(|| agent_hint.map(str::to_string));

    let mut phone = PhoneNumber {
        phone_number: number,
        phone_id: string(obj, "phone_id")
            .or_else(|| string(obj, "id"))
            .or_else(|| string(obj, "_id")),
        agent_id: None,
        agent_name: string(obj, "agent_name"),
        organization_id: string(obj, "organization_id").unwrap_or_default(),
        status: string(obj, "status").unwrap_or_else(|| "available".to_string()),
        voice_enabled: flag(obj, "voice_enabled"),
        sms_enabled: flag(obj, "sms_enabled"),
        whatsapp_enabled: flag(obj, "whatsapp_enabled"),
        inbound_enabled: flag(obj, "inbound_enabled"),
        outbound_enabled: flag(obj, "outbound_enabled"),
        created_at: string(obj, "created_at"),
        updated_at: string(obj, "updated_at"),
    };

    if agent_id.is_some() {
        let status = phone.status.clone();
        let name = phone.agent_name.clone();
        phone.set_agent(agent_id);
        // Keep whatever status the backend reported for assigned numbers.
        if status != "available" {
            phone.status = status;
        }
        phone.agent_name = name;
    }

    Some(phone)
}

/// Extract a list from `{key: [...]}`, `{data: [...]}`, `{data: {key: [...]}}`
/// or a bare array.
pub fn list<'a>(body: &'a Value, key: &str) -> Option<&'a Vec<Value>> {
    match body {
        Value::Array(items) => Some(items),
        Value::Object(obj) => match obj.get(key) {
            Some(Value::Array(items)) => Some(items),
            _ => obj.get("data").and_then(|inner| list(inner, key)),
        },
        _ => None,
    }
}

/// Parse `{agents: {prefix: {...}}}` into a list ordered by prefix.
pub fn agents(body: &Value, organization_id: &str) -> Vec<Agent> {
    let map = match body.get("agents").or_else(|| body.get("data").and_then(|d| d.get("agents"))) {
        Some(Value::Object(map)) => map,
        _ => return Vec::new(),
    };

    map.iter()
        .map(|(prefix, value)| {
            let details = value.as_object();
            let name = details.and_then(|d| string(d, "name"));
            let org = details
                .and_then(|d| string(d, "organization_id"))
                .unwrap_or_else(|| organization_id.to_string());
            let agent = Agent::new(prefix.clone(), org);
            match name {
                Some(name) => agent.with_name(name),
                None => agent,
            }
        })
        .collect()
}

/// Parse a trunk list. Records missing an id or number are skipped.
pub fn trunks(body: &Value, organization_id: &str) -> Vec<Trunk> {
    let Some(items) = list(body, "trunks") else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| trunk_record(item, organization_id))
        .collect()
}

/// Normalize one trunk record.
pub fn trunk_record(value: &Value, organization_id: &str) -> Option<Trunk> {
    let obj = value.as_object()?;
    let trunk_id = string(obj, "trunk_id")
        .or_else(|| string(obj, "id"))
        .or_else(|| string(obj, "_id"));
    let phone_number = number_field(obj);

    let (Some(trunk_id), Some(phone_number)) = (trunk_id, phone_number) else {
        warn!("Skipping trunk record without id or number: {}", value);
        return None;
    };

    let transport = string(obj, "transport")
        .and_then(|t| t.parse::<Transport>().ok())
        .unwrap_or_default();

    Some(Trunk {
        trunk_id,
        phone_number,
        transport,
        organization_id: string(obj, "organization_id")
            .unwrap_or_else(|| organization_id.to_string()),
    })
}

/// Parse a scheduled event list. Malformed records are skipped.
pub fn scheduled_events(body: &Value) -> Vec<ScheduledEvent> {
    let Some(items) = list(body, "scheduled_events") else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match serde_json::from_value::<ScheduledEvent>(item.clone()) {
            Ok(event) => Some(event),
            Err(e) => {
                warn!("Skipping malformed scheduled event: {}", e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_organization_list_fills_defaults() {
        let body = json!({
            "phone_numbers": [
                {"phone_number": "+15551230000", "phone_id": "p1", "agent_id": "agentA",
                 "agent_name": "Agent A", "voice_enabled": true, "status": "active"},
                {"number": "+15551230001"}
            ]
        });
        let numbers = organization_numbers(&body, "org1");
        assert_eq!(numbers.len(), 2);

        let first = &numbers[0];
        assert_eq!(first.phone_id.as_deref(), Some("p1"));
        assert_eq!(first.assigned_agent(), Some("agentA"));
        assert_eq!(first.agent_name.as_deref(), Some("Agent A"));
        assert_eq!(first.status, "active");
        assert!(first.voice_enabled);
        assert!(!first.sms_enabled);
        assert_eq!(first.organization_id, "org1");

        let second = &numbers[1];
        assert_eq!(second.phone_number, "+15551230001");
        assert_eq!(second.agent_id, None);
        assert_eq!(second.status, "available");
        assert!(!second.outbound_enabled);
    }

    #[test]
    fn test_assigned_record_without_id_has_no_phone_id() {
        let body = json!([
            {"phone_number": "+15551230000", "agent_id": "agentA"},
            {"phone_number": "+15551230001", "agent_id": "agentB", "phone_id": ""}
        ]);
        let numbers = organization_numbers(&body, "org1");
        assert_eq!(numbers[0].assigned_agent(), Some("agentA"));
        assert_eq!(numbers[0].resolved_phone_id(), None);
        assert_eq!(numbers[1].resolved_phone_id(), None);
    }

    #[test]
    fn test_sentinel_agent_is_unassigned() {
        let body = json!({"phone_numbers": [
            {"phone_number": "+15551230000", "agent_id": "unassigned"}
        ]});
        let numbers = organization_numbers(&body, "org1");
        assert!(!numbers[0].is_assigned());
    }

    #[test]
    fn test_legacy_agent_map() {
        let body = json!({
            "agentA": {"phone_number": "+15551230000"},
            "agentB": {"phone_number": "+15551230001", "agent_id": "agentZ"}
        });
        let numbers = organization_numbers(&body, "org1");
        assert_eq!(numbers.len(), 2);
        assert_eq!(numbers[0].assigned_agent(), Some("agentA"));
        assert_eq!(numbers[1].assigned_agent(), Some("agentZ"));

        let nested = json!({"phone_numbers": {"agentC": "+15551230002"}});
        let numbers = organization_numbers(&nested, "org1");
        assert_eq!(numbers[0].assigned_agent(), Some("agentC"));
        assert_eq!(numbers[0].phone_number, "+15551230002");
    }

    #[test]
    fn test_wrapped_shapes() {
        let wrapped = json!({"data": {"phone_numbers": [{"phone": "+15551230000"}]}});
        assert_eq!(organization_numbers(&wrapped, "org1").len(), 1);

        let assigned = json!({"assigned": [{"phone_number": "+15551230000"}]});
        assert_eq!(organization_numbers(&assigned, "org1").len(), 1);

        let empty = json!({"status": "ok", "count": 0});
        assert!(organization_numbers(&empty, "org1").is_empty());
    }

    #[test]
    fn test_available_pool_drops_agents() {
        let body = json!({"phone_numbers": [
            {"number": "+15551230000", "phone_id": "p1", "agent_id": "agentA"}
        ]});
        let numbers = available_numbers(&body);
        assert_eq!(numbers[0].agent_id, None);
        assert_eq!(numbers[0].phone_id.as_deref(), Some("p1"));
    }

    #[test]
    fn test_reconcile_prefers_organization_list() {
        let org = vec![
            PhoneNumber::new("+15551230000").with_phone_id("p1").with_agent("agentA"),
            PhoneNumber::new("+15551230001").with_phone_id("p2"),
        ];
        let pool = vec![
            PhoneNumber::new("+15551230001").with_phone_id("p2"),
            PhoneNumber::new("+15551230009").with_phone_id("p9"),
        ];

        let view = reconcile(org.clone(), pool);
        assert_eq!(view.source, PhoneSource::Organization);
        assert_eq!(view.numbers, org);

        let available: Vec<&str> = view.available.iter().map(|p| p.phone_number.as_str()).collect();
        assert_eq!(available, vec!["+15551230009"]);
    }

    #[test]
    fn test_unassigned_org_number_not_offered_without_pool() {
        let org = vec![
            PhoneNumber::new("+15551230000").with_phone_id("p1").with_agent("agentA"),
            PhoneNumber::new("+15551230001").with_phone_id("p2"),
        ];

        let view = reconcile(org, Vec::new());
        assert_eq!(view.source, PhoneSource::Organization);
        assert_eq!(view.numbers.len(), 2);
        assert!(view.available.is_empty());
    }

    #[test]
    fn test_reconcile_falls_back_to_pool() {
        let pool = vec![
            PhoneNumber::new("+15551230009").with_phone_id("p9").with_agent("stale"),
            PhoneNumber::new("+15551230009").with_phone_id("dup"),
        ];
        let view = reconcile(Vec::new(), pool);
        assert_eq!(view.source, PhoneSource::AvailablePool);
        assert_eq!(view.numbers.len(), 1);
        assert_eq!(view.numbers[0].agent_id, None);
        assert_eq!(view.numbers, view.available);

        let empty = reconcile(Vec::new(), Vec::new());
        assert_eq!(empty.source, PhoneSource::Empty);
    }

    #[test]
    fn test_agents() {
        let body = json!({"agents": {
            "support": {"name": "Support Bot"},
            "sales": {}
        }});
        let agents = agents(&body, "org1");
        assert_eq!(agents.len(), 2);
        assert_eq!(agents[0].agent_prefix, "sales");
        assert_eq!(agents[0].name, "sales");
        assert_eq!(agents[1].name, "Support Bot");
        assert_eq!(agents[1].organization_id, "org1");
    }

    #[test]
    fn test_trunks() {
        let body = json!({"success": true, "trunks": [
            {"trunk_id": "t1", "phone_number": "+15551230000", "transport": "udp"},
            {"id": "t2", "phone_number": "+15551230001", "transport": "sctp"},
            {"phone_number": "+15551230002"}
        ]});
        let trunks = trunks(&body, "org1");
        assert_eq!(trunks.len(), 2);
        assert_eq!(trunks[1].trunk_id, "t2");
        assert_eq!(trunks[1].transport, Transport::Udp);
        assert_eq!(trunks[0].organization_id, "org1");

        let data = json!({"success": true, "data": [
            {"trunk_id": "t3", "phone_number": "+15551230003"}
        ]});
        assert_eq!(super::trunks(&data, "org1").len(), 1);
    }

    #[test]
    fn test_scheduled_events_skip_malformed() {
        let body = json!({"scheduled_events": [
            {"scheduled_id": "s1", "scheduled_time": 1_800_000_000, "agent_id": "agentA"},
            {"scheduled_id": "s2", "scheduled_time": "not a time"},
            {"agent_id": "missing id", "scheduled_time": 1}
        ]});
        let events = scheduled_events(&body);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].scheduled_id, "s1");

        assert!(scheduled_events(&json!("garbage")).is_empty());
    }
}
