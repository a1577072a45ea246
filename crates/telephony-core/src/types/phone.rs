use serde::{Deserialize, Serialize};

/// Sentinel some backends store in `agent_id` for unassigned numbers.
pub const UNASSIGNED: &str = "unassigned";

/// A telephony resource owned by an organization.
///
/// Records are only ever produced by [`crate::normalize`], which fills every
/// optional field with a typed default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneNumber {
    /// E.164 number, primary key.
    pub phone_number: String,
    /// Backend identifier; may be absent for pool numbers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_id: Option<String>,
    /// Assigned agent prefix. `None` means unassigned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    /// Denormalized agent display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
    #[serde(default)]
    pub organization_id: String,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub voice_enabled: bool,
    #[serde(default)]
    pub sms_enabled: bool,
    #[serde(default)]
    pub whatsapp_enabled: bool,
    #[serde(default)]
    pub inbound_enabled: bool,
    #[serde(default)]
    pub outbound_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

fn default_status() -> String {
    "available".to_string()
}

impl PhoneNumber {
    /// Create an unassigned number with every field defaulted.
    pub fn new(phone_number: impl Into<String>) -> Self {
        Self {
            phone_number: phone_number.into(),
            phone_id: None,
            agent_id: None,
            agent_name: None,
            organization_id: String::new(),
            status: default_status(),
            voice_enabled: false,
            sms_enabled: false,
            whatsapp_enabled: false,
            inbound_enabled: false,
            outbound_enabled: false,
            created_at: None,
            updated_at: None,
        }
    }

    /// Set the backend identifier.
    pub fn with_phone_id(mut self, phone_id: impl Into<String>) -> Self {
        self.phone_id = Some(phone_id.into());
        self
    }

    /// Set the owning organization.
    pub fn with_organization(mut self, organization_id: impl Into<String>) -> Self {
        self.organization_id = organization_id.into();
        self
    }

    /// Assign to an agent.
    pub fn with_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.set_agent(Some(agent_id.into()));
        self
    }

    /// Whether this number is bound to an agent.
    pub fn is_assigned(&self) -> bool {
        self.assigned_agent().is_some()
    }

    /// The assigned agent, treating empty strings and the sentinel as none.
    pub fn assigned_agent(&self) -> Option<&str> {
        self.agent_id
            .as_deref()
            .filter(|id| !id.is_empty() && *id != UNASSIGNED)
    }

    /// The identifier used by the assign/unassign endpoints.
    pub fn resolved_phone_id(&self) -> Option<&str> {
        self.phone_id.as_deref().filter(|id| !id.is_empty())
    }

    /// Replace the assignment. The backend id is left as it is.
    pub fn set_agent(&mut self, agent_id: Option<String>) {
        self.agent_id = agent_id.filter(|id| !id.is_empty() && id != UNASSIGNED);
        if self.agent_id.is_some() {
            self.status = "assigned".to_string();
        } else {
            self.status = default_status();
            self.agent_name = None;
        }
    }

    /// Case-insensitive match against number, agent id and agent name.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return true;
        }
        self.phone_number.contains(&term)
            || self
                .assigned_agent()
                .is_some_and(|id| id.to_lowercase().contains(&term))
            || self
                .agent_name
                .as_deref()
                .is_some_and(|name| name.to_lowercase().contains(&term))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_and_empty_are_unassigned() {
        let mut phone = PhoneNumber::new("+15551230000");
        assert!(!phone.is_assigned());

        phone.agent_id = Some(UNASSIGNED.to_string());
        assert!(!phone.is_assigned());

        phone.agent_id = Some(String::new());
        assert!(!phone.is_assigned());

        phone.agent_id = Some("agentA".to_string());
        assert!(phone.is_assigned());
    }

    #[test]
    fn test_set_agent_updates_status_only() {
        let mut phone = PhoneNumber::new("+15551230000");
        phone.set_agent(Some("agentA".to_string()));
        assert_eq!(phone.assigned_agent(), Some("agentA"));
        assert_eq!(phone.resolved_phone_id(), None);
        assert_eq!(phone.status, "assigned");

        phone.set_agent(None);
        assert!(!phone.is_assigned());
        assert_eq!(phone.status, "available");
    }

    #[test]
    fn test_set_agent_normalizes_sentinel() {
        let mut phone = PhoneNumber::new("+15551230000").with_phone_id("p1");
        phone.set_agent(Some(UNASSIGNED.to_string()));
        assert_eq!(phone.agent_id, None);
        assert_eq!(phone.resolved_phone_id(), Some("p1"));
    }

    #[test]
    fn test_matches() {
        let mut phone = PhoneNumber::new("+15551230000").with_agent("SalesBot");
        phone.agent_name = Some("Sales Assistant".to_string());

        assert!(phone.matches(""));
        assert!(phone.matches("555123"));
        assert!(phone.matches("salesbot"));
        assert!(phone.matches("assistant"));
        assert!(!phone.matches("support"));
    }
}
