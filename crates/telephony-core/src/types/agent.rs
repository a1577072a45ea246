use serde::{Deserialize, Serialize};

/// An AI persona belonging to an organization.
///
/// Agents are managed elsewhere; this crate only reads them to populate
/// selection fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    /// Unique identifier within the organization. Used as the assignment key.
    pub agent_prefix: String,
    /// Display name (defaults to the prefix).
    pub name: String,
    /// Owning organization.
    pub organization_id: String,
}

impl Agent {
    /// Create an agent whose display name is its prefix.
    pub fn new(agent_prefix: impl Into<String>, organization_id: impl Into<String>) -> Self {
        let agent_prefix = agent_prefix.into();
        Self {
            name: agent_prefix.clone(),
            agent_prefix,
            organization_id: organization_id.into(),
        }
    }

    /// Set a display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}
