use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// SIP transport for a trunk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    #[default]
    #[serde(alias = "UDP")]
    Udp,
    #[serde(alias = "TCP")]
    Tcp,
}

impl Transport {
    /// Wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::Udp => "udp",
            Transport::Tcp => "tcp",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Transport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "udp" => Ok(Transport::Udp),
            "tcp" => Ok(Transport::Tcp),
            other => Err(format!("unsupported transport '{}'", other)),
        }
    }
}

/// A SIP egress resource binding a phone number to a transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trunk {
    pub trunk_id: String,
    /// E.164 number, unique per organization.
    pub phone_number: String,
    #[serde(default)]
    pub transport: Transport,
    #[serde(default)]
    pub organization_id: String,
}

/// Body of a trunk creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateTrunkRequest {
    pub organization_id: String,
    pub phone_number: String,
    pub transport: Transport,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_parse() {
        assert_eq!("udp".parse::<Transport>(), Ok(Transport::Udp));
        assert_eq!(" TCP ".parse::<Transport>(), Ok(Transport::Tcp));
        assert!("tls".parse::<Transport>().is_err());
    }

    #[test]
    fn test_transport_wire_format() {
        let request = CreateTrunkRequest {
            organization_id: "org1".to_string(),
            phone_number: "+15551230000".to_string(),
            transport: Transport::Udp,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["transport"], "udp");

        let trunk: Trunk = serde_json::from_str(
            r#"{"trunk_id":"t1","phone_number":"+15551230000","transport":"UDP"}"#,
        )
        .unwrap();
        assert_eq!(trunk.transport, Transport::Udp);
        assert_eq!(trunk.organization_id, "");
    }
}
