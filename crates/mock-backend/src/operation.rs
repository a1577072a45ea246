//! Names for each backend call, used for counters, failure injection and gates.

use std::fmt;

/// One method of [`telephony_core::TelephonyBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListAgents,
    OrganizationNumbers,
    AvailableNumbers,
    Assign,
    Unassign,
    ListTrunks,
    CreateTrunk,
    DeleteTrunk,
    ListEvents,
    CreateEvent,
    UpdateEvent,
    DeleteEvent,
}

impl Operation {
    /// Every operation, in trait order.
    pub const ALL: [Operation; 12] = [
        Operation::ListAgents,
        Operation::OrganizationNumbers,
        Operation::AvailableNumbers,
        Operation::Assign,
        Operation::Unassign,
        Operation::ListTrunks,
        Operation::CreateTrunk,
        Operation::DeleteTrunk,
        Operation::ListEvents,
        Operation::CreateEvent,
        Operation::UpdateEvent,
        Operation::DeleteEvent,
    ];

    /// Whether the call changes backend state.
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            Operation::ListAgents
                | Operation::OrganizationNumbers
                | Operation::AvailableNumbers
                | Operation::ListTrunks
                | Operation::ListEvents
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
