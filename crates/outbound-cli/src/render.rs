//! Plain-text tables for terminal output.

use outbound_scheduler::Outcome;
use telephony_core::{Agent, InputZone, PhoneNumber, ScheduledEvent, Trunk};

const DASH: &str = "-";

pub fn agents(agents: &[Agent]) {
    if agents.is_empty() {
        println!("No agents.");
        return;
    }
    println!("{:<24} NAME", "PREFIX");
    for agent in agents {
        println!("{:<24} {}", agent.agent_prefix, agent.name);
    }
}

pub fn numbers(numbers: &[PhoneNumber]) {
    if numbers.is_empty() {
        println!("No phone numbers.");
        return;
    }
    println!("{:<18} {:<24} {:<20} STATUS", "NUMBER", "PHONE ID", "AGENT");
    for phone in numbers {
        let agent = match (phone.assigned_agent(), phone.agent_name.as_deref()) {
            (Some(id), Some(name)) if name != id => format!("{} ({})", id, name),
            (Some(id), _) => id.to_string(),
            (None, _) => DASH.to_string(),
        };
        println!(
            "{:<18} {:<24} {:<20} {}",
            phone.phone_number,
            phone.resolved_phone_id().unwrap_or(DASH),
            agent,
            phone.status
        );
    }
}

pub fn trunks(trunks: &[Trunk]) {
    if trunks.is_empty() {
        println!("No trunks.");
        return;
    }
    println!("{:<24} {:<18} TRANSPORT", "TRUNK ID", "NUMBER");
    for trunk in trunks {
        println!(
            "{:<24} {:<18} {}",
            trunk.trunk_id, trunk.phone_number, trunk.transport
        );
    }
}

pub fn events(events: &[ScheduledEvent], zone: InputZone) {
    if events.is_empty() {
        println!("No scheduled events.");
        return;
    }
    println!(
        "{:<16} {:<20} {:<18} {:<16} {:<16} {:<12} RETRIES",
        "ID", "WHEN", "TYPE", "TO", "AGENT", "STATUS"
    );
    for event in events {
        let when = zone
            .format(event.scheduled_time)
            .unwrap_or_else(|| event.scheduled_time.to_string());
        println!(
            "{:<16} {:<20} {:<18} {:<16} {:<16} {:<12} {}/{}",
            event.scheduled_id,
            when,
            event.call_type,
            event.recipient_phone,
            event.agent_id,
            event.status,
            event.retry_count,
            event.max_retries
        );
    }
}

pub fn outcome(outcome: &Outcome) {
    let message = outcome.message.as_deref().unwrap_or_default();
    if outcome.success {
        println!("{}", message);
    } else {
        eprintln!("error: {}", message);
    }
}
