//! Command line client for the outbound telephony backend.
//!
//! Required environment variables:
//! - OUTBOUND_API_URL: backend base URL
//!
//! Optional:
//! - OUTBOUND_API_KEY, OUTBOUND_ORG_ID, OUTBOUND_TIMEOUT_SECS
//! - OUTBOUND_REFRESH_SECS, OUTBOUND_NOTICE_SECS, OUTBOUND_PREFS_PATH
//! - RUST_LOG (default: info)

mod render;

use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use outbound_scheduler::{
    Applied, OutboundSession, OutboundTab, Outcome, ScheduleForm, SchedulerSettings,
};
use telephony_api::TelephonyClient;
use telephony_core::{ApiError, CallType, InputZone, Transport};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "outbound")]
#[command(about = "Manage outbound trunks, phone number assignment and scheduled calls")]
struct Cli {
    /// Organization id. Falls back to OUTBOUND_ORG_ID.
    #[arg(long, global = true)]
    org: Option<String>,

    /// Print operation outcomes as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the organization's agents
    Agents,
    /// Phone numbers and their assignment
    #[command(subcommand)]
    Numbers(NumbersCommand),
    /// SIP trunks
    #[command(subcommand)]
    Trunks(TrunksCommand),
    /// Scheduled calls and messages
    #[command(subcommand)]
    Schedule(ScheduleCommand),
    /// Show or set the active outbound tab (trunk, scheduler, call)
    Tab { tab: Option<String> },
    /// Print scheduled events and numbers whenever they change
    Watch {
        /// Refresh period in seconds (default: OUTBOUND_REFRESH_SECS or 30)
        #[arg(long)]
        interval_secs: Option<u64>,
    },
}

#[derive(Debug, Subcommand)]
enum NumbersCommand {
    List {
        /// Filter by number, agent id or agent name
        #[arg(long)]
        filter: Option<String>,
    },
    Assign {
        /// E.164 number or phone id
        phone: String,
        agent: String,
    },
    Unassign {
        phone: String,
        /// Expected current agent (default: whoever holds the number)
        #[arg(long, default_value = "")]
        agent: String,
    },
}

#[derive(Debug, Subcommand)]
enum TrunksCommand {
    List,
    Create {
        phone: String,
        #[arg(long, default_value = "udp")]
        transport: Transport,
    },
    Delete { trunk_id: String },
}

#[derive(Debug, Subcommand)]
enum ScheduleCommand {
    List {
        /// Filter by agent, recipient or status
        #[arg(long)]
        filter: Option<String>,
    },
    Create(FormArgs),
    Update {
        scheduled_id: String,
        #[command(flatten)]
        changes: UpdateArgs,
    },
    Delete { scheduled_id: String },
}

#[derive(Debug, Args)]
struct FormArgs {
    /// Acting agent prefix
    #[arg(long)]
    agent: String,
    /// Recipient number (E.164)
    #[arg(long)]
    to: String,
    /// Caller number; must belong to a trunk
    #[arg(long)]
    from: String,
    /// Local date/time (YYYY-MM-DDTHH:MM), RFC 3339 or Unix seconds
    #[arg(long)]
    at: String,
    /// call, sms or whatsapp
    #[arg(long, default_value = "call", value_parser = parse_call_type)]
    kind: CallType,
    #[arg(long, default_value_t = 0)]
    retry_interval: i64,
    #[arg(long, default_value_t = 3)]
    max_retries: i64,
    /// Message body for sms and whatsapp
    #[arg(long)]
    message: Option<String>,
}

#[derive(Debug, Args)]
struct UpdateArgs {
    #[arg(long)]
    agent: Option<String>,
    #[arg(long)]
    to: Option<String>,
    #[arg(long)]
    from: Option<String>,
    #[arg(long)]
    at: Option<String>,
    #[arg(long, value_parser = parse_call_type)]
    kind: Option<CallType>,
    #[arg(long)]
    retry_interval: Option<i64>,
    #[arg(long)]
    max_retries: Option<i64>,
    #[arg(long)]
    message: Option<String>,
}

fn parse_call_type(s: &str) -> Result<CallType, String> {
    CallType::parse(s).ok_or_else(|| format!("unknown call type '{}'", s))
}

impl FormArgs {
    fn into_form(self, organization_id: &str) -> ScheduleForm {
        ScheduleForm {
            agent_prefix: self.agent,
            call_type: self.kind,
            recipient_phone: self.to,
            caller_number: self.from,
            scheduled_time: self.at,
            retry_interval_minutes: self.retry_interval,
            max_retries: self.max_retries,
            message_template: self.message,
            ..ScheduleForm::for_organization(organization_id)
        }
    }
}

impl UpdateArgs {
    fn apply(self, form: &mut ScheduleForm) {
        if let Some(agent) = self.agent {
            form.agent_prefix = agent;
        }
        if let Some(to) = self.to {
            form.recipient_phone = to;
        }
        if let Some(from) = self.from {
            form.caller_number = from;
        }
        if let Some(at) = self.at {
            form.scheduled_time = at;
        }
        if let Some(kind) = self.kind {
            form.call_type = kind;
        }
        if let Some(minutes) = self.retry_interval {
            form.retry_interval_minutes = minutes;
        }
        if let Some(retries) = self.max_retries {
            form.max_retries = retries;
        }
        if let Some(message) = self.message {
            form.message_template = Some(message);
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let client = TelephonyClient::from_env()?;
    let organization_id = cli
        .org
        .clone()
        .or_else(|| client.config().organization_id.clone())
        .ok_or("Missing organization (--org or OUTBOUND_ORG_ID)")?;
    let settings = SchedulerSettings::from_env()?;

    info!(org = %organization_id, "Connecting to {}", client.config().base_url);
    let session = OutboundSession::new(Arc::new(client), organization_id, settings);
    for (source, result) in session.load_all().await {
        if let Err(err) = result {
            warn!("Could not load {}: {}", source, err);
        }
    }

    run(&session, cli.command, cli.json).await
}

async fn run(
    session: &OutboundSession,
    command: Command,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let zone = session.settings().zone;

    match command {
        Command::Agents => render::agents(&session.agents.agents()),
        Command::Numbers(NumbersCommand::List { filter }) => {
            let book = session.phones.book();
            render::numbers(&book.filter(filter.as_deref().unwrap_or_default()));
            if let Some(err) = session.phones.last_error() {
                eprintln!("warning: {}", err);
            }
        }
        Command::Numbers(NumbersCommand::Assign { phone, agent }) => {
            let result = session.phones.assign(&phone, &agent).await;
            report(result, "Phone number assigned", json).await?;
        }
        Command::Numbers(NumbersCommand::Unassign { phone, agent }) => {
            let result = session.phones.unassign(&phone, &agent).await;
            report(result, "Phone number unassigned", json).await?;
        }
        Command::Trunks(TrunksCommand::List) => {
            render::trunks(&session.trunks.trunks());
            if let Some(err) = session.trunks.last_error() {
                eprintln!("warning: {}", err);
            }
        }
        Command::Trunks(TrunksCommand::Create { phone, transport }) => {
            let result = session.trunks.create_trunk(&phone, transport).await;
            report(result, "Trunk created successfully", json).await?;
        }
        Command::Trunks(TrunksCommand::Delete { trunk_id }) => {
            let result = session.trunks.delete_trunk(&trunk_id).await;
            report(result, "Trunk deleted successfully", json).await?;
        }
        Command::Schedule(ScheduleCommand::List { filter }) => {
            session.events.set_filter(filter.unwrap_or_default());
            render::events(&session.events.filtered(), zone);
            if let Some(err) = session.events.last_error() {
                eprintln!("warning: {}", err);
            }
        }
        Command::Schedule(ScheduleCommand::Create(args)) => {
            let mut form = args.into_form(session.organization_id());
            let result = session.events.create(&mut form).await;
            report(result, "Scheduled event created successfully", json).await?;
        }
        Command::Schedule(ScheduleCommand::Update {
            scheduled_id,
            changes,
        }) => {
            let mut form = session.events.edit_form(&scheduled_id)?;
            changes.apply(&mut form);
            let result = session.events.update(&scheduled_id, &form).await;
            report(result, "Scheduled event updated successfully", json).await?;
        }
        Command::Schedule(ScheduleCommand::Delete { scheduled_id }) => {
            let result = session.events.delete(&scheduled_id).await;
            report(result, "Scheduled event deleted successfully", json).await?;
        }
        Command::Tab { tab: None } => println!("{}", session.preferences.outbound_tab().await),
        Command::Tab { tab: Some(tab) } => {
            let tab = OutboundTab::parse(&tab)
                .ok_or_else(|| format!("unknown tab '{}' (trunk, scheduler, call)", tab))?;
            session.preferences.set_outbound_tab(tab).await;
            println!("{}", tab);
        }
        Command::Watch { interval_secs } => watch(session, interval_secs, zone).await?,
    }

    Ok(())
}

/// Print the outcome of a mutation and wait for its re-fetches, which would
/// otherwise die with the process.
async fn report<T>(
    result: Result<Applied<T>, ApiError>,
    success_message: &str,
    json: bool,
) -> Result<(), ApiError> {
    let outcome = Outcome::from_result(&result, success_message);
    if json {
        println!("{}", serde_json::to_string(&outcome)?);
    } else {
        render::outcome(&outcome);
    }

    let applied = result?;
    for (source, result) in applied.reconciliation.settled().await {
        if let Err(err) = result {
            warn!("Refresh of {} after the change failed: {}", source, err);
        }
    }
    Ok(())
}

async fn watch(
    session: &OutboundSession,
    interval_secs: Option<u64>,
    zone: InputZone,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = match interval_secs {
        Some(0) => return Err("--interval-secs must be at least 1".into()),
        Some(secs) => session
            .clone()
            .with_refresh_interval(Duration::from_secs(secs)),
        None => session.clone(),
    };

    let mut events = session.events.subscribe();
    let mut phones = session.phones.subscribe();
    render::events(&events.borrow_and_update(), zone);
    render::numbers(phones.borrow_and_update().numbers());

    let live = session.start_live_refresh();
    info!(
        "Watching every {}s, press Ctrl-C to stop",
        session.settings().refresh_interval.as_secs()
    );

    loop {
        tokio::select! {
            changed = events.changed() => {
                changed?;
                let snapshot = events.borrow_and_update().clone();
                render::events(&snapshot, zone);
            }
            changed = phones.changed() => {
                changed?;
                let snapshot = phones.borrow_and_update().clone();
                render::numbers(snapshot.numbers());
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    live.stop();
    Ok(())
}
