//! Operator console for the `monitor` command.
//!
//! One command per stdin line:
//!
//! ```text
//! dismiss            close the visible alert
//! confirm <id>       mark an occurrence as a real anomaly
//! reject <id>        mark an occurrence as a false positive
//! list [page]        print a review page as JSON
//! counts             print status and severity counters as JSON
//! help
//! quit
//! ```

use std::str::FromStr;
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use vigil_alert::NotificationScheduler;
use vigil_core::{DomainEvent, OccurrenceId, Result, Timestamp};
use vigil_store::{OccurrenceFilters, OccurrenceStore};

pub const HELP: &str = "commands: dismiss | confirm <id> | reject <id> | list [page] | counts | help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Dismiss,
    Confirm(OccurrenceId),
    Reject(OccurrenceId),
    List(usize),
    Counts,
    Help,
    Quit,
}

impl FromStr for ConsoleCommand {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let verb = parts.next().unwrap_or("").to_ascii_lowercase();
        let arg = parts.next();
        if parts.next().is_some() {
            return Err(format!("Too many arguments: {}", s.trim()));
        }

        let parse_id = |arg: Option<&str>| -> std::result::Result<OccurrenceId, String> {
            let raw = arg.ok_or_else(|| format!("'{}' needs an occurrence id", verb))?;
            raw.parse()
                .map_err(|e| format!("Invalid occurrence id '{}': {}", raw, e))
        };

        match verb.as_str() {
            "dismiss" => Ok(ConsoleCommand::Dismiss),
            "confirm" => parse_id(arg).map(ConsoleCommand::Confirm),
            "reject" => parse_id(arg).map(ConsoleCommand::Reject),
            "list" => match arg {
                None => Ok(ConsoleCommand::List(1)),
                Some(page) => page
                    .parse()
                    .map(ConsoleCommand::List)
                    .map_err(|_| format!("Invalid page number: {}", page)),
            },
            "counts" => Ok(ConsoleCommand::Counts),
            "help" | "?" => Ok(ConsoleCommand::Help),
            "quit" | "exit" => Ok(ConsoleCommand::Quit),
            "" => Err("Empty command".to_string()),
            other => Err(format!("Unknown command: {}", other)),
        }
    }
}

/// Executes console commands against the running session.
pub struct Console {
    store: Arc<OccurrenceStore>,
    scheduler: Option<Arc<NotificationScheduler>>,
    events: UnboundedSender<DomainEvent>,
    page_size: usize,
}

impl Console {
    pub fn new(
        store: Arc<OccurrenceStore>,
        scheduler: Option<Arc<NotificationScheduler>>,
        events: UnboundedSender<DomainEvent>,
        page_size: usize,
    ) -> Self {
        Self {
            store,
            scheduler,
            events,
            page_size,
        }
    }

    /// Run one command and return the text to print. `Quit` is handled by
    /// the caller.
    pub fn execute(&self, command: &ConsoleCommand) -> Result<String> {
        match command {
            ConsoleCommand::Dismiss => Ok(match &self.scheduler {
                None => "Notifications are disabled".to_string(),
                Some(scheduler) if scheduler.dismiss() => "Dismissed".to_string(),
                Some(_) => "Nothing to dismiss".to_string(),
            }),
            ConsoleCommand::Confirm(id) => self.validate(*id, true),
            ConsoleCommand::Reject(id) => self.validate(*id, false),
            ConsoleCommand::List(page) => {
                let view = self
                    .store
                    .view(&OccurrenceFilters::default(), *page, self.page_size)?;
                Ok(serde_json::to_string(&view)?)
            }
            ConsoleCommand::Counts => self.counts(),
            ConsoleCommand::Help | ConsoleCommand::Quit => Ok(HELP.to_string()),
        }
    }

    pub fn counts(&self) -> Result<String> {
        let counts = serde_json::json!({
            "total": self.store.len(),
            "status": self.store.status_counts(),
            "severity": self.store.severity_counts(),
        });
        Ok(serde_json::to_string(&counts)?)
    }

    fn validate(&self, id: OccurrenceId, confirmed: bool) -> Result<String> {
        let occurrence = self.store.set_validation(id, confirmed)?;
        let event = DomainEvent::OccurrenceValidated {
            occurrence_id: id,
            validation: occurrence.validation(),
            timestamp: Timestamp::now(),
        };
        if self.events.send(event).is_err() {
            tracing::debug!(occurrence_id = %id, "Event receiver dropped; validation event discarded");
        }
        Ok(format!("{} marked {}", id, occurrence.validation()))
    }
}
