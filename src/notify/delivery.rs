use serde::Serialize;
use tracing::{info, warn};

use crate::participant::{find, Participant};

use super::letter::compose_letter;
use super::mailer::Mailer;

/// A participant whose letter could not be sent
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryFailure {
    pub name: String,
    pub email: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub total: usize,
    pub sent: usize,
    /// Participants without an assignment, who get no letter
    pub skipped: usize,
    pub failures: Vec<DeliveryFailure>,
}

impl DeliveryReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn summary(&self) -> String {
        format!("Sent {} of {}", self.sent, self.total)
    }

    /// Failures as `name: reason` lines
    pub fn error_lines(&self) -> Vec<String> {
        self.failures
            .iter()
            .map(|f| format!("{}: {}", f.name, f.reason))
            .collect()
    }
}

/// Sends one letter to every participant with an assignment.
///
/// A failed send is recorded and the batch moves on; nothing is retried.
pub fn deliver_all(mailer: &dyn Mailer, roster: &[Participant]) -> DeliveryReport {
    let mut report = DeliveryReport {
        total: roster.len(),
        ..DeliveryReport::default()
    };

    for giver in roster {
        let Some(recipient_id) = &giver.assigned_to else {
            info!(name = %giver.name, "skipped, no assignment");
            report.skipped += 1;
            continue;
        };

        let Some(recipient) = find(roster, recipient_id) else {
            warn!(name = %giver.name, recipient = %recipient_id, "assigned recipient is not on the roster");
            report.failures.push(DeliveryFailure {
                name: giver.name.clone(),
                email: giver.email.clone(),
                reason: format!("assigned recipient {} is not on the roster", recipient_id),
            });
            continue;
        };

        let letter = compose_letter(giver, recipient);
        match mailer.send(&letter) {
            Ok(()) => {
                info!(email = %giver.email, "letter sent");
                report.sent += 1;
            }
            Err(e) => {
                warn!(email = %giver.email, error = %e, "letter failed");
                report.failures.push(DeliveryFailure {
                    name: giver.name.clone(),
                    email: giver.email.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    info!(sent = report.sent, total = report.total, failed = report.failures.len(), "delivery finished");
    report
}
