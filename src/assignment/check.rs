use std::collections::{HashMap, HashSet};

use crate::participant::{Participant, ParticipantId};

use super::shuffle::count_cycles;

/// Why a roster's assignments do not form a valid draw
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssignmentDefect {
    #[error("{0} has no assignment")]
    Unassigned(ParticipantId),
    #[error("{0} is assigned to themselves")]
    SelfAssigned(ParticipantId),
    #[error("{giver} is assigned to {recipient}, who is not on the roster")]
    UnknownRecipient {
        giver: ParticipantId,
        recipient: ParticipantId,
    },
    #[error("{0} receives more than one gift")]
    DuplicateRecipient(ParticipantId),
}

/// Verifies that every participant gives to exactly one other participant
/// and receives from exactly one
pub fn check_assignments(roster: &[Participant]) -> Result<(), AssignmentDefect> {
    let ids: HashSet<&ParticipantId> = roster.iter().map(|p| &p.id).collect();
    let mut received: HashSet<&ParticipantId> = HashSet::new();

    for p in roster {
        let recipient = p
            .assigned_to
            .as_ref()
            .ok_or_else(|| AssignmentDefect::Unassigned(p.id.clone()))?;
        if recipient == &p.id {
            return Err(AssignmentDefect::SelfAssigned(p.id.clone()));
        }
        if !ids.contains(recipient) {
            return Err(AssignmentDefect::UnknownRecipient {
                giver: p.id.clone(),
                recipient: recipient.clone(),
            });
        }
        if !received.insert(recipient) {
            return Err(AssignmentDefect::DuplicateRecipient(recipient.clone()));
        }
    }
    Ok(())
}

/// Number of separate gift chains, or `None` if the assignment is not valid
pub fn cycle_count(roster: &[Participant]) -> Option<usize> {
    check_assignments(roster).ok()?;
    let index: HashMap<&ParticipantId, usize> =
        roster.iter().enumerate().map(|(i, p)| (&p.id, i)).collect();
    let perm: Vec<usize> = roster
        .iter()
        .map(|p| p.assigned_to.as_ref().and_then(|r| index.get(r).copied()))
        .collect::<Option<_>>()?;
    Some(count_cycles(&perm))
}
