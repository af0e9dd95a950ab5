use std::collections::HashSet;

use rand::Rng;
use tracing::{debug, warn};

use crate::participant::Participant;

use super::shuffle::{count_cycles, fisher_yates, has_fixed_point, sattolo};
use super::types::{AssignmentError, DrawMode};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 100;

/// Draws who gives a gift to whom.
///
/// Holds configuration only; each call uses fresh randomness and leaves the
/// input roster untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssignmentGenerator {
    pub max_attempts: u32,
    pub mode: DrawMode,
}

impl Default for AssignmentGenerator {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            mode: DrawMode::AnyDerangement,
        }
    }
}

impl AssignmentGenerator {
    pub fn new(mode: DrawMode, max_attempts: u32) -> Self {
        Self { max_attempts, mode }
    }

    /// Returns the roster, in its original order, with every `assigned_to`
    /// filled in so that nobody gives to themselves
    pub fn generate(&self, roster: &[Participant]) -> Result<Vec<Participant>, AssignmentError> {
        self.generate_with_rng(roster, &mut rand::thread_rng())
    }

    pub fn generate_with_rng<R: Rng + ?Sized>(
        &self,
        roster: &[Participant],
        rng: &mut R,
    ) -> Result<Vec<Participant>, AssignmentError> {
        validate_roster(roster)?;
        let perm = self.draw_permutation(roster.len(), rng)?;

        let assigned = roster
            .iter()
            .zip(&perm)
            .map(|(giver, &target)| Participant {
                assigned_to: Some(roster[target].id.clone()),
                ..giver.clone()
            })
            .collect();
        Ok(assigned)
    }

    /// Index permutation where giver `i` gives to `perm[i]`
    fn draw_permutation<R: Rng + ?Sized>(
        &self,
        n: usize,
        rng: &mut R,
    ) -> Result<Vec<usize>, AssignmentError> {
        // the only derangement of two is the swap, which is also a single cycle
        if n == 2 {
            return Ok(vec![1, 0]);
        }

        for attempt in 1..=self.max_attempts {
            let mut perm: Vec<usize> = (0..n).collect();
            match self.mode {
                DrawMode::AnyDerangement => fisher_yates(&mut perm, rng),
                DrawMode::SingleCycle => sattolo(&mut perm, rng),
            }

            let valid = !has_fixed_point(&perm)
                && (self.mode != DrawMode::SingleCycle || count_cycles(&perm) == 1);
            if valid {
                debug!(attempt, participants = n, mode = ?self.mode, "draw accepted");
                return Ok(perm);
            }
        }

        warn!(attempts = self.max_attempts, participants = n, "draw exhausted its attempts");
        Err(AssignmentError::Exhausted {
            attempts: self.max_attempts,
        })
    }
}

fn validate_roster(roster: &[Participant]) -> Result<(), AssignmentError> {
    if roster.len() < 2 {
        return Err(AssignmentError::TooFewParticipants {
            count: roster.len(),
        });
    }
    let mut seen = HashSet::with_capacity(roster.len());
    for p in roster {
        if !seen.insert(&p.id) {
            return Err(AssignmentError::DuplicateIdentity(p.id.clone()));
        }
    }
    Ok(())
}
