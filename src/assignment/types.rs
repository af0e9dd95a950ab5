use std::str::FromStr;

use crate::participant::ParticipantId;

/// Shape of the gift chains a draw may produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrawMode {
    /// Any permutation without a fixed point; pairs may gift each other
    #[default]
    AnyDerangement,
    /// One chain that passes through every participant
    SingleCycle,
}

impl FromStr for DrawMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "any" | "any-derangement" => Ok(DrawMode::AnyDerangement),
            "single-cycle" | "cycle" => Ok(DrawMode::SingleCycle),
            other => Err(format!("unknown draw mode '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssignmentError {
    #[error("at least 2 participants are needed for a draw, got {count}")]
    TooFewParticipants { count: usize },
    #[error("participant id {0} appears more than once")]
    DuplicateIdentity(ParticipantId),
    #[error("could not find an assignment without self-gifting after {attempts} attempts")]
    Exhausted { attempts: u32 },
}

impl AssignmentError {
    /// Input problems, as opposed to an unlucky draw
    pub fn is_validation(&self) -> bool {
        !matches!(self, AssignmentError::Exhausted { .. })
    }
}
