//! Vote ledger: per-entity up/down voter sets with toggle semantics.
//!
//! The same algorithm serves questions and answers through the [`Votable`]
//! capability, so the toggle rules exist exactly once. The ledger assumes the
//! ownership guard has already rejected self-votes and votes on locked
//! questions; it only concerns itself with set membership and the counter
//! deltas the mutation implies.

use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;
use utoipa::ToSchema;

use super::user::UserId;

/// Requested vote direction. Only the literal strings `up` and `down` are
/// accepted on the wire; anything else is a client error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Up,
    Down,
}

/// Raised when a vote direction string is neither `up` nor `down`.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
#[error("invalid vote type: expected \"up\" or \"down\"")]
pub struct InvalidVoteType;

impl std::str::FromStr for VoteDirection {
    type Err = InvalidVoteType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            _ => Err(InvalidVoteType),
        }
    }
}

/// Failures raised while toggling a vote.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum VoteError {
    /// The voter appears in both the up-set and the down-set. The document is
    /// corrupted; the caller must surface this loudly, never repair silently.
    #[error("voter {voter} is present in both vote sets")]
    CorruptedSets { voter: UserId },
}

/// Net effect of one toggle on the denormalised counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteOutcome {
    /// Signed change to the target owner's `upvotesReceived`.
    pub owner_delta: i64,
    /// Signed change to the voter's `votesGivenCount`. Applied by callers for
    /// question targets only; answers do not track votes given.
    pub voter_delta: i64,
}

/// Ordered sets of voter identities, one per direction.
///
/// ## Invariants
/// - A voter is never a member of both sets at rest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct VoteSets {
    #[serde(default)]
    pub up: Vec<UserId>,
    #[serde(default)]
    pub down: Vec<UserId>,
}

impl VoteSets {
    /// Empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the voter currently holds an up-vote.
    pub fn has_upvoted(&self, voter: &UserId) -> bool {
        self.up.contains(voter)
    }

    /// Whether the voter currently holds a down-vote.
    pub fn has_downvoted(&self, voter: &UserId) -> bool {
        self.down.contains(voter)
    }

    fn remove(list: &mut Vec<UserId>, voter: &UserId) {
        list.retain(|id| id != voter);
    }

    /// Toggle the voter's membership for `direction` and report the counter
    /// deltas.
    ///
    /// Semantics (authoritative policy; down-votes never subtract from the
    /// owner's received-upvote counter except by displacing an up-vote):
    ///
    /// - `up` while already up: vote retracted; owner −1, voter −1.
    /// - `up` otherwise: up-vote added, any down-vote displaced; owner +1,
    ///   voter +1 (0 when switching from down).
    /// - `down` while already down: vote retracted; owner 0, voter −1.
    /// - `down` otherwise: down-vote added, any up-vote displaced; owner −1
    ///   only when an up-vote was displaced, voter +1 (0 when switching).
    pub fn toggle(
        &mut self,
        voter: &UserId,
        direction: VoteDirection,
    ) -> Result<VoteOutcome, VoteError> {
        let was_up = self.has_upvoted(voter);
        let was_down = self.has_downvoted(voter);
        if was_up && was_down {
            return Err(VoteError::CorruptedSets { voter: *voter });
        }

        let outcome = match direction {
            VoteDirection::Up => {
                if was_up {
                    Self::remove(&mut self.up, voter);
                    VoteOutcome {
                        owner_delta: -1,
                        voter_delta: -1,
                    }
                } else {
                    if was_down {
                        Self::remove(&mut self.down, voter);
                    }
                    self.up.push(*voter);
                    VoteOutcome {
                        owner_delta: 1,
                        voter_delta: if was_down { 0 } else { 1 },
                    }
                }
            }
            VoteDirection::Down => {
                if was_down {
                    Self::remove(&mut self.down, voter);
                    VoteOutcome {
                        owner_delta: 0,
                        voter_delta: -1,
                    }
                } else {
                    if was_up {
                        Self::remove(&mut self.up, voter);
                    }
                    self.down.push(*voter);
                    VoteOutcome {
                        owner_delta: if was_up { -1 } else { 0 },
                        voter_delta: if was_up { 0 } else { 1 },
                    }
                }
            }
        };
        Ok(outcome)
    }
}

/// Capability shared by entities that carry a vote ledger.
pub trait Votable {
    /// Identity of the entity's author.
    fn owner(&self) -> &UserId;

    /// Read access to the vote sets.
    fn votes(&self) -> &VoteSets;

    /// Mutable access to the vote sets.
    fn votes_mut(&mut self) -> &mut VoteSets;
}

/// Apply a vote to any [`Votable`] target.
pub fn apply_vote(
    target: &mut impl Votable,
    voter: &UserId,
    direction: VoteDirection,
) -> Result<VoteOutcome, VoteError> {
    target.votes_mut().toggle(voter, direction)
}
