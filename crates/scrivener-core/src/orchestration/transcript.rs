//! In-memory transcript of one session.

use transcript_ledger::Turn;

use super::error::{OrchestrationError, OrchestrationResult};

/// Append-only, gapless list of turns. Seq `n` always sits at index `n`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted turns, checking that seqs are exactly `0..n-1`.
    pub fn from_turns(turns: Vec<Turn>) -> OrchestrationResult<Self> {
        for (index, turn) in turns.iter().enumerate() {
            if turn.seq != index as u64 {
                return Err(OrchestrationError::CorruptTranscript {
                    detail: format!("expected seq {index}, found {}", turn.seq),
                });
            }
        }
        Ok(Self { turns })
    }

    /// Seq the next appended turn must carry.
    pub fn next_seq(&self) -> u64 {
        self.turns.len() as u64
    }

    pub(crate) fn push(&mut self, turn: Turn) {
        debug_assert_eq!(turn.seq, self.next_seq());
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Owned copy for readers outside the orchestrator.
    pub fn snapshot(&self) -> Vec<Turn> {
        self.turns.clone()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Number of turns that count against the round ceiling.
    pub fn rounds(&self) -> u64 {
        self.turns.iter().filter(|t| t.kind.is_round()).count() as u64
    }

    /// Last turn produced by a role rather than by an operator instruction.
    pub fn last_round(&self) -> Option<&Turn> {
        self.turns.iter().rev().find(|t| t.kind.is_round())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transcript_ledger::{Recipient, TurnKind};

    fn turn(seq: u64, kind: TurnKind) -> Turn {
        Turn::new(seq, "Writer", Recipient::Broadcast, kind, "text")
    }

    #[test]
    fn test_from_turns_accepts_gapless() {
        let t = Transcript::from_turns(vec![
            turn(0, TurnKind::Instruction),
            turn(1, TurnKind::Reply),
            turn(2, TurnKind::Instruction),
        ])
        .unwrap();
        assert_eq!(t.next_seq(), 3);
        assert_eq!(t.rounds(), 1);
        assert_eq!(t.last_round().unwrap().seq, 1);
    }

    #[test]
    fn test_from_turns_rejects_gap() {
        let err = Transcript::from_turns(vec![turn(0, TurnKind::Instruction), turn(2, TurnKind::Reply)])
            .unwrap_err();
        assert!(matches!(err, OrchestrationError::CorruptTranscript { .. }));
    }

    #[test]
    fn test_empty_transcript() {
        let t = Transcript::new();
        assert!(t.is_empty());
        assert_eq!(t.next_seq(), 0);
        assert!(t.last_round().is_none());
    }
}
