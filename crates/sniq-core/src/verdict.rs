//! Verdict policy
//!
//! A pure mapping from what the decoder and matcher found to what the kernel
//! should do with the packet. Anything that fails to decode is accepted.

use crate::error::DecodeError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Decision returned to the packet queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    /// Let the packet through untouched
    Accept,
    /// Let the packet through with a firewall mark
    AcceptWithMark(u32),
    /// Discard the packet
    Drop,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Accept => write!(f, "accept"),
            Verdict::AcceptWithMark(mark) => write!(f, "accept (mark {mark})"),
            Verdict::Drop => write!(f, "drop"),
        }
    }
}

/// What to do with a packet whose server name is listed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchAction {
    /// Drop matched packets
    Drop,
    /// Accept matched packets with the bad mark
    #[default]
    Mark,
}

/// Result of running one packet through decoder and matcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The packet could not be decoded
    DecodeFailed(DecodeError),
    /// Decoded, but no server name was present
    NoHostname,
    /// Server name present and not listed
    Unmatched(String),
    /// Server name present and listed
    Matched(String),
}

impl Outcome {
    /// Server name, if one was extracted
    pub fn hostname(&self) -> Option<&str> {
        match self {
            Outcome::Unmatched(host) | Outcome::Matched(host) => Some(host),
            Outcome::DecodeFailed(_) | Outcome::NoHostname => None,
        }
    }
}

/// Verdict policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    /// Action for matched packets
    pub action: MatchAction,
    /// Mark applied to matched packets in [`MatchAction::Mark`] mode
    pub bad_mark: u32,
    /// Mark applied to everything else in [`MatchAction::Mark`] mode
    pub good_mark: Option<u32>,
}

impl Default for Policy {
    fn default() -> Self {
        Self::mark_on_match(1)
    }
}

impl Policy {
    /// Drop matched packets, accept the rest
    pub fn drop_on_match() -> Self {
        Self {
            action: MatchAction::Drop,
            bad_mark: 0,
            good_mark: None,
        }
    }

    /// Mark matched packets with `mark`, accept the rest unmarked
    pub fn mark_on_match(mark: u32) -> Self {
        Self {
            action: MatchAction::Mark,
            bad_mark: mark,
            good_mark: None,
        }
    }

    /// Also mark unmatched packets
    #[must_use]
    pub fn with_good_mark(mut self, mark: u32) -> Self {
        self.good_mark = Some(mark);
        self
    }

    /// Verdict for an outcome
    pub fn verdict(&self, outcome: &Outcome) -> Verdict {
        match outcome {
            Outcome::DecodeFailed(_) => Verdict::Accept,
            Outcome::Matched(_) => match self.action {
                MatchAction::Drop => Verdict::Drop,
                MatchAction::Mark => Verdict::AcceptWithMark(self.bad_mark),
            },
            Outcome::NoHostname | Outcome::Unmatched(_) => match (self.action, self.good_mark) {
                (MatchAction::Mark, Some(mark)) => Verdict::AcceptWithMark(mark),
                _ => Verdict::Accept,
            },
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.action, self.good_mark) {
            (MatchAction::Drop, _) => write!(f, "drop"),
            (MatchAction::Mark, None) => write!(f, "mark {}", self.bad_mark),
            (MatchAction::Mark, Some(good)) => {
                write!(f, "mark {} (unmatched {})", self.bad_mark, good)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_outcomes() -> [Outcome; 4] {
        [
            Outcome::DecodeFailed(DecodeError::NotLongHeader),
            Outcome::NoHostname,
            Outcome::Unmatched("other.example".into()),
            Outcome::Matched("blocked.example".into()),
        ]
    }

    #[test]
    fn test_drop_policy() {
        let policy = Policy::drop_on_match();
        let verdicts: Vec<_> = all_outcomes().iter().map(|o| policy.verdict(o)).collect();
        assert_eq!(
            verdicts,
            vec![Verdict::Accept, Verdict::Accept, Verdict::Accept, Verdict::Drop]
        );
    }

    #[test]
    fn test_drop_policy_ignores_good_mark() {
        let policy = Policy::drop_on_match().with_good_mark(7);
        assert_eq!(policy.verdict(&Outcome::NoHostname), Verdict::Accept);
        assert_eq!(
            policy.verdict(&Outcome::Unmatched("a.example".into())),
            Verdict::Accept
        );
    }

    #[test]
    fn test_mark_policy() {
        let policy = Policy::mark_on_match(1);
        let verdicts: Vec<_> = all_outcomes().iter().map(|o| policy.verdict(o)).collect();
        assert_eq!(
            verdicts,
            vec![
                Verdict::Accept,
                Verdict::Accept,
                Verdict::Accept,
                Verdict::AcceptWithMark(1)
            ]
        );
    }

    #[test]
    fn test_mark_policy_with_good_mark() {
        let policy = Policy::mark_on_match(1).with_good_mark(2);
        let verdicts: Vec<_> = all_outcomes().iter().map(|o| policy.verdict(o)).collect();
        assert_eq!(
            verdicts,
            vec![
                // Decode failures are never marked
                Verdict::Accept,
                Verdict::AcceptWithMark(2),
                Verdict::AcceptWithMark(2),
                Verdict::AcceptWithMark(1)
            ]
        );
    }

    #[test]
    fn test_outcome_hostname() {
        assert_eq!(Outcome::Matched("a.example".into()).hostname(), Some("a.example"));
        assert_eq!(Outcome::NoHostname.hostname(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Verdict::AcceptWithMark(5).to_string(), "accept (mark 5)");
        assert_eq!(Policy::drop_on_match().to_string(), "drop");
        assert_eq!(Policy::mark_on_match(3).to_string(), "mark 3");
        assert_eq!(
            Policy::mark_on_match(3).with_good_mark(4).to_string(),
            "mark 3 (unmatched 4)"
        );
    }
}
