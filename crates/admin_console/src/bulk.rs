//! Confirmation-gated bulk delete.
//!
//! `Idle -> Confirming -> InFlight -> {Completed | PartiallyFailed | Failed}`,
//! and back to `Idle` once the operator acknowledges the result. Each step is
//! a separate call so the in-flight state survives across awaits.

use std::collections::BTreeSet;

use client_core::ClientError;
use shared::domain::UserId;
use tracing::{info, warn};

use crate::error::ConsoleError;

/// Text the operator must type before a bulk delete may run.
pub const CONFIRMATION_LITERAL: &str = "SUPPRIMER";

#[derive(Debug, Clone, PartialEq)]
pub struct BulkDeleteFailure {
    pub id: UserId,
    pub reason: String,
    pub requires_reauth: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BulkDeleteReport {
    pub deleted: Vec<UserId>,
    pub failed: Vec<BulkDeleteFailure>,
}

impl BulkDeleteReport {
    pub fn requested(&self) -> usize {
        self.deleted.len() + self.failed.len()
    }

    /// Only a run where every id was deleted counts as a success.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn is_partial(&self) -> bool {
        !self.deleted.is_empty() && !self.failed.is_empty()
    }

    pub fn deleted_ids(&self) -> BTreeSet<UserId> {
        self.deleted.iter().cloned().collect()
    }

    pub fn failed_ids(&self) -> Vec<&UserId> {
        self.failed.iter().map(|failure| &failure.id).collect()
    }

    pub fn summary(&self) -> String {
        if self.is_success() {
            format!("{} user(s) deleted", self.deleted.len())
        } else {
            format!(
                "{} of {} deleted, {} failed",
                self.deleted.len(),
                self.requested(),
                self.failed.len()
            )
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum BulkDeleteState {
    #[default]
    Idle,
    Confirming {
        count: usize,
    },
    InFlight {
        count: usize,
    },
    Completed(BulkDeleteReport),
    PartiallyFailed(BulkDeleteReport),
    Failed(BulkDeleteReport),
}

impl BulkDeleteState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Confirming { .. } => "confirming",
            Self::InFlight { .. } => "in flight",
            Self::Completed(_) => "completed",
            Self::PartiallyFailed(_) => "partially failed",
            Self::Failed(_) => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed(_) | Self::PartiallyFailed(_) | Self::Failed(_)
        )
    }

    pub fn report(&self) -> Option<&BulkDeleteReport> {
        match self {
            Self::Completed(report) | Self::PartiallyFailed(report) | Self::Failed(report) => {
                Some(report)
            }
            _ => None,
        }
    }
}

/// Proof that a confirmed run is in flight. Only [`BulkDeleteFlow::confirm`]
/// creates one and [`BulkDeleteFlow::complete`] consumes it.
#[derive(Debug)]
pub struct BulkDeleteTicket {
    ids: Vec<UserId>,
}

impl BulkDeleteTicket {
    pub fn ids(&self) -> &[UserId] {
        &self.ids
    }
}

/// A confirmed run holding its flow borrowed until the outcomes are in.
///
/// Dropping the run before [`InFlightRun::finish`] moves the flow to
/// `Failed`, with every id reported as having no recorded outcome.
#[derive(Debug)]
pub struct InFlightRun<'a> {
    flow: &'a mut BulkDeleteFlow,
    ticket: Option<BulkDeleteTicket>,
}

impl InFlightRun<'_> {
    pub fn ids(&self) -> &[UserId] {
        self.ticket
            .as_ref()
            .map(BulkDeleteTicket::ids)
            .unwrap_or_default()
    }

    pub fn finish(
        mut self,
        outcomes: impl IntoIterator<Item = (UserId, Result<(), ClientError>)>,
    ) -> Result<BulkDeleteReport, ConsoleError> {
        match self.ticket.take() {
            Some(ticket) => self.flow.complete(ticket, outcomes),
            None => Err(self.flow.wrong_state("finish", &self.flow.state)),
        }
    }
}

impl Drop for InFlightRun<'_> {
    fn drop(&mut self) {
        let Some(ticket) = self.ticket.take() else {
            return;
        };
        warn!(
            count = ticket.ids.len(),
            "bulk delete abandoned before all outcomes were recorded"
        );
        if let Err(err) = self.flow.complete(ticket, std::iter::empty()) {
            warn!(%err, "abandoned bulk delete could not be closed");
        }
    }
}

#[derive(Debug, Default)]
pub struct BulkDeleteFlow {
    state: BulkDeleteState,
}

impl BulkDeleteFlow {
    pub fn state(&self) -> &BulkDeleteState {
        &self.state
    }

    pub fn request(&mut self, count: usize) -> Result<(), ConsoleError> {
        match self.state {
            BulkDeleteState::Idle if count == 0 => Err(ConsoleError::EmptySelection),
            BulkDeleteState::Idle => {
                self.state = BulkDeleteState::Confirming { count };
                Ok(())
            }
            BulkDeleteState::InFlight { .. } => Err(ConsoleError::BulkInFlight),
            ref other => Err(self.wrong_state("request a bulk delete", other)),
        }
    }

    pub fn cancel(&mut self) -> Result<(), ConsoleError> {
        match self.state {
            BulkDeleteState::Confirming { .. } => {
                self.state = BulkDeleteState::Idle;
                Ok(())
            }
            ref other => Err(self.wrong_state("cancel", other)),
        }
    }

    /// Checks the typed confirmation and moves to `InFlight`.
    ///
    /// The token is trimmed and then compared case-sensitively. A mismatch
    /// leaves the flow in `Confirming` so the operator can retype it.
    pub fn confirm(
        &mut self,
        token: &str,
        ids: Vec<UserId>,
    ) -> Result<BulkDeleteTicket, ConsoleError> {
        match self.state {
            BulkDeleteState::Confirming { .. } => {}
            BulkDeleteState::InFlight { .. } => return Err(ConsoleError::BulkInFlight),
            ref other => return Err(self.wrong_state("confirm", other)),
        }
        if token.trim() != CONFIRMATION_LITERAL {
            return Err(ConsoleError::ConfirmationMismatch {
                expected: CONFIRMATION_LITERAL,
            });
        }
        if ids.is_empty() {
            return Err(ConsoleError::EmptySelection);
        }
        self.state = BulkDeleteState::InFlight { count: ids.len() };
        info!(count = ids.len(), "bulk delete confirmed");
        Ok(BulkDeleteTicket { ids })
    }

    /// Like [`confirm`](Self::confirm), with the ticket held by a guard that
    /// closes the run if it is dropped early.
    pub fn start(
        &mut self,
        token: &str,
        ids: Vec<UserId>,
    ) -> Result<InFlightRun<'_>, ConsoleError> {
        let ticket = self.confirm(token, ids)?;
        Ok(InFlightRun {
            flow: self,
            ticket: Some(ticket),
        })
    }

    /// Records per-id outcomes and moves to a terminal state.
    pub fn complete(
        &mut self,
        ticket: BulkDeleteTicket,
        outcomes: impl IntoIterator<Item = (UserId, Result<(), ClientError>)>,
    ) -> Result<BulkDeleteReport, ConsoleError> {
        if !matches!(self.state, BulkDeleteState::InFlight { .. }) {
            return Err(self.wrong_state("complete", &self.state));
        }

        let mut report = BulkDeleteReport::default();
        let mut pending: BTreeSet<UserId> = ticket.ids.into_iter().collect();
        for (id, outcome) in outcomes {
            if !pending.remove(&id) {
                continue;
            }
            match outcome {
                Ok(()) => report.deleted.push(id),
                Err(err) => {
                    warn!(user_id = %id, %err, "bulk delete item failed");
                    report.failed.push(BulkDeleteFailure {
                        requires_reauth: err.requires_reauth(),
                        reason: err.to_string(),
                        id,
                    });
                }
            }
        }
        for id in pending {
            report.failed.push(BulkDeleteFailure {
                id,
                reason: "no outcome recorded".to_string(),
                requires_reauth: false,
            });
        }

        info!(
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            "bulk delete finished"
        );
        self.state = if report.is_success() {
            BulkDeleteState::Completed(report.clone())
        } else if report.deleted.is_empty() {
            BulkDeleteState::Failed(report.clone())
        } else {
            BulkDeleteState::PartiallyFailed(report.clone())
        };
        Ok(report)
    }

    pub fn acknowledge(&mut self) -> Result<(), ConsoleError> {
        if self.state.is_terminal() {
            self.state = BulkDeleteState::Idle;
            Ok(())
        } else {
            Err(self.wrong_state("acknowledge", &self.state))
        }
    }

    fn wrong_state(&self, action: &'static str, state: &BulkDeleteState) -> ConsoleError {
        ConsoleError::BulkState {
            action,
            state: state.name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<UserId> {
        raw.iter().map(|id| UserId::from(*id)).collect()
    }

    #[test]
    fn happy_path_returns_to_idle_after_acknowledge() {
        let mut flow = BulkDeleteFlow::default();
        flow.request(2).expect("request");
        let ticket = flow.confirm("  SUPPRIMER ", ids(&["a", "b"])).expect("confirm");

        let report = flow
            .complete(
                ticket,
                vec![(UserId::from("a"), Ok(())), (UserId::from("b"), Ok(()))],
            )
            .expect("complete");
        assert!(report.is_success());
        assert!(matches!(flow.state(), BulkDeleteState::Completed(_)));

        flow.acknowledge().expect("acknowledge");
        assert_eq!(flow.state(), &BulkDeleteState::Idle);
    }

    #[test]
    fn confirmation_is_case_sensitive() {
        let mut flow = BulkDeleteFlow::default();
        flow.request(1).expect("request");

        let err = flow.confirm("supprimer", ids(&["a"])).expect_err("mismatch");
        assert!(matches!(err, ConsoleError::ConfirmationMismatch { .. }));
        assert_eq!(flow.state(), &BulkDeleteState::Confirming { count: 1 });

        flow.cancel().expect("cancel");
        assert_eq!(flow.state(), &BulkDeleteState::Idle);
    }

    #[test]
    fn reentrant_request_is_rejected_while_in_flight() {
        let mut flow = BulkDeleteFlow::default();
        flow.request(1).expect("request");
        let _ticket = flow.confirm(CONFIRMATION_LITERAL, ids(&["a"])).expect("confirm");

        assert!(matches!(flow.request(1), Err(ConsoleError::BulkInFlight)));
        assert!(matches!(
            flow.confirm(CONFIRMATION_LITERAL, ids(&["a"])),
            Err(ConsoleError::BulkInFlight)
        ));
        assert!(flow.acknowledge().is_err());
    }

    #[test]
    fn empty_selection_cannot_start() {
        let mut flow = BulkDeleteFlow::default();
        assert!(matches!(flow.request(0), Err(ConsoleError::EmptySelection)));
        assert!(matches!(
            flow.confirm(CONFIRMATION_LITERAL, Vec::new()),
            Err(ConsoleError::BulkState { .. })
        ));
    }

    #[test]
    fn mixed_outcomes_are_partial_and_missing_outcomes_fail() {
        let mut flow = BulkDeleteFlow::default();
        flow.request(3).expect("request");
        let ticket = flow
            .confirm(CONFIRMATION_LITERAL, ids(&["a", "b", "c"]))
            .expect("confirm");

        let report = flow
            .complete(
                ticket,
                vec![
                    (UserId::from("a"), Ok(())),
                    (
                        UserId::from("b"),
                        Err(ClientError::NotFound("/users/b".into())),
                    ),
                ],
            )
            .expect("complete");

        assert!(report.is_partial());
        assert_eq!(report.deleted, ids(&["a"]));
        assert_eq!(report.failed_ids(), vec![&UserId::from("b"), &UserId::from("c")]);
        assert!(matches!(flow.state(), BulkDeleteState::PartiallyFailed(_)));
    }

    #[test]
    fn all_failures_end_in_failed_state() {
        let mut flow = BulkDeleteFlow::default();
        flow.request(1).expect("request");
        let ticket = flow.confirm(CONFIRMATION_LITERAL, ids(&["a"])).expect("confirm");

        let report = flow
            .complete(
                ticket,
                vec![(
                    UserId::from("a"),
                    Err(ClientError::Authentication {
                        status: Some(401),
                        reason: "expired".into(),
                    }),
                )],
            )
            .expect("complete");

        assert!(!report.is_partial());
        assert!(report.failed[0].requires_reauth);
        assert!(matches!(flow.state(), BulkDeleteState::Failed(_)));
    }

    #[test]
    fn dropped_run_fails_every_id() {
        let mut flow = BulkDeleteFlow::default();
        flow.request(2).expect("request");
        let run = flow.start(CONFIRMATION_LITERAL, ids(&["a", "b"])).expect("start");
        assert_eq!(run.ids(), ids(&["a", "b"]).as_slice());
        drop(run);

        let BulkDeleteState::Failed(report) = flow.state() else {
            panic!("expected failed, got {:?}", flow.state());
        };
        assert!(report.deleted.is_empty());
        assert_eq!(report.failed_ids(), vec![&UserId::from("a"), &UserId::from("b")]);
        assert!(report
            .failed
            .iter()
            .all(|failure| failure.reason == "no outcome recorded"));

        flow.acknowledge().expect("acknowledge");
        flow.request(1).expect("flow is usable again");
    }

    #[test]
    fn finished_run_keeps_its_outcome() {
        let mut flow = BulkDeleteFlow::default();
        flow.request(1).expect("request");
        let run = flow.start(CONFIRMATION_LITERAL, ids(&["a"])).expect("start");
        let report = run.finish(vec![(UserId::from("a"), Ok(()))]).expect("finish");

        assert!(report.is_success());
        assert!(matches!(flow.state(), BulkDeleteState::Completed(_)));
    }
}
