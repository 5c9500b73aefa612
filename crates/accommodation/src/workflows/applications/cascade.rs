//! Withdrawal propagation through an application tree.
//!
//! The cascade mutates an in-memory snapshot only. Callers persist the tree afterwards in a
//! single write, so a failed save leaves no partial withdrawal behind.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::workflows::bookings::{BookingId, Cancellation};

use super::domain::{
    ApplicationStatus, ApplicationTree, EntityRef, PlacementApplicationId, PlacementRequestId,
    WithdrawableRef, Withdrawal, WithdrawalReason,
};

/// Why the cascade left a node untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    ArrivalRecorded,
    AlreadyWithdrawn,
    AlreadyCancelled,
    Reallocated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedEntity {
    pub entity: EntityRef,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalOutcome {
    pub root: EntityRef,
    pub withdrawn: Vec<EntityRef>,
    pub skipped: Vec<SkippedEntity>,
}

impl WithdrawalOutcome {
    pub fn changed(&self) -> bool {
        !self.withdrawn.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CascadeError {
    #[error("booking {0} has an arrival recorded and cannot be withdrawn")]
    ArrivalRecorded(BookingId),
    #[error("{0} does not belong to this application")]
    NotInTree(EntityRef),
}

/// Withdraw `target` and everything beneath it that has not already been actioned.
///
/// Withdrawing a node that is already withdrawn succeeds without changing anything.
pub fn withdraw(
    tree: &mut ApplicationTree,
    target: &WithdrawableRef,
    reason: WithdrawalReason,
    withdrawn_on: NaiveDate,
    notes: Option<String>,
) -> Result<WithdrawalOutcome, CascadeError> {
    let root = EntityRef::from(target.clone());
    if !tree.contains(&root) {
        return Err(CascadeError::NotInTree(root));
    }

    if let WithdrawableRef::Booking(id) = target {
        let arrived = tree
            .bookings
            .iter()
            .any(|booking| &booking.id == id && booking.has_arrival());
        if arrived {
            return Err(CascadeError::ArrivalRecorded(id.clone()));
        }
    }

    let mut cascade = Cascade {
        tree,
        withdrawn_on,
        notes,
        withdrawn: Vec::new(),
        skipped: Vec::new(),
    };
    match target {
        WithdrawableRef::Application(_) => cascade.application(reason),
        WithdrawableRef::PlacementApplication(id) => cascade.placement_application(id, reason),
        WithdrawableRef::PlacementRequest(id) => cascade.placement_request(id, reason),
        WithdrawableRef::Booking(id) => cascade.booking(id, reason),
    }

    Ok(WithdrawalOutcome {
        root,
        withdrawn: cascade.withdrawn,
        skipped: cascade.skipped,
    })
}

struct Cascade<'a> {
    tree: &'a mut ApplicationTree,
    withdrawn_on: NaiveDate,
    notes: Option<String>,
    withdrawn: Vec<EntityRef>,
    skipped: Vec<SkippedEntity>,
}

impl Cascade<'_> {
    fn withdrawal(&self, reason: WithdrawalReason) -> Withdrawal {
        Withdrawal {
            reason,
            withdrawn_on: self.withdrawn_on,
            notes: self.notes.clone(),
        }
    }

    fn skip(&mut self, entity: EntityRef, reason: SkipReason) {
        debug!(%entity, ?reason, "withdrawal skipped");
        self.skipped.push(SkippedEntity { entity, reason });
    }

    fn mark(&mut self, entity: EntityRef) {
        debug!(%entity, "withdrawn");
        self.withdrawn.push(entity);
    }

    fn application(&mut self, reason: WithdrawalReason) {
        let entity = EntityRef::Application(self.tree.application.id.clone());
        if self.tree.application.is_withdrawn() {
            self.skip(entity, SkipReason::AlreadyWithdrawn);
            return;
        }
        self.tree.application.status = ApplicationStatus::Withdrawn;
        self.tree.application.withdrawal = Some(self.withdrawal(reason));
        self.mark(entity);

        for index in 0..self.tree.assessments.len() {
            let assessment = &self.tree.assessments[index];
            let entity = EntityRef::Assessment(assessment.id.clone());
            if assessment.withdrawn {
                self.skip(entity, SkipReason::AlreadyWithdrawn);
            } else if assessment.reallocated_on.is_some() {
                self.skip(entity, SkipReason::Reallocated);
            } else {
                self.tree.assessments[index].withdrawn = true;
                self.mark(entity);
            }
        }

        let child = WithdrawalReason::RelatedApplicationWithdrawn;
        let placement_applications: Vec<PlacementApplicationId> = self
            .tree
            .placement_applications
            .iter()
            .map(|placement| placement.id.clone())
            .collect();
        for id in &placement_applications {
            self.placement_application(id, child);
        }

        let initial_requests: Vec<PlacementRequestId> = self
            .tree
            .placement_requests
            .iter()
            .filter(|request| request.placement_application_id.is_none())
            .map(|request| request.id.clone())
            .collect();
        for id in &initial_requests {
            self.placement_request(id, child);
        }

        let direct_bookings: Vec<BookingId> = self
            .tree
            .bookings
            .iter()
            .filter(|booking| booking.placement_request_id.is_none())
            .map(|booking| booking.id.clone())
            .collect();
        for id in &direct_bookings {
            self.booking(id, child);
        }
    }

    fn placement_application(&mut self, id: &PlacementApplicationId, reason: WithdrawalReason) {
        let entity = EntityRef::PlacementApplication(id.clone());
        let withdrawal = self.withdrawal(reason);
        let Some(placement) = self
            .tree
            .placement_applications
            .iter_mut()
            .find(|placement| &placement.id == id)
        else {
            return;
        };
        if placement.is_withdrawn() {
            self.skip(entity, SkipReason::AlreadyWithdrawn);
            return;
        }
        placement.withdrawal = Some(withdrawal);
        self.mark(entity);

        let requests: Vec<PlacementRequestId> = self
            .tree
            .placement_requests
            .iter()
            .filter(|request| request.placement_application_id.as_ref() == Some(id))
            .map(|request| request.id.clone())
            .collect();
        for request in &requests {
            self.placement_request(request, WithdrawalReason::RelatedPlacementApplicationWithdrawn);
        }
    }

    fn placement_request(&mut self, id: &PlacementRequestId, reason: WithdrawalReason) {
        let entity = EntityRef::PlacementRequest(id.clone());
        let withdrawal = self.withdrawal(reason);
        let Some(request) = self
            .tree
            .placement_requests
            .iter_mut()
            .find(|request| &request.id == id)
        else {
            return;
        };
        if request.is_withdrawn() {
            self.skip(entity, SkipReason::AlreadyWithdrawn);
            return;
        }
        request.withdrawal = Some(withdrawal);
        self.mark(entity);

        let bookings: Vec<BookingId> = self
            .tree
            .bookings
            .iter()
            .filter(|booking| booking.placement_request_id.as_ref() == Some(id))
            .map(|booking| booking.id.clone())
            .collect();
        for booking in &bookings {
            self.booking(booking, WithdrawalReason::RelatedPlacementRequestWithdrawn);
        }
    }

    fn booking(&mut self, id: &BookingId, reason: WithdrawalReason) {
        let entity = EntityRef::Booking(id.clone());
        let cancellation = Cancellation {
            date: self.withdrawn_on,
            reason,
            notes: self.notes.clone(),
        };
        let Some(booking) = self.tree.bookings.iter_mut().find(|booking| &booking.id == id) else {
            return;
        };
        if booking.has_arrival() {
            self.skip(entity, SkipReason::ArrivalRecorded);
        } else if booking.is_cancelled() {
            self.skip(entity, SkipReason::AlreadyCancelled);
        } else {
            booking.cancellation = Some(cancellation);
            self.mark(entity);
        }
    }
}
