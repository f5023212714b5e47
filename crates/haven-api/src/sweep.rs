//! # Overdue Sweep & Rent Materialization
//!
//! The one asynchronous actor in the system. On a timer, independent of
//! request handling:
//!
//! 1. moves `Pending` payments whose due date has elapsed to `Overdue`;
//! 2. materializes the next rent obligation for every executed lease
//!    whose current billing period has begun.
//!
//! Both passes are idempotent — the overdue transition no-ops on anything
//! but an elapsed `Pending` record, and rent periods are keyed on
//! `(lease, due_date)` — so the sweep tolerates interruption and re-run
//! without double-processing. Per-record failures are logged and skipped;
//! one bad record never aborts the batch.

use chrono::{Datelike, NaiveDate, Utc};

use haven_state::{LeaseStatus, Payment, PaymentKind, PaymentStatus};

use crate::dispatch;
use crate::state::AppState;

/// What one sweep run did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// Payments moved `Pending → Overdue`.
    pub marked_overdue: usize,
    /// Rent obligations materialized.
    pub rent_materialized: usize,
    /// Records skipped due to errors (logged individually).
    pub failures: usize,
}

/// Run one sweep pass over all payments and leases.
pub async fn run_sweep(state: &AppState) -> SweepReport {
    let now = Utc::now();
    let today = now.date_naive();
    let mut report = SweepReport::default();

    // ── Pass 1: overdue ──────────────────────────────────────────────
    for snapshot in state.payments.list() {
        if snapshot.status != PaymentStatus::Pending || snapshot.due_date >= today {
            continue;
        }
        // Re-check under the write lock; the tenant may have claimed
        // payment between the scan and this update.
        let outcome = state
            .payments
            .try_update(snapshot.id.as_uuid(), |p| Ok(p.mark_overdue(today, now)));
        let Some(Ok(Some(event))) = outcome else {
            continue;
        };

        let updated = state.payments.get(snapshot.id.as_uuid());
        if let Some(payment) = &updated {
            if let Err(e) =
                crate::db::write_through_payment(state, payment, PaymentStatus::Pending).await
            {
                tracing::warn!(payment_id = %payment.id, error = %e, "overdue persist failed");
                report.failures += 1;
                continue;
            }
        }

        match state.leases.get(snapshot.lease_id.as_uuid()) {
            Some(lease) => {
                if let Err(e) = dispatch::dispatch(state, &[event], &lease.parties(), now).await {
                    tracing::warn!(
                        payment_id = %snapshot.id,
                        error = %e,
                        "overdue notification dispatch failed"
                    );
                    report.failures += 1;
                }
            }
            None => {
                tracing::warn!(
                    payment_id = %snapshot.id,
                    lease_id = %snapshot.lease_id,
                    "payment references a missing lease; skipping dispatch"
                );
                report.failures += 1;
            }
        }
        report.marked_overdue += 1;
    }

    // ── Pass 2: rent materialization ─────────────────────────────────
    for lease in state.leases.list() {
        if !matches!(lease.status, LeaseStatus::LeaseSigned | LeaseStatus::MoveInReady) {
            continue;
        }
        let existing: Vec<NaiveDate> = state
            .payments_for_lease(&lease.id)
            .into_iter()
            .filter(|p| p.kind == PaymentKind::Rent)
            .map(|p| p.due_date)
            .collect();
        let mut last = existing.into_iter().max();

        loop {
            let next = match last {
                // First obligation is created at signature time; this arm
                // only fires for hydrated leases that predate it.
                None => lease.terms.start_date,
                Some(prev) => match next_due_date(prev, lease.terms.rent_due_day) {
                    Some(d) => d,
                    None => break,
                },
            };
            if next > today || next > lease.terms.end_date {
                break;
            }
            let payment = Payment::rent_for(&lease, next, now);
            state.payments.insert(*payment.id.as_uuid(), payment.clone());
            if let Some(pool) = &state.db_pool {
                if let Err(e) = crate::db::payments::insert(pool, &payment).await {
                    tracing::warn!(
                        lease_id = %lease.id,
                        due_date = %next,
                        error = %e,
                        "rent obligation persist failed"
                    );
                    report.failures += 1;
                }
            }
            tracing::info!(
                lease_id = %lease.id,
                due_date = %next,
                amount = %payment.amount,
                "materialized rent obligation"
            );
            report.rent_materialized += 1;
            last = Some(next);
        }
    }

    report
}

/// Spawn the sweep loop on its own task.
pub fn spawn_sweeper(state: AppState, interval_secs: u64) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker =
            tokio::time::interval(std::time::Duration::from_secs(interval_secs.max(1)));
        // The first tick fires immediately; that is deliberate — a
        // restart must not delay overdue detection by a full interval.
        loop {
            ticker.tick().await;
            let report = run_sweep(&state).await;
            if report != SweepReport::default() {
                tracing::info!(
                    marked_overdue = report.marked_overdue,
                    rent_materialized = report.rent_materialized,
                    failures = report.failures,
                    "sweep completed"
                );
            }
        }
    })
}

/// The first occurrence of `due_day` strictly after `prev`.
///
/// `due_day` is validated to 1..=28, so the constructed date exists in
/// every month; `None` only on year overflow far outside lease ranges.
fn next_due_date(prev: NaiveDate, due_day: u8) -> Option<NaiveDate> {
    let candidate = NaiveDate::from_ymd_opt(prev.year(), prev.month(), u32::from(due_day));
    match candidate {
        Some(d) if d > prev => Some(d),
        _ => {
            let (year, month) = if prev.month() == 12 {
                (prev.year() + 1, 1)
            } else {
                (prev.year(), prev.month() + 1)
            };
            NaiveDate::from_ymd_opt(year, month, u32::from(due_day))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_due_same_month() {
        let prev = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();
        assert_eq!(
            next_due_date(prev, 15),
            Some(NaiveDate::from_ymd_opt(2025, 9, 15).unwrap())
        );
    }

    #[test]
    fn test_next_due_rolls_to_next_month() {
        let prev = NaiveDate::from_ymd_opt(2025, 9, 15).unwrap();
        assert_eq!(
            next_due_date(prev, 15),
            Some(NaiveDate::from_ymd_opt(2025, 10, 15).unwrap())
        );
        let prev = NaiveDate::from_ymd_opt(2025, 9, 20).unwrap();
        assert_eq!(
            next_due_date(prev, 15),
            Some(NaiveDate::from_ymd_opt(2025, 10, 15).unwrap())
        );
    }

    #[test]
    fn test_next_due_rolls_over_year() {
        let prev = NaiveDate::from_ymd_opt(2025, 12, 20).unwrap();
        assert_eq!(
            next_due_date(prev, 5),
            Some(NaiveDate::from_ymd_opt(2026, 1, 5).unwrap())
        );
    }

    #[test]
    fn test_next_due_february_is_safe() {
        let prev = NaiveDate::from_ymd_opt(2026, 1, 28).unwrap();
        assert_eq!(
            next_due_date(prev, 28),
            Some(NaiveDate::from_ymd_opt(2026, 2, 28).unwrap())
        );
    }
}
