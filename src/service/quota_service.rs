use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc};
use uuid::Uuid;

use crate::{
    domain::{BookingStatus, CreditReinstatement, SessionBooking, WeeklyUsage},
    error::{AppError, Result},
    repository::{BookingRepository, ClassRepository, PlanRepository},
};

/// The Monday 00:00 UTC of the week containing `date`. Weeks run
/// Monday through Sunday, so a Sunday maps six days back.
pub fn week_start(date: DateTime<Utc>) -> DateTime<Utc> {
    let days_back = date.weekday().num_days_from_monday() as i64;
    let monday = date.date_naive() - Duration::days(days_back);
    DateTime::from_naive_utc_and_offset(monday.and_time(NaiveTime::MIN), Utc)
}

pub struct QuotaService {
    booking_repo: Arc<dyn BookingRepository>,
    plan_repo: Arc<dyn PlanRepository>,
    class_repo: Arc<dyn ClassRepository>,
}

impl QuotaService {
    pub fn new(
        booking_repo: Arc<dyn BookingRepository>,
        plan_repo: Arc<dyn PlanRepository>,
        class_repo: Arc<dyn ClassRepository>,
    ) -> Self {
        Self { booking_repo, plan_repo, class_repo }
    }

    /// The weekly allowance from the student's active plan; 0 without one.
    async fn weekly_limit(&self, student_id: Uuid) -> Result<i64> {
        let Some(plan) = self.plan_repo.active_plan(student_id).await? else {
            return Ok(0);
        };

        let option = self.plan_repo.find_option(plan.plan_option_id).await?
            .ok_or_else(|| AppError::NotFound("Plan option not found".to_string()))?;

        Ok(option.weekly_classes)
    }

    /// Booking consumption for the week containing `reference_date`.
    /// Reinstatements reduce effective usage, so `used` can go negative;
    /// `remaining` is clamped at zero.
    pub async fn weekly_usage(&self, student_id: Uuid, reference_date: DateTime<Utc>) -> Result<WeeklyUsage> {
        let week = week_start(reference_date);
        let limit = self.weekly_limit(student_id).await?;
        let booked = self.booking_repo.booked_count_for_week(student_id, week).await?;
        let reinstated = self.booking_repo.reinstated_for_week(student_id, week).await?;

        let used = booked - reinstated;
        Ok(WeeklyUsage {
            used,
            limit,
            remaining: (limit - used).max(0),
            week_start: week,
        })
    }

    /// Books one session against the student's weekly quota. Rejects a
    /// duplicate booking for the same session and fails with QuotaExceeded
    /// when the week's allowance is spent.
    pub async fn book_session(&self, session_id: Uuid, student_id: Uuid) -> Result<SessionBooking> {
        let session = self.class_repo.find_session(session_id).await?
            .ok_or_else(|| AppError::NotFound("Class session not found".to_string()))?;

        if self.booking_repo.find_live(student_id, session_id).await?.is_some() {
            return Err(AppError::Conflict(
                "Session already booked".to_string(),
            ));
        }

        let week = week_start(session.start_time);
        let limit = self.weekly_limit(student_id).await?;

        let booking = SessionBooking {
            id: Uuid::new_v4(),
            student_id,
            session_id,
            week_start: week,
            status: BookingStatus::Booked,
            created_at: Utc::now(),
        };

        let booking = self.booking_repo.create_with_quota_check(booking, limit).await?;

        tracing::info!(
            student_id = %student_id,
            session_id = %session_id,
            week_start = %week,
            "session booked"
        );

        Ok(booking)
    }

    pub async fn cancel_booking(&self, booking_id: Uuid) -> Result<SessionBooking> {
        self.booking_repo.cancel(booking_id).await
    }

    /// Manually hands a quota slot back for one week. Append-only; never
    /// reconciled against a specific prior booking.
    pub async fn reinstate_for_week(
        &self,
        student_id: Uuid,
        week: DateTime<Utc>,
        amount: i64,
        note: Option<String>,
    ) -> Result<CreditReinstatement> {
        if amount <= 0 {
            return Err(AppError::Validation(
                "Reinstatement amount must be positive".to_string(),
            ));
        }

        let credit = CreditReinstatement {
            id: Uuid::new_v4(),
            student_id,
            week_start: week_start(week),
            amount,
            note,
            created_at: Utc::now(),
        };

        self.booking_repo.create_reinstatement(credit).await
    }
}
