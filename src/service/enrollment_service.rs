use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    domain::{
        Attendance, BillingStatus, CapacityUsage, Enrollment, EnrollmentStatus, PaymentMethod,
    },
    error::{AppError, Result},
    repository::{ClassRepository, EnrollmentRepository, PaymentRepository},
    service::{billing, payment_service::PaymentService},
};

pub struct EnrollOutcome {
    pub enrollment: Enrollment,
    pub is_waitlist: bool,
    pub already_enrolled: bool,
}

pub struct EnrollmentService {
    enrollment_repo: Arc<dyn EnrollmentRepository>,
    class_repo: Arc<dyn ClassRepository>,
    payment_repo: Arc<dyn PaymentRepository>,
    payment_service: Arc<PaymentService>,
    enrollment_fee_cents: i64,
}

impl EnrollmentService {
    pub fn new(
        enrollment_repo: Arc<dyn EnrollmentRepository>,
        class_repo: Arc<dyn ClassRepository>,
        payment_repo: Arc<dyn PaymentRepository>,
        payment_service: Arc<PaymentService>,
        enrollment_fee_cents: i64,
    ) -> Self {
        Self {
            enrollment_repo,
            class_repo,
            payment_repo,
            payment_service,
            enrollment_fee_cents,
        }
    }

    /// Enrolls a student in a class. Idempotent: an existing non-cancelled
    /// enrollment for the pair is returned as-is with no side effects.
    /// Otherwise the student takes a seat when one is free and is
    /// waitlisted when not, and the enrollment's first billing obligation
    /// is created in the same call.
    pub async fn enroll_student(&self, student_id: Uuid, class_id: Uuid) -> Result<EnrollOutcome> {
        let class = self.class_repo.find_by_id(class_id).await?
            .ok_or_else(|| AppError::NotFound("Class not found".to_string()))?;

        if let Some(existing) = self.enrollment_repo.find_live(student_id, class_id).await? {
            return Ok(EnrollOutcome {
                is_waitlist: existing.status == EnrollmentStatus::Waitlist,
                already_enrolled: true,
                enrollment: existing,
            });
        }

        let enrollment = self
            .enrollment_repo
            .create_with_capacity_check(student_id, class_id, class.capacity)
            .await?;

        self.ensure_enrollment_charge(&enrollment, &class.name).await?;

        tracing::info!(
            student_id = %student_id,
            class_id = %class_id,
            status = ?enrollment.status,
            "student enrolled"
        );

        Ok(EnrollOutcome {
            is_waitlist: enrollment.status == EnrollmentStatus::Waitlist,
            already_enrolled: false,
            enrollment,
        })
    }

    /// Creates the enrollment's Payment and Invoice when none exists yet.
    async fn ensure_enrollment_charge(&self, enrollment: &Enrollment, class_name: &str) -> Result<()> {
        if self.payment_repo.exists_for_enrollment(enrollment.id).await? {
            return Ok(());
        }

        self.payment_service
            .create_charge(
                enrollment.student_id,
                Some(enrollment.id),
                self.enrollment_fee_cents,
                PaymentMethod::CreditCard,
                format!("Enrollment fee: {}", class_name),
            )
            .await?;

        Ok(())
    }

    pub async fn capacity_usage(&self, class_id: Uuid) -> Result<CapacityUsage> {
        let class = self.class_repo.find_by_id(class_id).await?
            .ok_or_else(|| AppError::NotFound("Class not found".to_string()))?;

        let active = self.enrollment_repo.count_active(class_id).await?;
        Ok(CapacityUsage {
            active,
            capacity: class.capacity,
            available: (class.capacity - active).max(0),
        })
    }

    /// Direct status overwrite for admin and instructor flows. Cancelling
    /// an Active enrollment frees a seat; the oldest waitlisted enrollment
    /// is promoted into it and gets its own billing obligation.
    pub async fn update_enrollment_status(
        &self,
        enrollment_id: Uuid,
        status: EnrollmentStatus,
    ) -> Result<Enrollment> {
        let current = self.enrollment_repo.find_by_id(enrollment_id).await?
            .ok_or_else(|| AppError::NotFound("Enrollment not found".to_string()))?;

        let updated = self.enrollment_repo.update_status(enrollment_id, status).await?;

        let freed_seat = current.status == EnrollmentStatus::Active
            && status == EnrollmentStatus::Cancelled;
        if freed_seat {
            self.promote_from_waitlist(current.class_id).await?;
        }

        Ok(updated)
    }

    async fn promote_from_waitlist(&self, class_id: Uuid) -> Result<()> {
        let class = self.class_repo.find_by_id(class_id).await?
            .ok_or_else(|| AppError::NotFound("Class not found".to_string()))?;

        let Some(promoted) = self
            .enrollment_repo
            .promote_oldest_waitlisted(class_id, class.capacity)
            .await?
        else {
            return Ok(());
        };

        self.ensure_enrollment_charge(&promoted, &class.name).await?;

        tracing::info!(
            enrollment_id = %promoted.id,
            class_id = %class_id,
            "promoted waitlisted enrollment"
        );

        Ok(())
    }

    /// Billing gate input for one enrollment: its most recent payment and
    /// that payment's invoice, run through the resolver.
    pub async fn payment_status_for_enrollment(
        &self,
        enrollment_id: Uuid,
    ) -> Result<billing::BillingResolution> {
        let payment = self.payment_repo.latest_for_enrollment(enrollment_id).await?;
        let invoice = match &payment {
            Some(p) => self.payment_repo.invoice_for_payment(p.id).await?,
            None => None,
        };

        Ok(billing::resolve(payment.as_ref(), invoice.as_ref(), Utc::now()))
    }

    /// Physical check-in. Hard-gated on billing: anything other than a
    /// Paid resolution is rejected with PaymentRequired.
    pub async fn record_check_in(
        &self,
        enrollment_id: Uuid,
        session_id: Option<Uuid>,
    ) -> Result<Attendance> {
        let enrollment = self.enrollment_repo.find_by_id(enrollment_id).await?
            .ok_or_else(|| AppError::NotFound("Enrollment not found".to_string()))?;

        let resolution = self.payment_status_for_enrollment(enrollment.id).await?;
        if resolution.status != BillingStatus::Paid {
            return Err(AppError::PaymentRequired(format!(
                "Check-in blocked: {}",
                resolution.label
            )));
        }

        let attendance = Attendance {
            id: Uuid::new_v4(),
            enrollment_id,
            session_id,
            checked_in_at: Utc::now(),
        };

        self.enrollment_repo.record_check_in(attendance).await
    }
}
