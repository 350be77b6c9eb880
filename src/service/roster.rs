use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    domain::RosterEntry,
    error::{AppError, Result},
    repository::{EnrollmentRepository, PaymentRepository, StudentRepository},
    service::billing,
};

/// Read model joining enrollments, students, attendance and the billing
/// gate into the per-class view. Recomputed on every read; fine at UI
/// scale since the repositories index by class and student.
pub struct RosterService {
    enrollment_repo: Arc<dyn EnrollmentRepository>,
    student_repo: Arc<dyn StudentRepository>,
    payment_repo: Arc<dyn PaymentRepository>,
}

impl RosterService {
    pub fn new(
        enrollment_repo: Arc<dyn EnrollmentRepository>,
        student_repo: Arc<dyn StudentRepository>,
        payment_repo: Arc<dyn PaymentRepository>,
    ) -> Self {
        Self { enrollment_repo, student_repo, payment_repo }
    }

    /// Roster entries for one class, in enrollment creation order.
    pub async fn roster_for(&self, class_id: Uuid) -> Result<Vec<RosterEntry>> {
        let enrollments = self.enrollment_repo.list_for_class(class_id).await?;
        let now = Utc::now();

        let mut entries = Vec::with_capacity(enrollments.len());
        for enrollment in enrollments {
            let student = self.student_repo.find_by_id(enrollment.student_id).await?
                .ok_or_else(|| AppError::NotFound("Student not found".to_string()))?;

            let attendance = self.enrollment_repo.latest_attendance(enrollment.id).await?;

            let payment = self.payment_repo.latest_for_enrollment(enrollment.id).await?;
            let invoice = match &payment {
                Some(p) => self.payment_repo.invoice_for_payment(p.id).await?,
                None => None,
            };
            let resolution = billing::resolve(payment.as_ref(), invoice.as_ref(), now);

            entries.push(RosterEntry {
                enrollment,
                student,
                attendance,
                payment_status: resolution.status,
                payment_label: resolution.label,
            });
        }

        Ok(entries)
    }
}
