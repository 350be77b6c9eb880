use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use crate::domain::*;
use crate::error::Result;

pub mod student_repository;
pub mod class_repository;
pub mod enrollment_repository;
pub mod plan_repository;
pub mod booking_repository;
pub mod payment_repository;

pub use student_repository::SqliteStudentRepository;
pub use class_repository::SqliteClassRepository;
pub use enrollment_repository::SqliteEnrollmentRepository;
pub use plan_repository::SqlitePlanRepository;
pub use booking_repository::SqliteBookingRepository;
pub use payment_repository::SqlitePaymentRepository;

#[async_trait]
pub trait StudentRepository: Send + Sync {
    async fn create(&self, request: ResolveStudentRequest) -> Result<Student>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Student>>;
    async fn find_by_subject(&self, subject: &str) -> Result<Option<Student>>;
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Student>>;
}

#[async_trait]
pub trait ClassRepository: Send + Sync {
    async fn create(&self, class: TrainingClass) -> Result<TrainingClass>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<TrainingClass>>;
    async fn list(&self) -> Result<Vec<TrainingClass>>;
    async fn create_session(&self, session: ClassSession) -> Result<ClassSession>;
    async fn find_session(&self, id: Uuid) -> Result<Option<ClassSession>>;
    async fn list_sessions(&self, class_id: Uuid) -> Result<Vec<ClassSession>>;
}

#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Enrollment>>;
    /// The one non-cancelled enrollment for (student, class), if any.
    async fn find_live(&self, student_id: Uuid, class_id: Uuid) -> Result<Option<Enrollment>>;
    async fn count_active(&self, class_id: Uuid) -> Result<i64>;
    /// Counts active seats and inserts in one transaction so two racing
    /// enrollments cannot both take the last seat. Returns the created
    /// enrollment with Active or Waitlist already decided.
    async fn create_with_capacity_check(
        &self,
        student_id: Uuid,
        class_id: Uuid,
        capacity: i64,
    ) -> Result<Enrollment>;
    async fn update_status(&self, id: Uuid, status: EnrollmentStatus) -> Result<Enrollment>;
    /// Non-cancelled enrollments for a class, in creation order.
    async fn list_for_class(&self, class_id: Uuid) -> Result<Vec<Enrollment>>;
    /// Promotes the oldest waitlisted enrollment (FIFO by created_at) to
    /// Active, but only when a seat is free. The seat check and the
    /// promotion share one transaction so a racing enrollment cannot fill
    /// the seat between the two. Returns None when the class is full or
    /// nobody is waiting.
    async fn promote_oldest_waitlisted(&self, class_id: Uuid, capacity: i64) -> Result<Option<Enrollment>>;
    async fn record_check_in(&self, attendance: Attendance) -> Result<Attendance>;
    async fn latest_attendance(&self, enrollment_id: Uuid) -> Result<Option<Attendance>>;
}

#[async_trait]
pub trait PlanRepository: Send + Sync {
    async fn create_option(&self, option: PlanOption) -> Result<PlanOption>;
    async fn find_option(&self, id: Uuid) -> Result<Option<PlanOption>>;
    async fn list_options(&self) -> Result<Vec<PlanOption>>;
    /// Inserts the new plan and expires any previously active plan for the
    /// student in the same transaction.
    async fn assign_plan(&self, plan: StudentPlan) -> Result<StudentPlan>;
    async fn active_plan(&self, student_id: Uuid) -> Result<Option<StudentPlan>>;
    async fn update_plan_status(&self, id: Uuid, status: PlanStatus) -> Result<StudentPlan>;
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<SessionBooking>>;
    async fn find_live(&self, student_id: Uuid, session_id: Uuid) -> Result<Option<SessionBooking>>;
    async fn booked_count_for_week(&self, student_id: Uuid, week_start: DateTime<Utc>) -> Result<i64>;
    async fn reinstated_for_week(&self, student_id: Uuid, week_start: DateTime<Utc>) -> Result<i64>;
    /// Counts the week's consumption and inserts in one transaction so two
    /// racing bookings cannot both take the last quota slot.
    async fn create_with_quota_check(&self, booking: SessionBooking, limit: i64) -> Result<SessionBooking>;
    async fn cancel(&self, id: Uuid) -> Result<SessionBooking>;
    async fn create_reinstatement(&self, credit: CreditReinstatement) -> Result<CreditReinstatement>;
}

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn create_payment(&self, payment: Payment) -> Result<Payment>;
    async fn find_payment(&self, id: Uuid) -> Result<Option<Payment>>;
    async fn latest_for_enrollment(&self, enrollment_id: Uuid) -> Result<Option<Payment>>;
    async fn exists_for_enrollment(&self, enrollment_id: Uuid) -> Result<bool>;
    async fn list_pending_for_student(&self, student_id: Uuid) -> Result<Vec<Payment>>;

    async fn create_invoice(&self, invoice: Invoice) -> Result<Invoice>;
    async fn invoice_for_payment(&self, payment_id: Uuid) -> Result<Option<Invoice>>;

    async fn create_intent(&self, intent: PaymentIntent) -> Result<PaymentIntent>;
    async fn find_intent(&self, id: Uuid) -> Result<Option<PaymentIntent>>;
    /// The live (neither succeeded nor canceled) intent for a payment.
    async fn live_intent_for_payment(&self, payment_id: Uuid) -> Result<Option<PaymentIntent>>;
    async fn update_intent_status(&self, id: Uuid, status: IntentStatus) -> Result<PaymentIntent>;

    async fn create_session(&self, session: PaymentSession) -> Result<PaymentSession>;
    async fn find_session(&self, id: Uuid) -> Result<Option<PaymentSession>>;
    /// Claims an Open session and applies the webhook's payment-side
    /// effects in the same transaction: the session only leaves Open when
    /// the intent, payment, invoice and settlement records commit with it.
    /// On success, `settlement` carries the Receipt and Settlement to mint;
    /// on failure, `failure_reason` annotates the payment and `invoice_note`
    /// the reopened invoice. Paid stays terminal throughout. Returns false
    /// when the session was already resolved, which is how duplicate
    /// webhook deliveries are absorbed.
    #[allow(clippy::too_many_arguments)]
    async fn resolve_session(
        &self,
        session_id: Uuid,
        intent_id: Uuid,
        payment_id: Uuid,
        outcome: WebhookOutcome,
        failure_reason: Option<&str>,
        invoice_note: Option<&str>,
        settlement: Option<(Receipt, Settlement)>,
    ) -> Result<bool>;
    /// Marks Open sessions past their expiry as Expired; returns how many.
    async fn expire_open_sessions(&self, now: DateTime<Utc>) -> Result<u64>;

    async fn receipts_for_payment(&self, payment_id: Uuid) -> Result<Vec<Receipt>>;
    async fn list_settlements(&self) -> Result<Vec<Settlement>>;
}
