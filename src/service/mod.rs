pub mod billing;
pub mod enrollment_service;
pub mod payment_service;
pub mod quota_service;
pub mod roster;

use std::sync::Arc;
use sqlx::SqlitePool;

use crate::config::Settings;
use crate::repository::*;

pub use billing::BillingResolution;
pub use enrollment_service::{EnrollOutcome, EnrollmentService};
pub use payment_service::PaymentService;
pub use quota_service::{week_start, QuotaService};
pub use roster::RosterService;

pub struct ServiceContext {
    pub student_repo: Arc<dyn StudentRepository>,
    pub class_repo: Arc<dyn ClassRepository>,
    pub enrollment_repo: Arc<dyn EnrollmentRepository>,
    pub plan_repo: Arc<dyn PlanRepository>,
    pub booking_repo: Arc<dyn BookingRepository>,
    pub payment_repo: Arc<dyn PaymentRepository>,
    pub enrollment_service: Arc<EnrollmentService>,
    pub quota_service: Arc<QuotaService>,
    pub payment_service: Arc<PaymentService>,
    pub roster_service: Arc<RosterService>,
    pub db_pool: SqlitePool,
}

impl ServiceContext {
    pub fn new(db_pool: SqlitePool, settings: &Settings) -> Self {
        let student_repo: Arc<dyn StudentRepository> =
            Arc::new(SqliteStudentRepository::new(db_pool.clone()));
        let class_repo: Arc<dyn ClassRepository> =
            Arc::new(SqliteClassRepository::new(db_pool.clone()));
        let enrollment_repo: Arc<dyn EnrollmentRepository> =
            Arc::new(SqliteEnrollmentRepository::new(db_pool.clone()));
        let plan_repo: Arc<dyn PlanRepository> =
            Arc::new(SqlitePlanRepository::new(db_pool.clone()));
        let booking_repo: Arc<dyn BookingRepository> =
            Arc::new(SqliteBookingRepository::new(db_pool.clone()));
        let payment_repo: Arc<dyn PaymentRepository> =
            Arc::new(SqlitePaymentRepository::new(db_pool.clone()));

        let payment_service = Arc::new(PaymentService::new(
            payment_repo.clone(),
            enrollment_repo.clone(),
            settings.billing.clone(),
            settings.server.base_url.clone(),
        ));

        let enrollment_service = Arc::new(EnrollmentService::new(
            enrollment_repo.clone(),
            class_repo.clone(),
            payment_repo.clone(),
            payment_service.clone(),
            settings.billing.enrollment_fee_cents,
        ));

        let quota_service = Arc::new(QuotaService::new(
            booking_repo.clone(),
            plan_repo.clone(),
            class_repo.clone(),
        ));

        let roster_service = Arc::new(RosterService::new(
            enrollment_repo.clone(),
            student_repo.clone(),
            payment_repo.clone(),
        ));

        Self {
            student_repo,
            class_repo,
            enrollment_repo,
            plan_repo,
            booking_repo,
            payment_repo,
            enrollment_service,
            quota_service,
            payment_service,
            roster_service,
            db_pool,
        }
    }
}
