use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use wodbook::{
    config::Settings,
    domain::{
        ClassSession, PlanBilling, PlanOption, PlanStatus, ResolveStudentRequest, Student,
        StudentPlan, TrainingClass,
    },
    service::ServiceContext,
};

pub async fn setup() -> anyhow::Result<(SqlitePool, Arc<ServiceContext>)> {
    let pool = SqlitePool::connect(":memory:").await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let settings = Settings::default();
    let ctx = Arc::new(ServiceContext::new(pool.clone(), &settings));
    Ok((pool, ctx))
}

pub async fn create_student(ctx: &ServiceContext, name: &str) -> anyhow::Result<Student> {
    let student = ctx
        .student_repo
        .create(ResolveStudentRequest {
            subject: format!("auth0|{}", Uuid::new_v4()),
            display_name: name.to_string(),
            email: None,
        })
        .await?;
    Ok(student)
}

pub async fn create_class(ctx: &ServiceContext, name: &str, capacity: i64) -> anyhow::Result<TrainingClass> {
    let now = Utc::now();
    let class = ctx
        .class_repo
        .create(TrainingClass {
            id: Uuid::new_v4(),
            name: name.to_string(),
            capacity,
            location: None,
            created_at: now,
            updated_at: now,
        })
        .await?;
    Ok(class)
}

pub async fn create_session_at(
    ctx: &ServiceContext,
    class_id: Uuid,
    start: DateTime<Utc>,
) -> anyhow::Result<ClassSession> {
    let now = Utc::now();
    let session = ctx
        .class_repo
        .create_session(ClassSession {
            id: Uuid::new_v4(),
            class_id,
            start_time: start,
            end_time: start + Duration::hours(1),
            capacity: None,
            location: None,
            created_at: now,
            updated_at: now,
        })
        .await?;
    Ok(session)
}

/// Puts the student on an active plan allowing `weekly_classes` per week.
pub async fn assign_plan(
    ctx: &ServiceContext,
    student_id: Uuid,
    weekly_classes: i64,
) -> anyhow::Result<StudentPlan> {
    let now = Utc::now();
    let option = ctx
        .plan_repo
        .create_option(PlanOption {
            id: Uuid::new_v4(),
            name: format!("{}x weekly", weekly_classes),
            weekly_classes,
            duration_months: 12,
            price_monthly_cents: 8900,
            price_upfront_cents: 89000,
            created_at: now,
            updated_at: now,
        })
        .await?;

    let plan = ctx
        .plan_repo
        .assign_plan(StudentPlan {
            id: Uuid::new_v4(),
            student_id,
            plan_option_id: option.id,
            billing: PlanBilling::Recurring,
            status: PlanStatus::Active,
            started_at: now,
            created_at: now,
            updated_at: now,
        })
        .await?;
    Ok(plan)
}
