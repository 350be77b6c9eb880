use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{PlanBilling, PlanOption, PlanStatus, StudentPlan},
    error::{AppError, Result},
    repository::PlanRepository,
};

#[derive(FromRow)]
struct PlanOptionRow {
    id: String,
    name: String,
    weekly_classes: i64,
    duration_months: i64,
    price_monthly_cents: i64,
    price_upfront_cents: i64,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

#[derive(FromRow)]
struct StudentPlanRow {
    id: String,
    student_id: String,
    plan_option_id: String,
    billing: String,
    status: String,
    started_at: NaiveDateTime,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

pub struct SqlitePlanRepository {
    pool: SqlitePool,
}

impl SqlitePlanRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_option(row: PlanOptionRow) -> Result<PlanOption> {
        Ok(PlanOption {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            name: row.name,
            weekly_classes: row.weekly_classes,
            duration_months: row.duration_months,
            price_monthly_cents: row.price_monthly_cents,
            price_upfront_cents: row.price_upfront_cents,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }

    fn row_to_plan(row: StudentPlanRow) -> Result<StudentPlan> {
        Ok(StudentPlan {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            student_id: Uuid::parse_str(&row.student_id).map_err(|e| AppError::Database(e.to_string()))?,
            plan_option_id: Uuid::parse_str(&row.plan_option_id).map_err(|e| AppError::Database(e.to_string()))?,
            billing: Self::parse_billing(&row.billing)?,
            status: Self::parse_status(&row.status)?,
            started_at: DateTime::from_naive_utc_and_offset(row.started_at, Utc),
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }

    fn parse_billing(s: &str) -> Result<PlanBilling> {
        match s {
            "Upfront" => Ok(PlanBilling::Upfront),
            "Recurring" => Ok(PlanBilling::Recurring),
            _ => Err(AppError::Database(format!("Invalid plan billing: {}", s))),
        }
    }

    fn billing_to_str(billing: &PlanBilling) -> &'static str {
        match billing {
            PlanBilling::Upfront => "Upfront",
            PlanBilling::Recurring => "Recurring",
        }
    }

    fn parse_status(s: &str) -> Result<PlanStatus> {
        match s {
            "Active" => Ok(PlanStatus::Active),
            "Expired" => Ok(PlanStatus::Expired),
            "Paused" => Ok(PlanStatus::Paused),
            _ => Err(AppError::Database(format!("Invalid plan status: {}", s))),
        }
    }

    fn status_to_str(status: &PlanStatus) -> &'static str {
        match status {
            PlanStatus::Active => "Active",
            PlanStatus::Expired => "Expired",
            PlanStatus::Paused => "Paused",
        }
    }
}

#[async_trait]
impl PlanRepository for SqlitePlanRepository {
    async fn create_option(&self, option: PlanOption) -> Result<PlanOption> {
        let id_str = option.id.to_string();
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO plan_options (
                id, name, weekly_classes, duration_months,
                price_monthly_cents, price_upfront_cents, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id_str)
        .bind(&option.name)
        .bind(option.weekly_classes)
        .bind(option.duration_months)
        .bind(option.price_monthly_cents)
        .bind(option.price_upfront_cents)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_option(option.id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created plan option".to_string())
        })
    }

    async fn find_option(&self, id: Uuid) -> Result<Option<PlanOption>> {
        let row = sqlx::query_as::<_, PlanOptionRow>(
            r#"
            SELECT id, name, weekly_classes, duration_months,
                   price_monthly_cents, price_upfront_cents, created_at, updated_at
            FROM plan_options
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_option(r)?)),
            None => Ok(None),
        }
    }

    async fn list_options(&self) -> Result<Vec<PlanOption>> {
        let rows = sqlx::query_as::<_, PlanOptionRow>(
            r#"
            SELECT id, name, weekly_classes, duration_months,
                   price_monthly_cents, price_upfront_cents, created_at, updated_at
            FROM plan_options
            ORDER BY weekly_classes
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(Self::row_to_option).collect()
    }

    async fn assign_plan(&self, plan: StudentPlan) -> Result<StudentPlan> {
        let student_id_str = plan.student_id.to_string();
        let now = Utc::now().naive_utc();

        // Expiring the previous active plan and inserting the new one must
        // be atomic or the one-active-plan index rejects the insert.
        let mut tx = self.pool.begin().await.map_err(|e| AppError::Database(e.to_string()))?;

        sqlx::query(
            r#"
            UPDATE student_plans
            SET status = 'Expired', updated_at = ?
            WHERE student_id = ? AND status = 'Active'
            "#,
        )
        .bind(now)
        .bind(&student_id_str)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO student_plans (
                id, student_id, plan_option_id, billing, status,
                started_at, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(plan.id.to_string())
        .bind(&student_id_str)
        .bind(plan.plan_option_id.to_string())
        .bind(Self::billing_to_str(&plan.billing))
        .bind(Self::status_to_str(&plan.status))
        .bind(plan.started_at.naive_utc())
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        tx.commit().await.map_err(|e| AppError::Database(e.to_string()))?;

        Ok(plan)
    }

    async fn active_plan(&self, student_id: Uuid) -> Result<Option<StudentPlan>> {
        let row = sqlx::query_as::<_, StudentPlanRow>(
            r#"
            SELECT id, student_id, plan_option_id, billing, status,
                   started_at, created_at, updated_at
            FROM student_plans
            WHERE student_id = ? AND status = 'Active'
            "#,
        )
        .bind(student_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_plan(r)?)),
            None => Ok(None),
        }
    }

    async fn update_plan_status(&self, id: Uuid, status: PlanStatus) -> Result<StudentPlan> {
        let id_str = id.to_string();
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            UPDATE student_plans
            SET status = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(Self::status_to_str(&status))
        .bind(now)
        .bind(&id_str)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let row = sqlx::query_as::<_, StudentPlanRow>(
            r#"
            SELECT id, student_id, plan_option_id, billing, status,
                   started_at, created_at, updated_at
            FROM student_plans
            WHERE id = ?
            "#,
        )
        .bind(&id_str)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Self::row_to_plan(r),
            None => Err(AppError::NotFound("Student plan not found".to_string())),
        }
    }
}
