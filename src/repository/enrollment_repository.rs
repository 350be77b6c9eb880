use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{Attendance, Enrollment, EnrollmentStatus},
    error::{AppError, Result},
    repository::EnrollmentRepository,
};

#[derive(FromRow)]
struct EnrollmentRow {
    id: String,
    student_id: String,
    class_id: String,
    status: String,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

#[derive(FromRow)]
struct AttendanceRow {
    id: String,
    enrollment_id: String,
    session_id: Option<String>,
    checked_in_at: NaiveDateTime,
}

pub struct SqliteEnrollmentRepository {
    pool: SqlitePool,
}

impl SqliteEnrollmentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_enrollment(row: EnrollmentRow) -> Result<Enrollment> {
        Ok(Enrollment {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            student_id: Uuid::parse_str(&row.student_id).map_err(|e| AppError::Database(e.to_string()))?,
            class_id: Uuid::parse_str(&row.class_id).map_err(|e| AppError::Database(e.to_string()))?,
            status: Self::parse_status(&row.status)?,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }

    fn row_to_attendance(row: AttendanceRow) -> Result<Attendance> {
        let session_id = match row.session_id {
            Some(s) => Some(Uuid::parse_str(&s).map_err(|e| AppError::Database(e.to_string()))?),
            None => None,
        };
        Ok(Attendance {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            enrollment_id: Uuid::parse_str(&row.enrollment_id).map_err(|e| AppError::Database(e.to_string()))?,
            session_id,
            checked_in_at: DateTime::from_naive_utc_and_offset(row.checked_in_at, Utc),
        })
    }

    fn parse_status(s: &str) -> Result<EnrollmentStatus> {
        match s {
            "Active" => Ok(EnrollmentStatus::Active),
            "Waitlist" => Ok(EnrollmentStatus::Waitlist),
            "Cancelled" => Ok(EnrollmentStatus::Cancelled),
            _ => Err(AppError::Database(format!("Invalid enrollment status: {}", s))),
        }
    }

    fn status_to_str(status: &EnrollmentStatus) -> &'static str {
        match status {
            EnrollmentStatus::Active => "Active",
            EnrollmentStatus::Waitlist => "Waitlist",
            EnrollmentStatus::Cancelled => "Cancelled",
        }
    }
}

#[async_trait]
impl EnrollmentRepository for SqliteEnrollmentRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Enrollment>> {
        let id_str = id.to_string();
        let row = sqlx::query_as::<_, EnrollmentRow>(
            r#"
            SELECT id, student_id, class_id, status, created_at, updated_at
            FROM enrollments
            WHERE id = ?
            "#,
        )
        .bind(id_str)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_enrollment(r)?)),
            None => Ok(None),
        }
    }

    async fn find_live(&self, student_id: Uuid, class_id: Uuid) -> Result<Option<Enrollment>> {
        let row = sqlx::query_as::<_, EnrollmentRow>(
            r#"
            SELECT id, student_id, class_id, status, created_at, updated_at
            FROM enrollments
            WHERE student_id = ? AND class_id = ? AND status != 'Cancelled'
            "#,
        )
        .bind(student_id.to_string())
        .bind(class_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_enrollment(r)?)),
            None => Ok(None),
        }
    }

    async fn count_active(&self, class_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM enrollments
            WHERE class_id = ? AND status = 'Active'
            "#,
        )
        .bind(class_id.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(count)
    }

    async fn create_with_capacity_check(
        &self,
        student_id: Uuid,
        class_id: Uuid,
        capacity: i64,
    ) -> Result<Enrollment> {
        let id = Uuid::new_v4();
        let class_id_str = class_id.to_string();
        let now = Utc::now().naive_utc();

        // The count and the insert share one transaction, so two racing
        // enrollments cannot both observe a free seat.
        let mut tx = self.pool.begin().await.map_err(|e| AppError::Database(e.to_string()))?;

        let active: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM enrollments
            WHERE class_id = ? AND status = 'Active'
            "#,
        )
        .bind(&class_id_str)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let status = if active >= capacity {
            EnrollmentStatus::Waitlist
        } else {
            EnrollmentStatus::Active
        };

        let insert = sqlx::query(
            r#"
            INSERT INTO enrollments (id, student_id, class_id, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(student_id.to_string())
        .bind(&class_id_str)
        .bind(Self::status_to_str(&status))
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await;

        if let Err(e) = insert {
            drop(tx);
            // A racing enrollment for the same student landed first and the
            // live-row unique index rejected ours. Hand back theirs.
            if matches!(&e, sqlx::Error::Database(db) if db.is_unique_violation()) {
                return self.find_live(student_id, class_id).await?.ok_or_else(|| {
                    AppError::Database("Failed to retrieve created enrollment".to_string())
                });
            }
            return Err(AppError::Database(e.to_string()));
        }

        tx.commit().await.map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created enrollment".to_string())
        })
    }

    async fn update_status(&self, id: Uuid, status: EnrollmentStatus) -> Result<Enrollment> {
        let id_str = id.to_string();
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            UPDATE enrollments
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

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::NotFound("Enrollment not found".to_string())
        })
    }

    async fn list_for_class(&self, class_id: Uuid) -> Result<Vec<Enrollment>> {
        let rows = sqlx::query_as::<_, EnrollmentRow>(
            r#"
            SELECT id, student_id, class_id, status, created_at, updated_at
            FROM enrollments
            WHERE class_id = ? AND status != 'Cancelled'
            ORDER BY created_at
            "#,
        )
        .bind(class_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(Self::row_to_enrollment).collect()
    }

    async fn promote_oldest_waitlisted(
        &self,
        class_id: Uuid,
        capacity: i64,
    ) -> Result<Option<Enrollment>> {
        let class_id_str = class_id.to_string();
        let now = Utc::now().naive_utc();

        // The seat check and the promotion share one transaction, so a
        // racing enrollment cannot fill the seat between the two.
        let mut tx = self.pool.begin().await.map_err(|e| AppError::Database(e.to_string()))?;

        let active: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM enrollments
            WHERE class_id = ? AND status = 'Active'
            "#,
        )
        .bind(&class_id_str)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        if active >= capacity {
            return Ok(None);
        }

        let row = sqlx::query_as::<_, EnrollmentRow>(
            r#"
            SELECT id, student_id, class_id, status, created_at, updated_at
            FROM enrollments
            WHERE class_id = ? AND status = 'Waitlist'
            ORDER BY created_at
            LIMIT 1
            "#,
        )
        .bind(&class_id_str)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        sqlx::query(
            r#"
            UPDATE enrollments
            SET status = 'Active', updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(now)
        .bind(&row.id)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        tx.commit().await.map_err(|e| AppError::Database(e.to_string()))?;

        let id = Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?;
        match self.find_by_id(id).await? {
            Some(e) => Ok(Some(e)),
            None => Err(AppError::Database(
                "Failed to retrieve promoted enrollment".to_string(),
            )),
        }
    }

    async fn record_check_in(&self, attendance: Attendance) -> Result<Attendance> {
        let id_str = attendance.id.to_string();
        let session_id_str = attendance.session_id.map(|id| id.to_string());

        sqlx::query(
            r#"
            INSERT INTO attendance (id, enrollment_id, session_id, checked_in_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&id_str)
        .bind(attendance.enrollment_id.to_string())
        .bind(&session_id_str)
        .bind(attendance.checked_in_at.naive_utc())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(attendance)
    }

    async fn latest_attendance(&self, enrollment_id: Uuid) -> Result<Option<Attendance>> {
        let row = sqlx::query_as::<_, AttendanceRow>(
            r#"
            SELECT id, enrollment_id, session_id, checked_in_at
            FROM attendance
            WHERE enrollment_id = ?
            ORDER BY checked_in_at DESC
            LIMIT 1
            "#,
        )
        .bind(enrollment_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_attendance(r)?)),
            None => Ok(None),
        }
    }
}
