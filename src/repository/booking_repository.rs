use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{BookingStatus, CreditReinstatement, SessionBooking},
    error::{AppError, Result},
    repository::BookingRepository,
};

#[derive(FromRow)]
struct BookingRow {
    id: String,
    student_id: String,
    session_id: String,
    week_start: NaiveDateTime,
    status: String,
    created_at: NaiveDateTime,
}

pub struct SqliteBookingRepository {
    pool: SqlitePool,
}

impl SqliteBookingRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_booking(row: BookingRow) -> Result<SessionBooking> {
        Ok(SessionBooking {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            student_id: Uuid::parse_str(&row.student_id).map_err(|e| AppError::Database(e.to_string()))?,
            session_id: Uuid::parse_str(&row.session_id).map_err(|e| AppError::Database(e.to_string()))?,
            week_start: DateTime::from_naive_utc_and_offset(row.week_start, Utc),
            status: Self::parse_status(&row.status)?,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
        })
    }

    fn parse_status(s: &str) -> Result<BookingStatus> {
        match s {
            "Booked" => Ok(BookingStatus::Booked),
            "Cancelled" => Ok(BookingStatus::Cancelled),
            _ => Err(AppError::Database(format!("Invalid booking status: {}", s))),
        }
    }

    fn status_to_str(status: &BookingStatus) -> &'static str {
        match status {
            BookingStatus::Booked => "Booked",
            BookingStatus::Cancelled => "Cancelled",
        }
    }
}

#[async_trait]
impl BookingRepository for SqliteBookingRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<SessionBooking>> {
        let row = sqlx::query_as::<_, BookingRow>(
            r#"
            SELECT id, student_id, session_id, week_start, status, created_at
            FROM session_bookings
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_booking(r)?)),
            None => Ok(None),
        }
    }

    async fn find_live(&self, student_id: Uuid, session_id: Uuid) -> Result<Option<SessionBooking>> {
        let row = sqlx::query_as::<_, BookingRow>(
            r#"
            SELECT id, student_id, session_id, week_start, status, created_at
            FROM session_bookings
            WHERE student_id = ? AND session_id = ? AND status = 'Booked'
            "#,
        )
        .bind(student_id.to_string())
        .bind(session_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_booking(r)?)),
            None => Ok(None),
        }
    }

    async fn booked_count_for_week(&self, student_id: Uuid, week_start: DateTime<Utc>) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM session_bookings
            WHERE student_id = ? AND week_start = ? AND status = 'Booked'
            "#,
        )
        .bind(student_id.to_string())
        .bind(week_start.naive_utc())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(count)
    }

    async fn reinstated_for_week(&self, student_id: Uuid, week_start: DateTime<Utc>) -> Result<i64> {
        let total: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT SUM(amount) FROM credit_reinstatements
            WHERE student_id = ? AND week_start = ?
            "#,
        )
        .bind(student_id.to_string())
        .bind(week_start.naive_utc())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(total.unwrap_or(0))
    }

    async fn create_with_quota_check(&self, booking: SessionBooking, limit: i64) -> Result<SessionBooking> {
        let student_id_str = booking.student_id.to_string();
        let week_naive = booking.week_start.naive_utc();

        // Consumption count and insert share one transaction so two racing
        // bookings cannot both take the last quota slot.
        let mut tx = self.pool.begin().await.map_err(|e| AppError::Database(e.to_string()))?;

        let booked: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM session_bookings
            WHERE student_id = ? AND week_start = ? AND status = 'Booked'
            "#,
        )
        .bind(&student_id_str)
        .bind(week_naive)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let reinstated: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT SUM(amount) FROM credit_reinstatements
            WHERE student_id = ? AND week_start = ?
            "#,
        )
        .bind(&student_id_str)
        .bind(week_naive)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let used = booked - reinstated.unwrap_or(0);
        if limit - used <= 0 {
            return Err(AppError::QuotaExceeded(format!(
                "Weekly booking limit of {} reached for week starting {}",
                limit,
                booking.week_start.format("%Y-%m-%d")
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO session_bookings (id, student_id, session_id, week_start, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(booking.id.to_string())
        .bind(&student_id_str)
        .bind(booking.session_id.to_string())
        .bind(week_naive)
        .bind(Self::status_to_str(&booking.status))
        .bind(booking.created_at.naive_utc())
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        tx.commit().await.map_err(|e| AppError::Database(e.to_string()))?;

        Ok(booking)
    }

    async fn cancel(&self, id: Uuid) -> Result<SessionBooking> {
        sqlx::query(
            r#"
            UPDATE session_bookings
            SET status = 'Cancelled'
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::NotFound("Session booking not found".to_string())
        })
    }

    async fn create_reinstatement(&self, credit: CreditReinstatement) -> Result<CreditReinstatement> {
        sqlx::query(
            r#"
            INSERT INTO credit_reinstatements (id, student_id, week_start, amount, note, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(credit.id.to_string())
        .bind(credit.student_id.to_string())
        .bind(credit.week_start.naive_utc())
        .bind(credit.amount)
        .bind(&credit.note)
        .bind(credit.created_at.naive_utc())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(credit)
    }
}
