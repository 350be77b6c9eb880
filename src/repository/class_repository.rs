use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{ClassSession, TrainingClass},
    error::{AppError, Result},
    repository::ClassRepository,
};

#[derive(FromRow)]
struct ClassRow {
    id: String,
    name: String,
    capacity: i64,
    location: Option<String>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

#[derive(FromRow)]
struct SessionRow {
    id: String,
    class_id: String,
    start_time: NaiveDateTime,
    end_time: NaiveDateTime,
    capacity: Option<i64>,
    location: Option<String>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

pub struct SqliteClassRepository {
    pool: SqlitePool,
}

impl SqliteClassRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_class(row: ClassRow) -> Result<TrainingClass> {
        Ok(TrainingClass {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            name: row.name,
            capacity: row.capacity,
            location: row.location,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }

    fn row_to_session(row: SessionRow) -> Result<ClassSession> {
        Ok(ClassSession {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            class_id: Uuid::parse_str(&row.class_id).map_err(|e| AppError::Database(e.to_string()))?,
            start_time: DateTime::from_naive_utc_and_offset(row.start_time, Utc),
            end_time: DateTime::from_naive_utc_and_offset(row.end_time, Utc),
            capacity: row.capacity,
            location: row.location,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }
}

#[async_trait]
impl ClassRepository for SqliteClassRepository {
    async fn create(&self, class: TrainingClass) -> Result<TrainingClass> {
        let id_str = class.id.to_string();
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO classes (id, name, capacity, location, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id_str)
        .bind(&class.name)
        .bind(class.capacity)
        .bind(&class.location)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_id(class.id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created class".to_string())
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<TrainingClass>> {
        let id_str = id.to_string();
        let row = sqlx::query_as::<_, ClassRow>(
            r#"
            SELECT id, name, capacity, location, created_at, updated_at
            FROM classes
            WHERE id = ?
            "#,
        )
        .bind(id_str)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_class(r)?)),
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<TrainingClass>> {
        let rows = sqlx::query_as::<_, ClassRow>(
            r#"
            SELECT id, name, capacity, location, created_at, updated_at
            FROM classes
            ORDER BY created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(Self::row_to_class).collect()
    }

    async fn create_session(&self, session: ClassSession) -> Result<ClassSession> {
        let id_str = session.id.to_string();
        let class_id_str = session.class_id.to_string();
        let start_naive = session.start_time.naive_utc();
        let end_naive = session.end_time.naive_utc();
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO class_sessions (
                id, class_id, start_time, end_time, capacity, location,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id_str)
        .bind(&class_id_str)
        .bind(start_naive)
        .bind(end_naive)
        .bind(session.capacity)
        .bind(&session.location)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_session(session.id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created session".to_string())
        })
    }

    async fn find_session(&self, id: Uuid) -> Result<Option<ClassSession>> {
        let id_str = id.to_string();
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT id, class_id, start_time, end_time, capacity, location,
                   created_at, updated_at
            FROM class_sessions
            WHERE id = ?
            "#,
        )
        .bind(id_str)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_session(r)?)),
            None => Ok(None),
        }
    }

    async fn list_sessions(&self, class_id: Uuid) -> Result<Vec<ClassSession>> {
        let class_id_str = class_id.to_string();
        let rows = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT id, class_id, start_time, end_time, capacity, location,
                   created_at, updated_at
            FROM class_sessions
            WHERE class_id = ?
            ORDER BY start_time
            "#,
        )
        .bind(class_id_str)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(Self::row_to_session).collect()
    }
}
