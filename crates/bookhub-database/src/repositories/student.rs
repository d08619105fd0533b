//! Student repository implementation.

use sqlx::PgPool;
use uuid::Uuid;

use bookhub_core::error::{AppError, ErrorKind};
use bookhub_core::result::AppResult;
use bookhub_entity::student::Student;

/// Repository for student and guardianship reads.
#[derive(Debug, Clone)]
pub struct StudentRepository {
    pool: PgPool,
}

impl StudentRepository {
    /// Create a new student repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a student by ID.
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Student>> {
        sqlx::query_as::<_, Student>("SELECT * FROM students WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find student", e))
    }

    /// Find a student by ID or fail with NotFound.
    pub async fn get(&self, id: Uuid) -> AppResult<Student> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Student {id} not found")))
    }

    /// Whether `guardian_user_id` is a linked guardian of the student.
    pub async fn is_guardian_of(&self, guardian_user_id: Uuid, student_id: Uuid) -> AppResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM guardian_links \
             WHERE guardian_user_id = $1 AND student_id = $2",
        )
        .bind(guardian_user_id)
        .bind(student_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to check guardian link", e)
        })?;
        Ok(count > 0)
    }
}
