//! Notes on contacts.

use sqlx::PgPool;

use raze_core::Email;

use super::RepositoryError;
use crate::models::note::ContactNote;

/// Repository for `admin.contact_note`.
pub struct NoteRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> NoteRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Notes on an address, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn for_email(&self, email: &Email) -> Result<Vec<ContactNote>, RepositoryError> {
        let rows = sqlx::query_as::<_, ContactNote>(
            "SELECT id, email, note, author_email, created_at FROM admin.contact_note \
             WHERE lower(email) = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(email.as_str())
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Add a note.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        email: &Email,
        note: &str,
        author: &Email,
    ) -> Result<ContactNote, RepositoryError> {
        let row = sqlx::query_as::<_, ContactNote>(
            "INSERT INTO admin.contact_note (email, note, author_email) VALUES ($1, $2, $3) \
             RETURNING id, email, note, author_email, created_at",
        )
        .bind(email.as_str())
        .bind(note)
        .bind(author.as_str())
        .fetch_one(self.pool)
        .await?;
        Ok(row)
    }
}
