//! Loans repository for database operations

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};

use crate::{
    error::AppResult,
    models::{
        book::Book,
        loan::{CreateLoan, Loan, LoanDetails, LoanStatus},
        user::User,
    },
};

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List all loans with their user and book embedded
    pub async fn list_with_relations(&self) -> AppResult<Vec<LoanDetails>> {
        let rows = sqlx::query(
            r#"
            SELECT l.id, l.user_id, l.book_id, l.loan_date, l.due_date,
                   l.return_date, l.status,
                   u.name AS user_name, u.email AS user_email, u.role AS user_role,
                   b.title AS book_title, b.author AS book_author, b.isbn AS book_isbn,
                   b.description AS book_description, b.status AS book_status
            FROM loans l
            JOIN users u ON l.user_id = u.id
            JOIN books b ON l.book_id = b.id
            ORDER BY l.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut result = Vec::with_capacity(rows.len());
        for row in rows {
            let user_id: i32 = row.try_get("user_id")?;
            let book_id: i32 = row.try_get("book_id")?;

            result.push(LoanDetails {
                id: row.try_get("id")?,
                user_id,
                book_id,
                loan_date: row.try_get("loan_date")?,
                due_date: row.try_get("due_date")?,
                return_date: row.try_get("return_date")?,
                status: row.try_get("status")?,
                user: User {
                    id: user_id,
                    name: row.try_get("user_name")?,
                    email: row.try_get("user_email")?,
                    role: row.try_get("user_role")?,
                },
                book: Book {
                    id: book_id,
                    title: row.try_get("book_title")?,
                    author: row.try_get("book_author")?,
                    isbn: row.try_get("book_isbn")?,
                    description: row.try_get("book_description")?,
                    status: row.try_get("book_status")?,
                },
            });
        }

        Ok(result)
    }

    /// Insert a new loan with the given loan date and status `active`
    pub async fn create(&self, loan: &CreateLoan, loan_date: DateTime<Utc>) -> AppResult<Loan> {
        let created = sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO loans (user_id, book_id, loan_date, due_date)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(loan.user_id)
        .bind(loan.book_id)
        .bind(loan_date)
        .bind(loan.due_date)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    /// Stamp a loan returned. Re-stamps an already returned loan.
    pub async fn mark_returned(
        &self,
        id: i32,
        return_date: DateTime<Utc>,
    ) -> AppResult<Loan> {
        let returned = sqlx::query_as::<_, Loan>(
            r#"
            UPDATE loans
            SET return_date = $2, status = $3
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(return_date)
        .bind(LoanStatus::Returned)
        .fetch_one(&self.pool)
        .await?;

        Ok(returned)
    }

    /// Delete a loan row. Leaves the referenced book untouched.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        sqlx::query_scalar::<_, i32>("DELETE FROM loans WHERE id = $1 RETURNING id")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(())
    }
}
