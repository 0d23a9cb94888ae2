//! Loan lifecycle service
//!
//! Coordinates the two-step state change between a loan and its book. The two
//! writes on checkout and return are issued sequentially, outside any
//! transaction: a failure between them leaves the book and loan statuses
//! diverged, and two concurrent checkouts of the same book both succeed.

use chrono::Utc;

use crate::{
    error::AppResult,
    models::{
        book::BookStatus,
        loan::{CreateLoan, Loan, LoanDetails},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
}

impl LoansService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// List all loans with their user and book embedded
    pub async fn list_loans(&self) -> AppResult<Vec<LoanDetails>> {
        self.repository.loans.list_with_relations().await
    }

    /// Create a new loan (check out a book).
    ///
    /// Flips the book to `loaned` first, then inserts the loan row with
    /// `loan_date = now` and status `active`. The book's current availability
    /// is not checked. If the insert fails the book stays `loaned` with no
    /// loan row.
    pub async fn create_loan(&self, loan: CreateLoan) -> AppResult<Loan> {
        self.repository
            .books
            .set_status(loan.book_id, BookStatus::Loaned)
            .await?;

        let created = self.repository.loans.create(&loan, Utc::now()).await?;

        tracing::info!(
            loan_id = created.id,
            book_id = created.book_id,
            user_id = created.user_id,
            "Loan created"
        );

        Ok(created)
    }

    /// Return a loan.
    ///
    /// Stamps the loan `returned` with `return_date = now`, then flips the
    /// book back to `available`. The loan's prior status is not checked, so
    /// re-returning simply re-stamps the return date. If the book update
    /// fails the loan stays `returned` while the book remains `loaned`.
    pub async fn return_loan(&self, loan_id: i32) -> AppResult<Loan> {
        let loan = self
            .repository
            .loans
            .mark_returned(loan_id, Utc::now())
            .await?;

        self.repository
            .books
            .set_status(loan.book_id, BookStatus::Available)
            .await?;

        tracing::info!(loan_id = loan.id, book_id = loan.book_id, "Loan returned");

        Ok(loan)
    }

    /// Delete a loan row outright. The book's status is left as-is, even when
    /// this was the loan that marked it `loaned`.
    pub async fn delete_loan(&self, loan_id: i32) -> AppResult<()> {
        self.repository.loans.delete(loan_id).await
    }
}
