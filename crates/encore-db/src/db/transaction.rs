//! Database transaction utilities
//!
//! Multi-statement writes that must land together (or not at all) run inside a
//! `TransactionGuard`.

use anyhow::{Context, Result};
use sqlx::{PgConnection, PgPool, Postgres, Transaction};

/// A database transaction wrapper with explicit commit/rollback.
///
/// # Example
///
/// ```ignore
/// use encore_db::db::transaction::TransactionGuard;
///
/// async fn example(pool: &sqlx::PgPool) -> anyhow::Result<()> {
///     let mut tx = TransactionGuard::begin(pool).await?;
///     sqlx::query("DELETE FROM ...").execute(tx.conn()?).await?;
///     tx.commit().await?;
///     Ok(())
/// }
/// ```
pub struct TransactionGuard<'a> {
    transaction: Option<Transaction<'a, Postgres>>,
}

impl<'a> TransactionGuard<'a> {
    /// Begin a new database transaction
    pub async fn begin(pool: &'a PgPool) -> Result<Self> {
        let transaction = pool
            .begin()
            .await
            .context("Failed to begin database transaction")?;

        Ok(Self {
            transaction: Some(transaction),
        })
    }

    /// Connection to run statements on inside this transaction
    pub fn conn(&mut self) -> Result<&mut PgConnection> {
        self.transaction
            .as_deref_mut()
            .context("Transaction was already committed or rolled back")
    }

    /// Commit the transaction
    pub async fn commit(mut self) -> Result<()> {
        if let Some(tx) = self.transaction.take() {
            tx.commit()
                .await
                .context("Failed to commit database transaction")?;
        }
        Ok(())
    }

    /// Rollback the transaction
    pub async fn rollback(mut self) -> Result<()> {
        if let Some(tx) = self.transaction.take() {
            tx.rollback()
                .await
                .context("Failed to rollback database transaction")?;
        }
        Ok(())
    }
}

impl Drop for TransactionGuard<'_> {
    fn drop(&mut self) {
        // sqlx rolls back a dropped transaction when its connection returns to the pool
        if self.transaction.is_some() {
            tracing::warn!(
                "Transaction was dropped without explicit commit or rollback - rolling back"
            );
        }
    }
}
