//! Transaction wrapper with post-commit side effects.
//!
//! A [`UnitOfWork`] owns one database transaction plus a queue of hooks. Hooks are plain futures:
//! they are not polled until [`UnitOfWork::commit`] has succeeded, and they are dropped unpolled
//! if the unit is rolled back, fails to commit, or is simply dropped. Anything that must only
//! happen once the data is durable (sending mail, removing superseded bytes) goes through here.

use crate::PatientResult;
use sqlx::sqlite::{Sqlite, SqliteConnection, SqlitePool};
use sqlx::Transaction;
use std::future::Future;
use std::pin::Pin;

pub type AfterCommitHook = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

pub struct UnitOfWork {
    tx: Transaction<'static, Sqlite>,
    after_commit: Vec<AfterCommitHook>,
}

impl UnitOfWork {
    pub async fn begin(pool: &SqlitePool) -> PatientResult<Self> {
        Ok(Self {
            tx: pool.begin().await?,
            after_commit: Vec::new(),
        })
    }

    /// Connection bound to the open transaction.
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }

    /// Queues `hook` to run after a successful commit, in registration order.
    pub fn after_commit<F>(&mut self, hook: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.after_commit.push(Box::pin(hook));
    }

    pub fn pending_hooks(&self) -> usize {
        self.after_commit.len()
    }

    /// Commits, then runs the queued hooks. Hooks are discarded if the commit fails.
    pub async fn commit(self) -> PatientResult<()> {
        let Self { tx, after_commit } = self;
        tx.commit().await?;
        for hook in after_commit {
            hook.await;
        }
        Ok(())
    }

    /// Rolls back and discards the queued hooks.
    pub async fn rollback(self) -> PatientResult<()> {
        let hooks = self.after_commit.len();
        self.tx.rollback().await?;
        if hooks > 0 {
            tracing::debug!(hooks, "rolled back; after-commit hooks discarded");
        }
        Ok(())
    }
}

impl std::fmt::Debug for UnitOfWork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("pending_hooks", &self.after_commit.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn pool(temp_dir: &TempDir) -> SqlitePool {
        let url = format!("sqlite://{}", temp_dir.path().join("uow.db").display());
        let pool = db::connect(&url, 2).await.unwrap();
        db::migrate(&pool).await.unwrap();
        pool
    }

    async fn file_count(pool: &SqlitePool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM files")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    async fn insert_file(conn: &mut SqliteConnection, key: &str) {
        sqlx::query(
            "INSERT INTO files (id, server_filename, original_filename, storage_path, content_type, size_bytes, sha256, created_at, updated_at)
             VALUES (?, 'f.png', 'f.png', ?, 'image/png', 1, 'x', '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z')",
        )
        .bind(uuid::Uuid::new_v4())
        .bind(key)
        .execute(conn)
        .await
        .unwrap();
    }

    fn counting_hook(counter: &Arc<AtomicUsize>) -> impl Future<Output = ()> + Send + 'static {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_hooks_run_after_commit() {
        let temp_dir = TempDir::new().unwrap();
        let pool = pool(&temp_dir).await;
        let counter = Arc::new(AtomicUsize::new(0));

        let mut uow = UnitOfWork::begin(&pool).await.unwrap();
        insert_file(uow.conn(), "a/b/one.png").await;
        uow.after_commit(counting_hook(&counter));
        uow.after_commit(counting_hook(&counter));

        assert_eq!(uow.pending_hooks(), 2);
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        uow.commit().await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert_eq!(file_count(&pool).await, 1);
    }

    #[tokio::test]
    async fn test_hooks_skipped_on_rollback() {
        let temp_dir = TempDir::new().unwrap();
        let pool = pool(&temp_dir).await;
        let counter = Arc::new(AtomicUsize::new(0));

        let mut uow = UnitOfWork::begin(&pool).await.unwrap();
        insert_file(uow.conn(), "a/b/two.png").await;
        uow.after_commit(counting_hook(&counter));
        uow.rollback().await.unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(file_count(&pool).await, 0);
    }

    #[tokio::test]
    async fn test_hooks_skipped_when_dropped() {
        let temp_dir = TempDir::new().unwrap();
        let pool = pool(&temp_dir).await;
        let counter = Arc::new(AtomicUsize::new(0));

        {
            let mut uow = UnitOfWork::begin(&pool).await.unwrap();
            insert_file(uow.conn(), "a/b/three.png").await;
            uow.after_commit(counting_hook(&counter));
        }

        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(file_count(&pool).await, 0);
    }
}
