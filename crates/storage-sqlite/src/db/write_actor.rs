//! Single-writer actor for SQLite.
//!
//! SQLite allows one writer at a time; funneling all writes through one
//! actor-owned connection serializes them without lock contention. Jobs run
//! inside an immediate transaction, and the result travels back through a
//! oneshot channel with its type erased in transit.

use std::any::Any;

use diesel::SqliteConnection;
use tokio::sync::{mpsc, oneshot};

use super::DbPool;
use crate::errors::StorageError;
use dealsync_core::errors::{DatabaseError, Error, Result};

type Job<T> = Box<dyn FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static>;

type ErasedJob = Job<Box<dyn Any + Send + 'static>>;
type ErasedReply = oneshot::Sender<Result<Box<dyn Any + Send + 'static>>>;

/// Handle for submitting write jobs to the actor.
#[derive(Clone)]
pub struct WriteHandle {
    tx: mpsc::Sender<(ErasedJob, ErasedReply)>,
}

impl WriteHandle {
    /// Executes a job on the writer connection inside an immediate
    /// transaction and returns its result.
    pub async fn exec<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
        T: Send + 'static + Any,
    {
        let (ret_tx, ret_rx) = oneshot::channel();

        self.tx
            .send((
                Box::new(move |c| job(c).map(|v| Box::new(v) as Box<dyn Any + Send>)),
                ret_tx,
            ))
            .await
            .map_err(|_| {
                Error::Database(DatabaseError::Internal(
                    "database writer has stopped".to_string(),
                ))
            })?;

        let boxed = ret_rx.await.map_err(|_| {
            Error::Database(DatabaseError::Internal(
                "database writer dropped the reply".to_string(),
            ))
        })??;

        boxed.downcast::<T>().map(|v| *v).map_err(|_| {
            Error::Database(DatabaseError::Internal(
                "database writer returned an unexpected type".to_string(),
            ))
        })
    }
}

/// Spawns the writer actor, which owns one pooled connection for its whole
/// lifetime and processes jobs serially.
pub fn spawn_writer(pool: std::sync::Arc<DbPool>) -> Result<WriteHandle> {
    let (tx, mut rx) = mpsc::channel::<(ErasedJob, ErasedReply)>(1024);

    let mut conn = pool
        .get()
        .map_err(|e| Error::Database(DatabaseError::ConnectionFailed(e.to_string())))?;

    tokio::spawn(async move {
        use diesel::connection::Connection;

        while let Some((job, reply_tx)) = rx.recv().await {
            let result: Result<Box<dyn Any + Send + 'static>> = conn
                .immediate_transaction::<_, TxError, _>(|c| job(c).map_err(TxError))
                .map_err(|TxError(e)| e);

            // The caller may have given up waiting; nothing to do then.
            let _ = reply_tx.send(result);
        }
    });

    Ok(WriteHandle { tx })
}

/// Carries the job's error through the transaction wrapper without
/// flattening it; a unique-violation raised inside a job must still be
/// recognizable by the caller.
struct TxError(Error);

impl From<diesel::result::Error> for TxError {
    fn from(e: diesel::result::Error) -> Self {
        TxError(StorageError::QueryFailed(e).into())
    }
}
