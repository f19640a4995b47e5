use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use log::{error, info};
use rusqlite::Connection;
use tokio::sync::oneshot;

mod helpers;
mod migrations;
pub mod models;
mod repositories;

pub use models::StoredProgress;

use migrations::run_migrations;

/// Work shipped to the connection-owning thread.
type Job = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum WorkerMessage {
    Run(Job),
    Stop,
}

struct Worker {
    jobs: mpsc::Sender<WorkerMessage>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Worker {
    fn drop(&mut self) {
        let handle = match self.thread.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let Some(handle) = handle else {
            return;
        };

        if let Err(err) = self.jobs.send(WorkerMessage::Stop) {
            error!("Progress store worker already gone: {err}");
        }
        if let Err(err) = handle.join() {
            error!("Progress store worker panicked: {err:?}");
        }
    }
}

/// Progress store backed by SQLite on a dedicated worker thread.
#[derive(Clone)]
pub struct Database {
    worker: Arc<Worker>,
    db_path: Arc<Option<PathBuf>>,
}

impl Database {
    /// Opens (creating if needed) the progress database at `db_path`.
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create progress directory {}", parent.display())
            })?;
        }

        let target = db_path.clone();
        let worker = Self::spawn_worker(move || {
            let conn = Connection::open(&target)
                .with_context(|| format!("failed to open {}", target.display()))?;
            if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
                error!("WAL unavailable for progress database, continuing: {err}");
            }
            Ok(conn)
        })?;

        info!("Progress database ready at {}", db_path.display());
        Ok(Self {
            worker,
            db_path: Arc::new(Some(db_path)),
        })
    }

    /// Private in-memory database; contents vanish with the last handle.
    pub fn open_in_memory() -> Result<Self> {
        let worker = Self::spawn_worker(|| Ok(Connection::open_in_memory()?))?;
        Ok(Self {
            worker,
            db_path: Arc::new(None),
        })
    }

    /// Starts the thread that owns the connection and waits until the
    /// schema is migrated.
    fn spawn_worker<F>(open: F) -> Result<Arc<Worker>>
    where
        F: FnOnce() -> Result<Connection> + Send + 'static,
    {
        let (jobs, inbox) = mpsc::channel::<WorkerMessage>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();

        let thread = thread::Builder::new()
            .name("lessonguard-db".into())
            .spawn(move || {
                let mut conn = match open().and_then(|mut conn| {
                    run_migrations(&mut conn).context("failed to migrate progress schema")?;
                    Ok(conn)
                }) {
                    Ok(conn) => conn,
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };
                if ready_tx.send(Ok(())).is_err() {
                    return;
                }

                while let Ok(WorkerMessage::Run(job)) = inbox.recv() {
                    job(&mut conn);
                }
                info!("Progress store worker stopped");
            })
            .context("failed to spawn progress store worker")?;

        ready_rx
            .recv()
            .context("progress store worker exited during startup")??;

        Ok(Arc::new(Worker {
            jobs,
            thread: Mutex::new(Some(thread)),
        }))
    }

    /// File backing this database; `None` when in memory.
    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Runs `job` on the worker thread and awaits its result.
    pub async fn execute<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.worker
            .jobs
            .send(WorkerMessage::Run(Box::new(move |conn| {
                // The caller may have given up waiting; the write still happened.
                let _ = reply_tx.send(job(conn));
            })))
            .map_err(|_| anyhow!("progress store worker is not running"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("progress store worker dropped the request"))?
    }
}
