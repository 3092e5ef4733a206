use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{Builder as ThreadBuilder, JoinHandle};

use anyhow::Error;
use rusqlite::Connection;
use tokio::sync::mpsc::{channel, Receiver, Sender};
use tokio::sync::oneshot::channel as oneshot_channel;

pub(crate) trait DatabaseProvider {
    fn provide_db(&self) -> Result<Connection, Error>;
}

#[cfg(test)]
pub(crate) struct InMemDatabaseProvider;

#[cfg(test)]
impl DatabaseProvider for InMemDatabaseProvider {
    fn provide_db(&self) -> Result<Connection, Error> {
        let conn = Connection::open_in_memory()?;
        Ok(conn)
    }
}

pub(crate) struct FileDatabaseProvider {
    path: PathBuf,
}

impl FileDatabaseProvider {
    pub fn new<P>(path: P) -> Self
    where
        P: AsRef<Path>,
    {
        Self {
            path: path.as_ref().to_owned(),
        }
    }
}

impl DatabaseProvider for FileDatabaseProvider {
    fn provide_db(&self) -> Result<Connection, Error> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&self.path)?;
        Ok(conn)
    }
}

/// A handle to the connection owned by the database thread.
///
/// Every piece of work runs on that single thread in submission order,
/// so each closure sees the connection exclusively.
#[derive(Clone)]
pub(crate) struct DatabaseManager {
    inner: Arc<DatabaseManagerInner>,
}

impl DatabaseManager {
    pub fn with_db_provider<P>(provider: P) -> Result<Self, Error>
    where
        P: DatabaseProvider,
    {
        let conn = provider.provide_db()?;
        let (work_tx, work_rx) = channel(10);

        let db_thread = DatabaseThread { conn, work_rx };
        let join_handle = db_thread.start()?;

        Ok(Self {
            inner: Arc::new(DatabaseManagerInner {
                join_handle: Some(join_handle),
                work_tx: Some(work_tx),
            }),
        })
    }

    pub async fn enqueue_work<F>(&self, f: F) -> Result<(), Error>
    where
        F: FnOnce(&mut Connection) + Send + 'static,
    {
        let work_tx = self
            .inner
            .work_tx
            .as_ref()
            .ok_or_else(|| anyhow!("Database thread has shutdown"))?;
        work_tx
            .send(AnyDatabaseThreadWork::new_boxed(f))
            .await
            .map_err(|err| anyhow!(err.to_string()))?;

        Ok(())
    }

    pub async fn query<F, R>(&self, f: F) -> Result<R, Error>
    where
        F: FnOnce(&mut Connection) -> R + Send + 'static,
        R: Send + Debug + 'static,
    {
        let (res_tx, res_rx) = oneshot_channel();
        self.enqueue_work(move |conn| {
            // The receiver is gone only when the caller was cancelled.
            let _ = res_tx.send(f(conn));
        })
        .await?;

        res_rx.await.map_err(|err| anyhow!(err.to_string()))
    }
}

struct DatabaseManagerInner {
    join_handle: Option<JoinHandle<()>>,
    work_tx: Option<Sender<Box<dyn DatabaseThreadWork>>>,
}

impl Drop for DatabaseManagerInner {
    fn drop(&mut self) {
        // Closing the channel lets the thread drain the queue and return.
        self.work_tx.take();
        if let Some(join_handle) = self.join_handle.take() {
            if join_handle.join().is_err() {
                error!("Database thread panicked");
            }
        }

        debug!("Database thread has shutdown");
    }
}

struct DatabaseThread {
    conn: Connection,
    work_rx: Receiver<Box<dyn DatabaseThreadWork>>,
}

impl DatabaseThread {
    fn start(self) -> Result<JoinHandle<()>, Error> {
        let join_handle = ThreadBuilder::new()
            .name("DatabaseThread".to_owned())
            .spawn(move || {
                let mut thread = self;
                thread.thread_main()
            })?;
        Ok(join_handle)
    }

    fn thread_main(&mut self) {
        while let Some(mut work) = self.work_rx.blocking_recv() {
            work.perform(&mut self.conn);
        }
    }
}

trait DatabaseThreadWork: Send {
    fn perform(&mut self, conn: &mut Connection);
}

struct AnyDatabaseThreadWork<F>
where
    F: FnOnce(&mut Connection) + Send,
{
    f: Option<F>,
}

impl<F> AnyDatabaseThreadWork<F>
where
    F: FnOnce(&mut Connection) + Send,
{
    fn new_boxed(f: F) -> Box<Self> {
        Box::new(Self { f: Some(f) })
    }
}

impl<F> DatabaseThreadWork for AnyDatabaseThreadWork<F>
where
    F: FnOnce(&mut Connection) + Send,
{
    fn perform(&mut self, conn: &mut Connection) {
        if let Some(f) = self.f.take() {
            f(conn)
        }
    }
}
