//! Debounced query submission.
//!
//! Interactive edits produce a query per keystroke or line. The debouncer
//! keeps one pending query; each `submit` replaces it and restarts the
//! quiescence timer. Only when the timer expires without another submit is
//! the pending query forwarded on the output channel.

use std::time::Duration;

use anyhow::{anyhow, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

use catalog_core::models::CatalogQuery;

pub struct QueryDebouncer {
    input: mpsc::UnboundedSender<CatalogQuery>,
    task: JoinHandle<()>,
}

impl QueryDebouncer {
    /// Start the scheduler. Flushed queries arrive on the returned receiver.
    pub fn spawn(quiescence: Duration) -> (Self, mpsc::UnboundedReceiver<CatalogQuery>) {
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (output_tx, output_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(quiescence, input_rx, output_tx));
        (
            Self {
                input: input_tx,
                task,
            },
            output_rx,
        )
    }

    /// Replace the pending query.
    pub fn submit(&self, query: CatalogQuery) -> Result<()> {
        self.input
            .send(query)
            .map_err(|_| anyhow!("query scheduler has stopped"))
    }

    /// Stop accepting queries. A query still pending is flushed first.
    pub async fn close(self) {
        drop(self.input);
        let _ = self.task.await;
    }
}

async fn run(
    quiescence: Duration,
    mut input: mpsc::UnboundedReceiver<CatalogQuery>,
    output: mpsc::UnboundedSender<CatalogQuery>,
) {
    let mut pending: Option<CatalogQuery> = None;
    let mut deadline = Instant::now();

    loop {
        tokio::select! {
            received = input.recv() => match received {
                Some(query) => {
                    pending = Some(query);
                    deadline = Instant::now() + quiescence;
                }
                None => break,
            },
            _ = sleep_until(deadline), if pending.is_some() => {
                if let Some(query) = pending.take() {
                    if output.send(query).is_err() {
                        return;
                    }
                }
            }
        }
    }

    if let Some(query) = pending.take() {
        let _ = output.send(query);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CatalogQuery {
        CatalogQuery {
            search_text: s.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_submits_coalesce() {
        let (debouncer, mut flushed) = QueryDebouncer::spawn(Duration::from_millis(500));
        debouncer.submit(text("g")).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        debouncer.submit(text("ga")).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        debouncer.submit(text("gauze")).unwrap();

        let query = flushed.recv().await.unwrap();
        assert_eq!(query.search_text, "gauze");
        assert!(flushed.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_quiescence() {
        let (debouncer, mut flushed) = QueryDebouncer::spawn(Duration::from_millis(500));
        debouncer.submit(text("first")).unwrap();
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(flushed.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(
            flushed.recv().await.unwrap().search_text,
            "first"
        );

        debouncer.submit(text("second")).unwrap();
        assert_eq!(
            flushed.recv().await.unwrap().search_text,
            "second"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_flushes_pending() {
        let (debouncer, mut flushed) = QueryDebouncer::spawn(Duration::from_secs(60));
        debouncer.submit(text("last")).unwrap();
        debouncer.close().await;
        assert_eq!(
            flushed.recv().await.unwrap().search_text,
            "last"
        );
        assert!(flushed.recv().await.is_none());
    }
}
