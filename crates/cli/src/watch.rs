//! Periodic gallery refresh.
//!
//! [`GalleryPoller`] fetches the image list on a fixed interval and publishes
//! it through a `watch` channel whenever it changes. Missed ticks are skipped
//! rather than replayed, a poll never overlaps the previous one, and the task
//! stops when its cancellation token fires or the poller is dropped.

use crate::api_client::ApiClient;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Default refresh interval.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

/// Anything that can produce the current image list.
#[async_trait]
pub trait ImageSource: Send + Sync + 'static {
    async fn fetch(&self) -> anyhow::Result<Vec<String>>;
}

#[async_trait]
impl ImageSource for ApiClient {
    async fn fetch(&self) -> anyhow::Result<Vec<String>> {
        self.list_images().await
    }
}

/// Handle to a running poll loop.
pub struct GalleryPoller {
    cancel: CancellationToken,
    images: watch::Receiver<Option<Vec<String>>>,
    task: Option<JoinHandle<()>>,
}

impl GalleryPoller {
    /// Start polling `source` every `interval`. The first poll runs at once.
    pub fn spawn<S: ImageSource>(source: S, interval: Duration) -> Self {
        Self::spawn_with_token(source, interval, CancellationToken::new())
    }

    /// Start polling under an existing cancellation token.
    pub fn spawn_with_token<S: ImageSource>(
        source: S,
        interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        let (tx, images) = watch::channel(None);
        let task = tokio::spawn(poll_loop(source, interval, tx, cancel.clone()));
        Self {
            cancel,
            images,
            task: Some(task),
        }
    }

    /// Receiver that sees every published image list. `None` until the first
    /// successful poll.
    pub fn subscribe(&self) -> watch::Receiver<Option<Vec<String>>> {
        self.images.clone()
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop polling and wait for the loop to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            tracing::warn!(error = %e, "Gallery poller task failed");
        }
    }
}

impl Drop for GalleryPoller {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn poll_loop<S: ImageSource>(
    source: S,
    interval: Duration,
    tx: watch::Sender<Option<Vec<String>>>,
    cancel: CancellationToken,
) {
    // tokio panics on a zero period.
    let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let result = tokio::select! {
            _ = cancel.cancelled() => break,
            result = source.fetch() => result,
        };

        match result {
            Ok(images) => {
                let changed = tx.send_if_modified(|current| {
                    if current.as_ref() == Some(&images) {
                        return false;
                    }
                    *current = Some(images);
                    true
                });
                if changed {
                    tracing::debug!("Gallery changed");
                }
            }
            Err(e) => tracing::warn!(error = %e, "Gallery poll failed; keeping previous list"),
        }
    }

    tracing::debug!("Gallery poller stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays scripted responses, repeating the last one.
    #[derive(Clone)]
    struct ScriptedSource {
        responses: Arc<Mutex<VecDeque<anyhow::Result<Vec<String>>>>>,
        last: Arc<Mutex<Vec<String>>>,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedSource {
        fn new(responses: Vec<anyhow::Result<Vec<String>>>) -> Self {
            Self {
                responses: Arc::new(Mutex::new(responses.into())),
                last: Arc::new(Mutex::new(Vec::new())),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ImageSource for ScriptedSource {
        async fn fetch(&self) -> anyhow::Result<Vec<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.responses.lock().unwrap().pop_front();
            match next {
                Some(Ok(images)) => {
                    *self.last.lock().unwrap() = images.clone();
                    Ok(images)
                }
                Some(Err(e)) => Err(e),
                None => Ok(self.last.lock().unwrap().clone()),
            }
        }
    }

    fn urls(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| format!("/menu/{n}")).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn publishes_only_changes() {
        let source = ScriptedSource::new(vec![
            Ok(urls(&["menu1.jpg"])),
            Ok(urls(&["menu1.jpg"])),
            Ok(urls(&["admin-menu.png", "menu1.jpg"])),
        ]);
        let poller = GalleryPoller::spawn(source.clone(), DEFAULT_INTERVAL);
        let mut rx = poller.subscribe();

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), Some(urls(&["menu1.jpg"])));

        rx.changed().await.unwrap();
        assert_eq!(
            *rx.borrow_and_update(),
            Some(urls(&["admin-menu.png", "menu1.jpg"]))
        );
        assert!(source.calls() >= 3);

        poller.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn first_empty_list_is_published() {
        let source = ScriptedSource::new(vec![Ok(Vec::new())]);
        let poller = GalleryPoller::spawn(source, DEFAULT_INTERVAL);
        let mut rx = poller.subscribe();

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), Some(Vec::new()));

        poller.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn failed_polls_are_skipped() {
        let source = ScriptedSource::new(vec![
            Err(anyhow::anyhow!("connection refused")),
            Ok(urls(&["menu2.jpg"])),
        ]);
        let poller = GalleryPoller::spawn(source.clone(), DEFAULT_INTERVAL);
        let mut rx = poller.subscribe();

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), Some(urls(&["menu2.jpg"])));
        assert!(source.calls() >= 2);

        poller.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_polling() {
        let source = ScriptedSource::new(vec![Ok(urls(&["menu1.jpg"]))]);
        let poller = GalleryPoller::spawn(source.clone(), DEFAULT_INTERVAL);
        let mut rx = poller.subscribe();
        rx.changed().await.unwrap();

        poller.cancel_token().cancel();
        // The sender goes away once the loop exits.
        while rx.changed().await.is_ok() {}
        let calls = source.calls();

        tokio::time::sleep(DEFAULT_INTERVAL * 5).await;
        assert_eq!(source.calls(), calls);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_poller_cancels_it() {
        let source = ScriptedSource::new(vec![Ok(urls(&["menu1.jpg"]))]);
        let poller = GalleryPoller::spawn(source, DEFAULT_INTERVAL);
        let token = poller.cancel_token();

        drop(poller);
        assert!(token.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn polls_on_the_interval() {
        let source = ScriptedSource::new(vec![Ok(urls(&["menu1.jpg"]))]);
        let poller = GalleryPoller::spawn(source.clone(), Duration::from_secs(30));
        let mut rx = poller.subscribe();
        rx.changed().await.unwrap();
        assert_eq!(source.calls(), 1);

        tokio::time::sleep(Duration::from_secs(95)).await;
        assert_eq!(source.calls(), 4);

        poller.shutdown().await;
    }
}
