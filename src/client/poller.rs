use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::Dashboard;

/// Background refresh of a `Dashboard` on a fixed interval.
///
/// The first reload happens immediately. A failed reload is logged and the
/// previous list stays visible until the next tick.
pub struct Poller {
    stop_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Poller {
    pub fn start(dashboard: Arc<Dashboard>, every: Duration) -> Self {
        let (stop_tx, mut stop_rx) = oneshot::channel();
        let handle = tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!("Polling reports every {:?}", every);
            loop {
                tokio::select! {
                    _ = &mut stop_rx => {
                        debug!("Poller received stop signal");
                        break;
                    }
                    _ = ticker.tick() => {
                        match dashboard.reload().await {
                            Ok(count) => debug!("Poll loaded {} reports", count),
                            Err(e) => warn!("Poll failed: {}", e),
                        }
                    }
                }
            }
        });
        Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stops the loop and waits for an in-flight reload to finish.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!("Poller task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        if let Some(handle) = &self.handle {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::FakeApi;

    #[tokio::test]
    async fn test_poller_reloads_until_stopped() {
        let api = Arc::new(FakeApi::default());
        let dashboard = Arc::new(Dashboard::new(api.clone()));
        let mut ticks = dashboard.subscribe();

        let mut poller = Poller::start(dashboard.clone(), Duration::from_millis(20));
        assert!(poller.is_running());
        for _ in 0..3 {
            tokio::time::timeout(Duration::from_secs(2), ticks.changed())
                .await
                .unwrap()
                .unwrap();
        }
        poller.stop().await;
        assert!(!poller.is_running());

        let polled = api.fetch_count();
        assert!(polled >= 3);
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(api.fetch_count(), polled);
    }
}
