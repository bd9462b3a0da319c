//! Background polling of the signed-in user's notifications.

use std::sync::Arc;
use std::time::Duration;

use configs::{EndpointsConfig, NotificationsConfig};
use models::notification::{parse_notifications, unread_count};
use models::Notification;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::http::{ApiClient, HttpError, Method, RequestOptions};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NotificationFeed {
    pub items: Vec<Notification>,
    pub unread: usize,
}

impl NotificationFeed {
    fn new(items: Vec<Notification>) -> Self {
        let unread = unread_count(&items);
        Self { items, unread }
    }
}

/// Handle to a running poll loop. Dropping it stops the loop.
pub struct NotificationPoller {
    client: Arc<ApiClient>,
    list_path: String,
    unread_only: bool,
    mark_all_path: String,
    feed: Arc<watch::Sender<NotificationFeed>>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl NotificationPoller {
    /// Fetch immediately, then every `settings.poll_interval()`, until `cancel` fires.
    pub fn spawn(
        client: Arc<ApiClient>,
        endpoints: &EndpointsConfig,
        settings: &NotificationsConfig,
        cancel: CancellationToken,
    ) -> Self {
        let (tx, _) = watch::channel(NotificationFeed::default());
        let feed = Arc::new(tx);
        let interval = settings.poll_interval();
        let task = tokio::spawn(poll_loop(
            Arc::clone(&client),
            endpoints.notifications.clone(),
            settings.unread_only,
            interval,
            Arc::clone(&feed),
            cancel.clone(),
        ));
        info!(interval_secs = interval.as_secs(), unread_only = settings.unread_only, "notification polling started");
        Self {
            client,
            list_path: endpoints.notifications.clone(),
            unread_only: settings.unread_only,
            mark_all_path: endpoints.notifications_mark_all_read.clone(),
            feed,
            cancel,
            task,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<NotificationFeed> {
        self.feed.subscribe()
    }

    pub fn latest(&self) -> NotificationFeed {
        self.feed.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Fetch outside the regular schedule.
    pub async fn refresh_now(&self) -> Result<NotificationFeed, HttpError> {
        let items = fetch(&self.client, &self.list_path, self.unread_only).await?;
        let feed = NotificationFeed::new(items);
        if !self.cancel.is_cancelled() {
            self.feed.send_replace(feed.clone());
        }
        Ok(feed)
    }

    /// Mark everything read on the server, then locally.
    pub async fn mark_all_read(&self) -> Result<(), HttpError> {
        self.client.post(&self.mark_all_path, None).await?;
        self.feed.send_modify(|feed| {
            for item in &mut feed.items {
                item.is_read = true;
            }
            feed.unread = 0;
        });
        debug!("notifications marked read");
        Ok(())
    }
}

impl Drop for NotificationPoller {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.task.abort();
    }
}

async fn fetch(client: &ApiClient, path: &str, unread_only: bool) -> Result<Vec<Notification>, HttpError> {
    let options = RequestOptions::default().with_query("unread_only", unread_only.to_string());
    let resp = client.request(Method::Get, path, None, options).await?;
    parse_notifications(&resp.body).map_err(|e| HttpError::Decode(e.to_string()))
}

async fn poll_loop(
    client: Arc<ApiClient>,
    path: String,
    unread_only: bool,
    interval: Duration,
    feed: Arc<watch::Sender<NotificationFeed>>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }
        let result = tokio::select! {
            _ = cancel.cancelled() => break,
            result = fetch(&client, &path, unread_only) => result,
        };
        match result {
            // The session may have ended while the request was in flight.
            Ok(_) if cancel.is_cancelled() => break,
            Ok(items) => {
                let next = NotificationFeed::new(items);
                debug!(count = next.items.len(), unread = next.unread, "notifications fetched");
                feed.send_replace(next);
            }
            Err(e) => warn!(error = %e, "notification fetch failed"),
        }
    }
    info!("notification polling stopped");
}
