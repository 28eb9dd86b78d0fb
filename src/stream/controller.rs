use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::{anyhow, bail, Result};
use tokio::{
    sync::{mpsc, oneshot, watch, Mutex},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

use crate::{
    config::LiveConfig,
    source::{Delivery, PostChannel, PostSource, Subscription},
};

use super::state::{StreamEffect, StreamMessage, StreamSettings, StreamState, StreamStatus, StreamView};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

type Command = (StreamMessage, Option<oneshot::Sender<StreamView>>);

/// Reports the consumer's viewport offset. Only the latest value matters; it
/// is read by the channel callback as each post is delivered, so gating sees
/// the offset at the moment of delivery.
#[derive(Clone)]
pub struct ScrollObserver {
    tx: Arc<watch::Sender<f64>>,
}

impl ScrollObserver {
    pub fn report(&self, offset_px: f64) {
        self.tx.send_replace(offset_px);
    }

    pub fn offset(&self) -> f64 {
        *self.tx.borrow()
    }
}

struct StreamRuntime {
    commands: mpsc::UnboundedSender<Command>,
    subscription: Subscription,
    delivering: Arc<AtomicBool>,
    cancel_token: CancellationToken,
    reducer: JoinHandle<()>,
}

/// Owns one live stream session: the initial fetch, the channel
/// subscription and every expiry timer.
pub struct LiveStreamController {
    settings: StreamSettings,
    page_size: usize,
    view_tx: Arc<watch::Sender<StreamView>>,
    scroll: ScrollObserver,
    runtime: Mutex<Option<StreamRuntime>>,
}

impl LiveStreamController {
    pub fn new(config: &LiveConfig) -> Self {
        let (view_tx, _) = watch::channel(StreamView::default());
        let (scroll_tx, _) = watch::channel(0.0);
        Self {
            settings: StreamSettings::from(config),
            page_size: config.page_size,
            view_tx: Arc::new(view_tx),
            scroll: ScrollObserver {
                tx: Arc::new(scroll_tx),
            },
            runtime: Mutex::new(None),
        }
    }

    pub fn subscribe_view(&self) -> watch::Receiver<StreamView> {
        self.view_tx.subscribe()
    }

    pub fn view(&self) -> StreamView {
        self.view_tx.borrow().clone()
    }

    pub fn scroll_observer(&self) -> ScrollObserver {
        self.scroll.clone()
    }

    pub async fn is_running(&self) -> bool {
        self.runtime.lock().await.is_some()
    }

    /// Seed from the post store, then follow the channel. Resolves once the
    /// seed list is visible; a failed fetch shows the empty state.
    pub async fn start<S, C>(&self, source: &S, channel: &C) -> Result<StreamView>
    where
        S: PostSource,
        C: PostChannel,
    {
        let mut runtime = self.runtime.lock().await;
        if runtime.is_some() {
            bail!("live stream already active");
        }

        self.view_tx.send_replace(StreamView::loading());

        let posts = match source.fetch_recent_posts(self.page_size).await {
            Ok(posts) => posts,
            Err(err) => {
                log_warn!("initial post fetch failed, starting empty: {err:#}");
                Vec::new()
            }
        };

        let mut state = StreamState::new(self.settings.clone());
        state.apply(StreamMessage::Loaded(posts));
        let view = state.view();
        self.view_tx.send_replace(view.clone());

        let (commands, command_rx) = mpsc::unbounded_channel::<Command>();
        let delivering = Arc::new(AtomicBool::new(true));
        let cancel_token = CancellationToken::new();

        let subscription = {
            let commands = commands.clone();
            let delivering = delivering.clone();
            let scroll = self.scroll.tx.clone();
            channel.subscribe(Box::new(move |delivery: Delivery| {
                if !delivering.load(Ordering::SeqCst) {
                    return;
                }
                match delivery {
                    Ok(post) => {
                        let offset_px = *scroll.borrow();
                        let _ = commands.send((StreamMessage::Scrolled { offset_px }, None));
                        let _ = commands.send((StreamMessage::Delivered(post), None));
                    }
                    Err(err) => log_warn!("dropping failed stream delivery: {err:#}"),
                }
            }))
        };

        let reducer = tokio::spawn(run_reducer(
            state,
            command_rx,
            commands.clone(),
            cancel_token.clone(),
            self.view_tx.clone(),
        ));

        log_info!("live stream started with {} posts", view.posts.len());

        *runtime = Some(StreamRuntime {
            commands,
            subscription,
            delivering,
            cancel_token,
            reducer,
        });

        Ok(view)
    }

    /// The consumer went back to the top: reload from the store and clear
    /// the "new posts" flag. If the reload fails the buffered posts are
    /// shown instead.
    pub async fn return_to_top<S: PostSource>(&self, source: &S) -> Result<StreamView> {
        let commands = match self.runtime.lock().await.as_ref() {
            Some(runtime) => runtime.commands.clone(),
            None => bail!("live stream is not active"),
        };

        self.scroll.report(0.0);

        let message = match source.fetch_recent_posts(self.page_size).await {
            Ok(posts) => StreamMessage::Reloaded(posts),
            Err(err) => {
                log_warn!("stream reload failed, showing buffered posts: {err:#}");
                StreamMessage::ReloadFailed
            }
        };

        let (ack_tx, ack_rx) = oneshot::channel();
        commands
            .send((message, Some(ack_tx)))
            .map_err(|_| anyhow!("live stream stopped during reload"))?;
        let view = ack_rx
            .await
            .map_err(|_| anyhow!("live stream stopped during reload"))?;

        log_info!("stream reloaded with {} posts", view.posts.len());
        Ok(view)
    }

    /// Unsubscribe and cancel every timer. Idempotent; once this returns no
    /// further delivery reaches the stream.
    pub async fn stop(&self) {
        let Some(runtime) = self.runtime.lock().await.take() else {
            return;
        };

        runtime.delivering.store(false, Ordering::SeqCst);
        runtime.subscription.unsubscribe();
        runtime.cancel_token.cancel();

        if let Err(err) = runtime.reducer.await {
            log_error!("stream reducer task failed to join: {err}");
        }

        let mut view = self.view();
        view.status = StreamStatus::Stopped;
        view.celebration = None;
        view.just_arrived = None;
        self.view_tx.send_replace(view);
        log_info!("live stream stopped");
    }
}

async fn run_reducer(
    mut state: StreamState,
    mut commands_rx: mpsc::UnboundedReceiver<Command>,
    commands: mpsc::UnboundedSender<Command>,
    cancel_token: CancellationToken,
    view_tx: Arc<watch::Sender<StreamView>>,
) {
    loop {
        let (message, ack) = tokio::select! {
            _ = cancel_token.cancelled() => break,
            command = commands_rx.recv() => match command {
                Some(command) => command,
                None => break,
            },
        };

        if let StreamMessage::Delivered(post) = &message {
            log_info!("post {} from {} arrived", post.id, post.author_name);
        }

        for effect in state.apply(message) {
            if let StreamEffect::ExpireCelebration { id, .. } = &effect {
                log_info!("milestone celebration {id} raised");
            }
            schedule_effect(effect, commands.clone(), cancel_token.child_token());
        }

        let view = state.view();
        view_tx.send_replace(view.clone());
        if let Some(ack) = ack {
            let _ = ack.send(view);
        }
    }
}

fn schedule_effect(
    effect: StreamEffect,
    commands: mpsc::UnboundedSender<Command>,
    cancel_token: CancellationToken,
) {
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(effect.delay()) => {
                let _ = commands.send((effect.into_message(), None));
            }
            _ = cancel_token.cancelled() => {}
        }
    });
}
