use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::{bail, Result};
use rand::{rngs::StdRng, SeedableRng};
use tokio::{
    sync::{mpsc, watch, Mutex},
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    config::LiveConfig,
    source::{Delivery, PostChannel, PostSource, Subscription},
};

use super::{
    glyph::{layout_digits, GlyphLayout},
    state::{MosaicMessage, MosaicState, MosaicView},
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

struct MosaicRuntime {
    subscription: Subscription,
    delivering: Arc<AtomicBool>,
    cancel_token: CancellationToken,
    reducer: JoinHandle<()>,
    ticker: Option<JoinHandle<()>>,
}

/// Drives the photo mosaic: seeds the pool, pops arrivals into random
/// tiles and, unless reduced motion is requested, reshuffles on a timer.
pub struct MosaicController {
    layout: GlyphLayout,
    pool_capacity: usize,
    reshuffle_interval: Duration,
    reduced_motion: bool,
    seed: Option<u64>,
    view_tx: Arc<watch::Sender<MosaicView>>,
    runtime: Mutex<Option<MosaicRuntime>>,
}

impl MosaicController {
    /// Computes the glyph layout once. Fails on an invalid config or a
    /// non-digit `mosaic_digits`.
    pub fn new(config: &LiveConfig) -> Result<Self> {
        config.validate()?;
        let layout = layout_digits(&config.mosaic_digits, config.glyph_gap)?;
        let idle = MosaicState::new(layout.clone(), config.pool_capacity, StdRng::seed_from_u64(0));
        let (view_tx, _) = watch::channel(idle.view());

        Ok(Self {
            layout,
            pool_capacity: config.pool_capacity,
            reshuffle_interval: config.reshuffle_interval(),
            reduced_motion: config.reduced_motion,
            seed: None,
            view_tx: Arc::new(view_tx),
            runtime: Mutex::new(None),
        })
    }

    /// Fix the rng seed so tile picks are reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn layout(&self) -> &GlyphLayout {
        &self.layout
    }

    pub fn subscribe_view(&self) -> watch::Receiver<MosaicView> {
        self.view_tx.subscribe()
    }

    pub fn view(&self) -> MosaicView {
        self.view_tx.borrow().clone()
    }

    pub async fn is_running(&self) -> bool {
        self.runtime.lock().await.is_some()
    }

    pub async fn is_reshuffling(&self) -> bool {
        self.runtime
            .lock()
            .await
            .as_ref()
            .map_or(false, |runtime| runtime.ticker.is_some())
    }

    pub async fn start<S, C>(&self, source: &S, channel: &C) -> Result<MosaicView>
    where
        S: PostSource,
        C: PostChannel,
    {
        let mut runtime = self.runtime.lock().await;
        if runtime.is_some() {
            bail!("mosaic already active");
        }

        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut state = MosaicState::new(self.layout.clone(), self.pool_capacity, rng);

        match source.fetch_recent_posts(self.pool_capacity).await {
            Ok(posts) => {
                state.apply(MosaicMessage::Seeded(posts));
            }
            Err(err) => log_warn!("mosaic seed fetch failed, showing fallback tiles: {err:#}"),
        }
        let view = state.view();
        self.view_tx.send_replace(view.clone());

        let (messages, message_rx) = mpsc::unbounded_channel::<MosaicMessage>();
        let delivering = Arc::new(AtomicBool::new(true));
        let cancel_token = CancellationToken::new();

        let subscription = {
            let messages = messages.clone();
            let delivering = delivering.clone();
            channel.subscribe(Box::new(move |delivery: Delivery| {
                if !delivering.load(Ordering::SeqCst) {
                    return;
                }
                match delivery {
                    Ok(post) => {
                        let _ = messages.send(MosaicMessage::Arrived(post));
                    }
                    Err(err) => log_warn!("dropping failed mosaic delivery: {err:#}"),
                }
            }))
        };

        let reducer = tokio::spawn(run_reducer(
            state,
            message_rx,
            cancel_token.clone(),
            self.view_tx.clone(),
        ));

        let ticker = if self.reduced_motion {
            log_info!("reduced motion requested, mosaic reshuffle disabled");
            None
        } else {
            Some(tokio::spawn(reshuffle_ticker(
                self.reshuffle_interval,
                messages,
                cancel_token.clone(),
            )))
        };

        log_info!(
            "mosaic started: {} tiles, {} photos in pool",
            view.tiles.len(),
            view.pool_size
        );

        *runtime = Some(MosaicRuntime {
            subscription,
            delivering,
            cancel_token,
            reducer,
            ticker,
        });

        Ok(view)
    }

    /// Idempotent. Cancels the reshuffle timer and drops the subscription.
    pub async fn stop(&self) {
        let Some(runtime) = self.runtime.lock().await.take() else {
            return;
        };

        runtime.delivering.store(false, Ordering::SeqCst);
        runtime.subscription.unsubscribe();
        runtime.cancel_token.cancel();

        if let Err(err) = runtime.reducer.await {
            log_error!("mosaic reducer task failed to join: {err}");
        }
        if let Some(ticker) = runtime.ticker {
            if let Err(err) = ticker.await {
                log_error!("mosaic reshuffle task failed to join: {err}");
            }
        }
        log_info!("mosaic stopped");
    }
}

async fn run_reducer(
    mut state: MosaicState,
    mut messages: mpsc::UnboundedReceiver<MosaicMessage>,
    cancel_token: CancellationToken,
    view_tx: Arc<watch::Sender<MosaicView>>,
) {
    loop {
        let message = tokio::select! {
            _ = cancel_token.cancelled() => break,
            message = messages.recv() => match message {
                Some(message) => message,
                None => break,
            },
        };

        let reshuffle = matches!(message, MosaicMessage::Reshuffle);
        if state.apply(message) {
            if reshuffle {
                log_debug!("mosaic reshuffled one tile");
            }
            view_tx.send_replace(state.view());
        }
    }
}

async fn reshuffle_ticker(
    every: Duration,
    messages: mpsc::UnboundedSender<MosaicMessage>,
    cancel_token: CancellationToken,
) {
    let mut interval = time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if messages.send(MosaicMessage::Reshuffle).is_err() {
                    break;
                }
            }
            _ = cancel_token.cancelled() => break,
        }
    }
}
