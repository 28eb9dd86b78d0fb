use anyhow::{Context, Result};

use crate::{
    config::LiveConfig,
    mosaic::MosaicController,
    schedule::ScheduleController,
    source::{PostChannel, PostSource, ScheduleSource},
    stream::LiveStreamController,
};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// The three live components for one page, constructed together from one
/// config and started/stopped together. They share no state; each keeps its
/// own subscription and timers.
pub struct LiveDay {
    pub schedule: ScheduleController,
    pub stream: LiveStreamController,
    pub mosaic: MosaicController,
}

impl LiveDay {
    pub fn new(config: &LiveConfig) -> Result<Self> {
        config.validate().context("invalid live config")?;
        Ok(Self {
            schedule: ScheduleController::new(config),
            stream: LiveStreamController::new(config),
            mosaic: MosaicController::new(config).context("failed to lay out mosaic")?,
        })
    }

    pub async fn start<P, C, S>(&self, posts: &P, channel: &C, schedule: &S) -> Result<()>
    where
        P: PostSource,
        C: PostChannel,
        S: ScheduleSource,
    {
        self.schedule.start(schedule).await?;
        if let Err(err) = self.stream.start(posts, channel).await {
            log_warn!("live stream failed to start, stopping schedule: {err:#}");
            self.schedule.stop().await;
            return Err(err);
        }
        if let Err(err) = self.mosaic.start(posts, channel).await {
            log_warn!("mosaic failed to start, stopping stream and schedule: {err:#}");
            self.stream.stop().await;
            self.schedule.stop().await;
            return Err(err);
        }
        log_info!("live day started");
        Ok(())
    }

    pub async fn stop(&self) {
        self.mosaic.stop().await;
        self.stream.stop().await;
        self.schedule.stop().await;
        log_info!("live day stopped");
    }
}
