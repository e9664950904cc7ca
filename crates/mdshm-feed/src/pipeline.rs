//! The collector pipeline: feed socket, ingest thread, shared-memory
//! publisher and stats reporter wired around one [`MarketContext`].
//!
//! ```text
//! FeedSocket (tokio) --crossbeam--> ingest thread --> rings + disk logs
//!                                                        |
//!                         spawn_periodic(publish) <------+----> spawn_periodic(stats)
//!                                  |
//!                              ShmWriter --> segment --> readers
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use crossbeam_channel::TrySendError;
use mdshm_core::config::CollectorConfig;
use mdshm_core::context::MarketContext;
use mdshm_core::schedule::{PeriodicHandle, spawn_periodic};
use mdshm_core::shm::{ShmWriter, TickOutcome};
use mdshm_core::time_util;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::binance::{self, json_parser};
use crate::event::FeedEvent;
use crate::ingest::{self, Ingestor};
use crate::ws::{FeedSocket, FeedSocketConfig, OnTextCallback};

pub struct Collector {
    config: CollectorConfig,
    ctx: Arc<MarketContext>,
    ingestor: Option<Ingestor>,
    writer: Option<ShmWriter>,
    socket: Option<FeedSocket>,
    ingest_task: Option<JoinHandle<()>>,
    periodic: Vec<PeriodicHandle>,
}

impl Collector {
    /// Build the symbol table from an already normalized config.
    pub fn new(config: CollectorConfig) -> Result<Self> {
        let ctx = MarketContext::with_capacity(&config.feed.symbols, config.feed.ring_capacity)?;
        Ok(Self {
            config,
            ctx: Arc::new(ctx),
            ingestor: None,
            writer: None,
            socket: None,
            ingest_task: None,
            periodic: Vec::new(),
        })
    }

    pub fn context(&self) -> &Arc<MarketContext> {
        &self.ctx
    }

    /// Open the disk logs and create the shared memory segment. Either
    /// failing aborts startup.
    pub fn init(&mut self) -> Result<()> {
        let started = time_util::now_secs();
        let output_dir = Path::new(&self.config.output_dir);
        let ingestor = Ingestor::open(Arc::clone(&self.ctx), output_dir, started)
            .with_context(|| format!("failed to open data files under {}", output_dir.display()))?;

        let shm = &self.config.shm;
        let writer = ShmWriter::create(&shm.name, shm.size, &self.ctx.names())
            .with_context(|| format!("failed to create shared memory {}", shm.name))?;

        self.ingestor = Some(ingestor);
        self.writer = Some(writer);
        info!("[collector] initialized {} symbols: {}", self.ctx.len(), self.ctx.names().join(","));
        Ok(())
    }

    /// Start every task. Requires a prior successful [`Collector::init`].
    pub async fn start(&mut self) -> Result<()> {
        let feed = &self.config.feed;
        let url =
            binance::combined_stream_url(&feed.ws_base_url, &feed.symbols, &feed.kline_interval)?;
        let (Some(ingestor), Some(mut writer)) = (self.ingestor.take(), self.writer.take()) else {
            bail!("collector started before init");
        };

        // Ingest thread
        let (tx, rx) = crossbeam_channel::bounded::<FeedEvent>(feed.channel_capacity);
        let cpu_core = feed.cpu_affinity_ingest;
        self.ingest_task = Some(tokio::task::spawn_blocking(move || {
            ingest::run_ingest_loop("ingest", rx, ingestor, cpu_core);
        }));

        // Publisher
        let ctx = Arc::clone(&self.ctx);
        self.periodic.push(spawn_periodic(
            "publish",
            Duration::from_millis(self.config.shm.publish_interval_ms),
            move || {
                if let TickOutcome::Published(report) = writer.tick(&ctx) {
                    debug!("[publish] tick {}: {report:?}", report.write_counter);
                }
            },
        ));

        // Stats
        let mut reporter = crate::stats::StatsReporter::new(Arc::clone(&self.ctx));
        self.periodic.push(spawn_periodic(
            "stats",
            Duration::from_secs(self.config.stats_interval_sec),
            move || reporter.report(),
        ));

        // Feed
        let on_text: OnTextCallback = Arc::new(move |text| {
            let Some(event) = json_parser::parse_message(text) else {
                return;
            };
            match tx.try_send(event) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => warn!("[feed] ingest channel full, event dropped"),
                Err(TrySendError::Disconnected(_)) => debug!("[feed] ingest thread gone"),
            }
        });
        let mut socket =
            FeedSocket::new(FeedSocketConfig { label: "feed".into(), url, ping_interval: None });
        socket.start(on_text);
        self.socket = Some(socket);

        info!("[collector] started {} periodic tasks and the feed", self.periodic.len());
        Ok(())
    }

    /// Stop the feed, drain the ingest thread, then stop the periodic tasks.
    /// The publisher owns the writer, so stopping it unlinks the segment.
    pub async fn stop(&mut self) -> Result<()> {
        if let Some(mut socket) = self.socket.take() {
            socket.stop().await;
        }
        if let Some(task) = self.ingest_task.take() {
            task.await.context("ingest thread panicked")?;
        }
        for handle in self.periodic.drain(..) {
            debug!("[collector] stopping {}", handle.label());
            handle.stop().await;
        }
        // Only set if start never ran.
        self.writer = None;
        info!("[collector] stopped");
        Ok(())
    }
}
