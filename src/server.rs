//! # Server
//!
//! Wires the services to one shared registry and active slot, and runs
//! them until shutdown.
//!
//! Services are independent: if one cannot bind its socket it logs the
//! failure and stops, and the rest keep running.

use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::error::Result;
use crate::motion::{FusionParams, MotionFusionEngine};
use crate::net::sink::UdpControlSink;
use crate::services::{
    DiscoveryBroadcaster, DriverEmitter, LivenessMonitor, PairingService, TelemetryIngestor,
};
use crate::session::{ActiveSlot, SessionRegistry};

pub struct Server {
    config: Config,
    registry: Arc<SessionRegistry>,
    active: Arc<ActiveSlot>,
}

impl Server {
    /// # Errors
    ///
    /// Returns error if the configuration fails validation, or
    /// `InvalidSlot` if the configured active slot is out of range.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let active = ActiveSlot::new(config.driver.active_slot)?;
        Ok(Self {
            config,
            registry: Arc::new(SessionRegistry::new()),
            active: Arc::new(active),
        })
    }

    /// Shared slot table, for status readers such as a dashboard.
    #[must_use]
    pub fn registry(&self) -> Arc<SessionRegistry> {
        self.registry.clone()
    }

    /// Active slot selector, settable while the server runs.
    #[must_use]
    pub fn active_slot(&self) -> Arc<ActiveSlot> {
        self.active.clone()
    }

    /// Run every service until `shutdown` is cancelled
    ///
    /// # Errors
    ///
    /// Returns error only if an address in the configuration is invalid.
    /// Bind failures are logged per service and do not fail the server.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        let net = &self.config.network;
        let pair_addr = net.listen_addr(net.pair_port)?;
        let data_addr = net.listen_addr(net.data_port)?;
        let broadcast = net.broadcast_target()?;
        let driver_addr = self.config.driver.target()?;

        let mut tasks = JoinSet::new();

        let (period, pair_port, data_port) = (net.discovery_interval(), net.pair_port, net.data_port);
        spawn_service(&mut tasks, "discovery", shutdown.clone(), async move {
            DiscoveryBroadcaster::bind(broadcast, period, pair_port, data_port).await
        }, |service: DiscoveryBroadcaster, token| service.run(token));

        let registry = self.registry.clone();
        spawn_service(&mut tasks, "pairing", shutdown.clone(), async move {
            PairingService::bind(pair_addr, registry, data_port).await
        }, |service: PairingService, token| service.run(token));

        let registry = self.registry.clone();
        spawn_service(&mut tasks, "telemetry", shutdown.clone(), async move {
            TelemetryIngestor::bind(data_addr, registry).await
        }, |service: TelemetryIngestor, token| service.run(token));

        let monitor = LivenessMonitor::new(self.registry.clone(), &self.config.session);
        tasks.spawn(monitor.run(shutdown.clone()));

        let registry = self.registry.clone();
        let active = self.active.clone();
        let engine = MotionFusionEngine::new(FusionParams::from(&self.config.motion));
        let tick = self.config.driver.tick_period();
        spawn_service(&mut tasks, "driver", shutdown.clone(), async move {
            UdpControlSink::bind(driver_addr).await.map(|sink| {
                info!("Driver sink targeting {}", sink.target());
                DriverEmitter::new(registry, active, engine, sink, tick)
            })
        }, |service: DriverEmitter<UdpControlSink>, token| service.run(token));

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!("Service task failed: {}", e);
            }
        }

        debug!("All services stopped");
        Ok(())
    }
}

/// Spawn a service that first has to bind, then runs until shutdown.
fn spawn_service<S, B, R, F>(
    tasks: &mut JoinSet<()>,
    name: &'static str,
    shutdown: CancellationToken,
    bind: B,
    run: R,
) where
    S: Send + 'static,
    B: Future<Output = Result<S>> + Send + 'static,
    R: FnOnce(S, CancellationToken) -> F + Send + 'static,
    F: Future<Output = ()> + Send + 'static,
{
    tasks.spawn(async move {
        match bind.await {
            Ok(service) => run(service, shutdown).await,
            Err(e) => error!("{} service not started: {}", name, e),
        }
    });
}
