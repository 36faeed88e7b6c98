//! roaming-graph demonstration binary
//!
//! Builds a small entity graph (one operator, pool and station with two
//! EVSEs), attaches a loopback remote execution path to the first EVSE,
//! runs a reserve / remote start / remote stop cycle and then keeps the
//! reservation expiry task running until Ctrl+C.
//!
//! ```sh
//! # Run with default config (~/.config/roaming-graph/config.toml)
//! roaming-graph
//!
//! # Custom config path
//! roaming-graph --config ./config.toml
//!
//! # Validate config without starting
//! roaming-graph --check
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use clap::Parser;
use tracing::{error, info, warn};

use roaming_graph::application::charging::{
    CancelReservationRequest, CancelReservationResult, CancelReservationResultKind,
    RemoteStartRequest, RemoteStartResult, RemoteStartResultKind, RemoteStopRequest,
    RemoteStopResult, RemoteStopResultKind, RequestContext, RequestOptions, ReservationResult,
    ReservationResultKind, ReserveRequest,
};
use roaming_graph::application::services::start_reservation_expiry_task;
use roaming_graph::config::CONFIG_ENV_VAR;
use roaming_graph::domain::charging_pool::ChargingPool;
use roaming_graph::domain::charging_station::ChargingStation;
use roaming_graph::domain::evse::{EvseAdminStatusType, EvseStatusType, PlugType, SocketOutlet};
use roaming_graph::domain::operator::ChargingStationOperator;
use roaming_graph::domain::EvseId;
use roaming_graph::support::cancellation::{cancel_on_shutdown_signal, CancellationSignal};
use roaming_graph::support::logging::init_tracing;
use roaming_graph::{create_event_bus, default_config_path, AppConfig, EntityRegistry, RemoteEvsePort};

/// E-mobility entity graph with gated EVSE operations.
#[derive(Parser, Debug)]
#[command(name = "roaming-graph", version, about)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, env = CONFIG_ENV_VAR)]
    config: Option<PathBuf>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<String>,

    /// Validate the configuration file and exit.
    #[arg(long)]
    check: bool,
}

/// Remote execution path that accepts every request
struct LoopbackRemote;

#[async_trait]
impl RemoteEvsePort for LoopbackRemote {
    async fn reserve(
        &self,
        evse_id: &EvseId,
        _request: &ReserveRequest,
        _ctx: &RequestContext,
    ) -> ReservationResult {
        info!(%evse_id, "Loopback: reserve accepted");
        ReservationResult::new(ReservationResultKind::Success)
    }

    async fn cancel_reservation(
        &self,
        evse_id: &EvseId,
        _request: &CancelReservationRequest,
        _ctx: &RequestContext,
    ) -> CancelReservationResult {
        info!(%evse_id, "Loopback: cancel reservation accepted");
        CancelReservationResult::new(CancelReservationResultKind::Success)
    }

    async fn remote_start(
        &self,
        evse_id: &EvseId,
        _request: &RemoteStartRequest,
        _ctx: &RequestContext,
    ) -> RemoteStartResult {
        info!(%evse_id, "Loopback: remote start accepted");
        RemoteStartResult::new(RemoteStartResultKind::Success)
    }

    async fn remote_stop(
        &self,
        evse_id: &EvseId,
        _request: &RemoteStopRequest,
        _ctx: &RequestContext,
    ) -> RemoteStopResult {
        info!(%evse_id, "Loopback: remote stop accepted");
        RemoteStopResult::new(RemoteStopResultKind::Success)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // ── Load configuration ─────────────────────────────────────
    let config_path = cli.config.unwrap_or_else(default_config_path);
    let (mut config, load_error) = match AppConfig::load(&config_path) {
        Ok(cfg) => (cfg, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }

    init_tracing(&config.logging);
    match load_error {
        None => info!("Configuration loaded from {}", config_path.display()),
        Some(e) => {
            error!("Failed to load config from {}: {}", config_path.display(), e);
            error!("Using default configuration.");
        }
    }

    if cli.check {
        println!("Configuration is valid");
        println!("   Config file      : {}", config_path.display());
        println!("   Status history   : {}", config.schedule.max_status_history);
        println!("   Admin history    : {}", config.schedule.max_admin_status_history);
        println!("   Event capacity   : {}", config.events.capacity);
        println!("   Expiry interval  : {}s", config.reservations.expiry_check_interval_secs);
        println!("   Log level        : {}", config.logging.level);
        return Ok(());
    }

    // ── Metrics recorder (must be installed before any metrics calls) ──
    let prometheus = metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()?;

    // ── Entity graph ───────────────────────────────────────────
    let events = create_event_bus(config.events.capacity);
    let registry = EntityRegistry::shared(events.clone(), config.evse_settings());

    let mut subscriber = registry.subscribe();
    tokio::spawn(async move {
        while let Some(message) = subscriber.recv().await {
            info!(
                event_type = message.event.event_type(),
                evse_id = ?message.event.evse_id().map(ToString::to_string),
                "Event"
            );
        }
    });

    registry.add_operator(ChargingStationOperator::new("DE*GEF".parse()?, "GraphDefined"))?;
    registry.add_charging_pool(
        ChargingPool::new("DE*GEF*P1".parse()?, registry.history_limits()).with_name("Jena Central"),
    )?;
    registry.add_charging_station(
        ChargingStation::new("DE*GEF*S1".parse()?, "DE*GEF*P1".parse()?, registry.history_limits())
            .with_name("Parking deck"),
    )?;

    let first = registry.create_evse("DE*GEF*E1*1".parse()?, "DE*GEF*S1".parse()?)?;
    let second = registry.create_evse("DE*GEF*E1*2".parse()?, "DE*GEF*S1".parse()?)?;
    for evse in [&first, &second] {
        evse.add_socket_outlet(SocketOutlet::new(PlugType::Type2Outlet)).await;
        evse.set_max_power(Some(22.0)).await?;
        evse.set_status(EvseStatusType::Available, RequestOptions::new()).await;
    }
    first
        .set_admin_status(EvseAdminStatusType::Operational, RequestOptions::new())
        .await;
    first.attach_remote(Arc::new(LoopbackRemote)).await;

    // ── Demonstration cycle ────────────────────────────────────
    let reserve = ReserveRequest::new(chrono::Duration::minutes(15)).with_ema_id("DE-GEF-C12345678-X");
    let reserved = first.reserve(reserve.clone(), RequestOptions::new()).await?;
    info!(result = %reserved.kind, runtime_ms = reserved.runtime.as_millis() as u64, "Reserve on first EVSE");

    let refused = second.reserve(reserve, RequestOptions::new()).await?;
    info!(result = %refused.kind, "Reserve on second EVSE (admin status closed)");

    if let Some(reservation) = reserved.payload {
        let started = first
            .remote_start(
                RemoteStartRequest::new()
                    .with_reservation(reservation.id)
                    .with_ema_id("DE-GEF-C12345678-X"),
                RequestOptions::new(),
            )
            .await?;
        info!(result = %started.kind, "Remote start");

        if let Some(session) = started.payload {
            let stopped = first
                .remote_stop(RemoteStopRequest::new(session.id.clone()), RequestOptions::new())
                .await?;
            info!(result = %stopped.kind, session_id = %session.id, "Remote stop");
        }
    }

    let status = first.status_record().await;
    info!(evse_id = %status.id, status = %status.value, at = %status.timestamp, "First EVSE status");
    let update = second.status_update().await;
    info!(evse_id = %update.id, old = %update.old.value, new = %update.new.value, "Second EVSE status update");

    // ── Background services ────────────────────────────────────
    let cancellation = CancellationSignal::new();
    let expiry = start_reservation_expiry_task(
        registry.clone(),
        cancellation.clone(),
        config.reservations.expiry_check_interval(),
    );

    info!("Press Ctrl+C to shutdown gracefully.");
    if let Err(e) = cancel_on_shutdown_signal(cancellation.clone()).await {
        warn!(error = %e, "Signal handler failed, shutting down");
        cancellation.cancel();
    }

    expiry.await?;
    registry.detach_all_remotes().await;
    info!(at = %Utc::now(), "Shutdown complete");
    println!("{}", prometheus.render());

    Ok(())
}
