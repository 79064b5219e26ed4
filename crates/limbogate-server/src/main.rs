mod cache;
mod config;
mod frame;
mod proxy;
mod session;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::BytesMut;
use parking_lot::RwLock;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use limbogate_filter::lookup::AllowAll;
use limbogate_filter::{AttackEvent, AttackManager, CheckPipeline, ConnectionStatistics};
use limbogate_proto::registry::LimboRegistry;

use cache::PacketCache;
use config::ServerConfig;
use proxy::ProxyHeader;
use session::{LimboSession, Services, SessionClose, SessionSettings};

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "limbogate.toml".into());
    let config = match ServerConfig::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load {config_path}: {e}");
            std::process::exit(1);
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(
        "Limbogate v{} starting on {}:{}",
        env!("CARGO_PKG_VERSION"),
        config.server.address,
        config.server.port
    );
    info!("MOTD: {}", config.server.motd);
    info!(
        "Limbo dimension: {:?} ({:?} codec)",
        config.limbo.dimension, config.limbo.backend
    );
    info!("Proxy protocol: {}", config.server.proxy_protocol);
    info!("Attack trigger: {} cps", config.attack.trigger_cps);

    let addr: SocketAddr = format!("{}:{}", config.server.address, config.server.port)
        .parse()
        .expect("invalid bind address");

    let registry = Arc::new(LimboRegistry::build());
    let cache = Arc::new(PacketCache::new(registry.clone(), &config));
    let services = Arc::new(Services {
        registry,
        cache,
        checks: Arc::new(CheckPipeline::new(
            &config.checks,
            Arc::new(AllowAll),
            Arc::new(AllowAll),
        )),
        stats: Arc::new(ConnectionStatistics::new()),
        attack: Arc::new(AttackManager::new(&config.attack)),
        settings: RwLock::new(SessionSettings::from_config(&config)),
    });
    let proxy_protocol = config.server.proxy_protocol;

    let listener = match TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind {addr}: {e}");
            std::process::exit(1);
        }
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);

    // Handle Ctrl+C
    let shutdown_tx_ctrlc = shutdown_tx.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Shutdown signal received");
        let _ = shutdown_tx_ctrlc.send(true);
    });

    // Console REPL: read lines from stdin
    let (console_tx, mut console_rx) = tokio::sync::mpsc::channel::<String>(32);
    tokio::spawn(async move {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let mut lines = stdin.lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let line = line.trim().to_string();
            if !line.is_empty() && console_tx.send(line).await.is_err() {
                break;
            }
        }
    });

    // 1 Hz sampler: roll the per-second counters and feed the attack
    // state machine.
    let sampler_services = services.clone();
    let mut sampler_shutdown = shutdown_rx.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let cps = sampler_services.stats.tick_second();
                    sampler_services.attack.sample(cps, &sampler_services.stats);
                }
                _ = sampler_shutdown.changed() => {
                    if *sampler_shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    });

    // Surface attack transitions in the log.
    let mut attack_events = services.attack.subscribe();
    tokio::spawn(async move {
        loop {
            match attack_events.recv().await {
                Ok(AttackEvent::Started { methods }) => {
                    warn!(?methods, "attack started");
                }
                Ok(AttackEvent::MethodsChanged { methods }) => {
                    info!(?methods, "attack methods changed");
                }
                Ok(AttackEvent::Stopped { duration }) => {
                    info!(?duration, "attack ended");
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let mut shutdown_rx_main = shutdown_rx.clone();
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((socket, peer)) => {
                        let services = services.clone();
                        let shutdown = shutdown_rx.clone();
                        tokio::spawn(async move {
                            if let Err(err) =
                                drive_connection(socket, peer, services, proxy_protocol, shutdown)
                                    .await
                            {
                                debug!(%peer, %err, "connection i/o error");
                            }
                        });
                    }
                    Err(err) => warn!(%err, "accept failed"),
                }
            }
            Some(line) = console_rx.recv() => {
                handle_console_command(&line, &config_path, &services, &shutdown_tx);
            }
            _ = shutdown_rx_main.changed() => {
                if *shutdown_rx_main.borrow() {
                    break;
                }
            }
        }
    }
    info!("Limbo shut down.");
}

fn handle_console_command(
    line: &str,
    config_path: &str,
    services: &Arc<Services>,
    shutdown_tx: &watch::Sender<bool>,
) {
    match line {
        "stop" => {
            let _ = shutdown_tx.send(true);
        }
        "reload" => match ServerConfig::load(config_path) {
            Ok(config) => {
                services.checks.reload(&config.checks);
                services.attack.reload(&config.attack);
                services.cache.rebuild(&config);
                *services.settings.write() = SessionSettings::from_config(&config);
                info!("Configuration reloaded");
            }
            Err(err) => warn!(%err, "reload failed, keeping current configuration"),
        },
        "stats" => {
            let stats = &services.stats;
            info!(
                "cps={} peak={} total={} unique={} bytes_in={} bytes_out={}",
                stats.cps(),
                stats.peak_cps(),
                stats.total(),
                stats.unique_addresses(),
                stats.bytes_in(),
                stats.bytes_out()
            );
            if services.attack.in_attack() {
                info!(methods = ?services.attack.methods(), "attack in progress");
            }
            for &reason in limbogate_filter::reason::BlockReason::ALL {
                let blocked = stats.blocked(reason);
                if blocked > 0 {
                    info!("blocked[{}]={blocked}", reason.as_str());
                }
            }
        }
        _ => warn!("Unknown command: {line} (try: stats, reload, stop)"),
    }
}

/// Own one connection end to end: optional proxy preamble, then frames
/// in, session output back out, until either side closes or a check
/// decides the connection is done.
async fn drive_connection(
    mut socket: TcpStream,
    peer: SocketAddr,
    services: Arc<Services>,
    proxy_protocol: bool,
    mut shutdown: watch::Receiver<bool>,
) -> std::io::Result<()> {
    let mut buf = BytesMut::with_capacity(4096);
    let mut address = peer.ip();

    if proxy_protocol {
        loop {
            match proxy::strip_header(&mut buf) {
                Ok(ProxyHeader::Absent) => break,
                Ok(ProxyHeader::Parsed(source)) => {
                    if let Some(source) = source {
                        address = source.ip();
                    }
                    break;
                }
                Ok(ProxyHeader::Incomplete) => {
                    if socket.read_buf(&mut buf).await? == 0 {
                        return Ok(());
                    }
                }
                Err(err) => {
                    debug!(%peer, %err, "rejecting malformed proxy header");
                    return Ok(());
                }
            }
        }
    }

    services.stats.count_connection(address);
    let mut session = LimboSession::new(services.clone(), address, Instant::now());
    let mut tick = tokio::time::interval(Duration::from_secs(1));

    let close = loop {
        if session.has_output() {
            let out = session.take_output();
            socket.write_all(&out).await?;
        }
        tokio::select! {
            read = socket.read_buf(&mut buf) => {
                if read? == 0 {
                    break None;
                }
                if let Err(close) = pump_frames(&mut session, &mut buf) {
                    break Some(close);
                }
            }
            _ = tick.tick() => {
                if let Err(close) = session.tick(Instant::now()) {
                    break Some(close);
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break None;
                }
            }
        }
    };

    if let Some(close) = close {
        if let Some(reason) = close.block_reason() {
            services.stats.count_blocked(reason);
            debug!(%address, reason = reason.as_str(), "connection blocked");
            session.begin_disconnect(reason);
        }
        if session.has_output() {
            let out = session.take_output();
            // The peer may already be gone; the close stands either way.
            let _ = socket.write_all(&out).await;
        }
    }
    session.finish();
    Ok(())
}

fn pump_frames(session: &mut LimboSession, buf: &mut BytesMut) -> Result<(), SessionClose> {
    let now = Instant::now();
    while let Some(frame) = frame::split_frame(buf)? {
        session.handle_frame(&frame, now)?;
    }
    Ok(())
}
