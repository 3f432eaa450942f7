mod config;
mod game;

use std::path::PathBuf;
use std::thread;

use anyhow::{Result, bail};
use clap::Parser;
use glam::Vec3;
use log::{debug, info, warn};
use replica::{LoopbackHub, LoopbackTransport, Network, NetworkEvent, PlayerSpawn, Transform, Value};

use config::DemoConfig;
use game::{GUNNER_PREFAB, Gunner, TROPHY_PREFAB};

type Peer = Network<LoopbackTransport>;

#[derive(Parser)]
#[command(name = "replica-demo")]
#[command(about = "A host and loopback clients playing a shooting gallery")]
struct Args {
    #[arg(short, long, help = "TOML file with demo and network settings")]
    config: Option<PathBuf>,

    #[arg(long)]
    clients: Option<usize>,

    #[arg(short, long)]
    rounds: Option<u32>,

    #[arg(short, long)]
    tick_rate: Option<u32>,

    #[arg(long, help = "Run rounds back to back instead of at the tick rate")]
    fast: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => DemoConfig::load(path)?,
        None => DemoConfig::default(),
    };
    if let Some(clients) = args.clients {
        config.clients = clients;
    }
    if let Some(rounds) = args.rounds {
        config.rounds = rounds;
    }
    if let Some(tick_rate) = args.tick_rate {
        config.network.tick_rate = tick_rate;
    }
    if config.clients + 1 > config.network.max_connections {
        bail!(
            "{} clients plus the host exceed max_connections ({})",
            config.clients,
            config.network.max_connections
        );
    }

    let hub = LoopbackHub::new();
    let mut host = peer(&hub, &config);
    host.set_spawn_policy(|connection| {
        Some(PlayerSpawn {
            prefab: GUNNER_PREFAB,
            transform: Transform::from_position(Vec3::new(connection.0 as f32 * 2.0, 0.0, 0.0)),
        })
    });
    host.start_server()?;
    host.connect(&config.network.server_address)?;
    host.tick();
    log_events("host", &mut host);

    let mut remotes = Vec::with_capacity(config.clients);
    for _ in 0..config.clients {
        let mut remote = peer(&hub, &config);
        remote.connect(&config.network.server_address)?;
        remotes.push(remote);
    }
    step(&mut host, &mut remotes);

    let interval = config.network.tick_interval();
    for round in 0..config.rounds as usize {
        for (index, peer) in std::iter::once(&mut host).chain(remotes.iter_mut()).enumerate() {
            // every peer fires on its own cadence
            if round % (index + 2) == 0 {
                fire(peer)?;
            }
        }
        step(&mut host, &mut remotes);
        if !args.fast {
            thread::sleep(interval);
        }
    }

    report(&host);

    for remote in &mut remotes {
        remote.disconnect();
    }
    step(&mut host, &mut remotes);
    host.stop_server();
    log_events("host", &mut host);
    Ok(())
}

fn peer(hub: &LoopbackHub, config: &DemoConfig) -> Peer {
    Network::new(
        hub.transport(),
        config.network.clone(),
        game::prefabs(config.trophy_kills),
        game::registry(),
    )
}

fn step(host: &mut Peer, remotes: &mut [Peer]) {
    host.tick();
    log_events("host", host);
    for (index, remote) in remotes.iter_mut().enumerate() {
        remote.tick();
        log_events(&format!("client {}", index + 1), remote);
    }
}

/// Fires from this peer's own gunner, if it has one yet.
fn fire(peer: &mut Peer) -> Result<()> {
    let own = peer
        .world()
        .entities()
        .find(|e| e.prefab() == GUNNER_PREFAB && e.has_authority())
        .map(|e| e.id());
    let Some(component) = own.and_then(|id| peer.find_component::<Gunner>(id)) else {
        return Ok(());
    };
    peer.send_command(component, "Fire", vec![Value::Int(1)])?;
    Ok(())
}

fn log_events(label: &str, peer: &mut Peer) {
    for event in peer.drain_events() {
        match event {
            NetworkEvent::ClientConnected { connection, is_host } => {
                info!("[{}] {} joined{}", label, connection, if is_host { " (host)" } else { "" });
            }
            NetworkEvent::ClientDisconnected {
                connection,
                reason,
                destroyed,
            } => {
                info!(
                    "[{}] {} {} ({} entities removed)",
                    label,
                    connection,
                    reason.as_str(),
                    destroyed
                );
            }
            NetworkEvent::EntitySpawned {
                entity,
                prefab: TROPHY_PREFAB,
            } => {
                info!("[{}] trophy {} awarded", label, entity);
            }
            NetworkEvent::CallRejected {
                category,
                connection,
                error,
            } => {
                warn!("[{}] rejected {} from {:?}: {}", label, category, connection, error);
            }
            NetworkEvent::ConnectedToServer => info!("[{}] connected", label),
            NetworkEvent::DisconnectedFromServer => info!("[{}] disconnected", label),
            other => debug!("[{}] {:?}", label, other),
        }
    }
}

fn report(host: &Peer) {
    let Some(connections) = host.connections() else {
        return;
    };
    info!("Final scores:");
    for connection in connections.iter() {
        let kills = connection
            .player_entity()
            .and_then(|entity| host.find_component::<Gunner>(entity))
            .and_then(|component| host.behaviour::<Gunner>(component))
            .map_or(0, |gunner| gunner.kills);
        let trophies = host
            .world()
            .owned_by(connection.id())
            .into_iter()
            .filter(|id| host.entity(*id).is_some_and(|e| e.prefab() == TROPHY_PREFAB))
            .count();
        info!("  {}: {} kills, {} trophies", connection.id(), kills, trophies);
    }

    let stats = host.stats();
    info!(
        "Host sent {} frames ({} bytes), applied {} calls, rejected {}",
        stats.frames_sent, stats.bytes_sent, stats.calls_applied, stats.calls_rejected
    );
}
