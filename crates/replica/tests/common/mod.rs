#![allow(dead_code)]

use glam::Vec3;
use replica::{
    ArgumentError, Args, Behaviour, BehaviourRegistry, CallContext, ClientEvents, ComponentInfo,
    ComponentRef, ConnectionId, EntityId, Frame, Message, MethodKind, Network, NetworkConfig,
    Params, PrefabTable, Registrar, SendTarget, ServerEvents, Transport, TransportError, Value,
    ValueKind,
};

pub const EMPTY_PREFAB: usize = 0;
pub const PLAYER_PREFAB: usize = 1;
pub const TURRET_PREFAB: usize = 2;

/// Transport that records outbound frames and lets tests raise notifications.
#[derive(Default)]
pub struct RecordingTransport {
    pub server_events: Option<ServerEvents>,
    pub client_events: Option<ClientEvents>,
    pub sent: Vec<(SendTarget, Frame)>,
    pub client_sent: Vec<Frame>,
    pub kicked: Vec<ConnectionId>,
    pub listening: bool,
    /// Targeted sends to these connections fail.
    pub unreachable: Vec<ConnectionId>,
    /// Reported as the local client's connection.
    pub local: Option<ConnectionId>,
}

impl RecordingTransport {
    pub fn server_events(&self) -> ServerEvents {
        self.server_events.clone().expect("server not started")
    }

    pub fn client_events(&self) -> ClientEvents {
        self.client_events.clone().expect("client not connecting")
    }
}

impl Transport for RecordingTransport {
    fn start_server(
        &mut self,
        _max_connections: usize,
        events: ServerEvents,
    ) -> Result<(), TransportError> {
        self.server_events = Some(events);
        self.listening = true;
        Ok(())
    }

    fn stop_server(&mut self) {
        self.listening = false;
        self.server_events = None;
    }

    fn disconnect_client(&mut self, connection: ConnectionId) {
        self.kicked.push(connection);
        if let Some(events) = &self.server_events {
            events.disconnected(connection);
        }
    }

    fn server_send(&mut self, message: &Message, target: SendTarget) -> Result<(), TransportError> {
        if let SendTarget::Connection(id) = target {
            if self.unreachable.contains(&id) {
                return Err(TransportError::NotConnected);
            }
        }
        let frame =
            Frame::decode(message.as_bytes().to_vec()).expect("server sent an undecodable frame");
        self.sent.push((target, frame));
        Ok(())
    }

    fn client_connect(
        &mut self,
        _address: &str,
        events: ClientEvents,
    ) -> Result<(), TransportError> {
        events.connected();
        self.client_events = Some(events);
        Ok(())
    }

    fn client_disconnect(&mut self) {
        if let Some(events) = self.client_events.take() {
            events.disconnected();
        }
    }

    fn client_send(&mut self, message: &Message) -> Result<(), TransportError> {
        let frame =
            Frame::decode(message.as_bytes().to_vec()).expect("client sent an undecodable frame");
        self.client_sent.push(frame);
        Ok(())
    }

    fn local_connection(&self) -> Option<ConnectionId> {
        self.local
    }
}

/// Scorekeeping component.
#[derive(Debug, Default)]
pub struct Score {
    pub kills: i32,
    pub announcements: Vec<String>,
    pub whispers: Vec<String>,
    pub changed: Vec<String>,
    pub started: u32,
}

impl Behaviour for Score {
    fn name(&self) -> &str {
        "Score"
    }

    fn on_start(&mut self, _info: &ComponentInfo) {
        self.started += 1;
    }

    fn on_sync_var_changed(&mut self, field: &str) {
        self.changed.push(field.to_string());
    }

    fn register(reg: &mut Registrar<'_, Self>) {
        reg.command("Shoot", [ValueKind::Int], shoot)
            .rpc("Announce", [ValueKind::String], |score, _, args| {
                score.announcements.push(args.get(0)?);
                Ok(())
            })
            .target_rpc("Whisper", [ValueKind::String], |score, _, args| {
                score.whispers.push(args.get(0)?);
                Ok(())
            })
            .sync_var("Kills", |score| &mut score.kills);
    }
}

fn shoot(score: &mut Score, ctx: &mut CallContext, args: Args<'_>) -> Result<(), ArgumentError> {
    score.kills += args.get::<i32>(0)?;
    ctx.send_sync_var("Kills");
    ctx.send_rpc("Announce", vec![Value::from("shot")]);
    Ok(())
}

/// Movement component with a variadic method.
#[derive(Debug, Default)]
pub struct Mover {
    pub position: Vec3,
    pub trail: Vec<Vec3>,
}

impl Behaviour for Mover {
    fn name(&self) -> &str {
        "Mover"
    }

    fn register(reg: &mut Registrar<'_, Self>) {
        reg.command("Move", [ValueKind::Vec3], |mover, _, args| {
            mover.position = args.get(0)?;
            Ok(())
        })
        .method(
            MethodKind::Rpc,
            "Path",
            Params::Variadic(ValueKind::Vec3),
            |mover, _, args| {
                for index in 0..args.len() {
                    mover.trail.push(args.get(index)?);
                }
                Ok(())
            },
        );
    }
}

pub fn prefabs() -> PrefabTable {
    let mut prefabs = PrefabTable::new();
    prefabs.register("Empty", Vec::new);
    prefabs.register("Player", || -> Vec<Box<dyn Behaviour>> {
        vec![Box::new(Score::default()), Box::new(Mover::default())]
    });
    prefabs.register("Turret", || -> Vec<Box<dyn Behaviour>> { vec![Box::new(Score::default())] });
    prefabs
}

pub fn registry() -> BehaviourRegistry {
    let mut registry = BehaviourRegistry::new();
    registry.register::<Score>().register::<Mover>();
    registry
}

pub fn network(config: NetworkConfig) -> Network<RecordingTransport> {
    Network::new(RecordingTransport::default(), config, prefabs(), registry())
}

pub fn server_with(config: NetworkConfig) -> Network<RecordingTransport> {
    let mut net = network(config);
    net.start_server().unwrap();
    net
}

pub fn server() -> Network<RecordingTransport> {
    server_with(NetworkConfig::default())
}

/// Raises a transport connect for `id` and applies it.
pub fn connect(net: &mut Network<RecordingTransport>, id: u32) -> ConnectionId {
    let id = ConnectionId(id);
    net.transport().server_events().connected(id);
    net.tick();
    id
}

pub fn disconnect(net: &mut Network<RecordingTransport>, id: ConnectionId) {
    net.transport().server_events().disconnected(id);
    net.tick();
}

/// A client network that has completed its connect handshake.
pub fn client() -> Network<RecordingTransport> {
    let mut net = network(NetworkConfig::default());
    net.connect("test").unwrap();
    net.tick();
    assert!(net.is_client_connected());
    net
}

pub fn deliver(net: &mut Network<RecordingTransport>, frame: Frame) {
    let bytes = frame.encode(16 * 1024).unwrap().into_bytes();
    net.transport().client_events().received(bytes);
    net.tick();
}

pub fn command(
    net: &mut Network<RecordingTransport>,
    from: ConnectionId,
    call: replica::wire::RpcCall,
) {
    let bytes = Frame::Command(call).encode(16 * 1024).unwrap().into_bytes();
    net.transport().server_events().received(from, bytes);
}

pub fn take_sent(net: &mut Network<RecordingTransport>) -> Vec<(SendTarget, Frame)> {
    std::mem::take(&mut net.transport_mut().sent)
}

pub fn score_of(net: &Network<RecordingTransport>, entity: EntityId) -> &Score {
    let component = net.find_component::<Score>(entity).expect("entity has no score");
    net.behaviour::<Score>(component).unwrap()
}

pub fn score_ref(net: &Network<RecordingTransport>, entity: EntityId) -> ComponentRef {
    net.find_component::<Score>(entity).expect("entity has no score")
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
