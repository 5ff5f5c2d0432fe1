// Each integration test compiles as a separate binary that includes this module via `mod common;`.
// Not every test binary uses every helper, so Rust emits spurious dead_code warnings.
#![allow(dead_code)]
//! Shared in-memory fleet for gossipbench integration tests.
//!
//! A `MemoryFleet` stands in for DNS, the transport and the gossip router of a
//! whole benchmark fleet. Connections are symmetric; a publish floods the
//! connected component of the publisher.

use std::{
    collections::{BTreeSet, HashMap, HashSet, VecDeque},
    fmt, io,
    net::{IpAddr, Ipv4Addr},
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use gossipbench::{
    fingerprint, parse_ordinal, peer_id_for, AddressLookup, BenchObserver, Delivery, Host, HostError,
    PeerEndpoint, PeerResolver, PubSubError, Subscription, Topic,
};
use libp2p::PeerId;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{
    field::{Field, Visit},
    span::{Attributes, Id},
    Event, Subscriber,
};
use tracing_subscriber::{layer::Context, registry::LookupSpan, Layer};

pub const TEST_PORT: u16 = 9000;

/// Install a test subscriber once per binary
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// A log event together with the span it was emitted in
#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub message: String,
    pub fields: Vec<&'static str>,
    pub span: Option<&'static str>,
    pub ordinal: Option<u64>,
}

/// Layer recording every event with its enclosing span and that span's `ordinal`
#[derive(Clone, Default)]
pub struct EventCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl EventCapture {
    pub fn matching(&self, message: &str) -> Vec<CapturedEvent> {
        self.events.lock().unwrap().iter().filter(|event| event.message == message).cloned().collect()
    }
}

struct SpanOrdinal(u64);

#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    fields: Vec<&'static str>,
    ordinal: Option<u64>,
}

impl Visit for FieldVisitor {
    fn record_u64(&mut self, field: &Field, value: u64) {
        if field.name() == "ordinal" {
            self.ordinal = Some(value);
        }
        self.fields.push(field.name());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{value:?}"));
        } else {
            self.fields.push(field.name());
        }
    }
}

impl<S> Layer<S> for EventCapture
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        attrs.record(&mut visitor);
        if let (Some(ordinal), Some(span)) = (visitor.ordinal, ctx.span(id)) {
            span.extensions_mut().insert(SpanOrdinal(ordinal));
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let (span, ordinal) = match ctx.event_span(event) {
            Some(span) => {
                let extensions = span.extensions();
                let ordinal = extensions.get::<SpanOrdinal>().map(|ordinal| ordinal.0);
                (Some(span.name()), ordinal)
            }
            None => (None, None),
        };

        self.events.lock().unwrap().push(CapturedEvent {
            message: visitor.message.unwrap_or_default(),
            fields: visitor.fields,
            span,
            ordinal,
        });
    }
}

#[derive(Default)]
struct FleetState {
    /// Adjacency, always symmetric
    connections: HashMap<u64, BTreeSet<u64>>,

    /// Dial attempts per dialing ordinal, in order
    dials: HashMap<u64, Vec<u64>>,

    /// Ordinals whose hostname does not resolve
    unresolvable: HashSet<u64>,

    /// Ordinals that refuse connections
    unreachable: HashSet<u64>,

    subscribers: HashMap<u64, mpsc::UnboundedSender<Delivery>>,

    /// Payloads accepted by `publish`
    published: Vec<Vec<u8>>,
}

/// Shared in-memory network for a fleet of `node_count` nodes
#[derive(Clone)]
pub struct MemoryFleet {
    node_count: u64,
    state: Arc<Mutex<FleetState>>,
}

impl MemoryFleet {
    pub fn new(node_count: u64) -> Self {
        Self { node_count, state: Arc::new(Mutex::new(FleetState::default())) }
    }

    pub fn set_unresolvable(&self, ordinals: impl IntoIterator<Item = u64>) {
        self.state.lock().unwrap().unresolvable.extend(ordinals);
    }

    pub fn set_unreachable(&self, ordinals: impl IntoIterator<Item = u64>) {
        self.state.lock().unwrap().unreachable.extend(ordinals);
    }

    /// Connect two nodes without going through a dial
    pub fn link(&self, a: u64, b: u64) {
        let mut state = self.state.lock().unwrap();
        state.connections.entry(a).or_default().insert(b);
        state.connections.entry(b).or_default().insert(a);
    }

    pub fn dials_of(&self, ordinal: u64) -> Vec<u64> {
        self.state.lock().unwrap().dials.get(&ordinal).cloned().unwrap_or_default()
    }

    pub fn neighbours_of(&self, ordinal: u64) -> BTreeSet<u64> {
        self.state.lock().unwrap().connections.get(&ordinal).cloned().unwrap_or_default()
    }

    pub fn published(&self) -> Vec<Vec<u8>> {
        self.state.lock().unwrap().published.clone()
    }

    pub fn host(&self, ordinal: u64) -> MemoryHost {
        MemoryHost { ordinal, fleet: self.clone() }
    }

    pub fn resolver(&self) -> PeerResolver<MemoryLookup> {
        PeerResolver::new(MemoryLookup { fleet: self.clone() }, TEST_PORT)
    }

    pub fn topic(&self, ordinal: u64, name: &str) -> MemoryTopic {
        MemoryTopic { ordinal, name: name.to_string(), fleet: self.clone() }
    }

    /// Route deliveries of every topic to `ordinal`
    pub fn subscribe(&self, ordinal: u64, name: &str) -> MemorySubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        self.state.lock().unwrap().subscribers.insert(ordinal, tx);
        MemorySubscription { topic: name.to_string(), rx }
    }

    /// Drop the delivery queue of `ordinal`, closing its subscription
    pub fn unsubscribe(&self, ordinal: u64) {
        self.state.lock().unwrap().subscribers.remove(&ordinal);
    }
}

/// Address of `ordinal` inside the fleet
fn address_of(ordinal: u64) -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(10, (ordinal >> 16) as u8, (ordinal >> 8) as u8, ordinal as u8))
}

/// Hostname lookup against the fleet
pub struct MemoryLookup {
    fleet: MemoryFleet,
}

#[async_trait]
impl AddressLookup for MemoryLookup {
    async fn lookup(&self, hostname: &str) -> io::Result<Vec<IpAddr>> {
        let ordinal =
            parse_ordinal(hostname).map_err(|e| io::Error::new(io::ErrorKind::NotFound, e.to_string()))?;
        let state = self.fleet.state.lock().unwrap();
        if ordinal >= self.fleet.node_count || state.unresolvable.contains(&ordinal) {
            return Err(io::Error::new(io::ErrorKind::NotFound, format!("{hostname} not found")));
        }
        Ok(vec![address_of(ordinal)])
    }
}

/// Host of one fleet member
pub struct MemoryHost {
    ordinal: u64,
    fleet: MemoryFleet,
}

#[async_trait]
impl Host for MemoryHost {
    fn local_peer_id(&self) -> PeerId {
        peer_id_for(self.ordinal).unwrap()
    }

    async fn connect(&self, endpoint: &PeerEndpoint, _deadline: Duration) -> Result<(), HostError> {
        {
            let mut state = self.fleet.state.lock().unwrap();
            state.dials.entry(self.ordinal).or_default().push(endpoint.ordinal);
            if state.unreachable.contains(&endpoint.ordinal) {
                return Err(HostError::Dial { peer: endpoint.peer_id, reason: "connection refused".into() });
            }
        }
        self.fleet.link(self.ordinal, endpoint.ordinal);
        Ok(())
    }

    async fn connected_peer_count(&self) -> Result<usize, HostError> {
        Ok(self.fleet.neighbours_of(self.ordinal).len())
    }
}

/// Topic handle of one fleet member
pub struct MemoryTopic {
    ordinal: u64,
    name: String,
    fleet: MemoryFleet,
}

#[async_trait]
impl Topic for MemoryTopic {
    fn name(&self) -> &str {
        &self.name
    }

    async fn publish(&self, payload: Vec<u8>) -> Result<(), PubSubError> {
        let mut state = self.fleet.state.lock().unwrap();
        if state.connections.get(&self.ordinal).is_none_or(BTreeSet::is_empty) {
            return Err(PubSubError::Publish { topic: self.name.clone(), reason: "no peers".into() });
        }

        // Flood the connected component, each node hearing it from its BFS parent
        let mut seen = HashSet::from([self.ordinal]);
        let mut queue = VecDeque::from([self.ordinal]);
        while let Some(current) = queue.pop_front() {
            let neighbours = state.connections.get(&current).cloned().unwrap_or_default();
            for neighbour in neighbours {
                if !seen.insert(neighbour) {
                    continue;
                }
                queue.push_back(neighbour);
                if let Some(tx) = state.subscribers.get(&neighbour) {
                    let _ = tx.send(Delivery {
                        topic: self.name.clone(),
                        payload: payload.clone(),
                        source: None,
                        propagation_source: peer_id_for(current).unwrap(),
                        received_at: Utc::now(),
                    });
                }
            }
        }

        state.published.push(payload);
        Ok(())
    }
}

pub struct MemorySubscription {
    topic: String,
    rx: mpsc::UnboundedReceiver<Delivery>,
}

#[async_trait]
impl Subscription for MemorySubscription {
    async fn next(&mut self, cancel: &CancellationToken) -> Result<Option<Delivery>, PubSubError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Ok(None),
            delivery = self.rx.recv() => match delivery {
                Some(delivery) => Ok(Some(delivery)),
                None => Err(PubSubError::Closed { topic: self.topic.clone() }),
            },
        }
    }
}

/// Observer recording every lifecycle event
#[derive(Default)]
pub struct RecordingObserver {
    pub connected: Mutex<Vec<u64>>,
    pub published: Mutex<Vec<String>>,
    pub delivered: Mutex<Vec<String>>,
}

impl RecordingObserver {
    pub fn delivered_count(&self) -> usize {
        self.delivered.lock().unwrap().len()
    }
}

impl BenchObserver for RecordingObserver {
    fn peer_connected(&self, endpoint: &PeerEndpoint) {
        self.connected.lock().unwrap().push(endpoint.ordinal);
    }

    fn message_published(&self, _topic: &str, fingerprint: &str) {
        self.published.lock().unwrap().push(fingerprint.to_string());
    }

    fn message_delivered(&self, delivery: &Delivery, id: &str) {
        assert_eq!(id, fingerprint(&delivery.payload));
        self.delivered.lock().unwrap().push(id.to_string());
    }
}
