//! Scripted transports shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use shard_query::{
    ChannelOptions, Connector, Conversion, EndpointAddress, MethodTable, TaskKind, Transport,
    TransportError,
};

/// Shared record of transport events, in the order they happened.
pub type Journal = Arc<Mutex<Vec<String>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

/// A transport that answers every call after `delay` with `reply`.
#[derive(Debug)]
pub struct ScriptedTransport {
    pub name: String,
    pub delay: Duration,
    pub reply: Result<Value, TransportError>,
    pub journal: Journal,
    pub invocations: Mutex<Vec<(String, Value)>>,
    pub completed: AtomicUsize,
    pub terminated: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new(name: &str, reply: Result<Value, TransportError>, journal: &Journal) -> Self {
        Self {
            name: name.to_string(),
            delay: Duration::ZERO,
            reply,
            journal: journal.clone(),
            invocations: Mutex::new(Vec::new()),
            completed: AtomicUsize::new(0),
            terminated: AtomicUsize::new(0),
        }
    }

    pub fn replying(name: &str, reply: Value, journal: &Journal) -> Arc<Self> {
        Arc::new(Self::new(name, Ok(reply), journal))
    }

    pub fn failing(name: &str, error: TransportError, journal: &Journal) -> Arc<Self> {
        Arc::new(Self::new(name, Err(error), journal))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn invocation_count(&self) -> usize {
        self.invocations.lock().len()
    }

    pub fn completed_count(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn invoke(&self, method: &str, payload: Value) -> Result<Value, TransportError> {
        self.journal.lock().push(format!("start:{}", self.name));
        self.invocations.lock().push((method.to_string(), payload));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.completed.fetch_add(1, Ordering::SeqCst);
        self.journal.lock().push(format!("done:{}", self.name));
        self.reply.clone()
    }

    async fn terminate(&self) -> Result<(), TransportError> {
        self.terminated.fetch_add(1, Ordering::SeqCst);
        self.journal.lock().push(format!("terminate:{}", self.name));
        Ok(())
    }

    fn transport_type(&self) -> &'static str {
        "scripted"
    }
}

/// Hands out pre-built transports by port and counts connection attempts.
#[derive(Debug, Default)]
pub struct ScriptedConnector {
    pub transports: HashMap<u16, Arc<ScriptedTransport>>,
    pub connects: Mutex<Vec<EndpointAddress>>,
    pub options_seen: Mutex<Vec<ChannelOptions>>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, port: u16, transport: Arc<ScriptedTransport>) -> Self {
        self.transports.insert(port, transport);
        self
    }

    pub fn connect_count(&self) -> usize {
        self.connects.lock().len()
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(
        &self,
        address: &EndpointAddress,
        options: &ChannelOptions,
    ) -> Result<Arc<dyn Transport>, TransportError> {
        self.connects.lock().push(address.clone());
        self.options_seen.lock().push(*options);
        match self.transports.get(&address.port) {
            Some(transport) => Ok(transport.clone() as Arc<dyn Transport>),
            None => Err(TransportError::ConnectionRefused(address.to_string())),
        }
    }
}

/// Table with a pass-through `text-generation` conversion.
pub fn passthrough_table() -> Arc<MethodTable> {
    Arc::new(MethodTable::new().with_conversion(
        TaskKind::TextGeneration,
        Conversion::new("GeneratorReply", |request, _options| Ok(request.clone())),
    ))
}

pub fn request(text: &str) -> Value {
    json!({ "query": [text] })
}
