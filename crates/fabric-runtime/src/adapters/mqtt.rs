//! The MQTT Adapter: drives a [`fabric_mqtt::Client`] over a [`TcpTransport`], turning inbound
//! PUBLISH frames into [`MqttRecord`]s on the Distributor and draining ingress Records back out
//! as publishes/subscribes/unsubscribes (§4.1, §4.3).

use std::sync::Mutex;
use std::time::Duration;

use fabric_core::{Record, RecordKind};
use fabric_mqtt::{Client, Event, Options, ProtocolVersion, QoS};
use fabric_transport::TcpTransport;

use crate::adapter::{Adapter, AdapterCore};
use crate::errors::AdapterError;
use crate::records::MqttRecord;
use crate::translator::Translator;

/// Static construction parameters read out of the `[mqtt.*]` config section.
pub struct MqttAdapterConfig {
    pub broker_addr: String,
    pub client_id: String,
    pub version: u8,
    pub keep_alive_secs: u16,
    pub clean_session: bool,
    pub username: Option<String>,
    pub password: Option<Vec<u8>>,
    pub subscriptions: Vec<(String, QoS)>,
    pub connect_timeout: Duration,
}

pub struct MqttAdapter {
    core: AdapterCore,
    client: Mutex<Client<TcpTransport>>,
    subscriptions: Vec<(String, QoS)>,
    connect_timeout: Duration,
}

impl MqttAdapter {
    pub fn new(name: impl Into<String>, plag_id: u64, cfg: MqttAdapterConfig) -> Self {
        let protocol_version = if cfg.version == 5 {
            ProtocolVersion::V5
        } else {
            ProtocolVersion::V311
        };
        let transport = TcpTransport::new(cfg.broker_addr, fabric_transport::DEFAULT_RECV_TIMEOUT);
        let client = Client::new(
            transport,
            Options {
                protocol_version,
                client_id: cfg.client_id,
                keep_alive_secs: cfg.keep_alive_secs,
                clean_session: cfg.clean_session,
                username: cfg.username,
                password: cfg.password,
            },
        );

        MqttAdapter {
            core: AdapterCore::new(name, plag_id),
            client: Mutex::new(client),
            subscriptions: cfg.subscriptions,
            connect_timeout: cfg.connect_timeout,
        }
    }

    fn try_connect(&self) -> bool {
        let mut client = self.client.lock().unwrap();
        match client.connect(self.connect_timeout) {
            Ok(_) => {
                for (filter, qos) in &self.subscriptions {
                    if let Err(e) = client.subscribe(&[(filter.as_str(), *qos)]) {
                        log::warn!("{}: initial subscribe to {filter} failed: {e}", self.core.name());
                    }
                }
                true
            }
            Err(e) => {
                log::warn!("{}: connect failed: {e}", self.core.name());
                false
            }
        }
    }

    fn drain_one_ingress(&self, client: &mut Client<TcpTransport>) -> bool {
        let Some(record) = self.core.ingress.pop() else {
            return false;
        };

        let action = record.get_field("action").map(|v| v.to_string()).unwrap_or_default();
        let result = match action.as_str() {
            "publish" => {
                let topic = record.get_field("topic").map(|v| v.to_string()).unwrap_or_default();
                let payload = record.get_field("payload").map(|v| v.as_bytes().to_vec()).unwrap_or_default();
                let qos = match record.get_field("qos").map(|v| v.to_uint(0)).unwrap_or(0) {
                    1 => QoS::AtLeastOnce,
                    2 => QoS::ExactlyOnce,
                    _ => QoS::AtMostOnce,
                };
                let retain = record.get_field("retain").map(|v| v.to_uint(0) != 0).unwrap_or(false);
                client.publish(&topic, &payload, qos, retain)
            }
            "subscribe" => {
                let topic = record.get_field("topic").map(|v| v.to_string()).unwrap_or_default();
                client.subscribe(&[(topic.as_str(), QoS::AtMostOnce)]).map(|_| ())
            }
            "unsubscribe" => {
                let topic = record.get_field("topic").map(|v| v.to_string()).unwrap_or_default();
                client.unsubscribe(&[topic.as_str()]).map(|_| ())
            }
            other => {
                log::warn!("{}: ingress record with unknown action {other:?}; dropping", self.core.name());
                Ok(())
            }
        };

        if let Err(e) = result {
            log::warn!("{}: ingress record dropped: {e}", self.core.name());
        }
        true
    }
}

impl Adapter for MqttAdapter {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn plag_id(&self) -> u64 {
        self.core.plag_id()
    }

    fn kind(&self) -> RecordKind {
        RecordKind::Mqtt
    }

    fn init(&self) -> Result<(), AdapterError> {
        if !self.try_connect() {
            return Err(AdapterError::Other(format!("{}: initial MQTT connect failed", self.core.name())));
        }
        Ok(())
    }

    fn step(&self) -> bool {
        let mut client = self.client.lock().unwrap();

        if client.state() != fabric_mqtt::State::Connected {
            drop(client);
            return self.try_connect();
        }

        let events = match client.step() {
            Ok(events) => events,
            Err(e) => {
                log::warn!("{}: step error: {e}", self.core.name());
                Vec::new()
            }
        };

        let mut progressed = !events.is_empty();
        for event in events {
            if let Event::Publish { topic, payload, qos, retain, .. } = event {
                let record = MqttRecord::publish(self.core.name(), topic, payload, qos as u8, retain);
                self.core.distributor.dispatch(&record);
            }
        }

        progressed |= self.drain_one_ingress(&mut client);
        progressed
    }

    fn stop(&self) {
        self.core.stop();
        if let Ok(mut client) = self.client.lock() {
            let _ = client.disconnect();
        }
    }

    fn is_stopped(&self) -> bool {
        self.core.is_stopped()
    }

    fn enqueue(&self, record: Box<dyn Record + Send>) {
        self.core.ingress.push(record);
    }

    fn new_record(&self, source_record_id: u64) -> Box<dyn Record + Send> {
        Box::new(MqttRecord::new(self.core.name(), source_record_id))
    }

    fn attach_translator(&self, translator: Translator) {
        self.core.distributor.attach(translator);
    }
}
