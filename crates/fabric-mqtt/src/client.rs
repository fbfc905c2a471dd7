//! The blocking MQTT client state machine (§4.1 "Client state machine").
//!
//! Drives a single [`fabric_transport::Transport`] through
//! `Disconnected → TcpConnecting → MqttConnecting → Connected`, owns the QoS 1/2
//! [`RetryTable`](crate::retry::RetryTable), and turns inbound PUBLISH frames into owned
//! [`Event`]s so callers never have to fight the packet codec's borrowed lifetimes.

use std::time::{Duration, Instant};

use fabric_transport::Transport;

use crate::errors::MqttError;
use crate::packet::*;
use crate::retry::RetryTable;

/// Where the client currently is in the connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// No transport connection, no session.
    Disconnected,
    /// `Transport::connect` is in flight.
    TcpConnecting,
    /// TCP is up; CONNECT has been sent and CONNACK is awaited.
    MqttConnecting,
    /// CONNACK with reason 0 received; normal I/O may proceed.
    Connected,
}

/// Something the client observed this step that the owning Adapter needs to act on.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The broker closed the connection or a keep-alive deadline was missed.
    Disconnected,
    /// A PUBLISH arrived; already ack'd (QoS 1: PUBACK, QoS 2: PUBREC) if required.
    Publish {
        /// The matched topic name.
        topic: String,
        /// The raw application payload.
        payload: Vec<u8>,
        /// Delivery guarantee the broker used.
        qos: QoS,
        /// Whether the broker marked this as a retained message.
        retain: bool,
        /// Whether this is a redelivery.
        dup: bool,
    },
    /// SUBACK for a previously issued SUBSCRIBE.
    SubscribeAck {
        /// The SUBSCRIBE packet identifier this acknowledges.
        packet_id: u16,
    },
    /// UNSUBACK for a previously issued UNSUBSCRIBE.
    UnsubscribeAck {
        /// The UNSUBSCRIBE packet identifier this acknowledges.
        packet_id: u16,
    },
}

/// Connection parameters fixed for the lifetime of a [`Client`].
pub struct Options {
    /// `4` for MQTT v3.1.1, `5` for MQTT v5.
    pub protocol_version: ProtocolVersion,
    /// The client identifier sent in CONNECT.
    pub client_id: String,
    /// Keep-alive interval in seconds; also the QoS 1/2 resend threshold.
    pub keep_alive_secs: u16,
    /// Whether to request a clean (non-persistent) session.
    pub clean_session: bool,
    /// Optional username for CONNECT.
    pub username: Option<String>,
    /// Optional password for CONNECT.
    pub password: Option<Vec<u8>>,
}

/// A blocking MQTT client bound to a single [`Transport`].
pub struct Client<T: Transport> {
    transport: T,
    opts: Options,
    state: State,
    retry: RetryTable,
    inbuf: Vec<u8>,
    last_send: Instant,
    last_recv: Instant,
}

enum Frame {
    NeedMore,
    /// Total byte length of a complete frame sitting at the front of the buffer.
    Complete(usize),
    /// The variable-length-integer encoding ran past its 4-byte limit.
    Malformed,
}

fn frame_len(buf: &[u8]) -> Frame {
    if buf.is_empty() {
        return Frame::NeedMore;
    }
    let mut remaining: usize = 0;
    for i in 0..4 {
        let idx = 1 + i;
        if idx >= buf.len() {
            return Frame::NeedMore;
        }
        let b = buf[idx];
        remaining |= usize::from(b & 0x7F) << (7 * i);
        if b & 0x80 == 0 {
            let header_len = idx + 1;
            let total = header_len + remaining;
            return if buf.len() < total {
                Frame::NeedMore
            } else {
                Frame::Complete(total)
            };
        }
    }
    Frame::Malformed
}

impl<T: Transport> Client<T> {
    /// Construct a client around an unconnected transport.
    pub fn new(transport: T, opts: Options) -> Self {
        let now = Instant::now();
        Client {
            transport,
            opts,
            state: State::Disconnected,
            retry: RetryTable::new(),
            inbuf: Vec::new(),
            last_send: now,
            last_recv: now,
        }
    }

    /// The client's current state.
    pub fn state(&self) -> State {
        self.state
    }

    fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.opts.keep_alive_secs as u64)
    }

    fn send_packet(&mut self, packet: Packet<'_>) -> Result<(), MqttError> {
        let mut buf = Vec::with_capacity(packet.size());
        packet.write_to(&mut buf);
        self.transport.send(&buf)?;
        self.last_send = Instant::now();
        Ok(())
    }

    fn build_connect(&self) -> Connect<'_> {
        Connect {
            protocol_version: self.opts.protocol_version,
            clean_session: self.opts.clean_session,
            keep_alive: self.opts.keep_alive_secs,
            properties: None,
            client_id: &self.opts.client_id,
            last_will: None,
            username: self.opts.username.as_deref(),
            password: self.opts.password.as_deref(),
        }
    }

    /// Connect the transport and complete the CONNECT/CONNACK handshake within `timeout`.
    /// Leaves the client in [`State::Connected`] on success; reverts to
    /// [`State::Disconnected`] and disconnects the transport on any failure.
    pub fn connect(&mut self, timeout: Duration) -> Result<bool, MqttError> {
        self.state = State::TcpConnecting;
        if let Err(e) = self.transport.connect(timeout) {
            self.state = State::Disconnected;
            return Err(e.into());
        }

        self.state = State::MqttConnecting;
        self.inbuf.clear();

        let mut raw = Vec::new();
        {
            let connect = self.build_connect();
            Packet::Connect(connect).write_to(&mut raw);
        }
        if let Err(e) = self.transport.send(&raw) {
            self.state = State::Disconnected;
            self.transport.disconnect();
            return Err(e.into());
        }
        self.last_send = Instant::now();

        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() >= deadline {
                self.state = State::Disconnected;
                self.transport.disconnect();
                return Err(MqttError::KeepAliveTimeout(timeout.as_secs()));
            }

            match self.transport.recv_bytes(0) {
                Ok(chunk) => self.inbuf.extend_from_slice(&chunk),
                Err(e) => {
                    self.state = State::Disconnected;
                    self.transport.disconnect();
                    return Err(e.into());
                }
            }

            match frame_len(&self.inbuf) {
                Frame::NeedMore => continue,
                Frame::Malformed => {
                    self.state = State::Disconnected;
                    self.transport.disconnect();
                    return Err(MqttError::Malformed("CONNACK varint overflow".into()));
                }
                Frame::Complete(len) => {
                    let frame: Vec<u8> = self.inbuf.drain(..len).collect();
                    let (_, packet) = crate::decode::parse(&frame, self.opts.protocol_version)
                        .map_err(|e| MqttError::Malformed(format!("{e:?}")))?;

                    let ack = match packet {
                        Packet::ConnectAck(ack) => ack,
                        other => {
                            self.state = State::Disconnected;
                            self.transport.disconnect();
                            return Err(MqttError::Malformed(format!(
                                "expected CONNACK, got {other:?}"
                            )));
                        }
                    };

                    self.last_recv = Instant::now();

                    if ack.reason_code == 0 {
                        self.state = State::Connected;
                        return Ok(ack.session_present);
                    }

                    self.state = State::Disconnected;
                    self.transport.disconnect();
                    return Err(MqttError::ConnectRefused(ack.reason_code));
                }
            }
        }
    }

    /// Send DISCONNECT and tear down the transport.
    pub fn disconnect(&mut self) -> Result<(), MqttError> {
        if self.state == State::Connected {
            let _ = self.send_packet(Packet::Disconnect(Disconnect {
                reason_code: None,
                properties: None,
            }));
        }
        self.state = State::Disconnected;
        self.transport.disconnect();
        Ok(())
    }

    /// Publish `payload` to `topic`. QoS 1/2 packets are tracked in the retry table under a
    /// freshly allocated identifier.
    pub fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
    ) -> Result<(), MqttError> {
        let packet_id = if qos == QoS::AtMostOnce {
            None
        } else {
            Some(self.retry.next_id())
        };

        let publish = Publish {
            dup: false,
            retain,
            qos,
            topic_name: topic,
            packet_id,
            properties: None,
            payload,
        };

        if let Some(id) = packet_id {
            let mut raw = Vec::with_capacity(publish.size());
            Packet::Publish(publish.clone()).write_to(&mut raw);
            self.retry.track(id, raw);
        }

        self.send_packet(Packet::Publish(publish))
    }

    /// Issue a SUBSCRIBE for the given topic filter / QoS pairs, returning its packet id.
    pub fn subscribe(&mut self, filters: &[(&str, QoS)]) -> Result<u16, MqttError> {
        let packet_id = self.retry.next_id();
        self.send_packet(Packet::Subscribe(Subscribe {
            packet_id,
            properties: None,
            subscriptions: filters.to_vec(),
        }))?;
        Ok(packet_id)
    }

    /// Issue an UNSUBSCRIBE for the given topic filters, returning its packet id.
    pub fn unsubscribe(&mut self, filters: &[&str]) -> Result<u16, MqttError> {
        let packet_id = self.retry.next_id();
        self.send_packet(Packet::Unsubscribe(Unsubscribe {
            packet_id,
            properties: None,
            topic_filters: filters.to_vec(),
        }))?;
        Ok(packet_id)
    }

    /// One non-blocking chunk of work: drain whatever bytes are immediately available, decode as
    /// many complete frames as they yield, service keep-alive and the retry table, and return
    /// any events the caller needs to turn into Records. Never blocks longer than a single
    /// best-effort socket read.
    pub fn step(&mut self) -> Result<Vec<Event>, MqttError> {
        let mut events = Vec::new();

        if self.state != State::Connected {
            return Ok(events);
        }

        let available = self.transport.available_bytes();
        if available > 0 {
            match self.transport.peek_and_recv(available) {
                Ok(chunk) if !chunk.is_empty() => self.inbuf.extend_from_slice(&chunk),
                Ok(_) => {}
                Err(e) => {
                    self.state = State::Disconnected;
                    events.push(Event::Disconnected);
                    return Err(e.into());
                }
            }
        }

        loop {
            match frame_len(&self.inbuf) {
                Frame::NeedMore => break,
                Frame::Malformed => {
                    log::warn!("dropping malformed MQTT frame, resetting read buffer");
                    self.inbuf.clear();
                    break;
                }
                Frame::Complete(len) => {
                    let frame: Vec<u8> = self.inbuf.drain(..len).collect();
                    match crate::decode::parse(&frame, self.opts.protocol_version) {
                        Ok((_, packet)) => {
                            self.last_recv = Instant::now();
                            if let Some(event) = self.handle_packet(packet)? {
                                events.push(event);
                            }
                        }
                        Err(e) => {
                            log::warn!("dropping malformed MQTT frame: {e:?}");
                        }
                    }
                }
            }
        }

        self.service_keep_alive()?;

        if Instant::now().duration_since(self.last_recv) > self.keep_alive() * 2 {
            self.state = State::Disconnected;
            self.transport.disconnect();
            events.push(Event::Disconnected);
        }

        Ok(events)
    }

    fn handle_packet(&mut self, packet: Packet<'_>) -> Result<Option<Event>, MqttError> {
        match packet {
            Packet::Publish(publish) => {
                if let Some(id) = publish.packet_id {
                    match publish.qos {
                        QoS::AtLeastOnce => self.send_packet(Packet::PublishAck(PublishAck {
                            packet_id: id,
                            reason_code: None,
                            properties: None,
                        }))?,
                        QoS::ExactlyOnce => {
                            self.send_packet(Packet::PublishReceived(PublishReceived {
                                packet_id: id,
                                reason_code: None,
                                properties: None,
                            }))?
                        }
                        QoS::AtMostOnce => {}
                    }
                }
                Ok(Some(Event::Publish {
                    topic: publish.topic_name.to_string(),
                    payload: publish.payload.to_vec(),
                    qos: publish.qos,
                    retain: publish.retain,
                    dup: publish.dup,
                }))
            }
            Packet::PublishAck(ack) => {
                self.retry.remove(ack.packet_id);
                Ok(None)
            }
            Packet::PublishReceived(rec) => {
                self.send_packet(Packet::PublishRelease(PublishRelease {
                    packet_id: rec.packet_id,
                    reason_code: None,
                    properties: None,
                }))?;
                Ok(None)
            }
            Packet::PublishRelease(rel) => {
                self.send_packet(Packet::PublishComplete(PublishComplete {
                    packet_id: rel.packet_id,
                    reason_code: None,
                    properties: None,
                }))?;
                Ok(None)
            }
            Packet::PublishComplete(comp) => {
                self.retry.remove(comp.packet_id);
                Ok(None)
            }
            Packet::SubscribeAck(ack) => Ok(Some(Event::SubscribeAck {
                packet_id: ack.packet_id,
            })),
            Packet::UnsubscribeAck(ack) => Ok(Some(Event::UnsubscribeAck {
                packet_id: ack.packet_id,
            })),
            Packet::Pong => Ok(None),
            Packet::Disconnect(_) => {
                self.state = State::Disconnected;
                self.transport.disconnect();
                Ok(Some(Event::Disconnected))
            }
            other => {
                log::warn!("unexpected packet in Connected state: {other:?}");
                Ok(None)
            }
        }
    }

    fn service_keep_alive(&mut self) -> Result<(), MqttError> {
        if Instant::now().duration_since(self.last_send) >= self.keep_alive() {
            self.send_packet(Packet::Ping)?;
        }

        for (id, raw) in self.retry.due_for_resend(self.keep_alive()) {
            log::debug!("resending in-flight packet id {id}");
            self.transport.send(&raw)?;
            self.last_send = Instant::now();
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabric_transport::TransportError;
    use std::collections::VecDeque;

    struct MockTransport {
        connected: bool,
        inbound: VecDeque<u8>,
        sent: Vec<Vec<u8>>,
    }

    impl MockTransport {
        fn new() -> Self {
            MockTransport {
                connected: false,
                inbound: VecDeque::new(),
                sent: Vec::new(),
            }
        }

        fn push_inbound(&mut self, bytes: &[u8]) {
            self.inbound.extend(bytes.iter().copied());
        }
    }

    impl Transport for MockTransport {
        fn connect(&mut self, _timeout: Duration) -> Result<(), TransportError> {
            self.connected = true;
            Ok(())
        }

        fn disconnect(&mut self) {
            self.connected = false;
        }

        fn is_connected(&self) -> bool {
            self.connected
        }

        fn available_bytes(&mut self) -> usize {
            self.inbound.len()
        }

        fn recv_bytes(&mut self, n: usize) -> Result<Vec<u8>, TransportError> {
            let want = if n == 0 { self.inbound.len() } else { n };
            Ok((0..want.min(self.inbound.len()))
                .filter_map(|_| self.inbound.pop_front())
                .collect())
        }

        fn peek_and_recv(&mut self, n: usize) -> Result<Vec<u8>, TransportError> {
            if self.inbound.len() < n {
                return Ok(Vec::new());
            }
            Ok((0..n).filter_map(|_| self.inbound.pop_front()).collect())
        }

        fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
            self.sent.push(bytes.to_vec());
            Ok(())
        }
    }

    fn test_opts() -> Options {
        Options {
            protocol_version: ProtocolVersion::V311,
            client_id: "test-client".to_string(),
            keep_alive_secs: 60,
            clean_session: true,
            username: None,
            password: None,
        }
    }

    #[test]
    fn connect_success_reaches_connected_state() {
        let mut transport = MockTransport::new();
        transport.push_inbound(b"\x20\x02\x00\x00");
        let mut client = Client::new(transport, test_opts());

        let session_present = client.connect(Duration::from_millis(100)).unwrap();
        assert!(!session_present);
        assert_eq!(client.state(), State::Connected);
    }

    #[test]
    fn connect_refused_returns_to_disconnected() {
        let mut transport = MockTransport::new();
        transport.push_inbound(b"\x20\x02\x00\x05");
        let mut client = Client::new(transport, test_opts());

        let err = client.connect(Duration::from_millis(100)).unwrap_err();
        assert!(matches!(err, MqttError::ConnectRefused(5)));
        assert_eq!(client.state(), State::Disconnected);
    }

    #[test]
    fn publish_at_least_once_tracks_retry_entry() {
        let mut transport = MockTransport::new();
        transport.push_inbound(b"\x20\x02\x00\x00");
        let mut client = Client::new(transport, test_opts());
        client.connect(Duration::from_millis(100)).unwrap();

        client.publish("a/b", b"data", QoS::AtLeastOnce, false).unwrap();
        assert_eq!(client.retry.len(), 1);
    }

    #[test]
    fn step_decodes_publish_and_acks_qos1() {
        let mut transport = MockTransport::new();
        transport.push_inbound(b"\x20\x02\x00\x00");
        let mut client = Client::new(transport, test_opts());
        client.connect(Duration::from_millis(100)).unwrap();

        // PUBLISH qos=1 topic="t" packet_id=1 payload="hi"
        client
            .transport
            .push_inbound(b"\x32\x07\x00\x01t\x00\x01hi");

        let events = client.step().unwrap();
        assert_eq!(
            events,
            vec![Event::Publish {
                topic: "t".to_string(),
                payload: b"hi".to_vec(),
                qos: QoS::AtLeastOnce,
                retain: false,
                dup: false,
            }]
        );
        assert_eq!(client.transport.sent.len(), 1);
        assert_eq!(client.transport.sent[0][0] >> 4, 4); // PUBACK packet type
    }
}
