//! Builds the Adapter/Translator topology from an [`IniConfig`] and hands back the set of
//! `Arc<dyn Adapter>`s the binary spawns one worker thread per (§4.6).
//!
//! Config shape, one section per Adapter instance, instance name following the dot:
//!
//! ```text
//! [mqtt.broker]
//! broker = 10.0.0.5:1883
//! clientId = plagn-router
//! version = 4
//! keepAlive = 60
//! cleanSession = true
//! subscribe[1] = sensors/#
//! subscribe[1].qos = 1
//!
//! [modbus.plc]
//! serverIP = 10.0.0.9
//! port = 502
//! unitId = 1
//! pollIntervalMs = 1000
//! poll[1].fc = 3
//! poll[1].address = 0
//! poll[1].quantity = 10
//!
//! [translator.plc-to-broker]
//! source = plc
//! target = broker
//! rewrite.topic = "plant/temp"
//! rewrite.payload = register
//! ```
//!
//! Every other key in a `[translator.*]` section, after stripping the `rewrite.` prefix, is one
//! row of that Translator's rewrite table.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use fabric_config::{ConfigExt, IniConfig};
use fabric_modbus::FunctionCode;
use fabric_mqtt::QoS;
use fabric_runtime::adapters::{HttpServerAdapter, ModbusAdapter, ModbusAdapterConfig, MqttAdapter, MqttAdapterConfig, PollRequest, UdpAdapter};
use fabric_runtime::{parse_rewrite_table, Adapter, AdapterRegistry, Translator};

const REWRITE_PREFIX: &str = "rewrite.";

/// A fully wired topology: every Adapter the config named, ready to have `init()`/`run()` called.
pub struct Topology {
    pub adapters: Vec<Arc<dyn Adapter>>,
}

pub fn build(config: &IniConfig) -> Result<Topology> {
    let mut registry = AdapterRegistry::new();

    for section in collect(config, "mqtt.") {
        let name = strip_prefix(&section, "mqtt.");
        let adapter = build_mqtt(config, &section, name)?;
        registry.insert(Arc::new(adapter));
    }

    for section in collect(config, "modbus.") {
        let name = strip_prefix(&section, "modbus.");
        let adapter = build_modbus(config, &section, name)?;
        registry.insert(Arc::new(adapter));
    }

    for section in collect(config, "http.") {
        let name = strip_prefix(&section, "http.");
        registry.insert(Arc::new(HttpServerAdapter::new(name, plag_id(&section))));
    }

    for section in collect(config, "udp.") {
        let name = strip_prefix(&section, "udp.");
        registry.insert(Arc::new(UdpAdapter::new(name, plag_id(&section))));
    }

    for section in collect(config, "translator.") {
        attach_translator(config, &registry, &section)?;
    }

    let adapters: Vec<Arc<dyn Adapter>> = registry.iter().cloned().collect();
    if adapters.is_empty() {
        bail!("config defines no adapters (no [mqtt.*]/[modbus.*]/[http.*]/[udp.*] sections)");
    }
    Ok(Topology { adapters })
}

fn collect(config: &IniConfig, prefix: &str) -> Vec<String> {
    let mut names: Vec<String> = config.sections_with_prefix(prefix).map(str::to_string).collect();
    names.sort();
    names
}

fn strip_prefix<'a>(section: &'a str, prefix: &str) -> &'a str {
    section.strip_prefix(prefix).unwrap_or(section)
}

/// Adapters don't expose a config key for this today; deterministic and stable per run is all
/// that's needed since `plag_id` only threads through to log lines, never compared across runs.
fn plag_id(section: &str) -> u64 {
    section.bytes().fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64))
}

fn build_mqtt(config: &IniConfig, section: &str, name: &str) -> Result<MqttAdapter> {
    let broker_addr = config.require(section, "broker").with_context(|| format!("[{section}]"))?.to_string();
    let client_id = config.get_str(section, "clientId", name).to_string();
    let version = config.get_i64(section, "version", 4)? as u8;
    let keep_alive_secs = config.get_u16(section, "keepAlive", 60)?;
    let clean_session = config.get_bool(section, "cleanSession", true)?;
    let username = config.get(section, "username").map(str::to_string);
    let password = config.get(section, "password").map(|p| p.as_bytes().to_vec());
    let connect_timeout = Duration::from_millis(config.get_i64(section, "connectTimeoutMs", 5000)? as u64);

    let mut subscriptions = Vec::new();
    for i in 1.. {
        let key = format!("subscribe[{i}]");
        let Some(topic) = config.get(section, &key) else { break };
        let qos = match config.get_i64(section, &format!("subscribe[{i}].qos"), 0)? {
            1 => QoS::AtLeastOnce,
            2 => QoS::ExactlyOnce,
            _ => QoS::AtMostOnce,
        };
        subscriptions.push((topic.to_string(), qos));
    }

    Ok(MqttAdapter::new(
        name,
        plag_id(section),
        MqttAdapterConfig {
            broker_addr,
            client_id,
            version,
            keep_alive_secs,
            clean_session,
            username,
            password,
            subscriptions,
            connect_timeout,
        },
    ))
}

fn build_modbus(config: &IniConfig, section: &str, name: &str) -> Result<ModbusAdapter> {
    let server_ip = config.require(section, "serverIP").with_context(|| format!("[{section}]"))?;
    let port = config.get_u16(section, "port", 502)?;
    let server_addr = format!("{server_ip}:{port}");
    let unit_id = config.get_i64(section, "unitId", 1)? as u8;
    let poll_interval = Duration::from_millis(config.get_i64(section, "pollIntervalMs", 1000)? as u64);
    let connect_timeout = Duration::from_millis(config.get_i64(section, "connectTimeoutMs", 5000)? as u64);

    let mut poll_list = Vec::new();
    for i in 1.. {
        let fc_key = format!("poll[{i}].fc");
        let Some(fc_raw) = config.get(section, &fc_key) else { break };
        let fc = fc_raw.parse::<u8>().with_context(|| format!("[{section}] {fc_key}"))?;
        let function_code = FunctionCode::from_u8(fc).with_context(|| format!("[{section}] {fc_key}: unknown function code {fc}"))?;
        let address = config.get_i64(section, &format!("poll[{i}].address"), 0)? as u16;
        let quantity = config.get_i64(section, &format!("poll[{i}].quantity"), 1)? as u16;
        poll_list.push(PollRequest { function_code, address, quantity });
    }

    Ok(ModbusAdapter::new(
        name,
        plag_id(section),
        ModbusAdapterConfig {
            server_addr,
            unit_id,
            poll_list,
            poll_interval,
            connect_timeout,
        },
    ))
}

fn attach_translator(config: &IniConfig, registry: &AdapterRegistry, section: &str) -> Result<()> {
    let source_name = config.require(section, "source").with_context(|| format!("[{section}]"))?.to_string();
    let target_name = config.require(section, "target").with_context(|| format!("[{section}]"))?.to_string();

    let Some(source) = registry.get(&source_name) else {
        bail!("[{section}] source {source_name:?} names no known adapter");
    };

    let raw_rewrite = rewrite_keys(config, section);
    let rewrite = parse_rewrite_table(&raw_rewrite).with_context(|| format!("[{section}] rewrite table"))?;
    let target = registry.weak(&target_name);
    source.attach_translator(Translator::new(source_name, target, rewrite));
    Ok(())
}

fn rewrite_keys(config: &IniConfig, section: &str) -> Vec<(String, String)> {
    config
        .keys_in(section)
        .filter_map(|key| key.strip_prefix(REWRITE_PREFIX).map(|target_key| (target_key.to_string(), config.get(section, key).unwrap().to_string())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_one_adapter_per_instance_section() {
        let config = IniConfig::parse(
            "[mqtt.broker]\nbroker = 127.0.0.1:1883\n\n[modbus.plc]\nserverIP = 127.0.0.1\npoll[1].fc = 3\npoll[1].address = 0\npoll[1].quantity = 4\n\n[udp.sink]\n",
        )
        .unwrap();
        let topology = build(&config).unwrap();
        let mut names: Vec<_> = topology.adapters.iter().map(|a| a.name().to_string()).collect();
        names.sort();
        assert_eq!(names, vec!["broker", "plc", "sink"]);
    }

    #[test]
    fn empty_config_is_rejected() {
        let config = IniConfig::parse("").unwrap();
        assert!(build(&config).is_err());
    }

    #[test]
    fn translator_wires_onto_source_distributor() {
        let config = IniConfig::parse(
            "[udp.a]\n[udp.b]\n[translator.a-to-b]\nsource = a\ntarget = b\nrewrite.payload = payload\n",
        )
        .unwrap();
        let topology = build(&config).unwrap();
        let source = topology.adapters.iter().find(|a| a.name() == "a").unwrap();
        // Dispatch is exercised end-to-end in fabric-runtime's own translator/distributor tests;
        // here we only check wiring didn't panic and produced an Adapter that still reports "a".
        assert_eq!(source.name(), "a");
    }

    #[test]
    fn unknown_translator_source_is_an_error() {
        let config = IniConfig::parse("[udp.a]\n[translator.x]\nsource = nope\ntarget = a\n").unwrap();
        assert!(build(&config).is_err());
    }

    #[test]
    fn unknown_modbus_function_code_is_rejected() {
        let config = IniConfig::parse("[modbus.plc]\nserverIP = 127.0.0.1\npoll[1].fc = 250\n").unwrap();
        assert!(build(&config).is_err());
    }
}
