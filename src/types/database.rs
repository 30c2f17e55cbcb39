//! Database model (SlotMap-backed).
//!
//! The in-memory **CAN database** handed to the codec by format parsers.
//! Storage uses **SlotMap** arenas with **stable keys**: [`MessageKey`], [`NodeKey`], [`BusKey`].
//! Public iteration follows **order vectors** via `iter_messages()`, `iter_nodes()`, `iter_buses()`
//! and presentation can be reordered with `sort_messages_by_name()` / `sort_nodes_by_name()`.
//!
//! **Lookups** are O(1): `get_message_by_name`, `get_message_by_identifier`, `get_node_by_name`,
//! `get_bus_by_name`. Names are case-insensitive; identifiers match ID and format.
//!
//! Every message is validated when it is added (see [`DatabaseOptions`]); after loading, the
//! database is read-only for the codec and may be shared across threads.

use slotmap::{SlotMap, new_key_type};
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::codec::options::{DatabaseOptions, DecodeOptions, EncodeOptions};
use crate::types::{
    attributes::Attributes,
    bus::Bus,
    errors::{CodecError, DatabaseError},
    message::{Identifier, Message},
    node::Node,
    signal::Signal,
    value::SignalValues,
};

// --- Stable keys (SlotMap) ---
new_key_type! { pub struct MessageKey; }
new_key_type! { pub struct NodeKey; }
new_key_type! { pub struct BusKey; }

/// In-memory representation of a CAN database.
///
/// Holds metadata, the arenas of messages/nodes/buses (SlotMaps with stable keys),
/// order vectors that control iteration order, and normalized lookup maps.
///
/// # Example
/// ```
/// use can_codec::{Database, DecodeOptions, Identifier, Message, Signal, Value};
///
/// let mut db = Database::new();
/// db.add_message(
///     Message::new("Engine", Identifier::standard(0x100), 1, vec![Signal::new("Gear", 0, 4)])
///         .unwrap(),
/// )
/// .unwrap();
///
/// let values = db
///     .decode_message(Identifier::standard(0x100), &[0x03], &DecodeOptions::default())
///     .unwrap();
/// assert_eq!(values["Gear"], Value::Integer(3));
/// ```
#[derive(Default, Clone, Debug)]
pub struct Database {
    // --- General information ---
    pub version: Option<String>,
    pub comment: Option<String>,
    /// Database-level attributes.
    pub attributes: Attributes,

    options: DatabaseOptions,

    // --- Main storage (stable-key maps) ---
    messages: SlotMap<MessageKey, Message>,
    nodes: SlotMap<NodeKey, Node>,
    buses: SlotMap<BusKey, Bus>,

    // --- Order "views" ---
    messages_order: Vec<MessageKey>,
    nodes_order: Vec<NodeKey>,
    buses_order: Vec<BusKey>,

    // --- Lookups (case-normalized) ---
    msg_key_by_name: HashMap<String, MessageKey>, // lower(name) → MessageKey
    msg_keys_by_identifier: HashMap<Identifier, Vec<MessageKey>>, // bus frame → messages, insertion order
    node_key_by_name: HashMap<String, NodeKey>,   // lower(name) → NodeKey
    bus_key_by_name: HashMap<String, BusKey>,     // lower(name) → BusKey
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: DatabaseOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    pub fn options(&self) -> &DatabaseOptions {
        &self.options
    }

    // ------------- Buses ------------
    pub fn add_bus(&mut self, bus: Bus) -> Result<BusKey, DatabaseError> {
        let lower = bus.name.to_lowercase();
        if self.bus_key_by_name.contains_key(&lower) {
            return Err(DatabaseError::BusAlreadyExists { name: bus.name });
        }
        let key = self.buses.insert(bus);
        self.buses_order.push(key);
        self.bus_key_by_name.insert(lower, key);
        Ok(key)
    }

    pub fn get_bus_by_key(&self, key: BusKey) -> Option<&Bus> {
        self.buses.get(key)
    }

    /// Returns a `&Bus` given the name (case-insensitive).
    pub fn get_bus_by_name(&self, name: &str) -> Result<&Bus, DatabaseError> {
        self.bus_key_by_name
            .get(&name.to_lowercase())
            .and_then(|&k| self.buses.get(k))
            .ok_or_else(|| DatabaseError::BusNotFound {
                name: name.to_string(),
            })
    }

    // --------- Nodes --------
    pub fn add_node(&mut self, node: Node) -> Result<NodeKey, DatabaseError> {
        let lower = node.name.to_lowercase();
        if self.node_key_by_name.contains_key(&lower) {
            return Err(DatabaseError::NodeAlreadyExists { name: node.name });
        }
        let key = self.nodes.insert(node);
        self.nodes_order.push(key);
        self.node_key_by_name.insert(lower, key);
        Ok(key)
    }

    pub fn get_node_key_by_name(&self, name: &str) -> Option<NodeKey> {
        self.node_key_by_name.get(&name.to_lowercase()).copied()
    }

    pub fn get_node_by_key(&self, key: NodeKey) -> Option<&Node> {
        self.nodes.get(key)
    }

    pub fn get_node_by_key_mut(&mut self, key: NodeKey) -> Option<&mut Node> {
        self.nodes.get_mut(key)
    }

    /// Returns a `&Node` given the name (case-insensitive).
    pub fn get_node_by_name(&self, name: &str) -> Result<&Node, DatabaseError> {
        self.get_node_key_by_name(name)
            .and_then(|k| self.nodes.get(k))
            .ok_or_else(|| DatabaseError::NodeNotFound {
                name: name.to_string(),
            })
    }

    // ------------- Messages ------------
    /// Validates `message` against the database and stores it.
    ///
    /// Rejected when its name is taken, it names an unknown bus or node, two of its
    /// simultaneously active signals overlap (`strict` only), or its frame ID is
    /// already used on the same bus (unless collisions are allowed).
    pub fn add_message(&mut self, message: Message) -> Result<MessageKey, DatabaseError> {
        if let Err(e) = self.validate_message(&message) {
            tracing::warn!("Rejecting message '{}': {}", message.name, e);
            return Err(e);
        }

        let lower = message.name.to_lowercase();
        let identifier = message.identifier();
        let key = self.messages.insert(message);
        self.messages_order.push(key);
        self.msg_key_by_name.insert(lower, key);
        if let Identifier::Frame { .. } = identifier {
            self.msg_keys_by_identifier
                .entry(identifier)
                .or_default()
                .push(key);
        }
        Ok(key)
    }

    fn validate_message(&self, message: &Message) -> Result<(), DatabaseError> {
        if self.msg_key_by_name.contains_key(&message.name.to_lowercase()) {
            return Err(DatabaseError::MessageAlreadyExists {
                name: message.name.clone(),
            });
        }

        if let Some(bus) = message.bus_name.as_deref()
            && !self.buses.is_empty()
            && !self.bus_key_by_name.contains_key(&bus.to_lowercase())
        {
            return Err(DatabaseError::UnknownBus {
                message: message.name.clone(),
                bus: bus.to_string(),
            });
        }

        if !self.nodes.is_empty() {
            let receivers = message
                .signals()
                .iter()
                .chain(message.contained_messages().iter().flat_map(|m| m.signals()))
                .flat_map(|s| s.receivers.iter());
            for node in message.senders.iter().chain(receivers) {
                if self.get_node_key_by_name(node).is_none() {
                    return Err(DatabaseError::UnknownNode {
                        message: message.name.clone(),
                        node: node.clone(),
                    });
                }
            }
        }

        if self.options.strict {
            message.check_overlaps()?;
            for inner in message.contained_messages() {
                inner.check_overlaps()?;
            }
        }

        if !self.options.allow_frame_id_collisions && !message.is_container() {
            let identifier = message.identifier();
            let bus = message.bus_name.as_deref().map(str::to_lowercase);
            let clash = self.messages_with_identifier(identifier).find(|other| {
                !other.is_container() && other.bus_name.as_deref().map(str::to_lowercase) == bus
            });
            if let Some(other) = clash {
                return Err(DatabaseError::FrameIdAlreadyAssigned {
                    identifier,
                    existing: other.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Removes a message and drops it from every lookup.
    pub fn remove_message(&mut self, key: MessageKey) -> Result<Message, DatabaseError> {
        let message = self
            .messages
            .remove(key)
            .ok_or(DatabaseError::MessageMissing { key })?;
        self.messages_order.retain(|&k| k != key);
        self.msg_key_by_name.remove(&message.name.to_lowercase());
        let identifier = message.identifier();
        if let Some(keys) = self.msg_keys_by_identifier.get_mut(&identifier) {
            keys.retain(|&k| k != key);
            if keys.is_empty() {
                self.msg_keys_by_identifier.remove(&identifier);
            }
        }
        Ok(message)
    }

    pub fn get_msg_key_by_name(&self, name: &str) -> Option<MessageKey> {
        self.msg_key_by_name.get(&name.to_lowercase()).copied()
    }

    pub fn get_message_by_key(&self, key: MessageKey) -> Option<&Message> {
        self.messages.get(key)
    }

    /// Returns a `&Message` given the name (case-insensitive).
    pub fn get_message_by_name(&self, name: &str) -> Result<&Message, DatabaseError> {
        self.get_msg_key_by_name(name)
            .and_then(|k| self.messages.get(k))
            .ok_or_else(|| DatabaseError::MessageNotFound {
                name: name.to_string(),
            })
    }

    /// Returns the first message registered with `identifier` (ID and format), on any bus.
    ///
    /// A standard and an extended frame with the same numeric ID are different messages.
    pub fn get_message_by_identifier(
        &self,
        identifier: Identifier,
    ) -> Result<&Message, DatabaseError> {
        self.messages_with_identifier(identifier)
            .next()
            .ok_or(DatabaseError::FrameIdNotFound { identifier })
    }

    /// Returns the message with `identifier` on the bus called `bus` (case-insensitive).
    pub fn get_message_by_identifier_on_bus(
        &self,
        bus: &str,
        identifier: Identifier,
    ) -> Result<&Message, DatabaseError> {
        self.messages_with_identifier(identifier)
            .find(|m| {
                m.bus_name
                    .as_deref()
                    .is_some_and(|b| b.eq_ignore_ascii_case(bus))
            })
            .ok_or(DatabaseError::FrameIdNotFound { identifier })
    }

    fn messages_with_identifier(
        &self,
        identifier: Identifier,
    ) -> impl Iterator<Item = &Message> + '_ {
        self.msg_keys_by_identifier
            .get(&identifier)
            .into_iter()
            .flatten()
            .filter_map(|&k| self.messages.get(k))
    }

    /// Iterate messages following `messages_order`.
    pub fn iter_messages(&self) -> impl Iterator<Item = &Message> + '_ {
        self.messages_order
            .iter()
            .filter_map(|&k| self.messages.get(k))
    }

    pub fn iter_nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes_order.iter().filter_map(|&k| self.nodes.get(k))
    }

    pub fn iter_buses(&self) -> impl Iterator<Item = &Bus> + '_ {
        self.buses_order.iter().filter_map(|&k| self.buses.get(k))
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    // -------------- Sorting ---------------
    /// Sort messages_by_name case insensitive
    pub fn sort_messages_by_name(&mut self) {
        self.messages_order
            .sort_by_key(|&k| self.messages.get(k).map(|m| m.name.to_ascii_lowercase()));
    }

    /// Sort nodes_by_name case insensitive
    pub fn sort_nodes_by_name(&mut self) {
        self.nodes_order
            .sort_by_key(|&k| self.nodes.get(k).map(|n| n.name.to_ascii_lowercase()));
    }

    /// Reorders the signals of every message (contained messages included) with `compare`.
    ///
    /// Meant for the load phase, before the database is shared with codec users.
    pub fn sort_signals<F>(&mut self, mut compare: F) -> Result<(), DatabaseError>
    where
        F: FnMut(&Signal, &Signal) -> Ordering,
    {
        for message in self.messages.values_mut() {
            message.sort_signals(&mut compare)?;
        }
        Ok(())
    }

    // -------------- Codec ---------------
    /// Decodes a frame received with `identifier`.
    pub fn decode_message(
        &self,
        identifier: Identifier,
        data: &[u8],
        options: &DecodeOptions,
    ) -> Result<SignalValues, CodecError> {
        self.get_message_by_identifier(identifier)?
            .decode(data, options)
    }

    pub fn decode_message_by_name(
        &self,
        name: &str,
        data: &[u8],
        options: &DecodeOptions,
    ) -> Result<SignalValues, CodecError> {
        self.get_message_by_name(name)?.decode(data, options)
    }

    pub fn encode_message(
        &self,
        name: &str,
        values: &SignalValues,
        options: &EncodeOptions,
    ) -> Result<Vec<u8>, CodecError> {
        self.get_message_by_name(name)?.encode(values, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::message::Identifier;
    use crate::types::value::Value;

    fn build_test_database() -> Database {
        let mut db = Database::new();
        db.add_bus(Bus::new("Powertrain").with_baudrate(500_000)).unwrap();
        db.add_bus(Bus::new("Body").with_baudrate(125_000)).unwrap();
        db.add_node(Node::new("Motor")).unwrap();
        db.add_node(Node::new("Gateway")).unwrap();

        let engine = Message::new(
            "EngineData",
            Identifier::standard(0x100),
            8,
            vec![
                Signal::new("Rpm", 0, 16).with_receivers(["Gateway"]),
                Signal::new("Temp", 16, 8).with_scaling(1.0, -40.0),
            ],
        )
        .unwrap()
        .with_senders(["Motor"])
        .on_bus("Powertrain");
        db.add_message(engine).unwrap();

        let doors = Message::new(
            "Doors",
            Identifier::standard(0x200),
            1,
            vec![Signal::new("Open", 0, 1)],
        )
        .unwrap()
        .on_bus("Body");
        db.add_message(doors).unwrap();
        db
    }

    fn simple(name: &str, id: u32, bus: &str) -> Message {
        Message::new(name, Identifier::standard(id), 8, vec![])
            .unwrap()
            .on_bus(bus)
    }

    #[test]
    fn lookups_are_case_insensitive() {
        let db = build_test_database();
        assert_eq!(db.get_message_by_name("enginedata").unwrap().frame_id(), Some(0x100));
        assert_eq!(
            db.get_message_by_identifier(Identifier::standard(0x200)).unwrap().name,
            "Doors"
        );
        assert_eq!(db.get_node_by_name("MOTOR").unwrap().name, "Motor");
        assert_eq!(db.get_bus_by_name("body").unwrap().baudrate, Some(125_000));
        assert_eq!(
            db.get_message_by_identifier(Identifier::standard(0x300)),
            Err(DatabaseError::FrameIdNotFound {
                identifier: Identifier::standard(0x300)
            })
        );
        assert!(matches!(
            db.get_message_by_name("Nope"),
            Err(DatabaseError::MessageNotFound { .. })
        ));
    }

    #[test]
    fn duplicates_are_rejected() {
        let mut db = build_test_database();
        assert!(matches!(
            db.add_message(simple("ENGINEDATA", 0x101, "Powertrain")),
            Err(DatabaseError::MessageAlreadyExists { .. })
        ));
        assert!(matches!(
            db.add_node(Node::new("gateway")),
            Err(DatabaseError::NodeAlreadyExists { .. })
        ));
        assert!(matches!(
            db.add_bus(Bus::new("BODY")),
            Err(DatabaseError::BusAlreadyExists { .. })
        ));
    }

    #[test]
    fn frame_ids_are_unique_per_bus() {
        let mut db = build_test_database();
        assert_eq!(
            db.add_message(simple("Clash", 0x100, "Powertrain")),
            Err(DatabaseError::FrameIdAlreadyAssigned {
                identifier: Identifier::standard(0x100),
                existing: "EngineData".into()
            })
        );
        // same id on another bus is fine
        db.add_message(simple("Mirror", 0x100, "Body")).unwrap();
        assert_eq!(
            db.get_message_by_identifier_on_bus("body", Identifier::standard(0x100))
                .unwrap()
                .name,
            "Mirror"
        );
        assert_eq!(
            db.get_message_by_identifier(Identifier::standard(0x100))
                .unwrap()
                .name,
            "EngineData"
        );

        let mut lax = Database::with_options(DatabaseOptions {
            allow_frame_id_collisions: true,
            ..Default::default()
        });
        lax.add_message(Message::new("A", Identifier::standard(1), 8, vec![]).unwrap())
            .unwrap();
        lax.add_message(Message::new("B", Identifier::standard(1), 8, vec![]).unwrap())
            .unwrap();
        assert_eq!(lax.message_count(), 2);
    }

    #[test]
    fn standard_and_extended_ids_are_distinct() {
        let mut db = build_test_database();
        let extended = Message::new(
            "ExtEngine",
            Identifier::extended(0x100),
            1,
            vec![Signal::new("Level", 0, 8)],
        )
        .unwrap()
        .on_bus("Powertrain");
        db.add_message(extended).unwrap();

        assert_eq!(
            db.get_message_by_identifier(Identifier::extended(0x100))
                .unwrap()
                .name,
            "ExtEngine"
        );
        assert_eq!(
            db.get_message_by_identifier(Identifier::standard(0x100))
                .unwrap()
                .name,
            "EngineData"
        );
        let values = db
            .decode_message(Identifier::extended(0x100), &[0x2A], &DecodeOptions::default())
            .unwrap();
        assert_eq!(values["Level"], Value::Integer(42));
        assert!(db.get_message_by_identifier(Identifier::extended(0x200)).is_err());
    }

    #[test]
    fn references_must_be_known() {
        let mut db = build_test_database();
        assert!(matches!(
            db.add_message(simple("Lost", 0x300, "Chassis")),
            Err(DatabaseError::UnknownBus { .. })
        ));
        let msg = Message::new(
            "Ghostly",
            Identifier::standard(0x301),
            8,
            vec![Signal::new("S", 0, 8).with_receivers(["FakeECU"])],
        )
        .unwrap();
        assert_eq!(
            db.add_message(msg),
            Err(DatabaseError::UnknownNode {
                message: "Ghostly".into(),
                node: "FakeECU".into()
            })
        );

        // without nodes or buses nothing is checked
        let mut bare = Database::new();
        let msg = Message::new("Free", Identifier::standard(1), 8, vec![])
            .unwrap()
            .with_senders(["Anyone"])
            .on_bus("Anywhere");
        assert!(bare.add_message(msg).is_ok());
    }

    #[test]
    fn overlap_check_follows_strictness() {
        let clash = || {
            Message::new(
                "Clash",
                Identifier::standard(0x10),
                8,
                vec![Signal::new("A", 0, 8), Signal::new("B", 7, 8)],
            )
            .unwrap()
        };
        let mut strict = Database::new();
        assert!(matches!(
            strict.add_message(clash()),
            Err(DatabaseError::OverlappingSignals { .. })
        ));
        let mut lax = Database::with_options(DatabaseOptions {
            strict: false,
            ..Default::default()
        });
        assert!(lax.add_message(clash()).is_ok());
    }

    #[test]
    fn remove_message_clears_lookups() {
        let mut db = build_test_database();
        let key = db.get_msg_key_by_name("Doors").unwrap();
        let removed = db.remove_message(key).unwrap();
        assert_eq!(removed.name, "Doors");
        assert!(db.get_message_by_identifier(Identifier::standard(0x200)).is_err());
        assert!(db.get_message_by_name("Doors").is_err());
        assert_eq!(db.iter_messages().count(), 1);
        assert_eq!(
            db.remove_message(key),
            Err(DatabaseError::MessageMissing { key })
        );
        // the name is free again
        db.add_message(simple("Doors", 0x200, "Body")).unwrap();
    }

    #[test]
    fn sorting() {
        let mut db = build_test_database();
        db.sort_messages_by_name();
        let names: Vec<&str> = db.iter_messages().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Doors", "EngineData"]);

        db.sort_signals(|a, b| b.name.cmp(&a.name)).unwrap();
        let engine = db.get_message_by_name("EngineData").unwrap();
        assert_eq!(engine.signals()[0].name, "Temp");
        assert!(engine.get_signal_by_name("Rpm").is_ok());
    }

    #[test]
    fn codec_shortcuts() {
        let db = build_test_database();
        let mut values = SignalValues::new();
        values.insert("Rpm".into(), Value::Integer(3000));
        values.insert("Temp".into(), Value::Integer(90));
        let data = db
            .encode_message("EngineData", &values, &EncodeOptions::default())
            .unwrap();
        assert_eq!(data[..3], [0xB8, 0x0B, 130]);
        assert_eq!(
            db.decode_message(Identifier::standard(0x100), &data, &DecodeOptions::default())
                .unwrap(),
            values
        );
        assert_eq!(
            db.decode_message_by_name("enginedata", &data, &DecodeOptions::default())
                .unwrap(),
            values
        );
        assert!(matches!(
            db.decode_message(Identifier::standard(0x7FF), &data, &DecodeOptions::default()),
            Err(CodecError::Database(DatabaseError::FrameIdNotFound { .. }))
        ));
    }
}
