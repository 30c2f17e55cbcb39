use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use crate::core::message_layout::{self, MuxLink};
use crate::types::{
    attributes::{AttributeValue, Attributes, Comments, DEFAULT_LANGUAGE, preferred_comment},
    errors::DatabaseError,
    signal::{MuxSelector, Signal},
};

/// CAN message: identifier, payload length, metadata and its composing signals.
///
/// A `Message` is validated once, at construction: identifier range, payload length,
/// signal geometry, unique signal names and multiplexer references. The per-signal
/// extraction steps and multiplex constraint chains are precomputed there, so the
/// codec never has to re-validate.
///
/// Container messages (CAN-FD PDU multiplexing) carry no signals of their own; they
/// list the messages that can be packed into their payload, each addressed by a
/// header ID instead of a frame ID.
///
/// # Example
/// ```
/// use can_codec::{Identifier, Message, Signal};
///
/// let msg = Message::new(
///     "EngineData",
///     Identifier::standard(0x100),
///     8,
///     vec![Signal::new("Rpm", 0, 16).with_scaling(0.25, 0.0)],
/// )
/// .unwrap()
/// .with_senders(["Motor"])
/// .with_cycle_time(10);
///
/// assert_eq!(msg.frame_id(), Some(0x100));
/// assert!(msg.get_signal_by_name("Rpm").is_ok());
/// ```
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(try_from = "MessageDef", into = "MessageDef")]
pub struct Message {
    /// Message name.
    pub name: String,
    /// Nominal transmission period in milliseconds.
    pub cycle_time: Option<u32>,
    /// Transmitting nodes (ECUs) for this message.
    pub senders: Vec<String>,
    /// Bus this message is sent on.
    pub bus_name: Option<String>,
    /// Comments per language.
    pub comments: Comments,
    pub attributes: Attributes,

    identifier: Identifier,
    length: u16,
    is_fd: bool,
    signals: Vec<Signal>,
    contained: Option<Vec<Message>>,

    // --- caches, rebuilt by `compile` ---
    signal_by_name: HashMap<String, usize>,
    mux_chains: Vec<Vec<MuxLink>>,
    selectors: Vec<usize>,
    contained_by_header: HashMap<u32, usize>,
}

/// How a message is addressed.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
pub enum Identifier {
    /// Frame on the bus.
    Frame { id: u32, format: IdFormat },
    /// Message carried inside a container, addressed by a 24-bit header ID.
    Header(u32),
}

impl Identifier {
    pub fn standard(id: u32) -> Self {
        Identifier::Frame {
            id,
            format: IdFormat::Standard,
        }
    }

    pub fn extended(id: u32) -> Self {
        Identifier::Frame {
            id,
            format: IdFormat::Extended,
        }
    }

    pub fn header(id: u32) -> Self {
        Identifier::Header(id)
    }

    /// Raw identifier value.
    pub fn value(&self) -> u32 {
        match *self {
            Identifier::Frame { id, .. } => id,
            Identifier::Header(id) => id,
        }
    }

    fn max_value(&self) -> u32 {
        match self {
            Identifier::Frame {
                format: IdFormat::Standard,
                ..
            } => 0x7FF,
            Identifier::Frame {
                format: IdFormat::Extended,
                ..
            } => 0x1FFF_FFFF,
            Identifier::Header(_) => 0xFF_FFFF,
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Frame {
                id,
                format: IdFormat::Standard,
            } => write!(f, "standard frame 0x{:03X}", id),
            Identifier::Frame {
                id,
                format: IdFormat::Extended,
            } => write!(f, "extended frame 0x{:08X}", id),
            Identifier::Header(id) => write!(f, "header 0x{:06X}", id),
        }
    }
}

/// CAN identifier format (standard 11-bit or extended 29-bit).
#[derive(Default, Copy, Clone, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
pub enum IdFormat {
    #[default]
    Standard,
    Extended,
}

impl IdFormat {
    /// Returns a human-readable name for this CAN ID format.
    pub fn to_str(&self) -> &'static str {
        match self {
            IdFormat::Standard => "Standard",
            IdFormat::Extended => "Extended",
        }
    }
}

/// Node of the multiplexing hierarchy returned by [`Message::signal_tree`].
#[derive(Clone, PartialEq, Debug, Serialize)]
pub enum SignalTreeNode {
    /// Plain signal.
    Signal(String),
    /// Selector with, for each selector value, the signals it enables.
    Multiplexer {
        name: String,
        branches: Vec<(MuxSelector, Vec<SignalTreeNode>)>,
    },
}

const MAX_CLASSIC_LENGTH: u16 = 8;
const MAX_FD_LENGTH: u16 = 64;
const MAX_CONTAINED_LENGTH: u16 = 255;

impl Message {
    /// Builds and validates a message. Payloads longer than 8 bytes make it a CAN-FD message.
    pub fn new(
        name: impl Into<String>,
        identifier: Identifier,
        length: u16,
        signals: Vec<Signal>,
    ) -> Result<Self, DatabaseError> {
        let mut msg = Message {
            name: name.into(),
            cycle_time: None,
            senders: Vec::new(),
            bus_name: None,
            comments: Comments::new(),
            attributes: Attributes::new(),
            identifier,
            length,
            is_fd: length > MAX_CLASSIC_LENGTH,
            signals,
            contained: None,
            signal_by_name: HashMap::new(),
            mux_chains: Vec::new(),
            selectors: Vec::new(),
            contained_by_header: HashMap::new(),
        };
        msg.check_identifier()?;
        msg.compile()?;
        Ok(msg)
    }

    /// Builds a container message whose payload packs the given header-addressed messages.
    pub fn container(
        name: impl Into<String>,
        identifier: Identifier,
        length: u16,
        contained: Vec<Message>,
    ) -> Result<Self, DatabaseError> {
        let mut msg = Message::new(name, identifier, length, Vec::new())?;
        msg.contained = Some(contained);
        msg.compile()?;
        Ok(msg)
    }

    /// Flags a classic-length message as CAN-FD.
    pub fn fd(mut self) -> Self {
        self.is_fd = true;
        self
    }

    pub fn with_senders<I, S>(mut self, senders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.senders = senders.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_cycle_time(mut self, cycle_time_ms: u32) -> Self {
        self.cycle_time = Some(cycle_time_ms);
        self
    }

    pub fn on_bus(mut self, bus_name: impl Into<String>) -> Self {
        self.bus_name = Some(bus_name.into());
        self
    }

    pub fn with_comment(self, comment: impl Into<String>) -> Self {
        self.with_comment_in(DEFAULT_LANGUAGE, comment)
    }

    pub fn with_comment_in(
        mut self,
        language: impl Into<String>,
        comment: impl Into<String>,
    ) -> Self {
        self.comments.insert(language.into(), comment.into());
        self
    }

    pub fn comment(&self) -> Option<&str> {
        preferred_comment(&self.comments)
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: AttributeValue) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    pub fn identifier(&self) -> Identifier {
        self.identifier
    }

    /// Frame ID, `None` for messages only reachable through a container.
    pub fn frame_id(&self) -> Option<u32> {
        match self.identifier {
            Identifier::Frame { id, .. } => Some(id),
            Identifier::Header(_) => None,
        }
    }

    /// Header ID inside a container, `None` for bus frames.
    pub fn header_id(&self) -> Option<u32> {
        match self.identifier {
            Identifier::Header(id) => Some(id),
            Identifier::Frame { .. } => None,
        }
    }

    pub fn is_extended_frame(&self) -> bool {
        matches!(
            self.identifier,
            Identifier::Frame {
                format: IdFormat::Extended,
                ..
            }
        )
    }

    /// Payload length in bytes (maximum payload length for containers).
    pub fn length(&self) -> u16 {
        self.length
    }

    pub fn is_fd(&self) -> bool {
        self.is_fd
    }

    pub fn is_container(&self) -> bool {
        self.contained.is_some()
    }

    /// Whether any signal is a selector.
    pub fn is_multiplexed(&self) -> bool {
        !self.selectors.is_empty()
    }

    /// Signals in declaration order.
    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    /// Messages that may be packed into this container (empty for plain messages).
    pub fn contained_messages(&self) -> &[Message] {
        self.contained.as_deref().unwrap_or(&[])
    }

    pub fn get_signal_by_name(&self, name: &str) -> Result<&Signal, DatabaseError> {
        self.signal_index(name)
            .map(|i| &self.signals[i])
            .ok_or_else(|| DatabaseError::SignalNotFound {
                message: self.name.clone(),
                signal: name.to_string(),
            })
    }

    pub fn get_contained_message_by_header_id(
        &self,
        header_id: u32,
    ) -> Result<&Message, DatabaseError> {
        if !self.is_container() {
            return Err(DatabaseError::NotAContainer {
                message: self.name.clone(),
            });
        }
        self.contained_by_header
            .get(&header_id)
            .map(|&i| &self.contained_messages()[i])
            .ok_or(DatabaseError::HeaderIdNotFound { header_id })
    }

    pub fn get_contained_message_by_name(&self, name: &str) -> Result<&Message, DatabaseError> {
        if !self.is_container() {
            return Err(DatabaseError::NotAContainer {
                message: self.name.clone(),
            });
        }
        self.contained_messages()
            .iter()
            .find(|m| m.name == name)
            .ok_or_else(|| DatabaseError::MessageNotFound {
                name: name.to_string(),
            })
    }

    /// Multiplexing hierarchy: unconditional signals at the root, selectors carrying
    /// one branch per distinct selector value.
    pub fn signal_tree(&self) -> Vec<SignalTreeNode> {
        self.signals
            .iter()
            .enumerate()
            .filter(|(_, s)| s.multiplexer_signal.is_none())
            .map(|(i, _)| self.tree_node(i))
            .collect()
    }

    fn tree_node(&self, index: usize) -> SignalTreeNode {
        let sig = &self.signals[index];
        if !sig.is_multiplexer {
            return SignalTreeNode::Signal(sig.name.clone());
        }

        let children: Vec<usize> = self
            .signals
            .iter()
            .enumerate()
            .filter(|(_, s)| s.multiplexer_signal.as_deref() == Some(sig.name.as_str()))
            .map(|(i, _)| i)
            .collect();

        let mut keys: Vec<MuxSelector> = Vec::new();
        for &c in &children {
            for sel in &self.signals[c].multiplexer_ids {
                if !keys.contains(sel) {
                    keys.push(*sel);
                }
            }
        }
        keys.sort_by_key(|k| k.first());

        let branches = keys
            .into_iter()
            .map(|key| {
                let nodes = children
                    .iter()
                    .filter(|&&c| self.signals[c].multiplexer_ids.contains(&key))
                    .map(|&c| self.tree_node(c))
                    .collect();
                (key, nodes)
            })
            .collect();

        SignalTreeNode::Multiplexer {
            name: sig.name.clone(),
            branches,
        }
    }

    /// Reorders the signals, and those of every contained message, then rebuilds
    /// the lookup caches.
    pub fn sort_signals<F>(&mut self, mut compare: F) -> Result<(), DatabaseError>
    where
        F: FnMut(&Signal, &Signal) -> Ordering,
    {
        self.sort_signals_with(&mut compare)
    }

    fn sort_signals_with(
        &mut self,
        compare: &mut dyn FnMut(&Signal, &Signal) -> Ordering,
    ) -> Result<(), DatabaseError> {
        if let Some(contained) = &mut self.contained {
            for inner in contained.iter_mut() {
                inner.sort_signals_with(compare)?;
            }
        }
        self.signals.sort_by(|a, b| compare(a, b));
        self.compile()
    }

    /// Fails if two signals share payload bits while they can be active in the same frame.
    pub fn check_overlaps(&self) -> Result<(), DatabaseError> {
        match message_layout::find_active_overlap(
            self.length as usize,
            &self.signals,
            &self.mux_chains,
        ) {
            Some((a, b)) => Err(DatabaseError::OverlappingSignals {
                message: self.name.clone(),
                first: self.signals[a].name.clone(),
                second: self.signals[b].name.clone(),
            }),
            None => Ok(()),
        }
    }

    pub(crate) fn signal_index(&self, name: &str) -> Option<usize> {
        self.signal_by_name.get(name).copied()
    }

    /// Constraint chain (root selector first) gating `signals[index]`.
    pub(crate) fn mux_chain(&self, index: usize) -> &[MuxLink] {
        &self.mux_chains[index]
    }

    /// Indices of the selector signals, root selectors first (stable within a nesting depth).
    pub(crate) fn selectors(&self) -> &[usize] {
        &self.selectors
    }

    fn check_identifier(&self) -> Result<(), DatabaseError> {
        if self.identifier.value() > self.identifier.max_value() {
            return Err(DatabaseError::InvalidFrameId {
                message: self.name.clone(),
                id: self.identifier.value(),
            });
        }
        let limit = match self.identifier {
            Identifier::Header(_) => MAX_CONTAINED_LENGTH,
            Identifier::Frame { .. } => MAX_FD_LENGTH,
        };
        if self.length > limit {
            return Err(DatabaseError::InvalidLength {
                message: self.name.clone(),
                length: self.length,
                reason: "exceeds the maximum payload length",
            });
        }
        Ok(())
    }

    /// Compiles signal steps and rebuilds every cache.
    fn compile(&mut self) -> Result<(), DatabaseError> {
        let mut index: HashMap<String, usize> = HashMap::with_capacity(self.signals.len());
        for (i, sig) in self.signals.iter_mut().enumerate() {
            sig.compile_inline()?;
            message_layout::check_signal_fits(self.length, sig)?;
            if index.insert(sig.name.clone(), i).is_some() {
                return Err(DatabaseError::DuplicateSignal {
                    message: self.name.clone(),
                    signal: sig.name.clone(),
                });
            }
        }

        let mut chains = Vec::with_capacity(self.signals.len());
        for i in 0..self.signals.len() {
            chains.push(build_chain(&self.signals, &index, i)?);
        }

        self.selectors = self
            .signals
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_multiplexer)
            .map(|(i, _)| i)
            .collect();
        // a parent's chain is strictly shorter than its children's
        self.selectors.sort_by_key(|&i| chains[i].len());
        self.signal_by_name = index;
        self.mux_chains = chains;

        self.contained_by_header.clear();
        if let Some(contained) = &self.contained {
            for (i, inner) in contained.iter().enumerate() {
                let header_id =
                    inner
                        .header_id()
                        .ok_or_else(|| DatabaseError::MissingHeaderId {
                            container: self.name.clone(),
                            message: inner.name.clone(),
                        })?;
                if self.contained_by_header.insert(header_id, i).is_some() {
                    return Err(DatabaseError::DuplicateHeaderId {
                        header_id,
                        container: self.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Walks `multiplexer_signal` references from `signals[index]` up to the root selector.
fn build_chain(
    signals: &[Signal],
    index: &HashMap<String, usize>,
    start: usize,
) -> Result<Vec<MuxLink>, DatabaseError> {
    let mut chain: Vec<MuxLink> = Vec::new();
    let mut current = start;

    while let Some(parent) = signals[current].multiplexer_signal.as_deref() {
        let sig = &signals[current];
        let p = *index
            .get(parent)
            .ok_or_else(|| DatabaseError::UnknownMultiplexer {
                signal: sig.name.clone(),
                multiplexer: parent.to_string(),
            })?;
        if !signals[p].is_multiplexer {
            return Err(DatabaseError::NotAMultiplexer {
                signal: sig.name.clone(),
                multiplexer: parent.to_string(),
            });
        }
        if p == start || chain.len() >= signals.len() {
            return Err(DatabaseError::MultiplexCycle {
                signal: signals[start].name.clone(),
            });
        }
        chain.push(MuxLink {
            selector: p,
            ids: sig.multiplexer_ids.clone(),
        });
        current = p;
    }

    chain.reverse();
    Ok(chain)
}

/// Flat serialized form of a [`Message`], the shape format parsers emit.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct MessageDef {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    frame_id: Option<u32>,
    is_extended_frame: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    header_id: Option<u32>,
    length: u16,
    is_fd: bool,
    is_container: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    cycle_time: Option<u32>,
    senders: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bus_name: Option<String>,
    #[serde(skip_serializing_if = "Comments::is_empty")]
    comments: Comments,
    #[serde(skip_serializing_if = "Attributes::is_empty")]
    attributes: Attributes,
    signals: Vec<Signal>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    contained_messages: Vec<MessageDef>,
}

impl TryFrom<MessageDef> for Message {
    type Error = DatabaseError;

    fn try_from(def: MessageDef) -> Result<Self, Self::Error> {
        let identifier = match (def.frame_id, def.header_id) {
            (Some(id), None) if def.is_extended_frame => Identifier::extended(id),
            (Some(id), None) => Identifier::standard(id),
            (None, Some(id)) => Identifier::header(id),
            _ => return Err(DatabaseError::AmbiguousIdentifier { message: def.name }),
        };

        let mut msg = if def.is_container {
            let contained = def
                .contained_messages
                .into_iter()
                .map(Message::try_from)
                .collect::<Result<Vec<_>, _>>()?;
            Message::container(def.name, identifier, def.length, contained)?
        } else {
            Message::new(def.name, identifier, def.length, def.signals)?
        };
        msg.is_fd |= def.is_fd;
        msg.cycle_time = def.cycle_time;
        msg.senders = def.senders;
        msg.bus_name = def.bus_name;
        msg.comments = def.comments;
        msg.attributes = def.attributes;
        Ok(msg)
    }
}

impl From<Message> for MessageDef {
    fn from(msg: Message) -> Self {
        let is_container = msg.is_container();
        MessageDef {
            frame_id: msg.frame_id(),
            is_extended_frame: msg.is_extended_frame(),
            header_id: msg.header_id(),
            length: msg.length,
            is_fd: msg.is_fd,
            is_container,
            name: msg.name,
            cycle_time: msg.cycle_time,
            senders: msg.senders,
            bus_name: msg.bus_name,
            comments: msg.comments,
            attributes: msg.attributes,
            signals: msg.signals,
            contained_messages: msg
                .contained
                .unwrap_or_default()
                .into_iter()
                .map(MessageDef::from)
                .collect(),
        }
    }
}
