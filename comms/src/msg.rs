//! The application layer message model for parameter synchronization and
//! cross-partition data exchange.

use std::io;

use crate::{Deserialize, Serialize};

type Header = u32;
const HEADER_SIZE: usize = size_of::<Header>();

/// The role tag of a message endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The server-tier stub that routes synchronization traffic.
    Stub,
    /// A worker's parameter synchronization endpoint.
    WorkerParam,
    /// A worker's cross-partition layer data endpoint.
    WorkerLayer,
    /// A parameter server shard.
    Server,
}

/// A (group, entity, role) endpoint address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Addr {
    pub group: i32,
    pub id: i32,
    pub role: Role,
}

impl Addr {
    pub fn new(group: i32, id: i32, role: Role) -> Self {
        Self { group, id, role }
    }

    /// The well-known server stub address.
    pub fn stub() -> Self {
        Self::new(-1, -1, Role::Stub)
    }
}

/// The closed set of message type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MsgKind {
    Connect,
    Put,
    Get,
    Update,
    Stop,
    /// Raw cross-partition tensor exchange; carries a node-name frame
    /// followed by a payload frame.
    Blob,
}

/// Shard key routing a synchronization message to its server partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Target {
    pub shard: u32,
    pub step: i64,
}

impl Target {
    /// Derives the target for a parameter from its owner id and a step.
    pub fn for_param(owner: i32, step: i64) -> Self {
        Self {
            shard: owner as u32,
            step,
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
struct MsgHeader {
    src: Addr,
    dst: Addr,
    kind: MsgKind,
    target: Option<Target>,
    frames: usize,
}

/// One wire message: structured header plus zero or more binary frames.
#[derive(Debug, Clone, PartialEq)]
pub struct Msg {
    pub src: Addr,
    pub dst: Addr,
    pub kind: MsgKind,
    pub target: Option<Target>,
    pub frames: Vec<Vec<u8>>,
}

impl Msg {
    /// A frameless control message.
    pub fn control(src: Addr, dst: Addr, kind: MsgKind) -> Self {
        Self {
            src,
            dst,
            kind,
            target: None,
            frames: Vec::new(),
        }
    }

    /// A parameter synchronization message keyed by `target`.
    pub fn param(src: Addr, dst: Addr, kind: MsgKind, target: Target) -> Self {
        Self {
            src,
            dst,
            kind,
            target: Some(target),
            frames: Vec::new(),
        }
    }

    fn truncated<T>(what: &str) -> io::Result<T> {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("truncated message: {what}"),
        ))
    }
}

impl Serialize for Msg {
    fn serialize(&self, buf: &mut Vec<u8>) -> io::Result<()> {
        let header = MsgHeader {
            src: self.src,
            dst: self.dst,
            kind: self.kind,
            target: self.target,
            frames: self.frames.len(),
        };

        let json = serde_json::to_vec(&header)?;
        buf.extend_from_slice(&(json.len() as Header).to_be_bytes());
        buf.extend_from_slice(&json);

        for frame in &self.frames {
            buf.extend_from_slice(&(frame.len() as Header).to_be_bytes());
            buf.extend_from_slice(frame);
        }

        Ok(())
    }
}

/// Splits the next length-prefixed chunk off the front of `rest`.
fn take<'a>(rest: &mut &'a [u8], what: &str) -> io::Result<&'a [u8]> {
    if rest.len() < HEADER_SIZE {
        return Msg::truncated(what);
    }
    let (len_buf, tail) = rest.split_at(HEADER_SIZE);

    // split_at guarantees exactly HEADER_SIZE bytes here
    let len = Header::from_be_bytes(len_buf.try_into().unwrap()) as usize;
    if tail.len() < len {
        return Msg::truncated(what);
    }

    let (chunk, tail) = tail.split_at(len);
    *rest = tail;
    Ok(chunk)
}

impl Deserialize for Msg {
    fn deserialize(buf: &[u8]) -> io::Result<Self> {
        let mut rest = buf;

        let header: MsgHeader = serde_json::from_slice(take(&mut rest, "header")?)?;

        let mut frames = Vec::with_capacity(header.frames);
        for _ in 0..header.frames {
            frames.push(take(&mut rest, "frame")?.to_vec());
        }

        Ok(Self {
            src: header.src,
            dst: header.dst,
            kind: header.kind,
            target: header.target,
            frames,
        })
    }
}
