//! Connection hubs: how a worker opens its channels.

use std::{collections::HashMap, io, net::SocketAddr, sync::Arc};

use async_trait::async_trait;
use comms::{
    MsgChannel,
    msg::{MsgKind, Role},
};
use log::{debug, warn};
use tokio::net::TcpStream;

use crate::param::Param;

/// Factory for the channels a worker owns, one per role.
#[async_trait]
pub trait Hub: Send + Sync {
    async fn connect(&self, role: Role) -> io::Result<MsgChannel>;
}

/// Hub dialing a TCP stub endpoint.
///
/// The stub learns the caller's role from the connect handshake message, so
/// every role dials the same address.
pub struct TcpHub {
    addr: SocketAddr,
}

impl TcpHub {
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }
}

#[async_trait]
impl Hub for TcpHub {
    async fn connect(&self, _role: Role) -> io::Result<MsgChannel> {
        let stream = TcpStream::connect(self.addr).await?;
        let (rx, tx) = stream.into_split();
        Ok(MsgChannel::new(rx, tx))
    }
}

/// In-process hub backed by `tokio::io::duplex`, doubling for the server
/// tier: it confirms `Update`s by advancing the shared parameter's version
/// past the submitted step, answers `Put`/`Get` from shared memory, and
/// echoes layer-channel traffic back to its sender.
///
/// Used by the demo binary and the integration tests.
pub struct LoopbackHub {
    params: Arc<HashMap<u32, Arc<Param>>>,
}

impl LoopbackHub {
    /// Builds the hub's server-side view: one entry per owned parameter,
    /// keyed by shard.
    pub fn new(params: impl IntoIterator<Item = Arc<Param>>) -> Self {
        let map = params
            .into_iter()
            .filter(|p| p.is_owned_here())
            .map(|p| (p.shard(), p))
            .collect();
        Self {
            params: Arc::new(map),
        }
    }
}

#[async_trait]
impl Hub for LoopbackHub {
    async fn connect(&self, role: Role) -> io::Result<MsgChannel> {
        let (near, far) = tokio::io::duplex(64 * 1024);
        let (near_rx, near_tx) = tokio::io::split(near);
        let (far_rx, far_tx) = tokio::io::split(far);
        let far_channel = MsgChannel::new(far_rx, far_tx);

        match role {
            Role::WorkerLayer => {
                tokio::spawn(serve_layer_echo(far_channel));
            }
            _ => {
                tokio::spawn(serve_params(far_channel, Arc::clone(&self.params)));
            }
        }

        Ok(MsgChannel::new(near_rx, near_tx))
    }
}

async fn serve_params(mut channel: MsgChannel, params: Arc<HashMap<u32, Arc<Param>>>) {
    loop {
        let msg = match channel.recv().await {
            Ok(msg) => msg,
            // Worker dropped its end.
            Err(_) => break,
        };

        match msg.kind {
            MsgKind::Connect => {
                debug!(group = msg.src.group, worker = msg.src.id; "stub: worker connected");
            }
            MsgKind::Stop => {
                debug!(group = msg.src.group, worker = msg.src.id; "stub: worker stopped");
                break;
            }
            MsgKind::Update => {
                let Some(target) = msg.target else { continue };
                let Some(param) = params.get(&target.shard) else {
                    warn!(shard = target.shard; "stub: update for unknown shard");
                    continue;
                };
                // Confirm the submitted update: the version must move past
                // the local-observed version the worker just stamped.
                param.set_version(param.version().max(target.step + 1));
            }
            MsgKind::Put | MsgKind::Get => {
                // Shared memory in-process: the value is already visible.
            }
            MsgKind::Blob => {
                warn!("stub: blob message on the parameter channel");
            }
        }
    }
}

async fn serve_layer_echo(mut channel: MsgChannel) {
    loop {
        let msg = match channel.recv().await {
            Ok(msg) => msg,
            Err(_) => break,
        };
        if msg.kind == MsgKind::Connect {
            continue;
        }
        if channel.send(&msg).await.is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use comms::msg::{Addr, Msg, Target};

    use super::*;

    #[tokio::test]
    async fn loopback_confirms_updates_by_bumping_versions() {
        let p = Arc::new(Param::new(3, 3, None, 1));
        p.set_version(5);
        let hub = LoopbackHub::new(vec![Arc::clone(&p)]);

        let mut channel = hub.connect(Role::WorkerParam).await.unwrap();
        let update = Msg::param(
            Addr::new(0, 0, Role::WorkerParam),
            Addr::stub(),
            MsgKind::Update,
            Target::for_param(3, 5),
        );
        channel.send(&update).await.unwrap();

        // Poll until the stub task has processed the message.
        for _ in 0..100 {
            if p.version() > 5 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert_eq!(p.version(), 6);
    }

    #[tokio::test]
    async fn loopback_echoes_layer_traffic() {
        let hub = LoopbackHub::new(Vec::new());
        let mut channel = hub.connect(Role::WorkerLayer).await.unwrap();

        let blob = Msg {
            src: Addr::new(0, 0, Role::WorkerLayer),
            dst: Addr::new(0, 0, Role::WorkerLayer),
            kind: MsgKind::Blob,
            target: None,
            frames: vec![b"sink".to_vec(), vec![1, 2, 3, 4]],
        };
        channel.send(&blob).await.unwrap();

        let echoed = channel.recv().await.unwrap();
        assert_eq!(echoed, blob);
    }
}
