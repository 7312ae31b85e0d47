pub mod msg;

mod deserialize;
mod receiver;
mod sender;
mod serialize;

use std::io;

use tokio::io::{AsyncRead, AsyncWrite};

pub use deserialize::Deserialize;
pub use receiver::NetReceiver;
pub use sender::NetSender;
pub use serialize::Serialize;

use msg::Msg;

type LenType = u64;
const LEN_TYPE_SIZE: usize = size_of::<LenType>();

/// Creates both `NetReceiver` and `NetSender` network channel parts.
///
/// Given a reader and writer creates and returns both ends of the
/// communication.
///
/// # Arguments
/// * `rx` - An async readable.
/// * `tx` - An async writable.
///
/// # Returns
/// A communication stream in the form of a receiver and sender pair.
pub fn channel<R, W>(rx: R, tx: W) -> (NetReceiver<R>, NetSender<W>)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    (NetReceiver::new(rx), NetSender::new(tx))
}

/// Boxed reader half of a message channel.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send + Sync>;
/// Boxed writer half of a message channel.
pub type BoxWriter = Box<dyn AsyncWrite + Unpin + Send + Sync>;

/// An exclusively owned, bidirectional message channel.
///
/// Workers hold one of these per role (parameter sync, layer data); dropping
/// the channel releases the underlying connection.
pub struct MsgChannel {
    rx: NetReceiver<BoxReader>,
    tx: NetSender<BoxWriter>,
}

impl MsgChannel {
    /// Wraps a reader/writer pair into a channel handle.
    ///
    /// # Arguments
    /// * `rx` - An async readable.
    /// * `tx` - An async writable.
    pub fn new<R, W>(rx: R, tx: W) -> Self
    where
        R: AsyncRead + Unpin + Send + Sync + 'static,
        W: AsyncWrite + Unpin + Send + Sync + 'static,
    {
        let (rx, tx) = channel(Box::new(rx) as BoxReader, Box::new(tx) as BoxWriter);
        Self { rx, tx }
    }

    /// Sends one message, framed and flushed.
    pub async fn send(&mut self, msg: &Msg) -> io::Result<()> {
        self.tx.send(msg).await
    }

    /// Waits for the next message on this channel.
    pub async fn recv(&mut self) -> io::Result<Msg> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::msg::{Addr, Msg, MsgKind, Role, Target};

    #[tokio::test]
    async fn channel_round_trips_messages() {
        let (a, b) = tokio::io::duplex(4096);
        let (ar, aw) = tokio::io::split(a);
        let (br, bw) = tokio::io::split(b);
        let mut left = MsgChannel::new(ar, aw);
        let mut right = MsgChannel::new(br, bw);

        let sent = Msg {
            src: Addr::new(0, 2, Role::WorkerParam),
            dst: Addr::stub(),
            kind: MsgKind::Update,
            target: Some(Target::for_param(7, 42)),
            frames: vec![b"w1".to_vec(), vec![0, 0, 128, 63]],
        };
        left.send(&sent).await.unwrap();

        let got = right.recv().await.unwrap();
        assert_eq!(got, sent);
    }
}
