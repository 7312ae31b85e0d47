use std::io;

/// Wire deserialization from a received frame.
pub trait Deserialize: Sized {
    fn deserialize(buf: &[u8]) -> io::Result<Self>;
}
