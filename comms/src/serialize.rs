use std::io;

/// Wire serialization into a reusable byte buffer.
pub trait Serialize {
    fn serialize(&self, buf: &mut Vec<u8>) -> io::Result<()>;
}
