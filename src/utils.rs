//! Float encoding shared by the aggregation mapper, the `SumF` reducer and
//! the response conversion in the server.

use anyhow::{bail, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Encode a float as 8 little-endian IEEE-754 bytes.
#[inline]
pub fn f64_to_bytes(f: f64) -> Bytes {
    let mut writer = BytesMut::with_capacity(8);
    writer.put_f64_le(f);
    writer.freeze()
}

/// Decode a float written by [`f64_to_bytes`].
///
/// Anything that is not exactly 8 bytes long is rejected.
pub fn f64_from_bytes(mut buf: &[u8]) -> Result<f64> {
    if buf.len() != 8 {
        bail!("not a float64 (len={}): {:?}", buf.len(), buf);
    }
    Ok(buf.get_f64_le())
}
