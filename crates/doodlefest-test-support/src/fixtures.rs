//! Payload and roster fixtures.

use uuid::Uuid;

/// `n` fresh player identifiers, in a stable order for the test.
#[must_use]
pub fn player_ids(n: usize) -> Vec<Uuid> {
    (0..n).map(|_| Uuid::new_v4()).collect()
}

/// Bytes that look like the start of a PNG file followed by `tag`, so two
/// fixtures with different tags are distinguishable.
#[must_use]
pub fn fake_png(tag: u8) -> Vec<u8> {
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.push(tag);
    bytes
}
