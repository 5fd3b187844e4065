//! Cluster key-slot hashing.
//!
//! Redis cluster assigns every key to one of 16384 slots using CRC16/XMODEM
//! over the key, or over its first non-empty `{hash tag}` when one is present.

/// Number of hash slots in a Redis cluster.
pub const SLOT_COUNT: u16 = 16384;

const CRC16_TABLE: [u16; 256] = crc16_table();

const fn crc16_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u16) << 8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

fn crc16(data: &[u8]) -> u16 {
    data.iter().fold(0u16, |crc, &byte| {
        (crc << 8) ^ CRC16_TABLE[usize::from((crc >> 8) as u8 ^ byte)]
    })
}

/// Returns the part of `key` that decides its slot.
fn hash_tag(key: &[u8]) -> &[u8] {
    let Some(open) = key.iter().position(|&b| b == b'{') else {
        return key;
    };
    match key[open + 1..].iter().position(|&b| b == b'}') {
        Some(len) if len > 0 => &key[open + 1..open + 1 + len],
        _ => key,
    }
}

/// Returns the cluster slot of `key`.
#[must_use]
pub fn key_slot(key: &str) -> u16 {
    crc16(hash_tag(key.as_bytes())) % SLOT_COUNT
}

/// Returns `true` if every key maps to the same slot.
///
/// An empty iterator is trivially colocated.
pub fn same_slot<'a>(keys: impl IntoIterator<Item = &'a str>) -> bool {
    let mut slots = keys.into_iter().map(key_slot);
    match slots.next() {
        Some(first) => slots.all(|slot| slot == first),
        None => true,
    }
}
