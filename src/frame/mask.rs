//! Payload masking.

/// XOR `buf` in place with `key`, cycling the key by byte position.
///
/// Masking is its own inverse, so the same call masks and unmasks.
///
/// # Examples
///
/// ```
/// use wsframe::frame::apply_mask;
///
/// let key = [0x37, 0xfa, 0x21, 0x3d];
/// let mut payload = *b"Hello";
/// apply_mask(&mut payload, key);
/// assert_eq!(payload, [0x7f, 0x9f, 0x4d, 0x51, 0x58]);
/// apply_mask(&mut payload, key);
/// assert_eq!(&payload, b"Hello");
/// ```
pub fn apply_mask(buf: &mut [u8], key: [u8; 4]) {
    let mut chunks = buf.chunks_exact_mut(4);
    for chunk in &mut chunks {
        for (byte, k) in chunk.iter_mut().zip(key) {
            *byte ^= k;
        }
    }
    for (byte, k) in chunks.into_remainder().iter_mut().zip(key) {
        *byte ^= k;
    }
}

/// Copy `src` into `dst` while masking it with `key`.
///
/// # Panics
///
/// Panics if `dst` and `src` differ in length.
pub fn mask_into(dst: &mut [u8], src: &[u8], key: [u8; 4]) {
    assert_eq!(dst.len(), src.len(), "mask_into requires equal lengths");
    for (i, (out, byte)) in dst.iter_mut().zip(src).enumerate() {
        *out = byte ^ key[i % 4];
    }
}
