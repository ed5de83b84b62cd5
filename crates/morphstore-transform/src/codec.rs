//! Forward/inverse byte-buffer codecs for the transformation engine.
//!
//! Each codec is a pure function over the complete input buffer. Range
//! restriction happens at the caller, never inside a codec. Variable-length
//! codecs size their output in a first pass and fill an exactly-sized buffer
//! in a second.

/// XOR every byte with 0xFF. Self-inverse.
pub fn xor_bytes(input: &[u8]) -> Vec<u8> {
    input.iter().map(|b| b ^ 0xFF).collect()
}

/// Encoded size in bytes of the run-length encoding of `input`.
///
/// The encoding emits `(count - 1, value)` byte pairs for maximal runs of up
/// to 256 identical bytes.
pub fn rle_encoded_size(input: &[u8]) -> usize {
    let mut size = 0;
    let mut iter = input.iter();
    if let Some(&first) = iter.next() {
        let mut value = first;
        let mut copies = 0u8;
        for &b in iter {
            if b == value && copies < u8::MAX {
                copies += 1;
            } else {
                size += 2;
                copies = 0;
                value = b;
            }
        }
        size += 2;
    }
    size
}

fn rle_encode_into(input: &[u8], out: &mut [u8]) {
    let mut pos = 0;
    let mut iter = input.iter();
    if let Some(&first) = iter.next() {
        let mut value = first;
        // copies == count - 1, storing a 0 would be wasted
        let mut copies = 0u8;
        for &b in iter {
            if b == value && copies < u8::MAX {
                copies += 1;
            } else {
                out[pos] = copies;
                out[pos + 1] = value;
                pos += 2;
                copies = 0;
                value = b;
            }
        }
        out[pos] = copies;
        out[pos + 1] = value;
    }
}

/// Run-length encode `input` into an exactly-sized buffer.
pub fn rle_encode(input: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; rle_encoded_size(input)];
    rle_encode_into(input, &mut out);
    out
}

/// Decoded size in bytes of run-length encoded data.
pub fn rle_decoded_size(encoded: &[u8]) -> usize {
    encoded
        .chunks_exact(2)
        .map(|pair| pair[0] as usize + 1)
        .sum()
}

/// Expand `(count - 1, value)` pairs back into `count` repeated bytes.
pub fn rle_decode(encoded: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(rle_decoded_size(encoded));
    for pair in encoded.chunks_exact(2) {
        let count = pair[0] as usize + 1;
        let value = pair[1];
        out.resize(out.len() + count, value);
    }
    out
}

/// Compress the full input with LZ4, prepending the uncompressed size so the
/// inverse can allocate exactly.
pub fn lz4_compress(input: &[u8]) -> Vec<u8> {
    lz4_flex::block::compress_prepend_size(input)
}

/// Decompress a size-prepended LZ4 block.
///
/// Panics when the codec reports an invalid result: that means corrupted
/// stored data or a broken library contract, and no safe recovery exists in
/// the middle of a buffer transform.
pub fn lz4_decompress(input: &[u8]) -> Vec<u8> {
    match lz4_flex::block::decompress_size_prepended(input) {
        Ok(out) => out,
        Err(e) => panic!("lz4 decompression reported an invalid result: {e}"),
    }
}
