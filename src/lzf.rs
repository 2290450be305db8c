use crate::error::{DecodeError, ErrorKind};

/// Decompress an LZF byte block of known uncompressed length.
///
/// Pure function: no I/O, no state held across calls. Back-references that
/// overlap the bytes already written (`offset < len`) are copied
/// byte-by-byte rather than with a block copy, since the tail of the copy
/// may depend on bytes the copy itself is producing.
pub fn decompress(src: &[u8], out_len: usize) -> Result<Vec<u8>, DecodeError> {
    let mut out = Vec::with_capacity(out_len);
    let mut i = 0usize;

    while i < src.len() {
        let ctrl = src[i] as usize;
        i += 1;

        if ctrl < 32 {
            let run = ctrl + 1;
            if i + run > src.len() {
                return Err(corrupted(&out, "literal run past input end"));
            }
            out.extend_from_slice(&src[i..i + run]);
            i += run;
        } else {
            let l = ctrl >> 5;
            let len = if l == 7 {
                if i >= src.len() {
                    return Err(corrupted(&out, "back-reference length byte past input end"));
                }
                let extra = src[i] as usize;
                i += 1;
                extra + 9
            } else {
                l + 2
            };
            if i >= src.len() {
                return Err(corrupted(&out, "back-reference offset byte past input end"));
            }
            let o = src[i] as usize;
            i += 1;
            let offset = (((ctrl & 0x1F) << 8) | o) + 1;
            if offset > out.len() {
                return Err(corrupted(&out, "back-reference offset past output start"));
            }
            let mut pos = out.len() - offset;
            for _ in 0..len {
                let byte = out[pos];
                out.push(byte);
                pos += 1;
            }
        }
    }

    if out.len() != out_len {
        return Err(corrupted(
            &out,
            format!(
                "decompressed length {} does not match declared length {out_len}",
                out.len()
            ),
        ));
    }
    Ok(out)
}

fn corrupted(out: &[u8], detail: impl Into<String>) -> DecodeError {
    DecodeError::new(ErrorKind::CorruptedCompression, out.len() as u64, 0, detail)
}
