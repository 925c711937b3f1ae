#![forbid(unsafe_code)]
// Constant-time pad comparison.
// - Touches every byte regardless of where the first difference is.
// - Lengths are not secret; unequal lengths compare unequal immediately.

/// Constant-time equality over two pads.
#[inline(never)]
pub fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    core::hint::black_box(diff) == 0
}
