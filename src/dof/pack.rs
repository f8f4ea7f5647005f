//! 16-bit normalized values split over two 8-bit channels.

/// Splits `value` in `[0, 1]` into a coarse and a fine channel.
///
/// The coarse channel is `value` rounded down to a multiple of `1/255`; the
/// fine channel carries the remainder scaled up by 255. Both channels survive
/// 8-bit quantization with about 16 bits of combined precision.
pub fn pack16(value: f32) -> [f32; 2] {
    let fine = fract(value * 255.0);
    [value - fine / 255.0, fine]
}

/// Inverse of [`pack16`].
pub fn unpack16(packed: [f32; 2]) -> f32 {
    packed[0] + packed[1] / 255.0
}

/// Rounds a normalized channel to its 8-bit stored value.
pub fn quantize(value: f32) -> f32 {
    (value.clamp(0.0, 1.0) * 255.0).round() / 255.0
}

/// Shader-style fractional part (always non-negative).
pub(crate) fn fract(x: f32) -> f32 {
    x - x.floor()
}
