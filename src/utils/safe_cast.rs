//! Clamped numeric conversions for pixel coordinates and intensities

/// Clamp and convert f32 to i32 for pixel coordinates
#[must_use]
#[allow(clippy::cast_precision_loss)] // Pixel bounds are far below f32's exact integer range
#[allow(clippy::cast_possible_truncation)] // Truncation after clamping is safe
pub fn f32_to_i32_clamp(value: f32, min: i32, max: i32) -> i32 {
    let (min, max) = if min <= max { (min, max) } else { (max, min) };

    if !value.is_finite() {
        return min;
    }

    let clamped = value.clamp(min as f32, max as f32);
    (clamped as i32).clamp(min, max)
}

/// Round a sub-pixel coordinate to the nearest pixel, clamped to `[min, max]`
#[must_use]
pub fn round_to_pixel(value: f32, min: i32, max: i32) -> i32 {
    f32_to_i32_clamp(value.round(), min, max)
}

/// Clamp a threshold-like integer into the 8-bit intensity range
#[must_use]
#[allow(clippy::cast_sign_loss)] // Clamped to 0 first
#[allow(clippy::cast_possible_truncation)] // Clamped to 255 first
pub fn i32_to_u8_clamp(value: i32) -> u8 {
    value.clamp(0, 255) as u8
}
