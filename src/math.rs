//! Heading arithmetic

/// Degrees in a full turn
pub const FULL_TURN: f32 = 360.0;

/// Wrap an angle in degrees into `[0, 360)`
///
/// # Example
/// ```
/// use heading_source::normalize_degrees;
///
/// assert_eq!(normalize_degrees(370.0), 10.0);
/// assert_eq!(normalize_degrees(-90.0), 270.0);
/// ```
pub fn normalize_degrees(degrees: f32) -> f32 {
    let wrapped = degrees % FULL_TURN;
    let wrapped = if wrapped < 0.0 { wrapped + FULL_TURN } else { wrapped };
    // -1e-6 % 360 + 360 rounds to exactly 360 in f32
    if wrapped >= FULL_TURN { 0.0 } else { wrapped }
}

/// Apply a calibration offset to a raw orientation angle
pub fn correct_heading(alpha: f32, offset: f32, wrap: bool) -> f32 {
    let heading = alpha + offset;
    if wrap { normalize_degrees(heading) } else { heading }
}
