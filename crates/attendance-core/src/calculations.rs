//! Rate and rounding maths shared by the parser and the aggregator.

/// Round `value` to `decimals` places, resolving exact midpoints to the even
/// neighbour (the convention of the spreadsheet tooling the datasets come
/// from).
///
/// ```
/// use attendance_core::calculations::round_to;
///
/// assert_eq!(round_to(10.5, 0), 10.0);
/// assert_eq!(round_to(11.5, 0), 12.0);
/// assert_eq!(round_to(66.666_666, 2), 66.67);
/// ```
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10_f64.powi(decimals as i32);
    (value * factor).round_ties_even() / factor
}

/// Attendance as a percentage of target, rounded to 2 decimals.
///
/// Returns `None` when `target` is zero (or not a positive finite number):
/// the rate is undefined rather than infinite.
///
/// ```
/// use attendance_core::calculations::attendance_rate;
///
/// assert_eq!(attendance_rate(5.0, 10.0), Some(50.0));
/// assert_eq!(attendance_rate(5.0, 0.0), None);
/// ```
pub fn attendance_rate(attendance: f64, target: f64) -> Option<f64> {
    if !(target.is_finite() && target > 0.0) {
        return None;
    }
    let rate = round_to(attendance / target * 100.0, 2);
    rate.is_finite().then_some(rate)
}

/// Arithmetic mean of `values`, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}
