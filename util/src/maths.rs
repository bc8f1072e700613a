//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Return the euclidian norm (distance between) of two points.
///
/// If the points do not have the same number of dimentions then `None` is
/// returned.
pub fn norm<T>(point_0: &[T], point_1: &[T]) -> Option<T>
where
    T: Float + std::ops::AddAssign,
{
    // Check that the dimentions match
    if point_0.len() != point_1.len() {
        return None;
    }

    // Sum all elements of the points
    let mut sum = T::zero();

    for (a, b) in point_0.iter().zip(point_1.iter()) {
        sum += (*a - *b).powi(2);
    }

    // Return the squareroot of the sum
    Some(sum.sqrt())
}

/// Limit a value to the range `[min, max]`.
pub fn clamp<T>(value: &T, min: &T, max: &T) -> T
where
    T: Float,
{
    let mut ret = *value;

    if ret > *max {
        ret = *max
    }
    if ret < *min {
        ret = *min
    }

    ret
}

/// Wrap an angle into the range (-pi, pi].
///
/// Any finite angle is accepted. The angle is first reduced with the floating
/// point remainder, which is exact, so at most one addition or subtraction of
/// 2pi follows. Non-finite values are returned unchanged.
pub fn wrap_pi<T>(value: T) -> T
where
    T: Float,
{
    if !value.is_finite() {
        return value;
    }

    let pi_t = T::from(std::f64::consts::PI).unwrap_or_else(T::zero);
    let tau_t = pi_t + pi_t;

    // |ret| < 2pi from here on
    let mut ret = value % tau_t;

    if ret > pi_t {
        ret = ret - tau_t;
    } else if ret <= -pi_t {
        ret = ret + tau_t;
    }

    ret
}

/// Signed difference `a - b` between two angles, wrapped into (-pi, pi].
pub fn ang_diff<T>(a: T, b: T) -> T
where
    T: Float,
{
    wrap_pi(a - b)
}
