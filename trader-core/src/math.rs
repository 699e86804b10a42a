// Small numeric helpers shared by the noise and pricing code

/// Linear blend between `a` and `b`.
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a * (1.0 - t) + b * t
}

/// Round to cents.
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Round to cents without leaving `[lo, hi]`.
///
/// Falls back to the unrounded clamp when the band is narrower than a cent.
pub fn round_cents_within(value: f64, lo: f64, hi: f64) -> f64 {
    let clamped = value.clamp(lo, hi);
    let rounded = round_cents(clamped);
    if rounded >= lo && rounded <= hi {
        return rounded;
    }
    let nudged = if rounded < lo {
        (lo * 100.0).ceil() / 100.0
    } else {
        (hi * 100.0).floor() / 100.0
    };
    if nudged >= lo && nudged <= hi {
        nudged
    } else {
        clamped
    }
}

/// Trilinear interpolation over a dense (t, y, x) grid in row-major order.
///
/// Coordinates are fractions in [0, 1] of each axis; values outside are
/// clamped, and upper corners clamp to the last valid index.
pub fn trilinear(values: &[f64], dims: [usize; 3], tp: f64, yp: f64, xp: f64) -> f64 {
    let [nt, ny, nx] = dims;
    if nt == 0 || ny == 0 || nx == 0 {
        return 0.0;
    }

    let scale = |p: f64, n: usize| {
        let p = if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) };
        p * (n - 1) as f64
    };
    let (tp, yp, xp) = (scale(tp, nt), scale(yp, ny), scale(xp, nx));

    let (t0, y0, x0) = (tp.floor() as usize, yp.floor() as usize, xp.floor() as usize);
    let (t1, y1, x1) = ((t0 + 1).min(nt - 1), (y0 + 1).min(ny - 1), (x0 + 1).min(nx - 1));
    let (dt, dy, dx) = (tp - t0 as f64, yp - y0 as f64, xp - x0 as f64);

    let at = |t: usize, y: usize, x: usize| values[(t * ny + y) * nx + x];

    // x axis
    let c00 = lerp(at(t0, y0, x0), at(t0, y0, x1), dx);
    let c01 = lerp(at(t0, y1, x0), at(t0, y1, x1), dx);
    let c10 = lerp(at(t1, y0, x0), at(t1, y0, x1), dx);
    let c11 = lerp(at(t1, y1, x0), at(t1, y1, x1), dx);

    // y axis
    let c0 = lerp(c00, c01, dy);
    let c1 = lerp(c10, c11, dy);

    // t axis
    lerp(c0, c1, dt)
}
