/// Default number of ticks requested for a numeric axis
pub const DEFAULT_TICK_COUNT: usize = 5;

/// Nice tick values (steps of 1, 2, 5 or 10 times a power of ten) that lie
/// inside `[min, max]`. A degenerate range yields its single value; a
/// non-finite one yields nothing.
pub fn nice_ticks(min: f64, max: f64, target: usize) -> Vec<f64> {
    if !min.is_finite() || !max.is_finite() || target == 0 || min > max {
        return Vec::new();
    }
    if min == max {
        return vec![min];
    }

    let step = nice_step(max - min, target);
    let decimals = step_decimals(step);
    let first = (min / step).ceil() as i64;
    let last = (max / step).floor() as i64;

    (first..=last)
        .map(|i| round_to(i as f64 * step, decimals))
        // Rounding may nudge an edge tick outside the range
        .filter(|v| *v >= min && *v <= max)
        .collect()
}

fn nice_step(range: f64, target: usize) -> f64 {
    let rough = range / target as f64;
    let magnitude = 10f64.powf(rough.log10().floor());
    let residual = rough / magnitude;
    let nice = if residual <= 1.0 {
        1.0
    } else if residual <= 2.0 {
        2.0
    } else if residual <= 5.0 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}

fn step_decimals(step: f64) -> i32 {
    (-step.log10().floor()).max(0.0) as i32
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    let rounded = (value * factor).round() / factor;
    // Avoid -0 ticks
    if rounded == 0.0 { 0.0 } else { rounded }
}

/// Linear map of `value` from `domain` onto `range`. A zero-width domain maps
/// everything to the middle of the range.
pub fn rescale(value: f64, domain: (f64, f64), range: (f64, f64)) -> f64 {
    let (d0, d1) = domain;
    let (r0, r1) = range;
    if d1 == d0 || !value.is_finite() {
        return (r0 + r1) / 2.0;
    }
    let t = ((value - d0) / (d1 - d0)).clamp(0.0, 1.0);
    r0 + t * (r1 - r0)
}
