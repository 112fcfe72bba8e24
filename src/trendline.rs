use crate::config::TrendlineKind;

/// One point of a source series. `y` is `None` for gaps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendPoint {
    pub x: f64,
    pub y: Option<f64>,
}

impl TrendPoint {
    pub fn new(x: f64, y: Option<f64>) -> Self {
        Self { x, y }
    }
}

/// Fitted values over the source x domain, or nothing when the series has
/// too few points for the chosen kind.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrendlineResult {
    /// One value per source point, in source order
    pub values: Vec<f64>,
    pub equation: Option<String>,
}

impl TrendlineResult {
    fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Compute a trendline over `points`. Null y values are ignored when
/// fitting but still receive a fitted value.
pub fn compute_trendline(points: &[TrendPoint], kind: TrendlineKind) -> TrendlineResult {
    let known: Vec<(f64, f64)> = points
        .iter()
        .filter_map(|p| p.y.filter(|y| y.is_finite()).map(|y| (p.x, y)))
        .filter(|(x, _)| x.is_finite())
        .collect();

    match kind {
        TrendlineKind::Linear => linear(points, &known),
        TrendlineKind::Average | TrendlineKind::Min | TrendlineKind::Max | TrendlineKind::Median => {
            constant(points, &known, kind)
        }
        TrendlineKind::ExponentialRegression => exponential(points, &known),
        TrendlineKind::LogarithmicRegression => logarithmic(points, &known),
        TrendlineKind::PolynomialRegression => polynomial(points, &known),
    }
}

/// Straight-line fit in centred form: `y = mean_y + slope·(x - mean_x)`.
#[derive(Debug, Clone, Copy)]
struct LineFit {
    slope: f64,
    mean_x: f64,
    mean_y: f64,
}

impl LineFit {
    fn predict(&self, x: f64) -> f64 {
        self.mean_y + self.slope * (x - self.mean_x)
    }

    /// Value at x = 0 in the caller's x.
    fn intercept(&self) -> f64 {
        self.mean_y - self.slope * self.mean_x
    }
}

/// Ordinary least squares on mean-centred sums; `None` when x has no spread.
fn least_squares(pairs: &[(f64, f64)]) -> Option<LineFit> {
    if pairs.len() < 2 || !has_spread(pairs) {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let (sxx, sxy) = pairs.iter().fold((0.0, 0.0), |(sxx, sxy), (x, y)| {
        let dx = x - mean_x;
        (sxx + dx * dx, sxy + dx * (y - mean_y))
    });
    if sxx <= 0.0 || !sxx.is_finite() {
        return None;
    }
    Some(LineFit {
        slope: sxy / sxx,
        mean_x,
        mean_y,
    })
}

fn has_spread(pairs: &[(f64, f64)]) -> bool {
    let first = pairs[0].0;
    pairs.iter().any(|(x, _)| *x != first)
}

fn linear(points: &[TrendPoint], known: &[(f64, f64)]) -> TrendlineResult {
    let Some(fit) = least_squares(known) else {
        return TrendlineResult::empty();
    };
    TrendlineResult {
        values: points.iter().map(|p| fit.predict(p.x)).collect(),
        equation: Some(format!("y = {}", polynomial_terms(&[fit.intercept(), fit.slope]))),
    }
}

fn constant(points: &[TrendPoint], known: &[(f64, f64)], kind: TrendlineKind) -> TrendlineResult {
    if known.is_empty() {
        return TrendlineResult::empty();
    }
    let mut ys: Vec<f64> = known.iter().map(|(_, y)| *y).collect();
    let value = match kind {
        TrendlineKind::Min => ys.iter().copied().fold(f64::INFINITY, f64::min),
        TrendlineKind::Max => ys.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        TrendlineKind::Median => {
            ys.sort_by(|a, b| a.total_cmp(b));
            percentile(&ys, 0.5)
        }
        _ => ys.iter().sum::<f64>() / ys.len() as f64,
    };
    TrendlineResult {
        values: vec![value; points.len()],
        equation: Some(format!("y = {}", coefficient(value))),
    }
}

fn percentile(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n == 1 {
        return sorted[0];
    }

    let rank = p * (n - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let weight = rank - lower as f64;
        sorted[lower] * (1.0 - weight) + sorted[upper] * weight
    }
}

/// `y = a·e^(b·x)`, fitted on `ln y`. y is shifted positive and x is
/// normalised to start at 1 before fitting.
fn exponential(points: &[TrendPoint], known: &[(f64, f64)]) -> TrendlineResult {
    if known.len() < 2 {
        return TrendlineResult::empty();
    }
    let min_y = known.iter().map(|(_, y)| *y).fold(f64::INFINITY, f64::min);
    let y_shift = if min_y <= 0.0 { min_y.abs() + 1.0 } else { 0.0 };
    let min_x = known.iter().map(|(x, _)| *x).fold(f64::INFINITY, f64::min);
    let normalise = |x: f64| x - min_x + 1.0;

    let logged: Vec<(f64, f64)> = known
        .iter()
        .map(|(x, y)| (normalise(*x), (y + y_shift).ln()))
        .collect();
    let Some(fit) = least_squares(&logged) else {
        return TrendlineResult::empty();
    };
    let (a, b) = (fit.intercept().exp(), fit.slope);

    // Same curve expressed against the caller's x
    let a_display = a * (b * (1.0 - min_x)).exp();
    let mut equation = format!("y = {}e^({}x)", coefficient(a_display), coefficient(b));
    if y_shift > 0.0 {
        equation.push_str(&format!(" - {}", coefficient(y_shift)));
    }

    TrendlineResult {
        values: points
            .iter()
            .map(|p| fit.predict(normalise(p.x)).exp() - y_shift)
            .collect(),
        equation: Some(equation),
    }
}

/// `y = a + b·ln(x)`. x is shifted positive when needed.
fn logarithmic(points: &[TrendPoint], known: &[(f64, f64)]) -> TrendlineResult {
    if known.len() < 2 {
        return TrendlineResult::empty();
    }
    let min_x = points
        .iter()
        .map(|p| p.x)
        .filter(|x| x.is_finite())
        .fold(f64::INFINITY, f64::min);
    let x_shift = if min_x <= 0.0 { min_x.abs() + 1.0 } else { 0.0 };

    let logged: Vec<(f64, f64)> = known.iter().map(|(x, y)| ((x + x_shift).ln(), *y)).collect();
    let Some(fit) = least_squares(&logged) else {
        return TrendlineResult::empty();
    };
    let (a, b) = (fit.intercept(), fit.slope);

    let argument = if x_shift > 0.0 {
        format!("x + {}", coefficient(x_shift))
    } else {
        "x".to_string()
    };
    TrendlineResult {
        values: points.iter().map(|p| fit.predict((p.x + x_shift).ln())).collect(),
        equation: Some(format!("y = {} + {} ln({})", coefficient(a), coefficient(b), argument)),
    }
}

/// Order-2 least squares through the normal equations. x is centred on its
/// mean and scaled to [-1, 1] before the power sums are taken.
fn polynomial(points: &[TrendPoint], known: &[(f64, f64)]) -> TrendlineResult {
    const ORDER: usize = 2;
    if known.len() < ORDER + 1 || !has_spread(known) {
        return TrendlineResult::empty();
    }
    let mean_x = known.iter().map(|(x, _)| x).sum::<f64>() / known.len() as f64;
    let scale = known.iter().map(|(x, _)| (x - mean_x).abs()).fold(0.0, f64::max);
    if scale <= 0.0 || !scale.is_finite() {
        return TrendlineResult::empty();
    }
    let to_u = |x: f64| (x - mean_x) / scale;

    // Sums of u^k for k in 0..=2*ORDER, and of u^k * y for k in 0..=ORDER
    let mut power_sums = [0.0f64; 2 * ORDER + 1];
    let mut rhs = [0.0f64; ORDER + 1];
    for (x, y) in known {
        let u = to_u(*x);
        let mut up = 1.0;
        for (k, sum) in power_sums.iter_mut().enumerate() {
            *sum += up;
            if k <= ORDER {
                rhs[k] += up * y;
            }
            up *= u;
        }
    }

    let mut matrix = [[0.0f64; ORDER + 2]; ORDER + 1];
    for (row, cells) in matrix.iter_mut().enumerate() {
        for col in 0..=ORDER {
            cells[col] = power_sums[row + col];
        }
        cells[ORDER + 1] = rhs[row];
    }

    let Some(c) = solve(matrix) else {
        return TrendlineResult::empty();
    };

    // c0 + c1·u + c2·u² with u = (x - m) / s, expanded into powers of x
    let (c1, c2) = (c[1] / scale, c[2] / (scale * scale));
    let in_x = [
        c[0] - c1 * mean_x + c2 * mean_x * mean_x,
        c1 - 2.0 * c2 * mean_x,
        c2,
    ];
    TrendlineResult {
        values: points
            .iter()
            .map(|p| {
                let u = to_u(p.x);
                c.iter().rev().fold(0.0, |acc, k| acc * u + k)
            })
            .collect(),
        equation: Some(format!("y = {}", polynomial_terms(&in_x))),
    }
}

/// Gauss-Jordan elimination with partial pivoting on an augmented matrix.
fn solve<const N: usize, const M: usize>(mut matrix: [[f64; M]; N]) -> Option<[f64; N]> {
    for col in 0..N {
        let pivot = (col..N).max_by(|a, b| matrix[*a][col].abs().total_cmp(&matrix[*b][col].abs()))?;
        if matrix[pivot][col].abs() < 1e-12 {
            return None;
        }
        matrix.swap(col, pivot);
        for row in 0..N {
            if row != col {
                let factor = matrix[row][col] / matrix[col][col];
                for k in col..M {
                    matrix[row][k] -= factor * matrix[col][k];
                }
            }
        }
    }
    let mut out = [0.0; N];
    for (i, value) in out.iter_mut().enumerate() {
        *value = matrix[i][M - 1] / matrix[i][i];
    }
    Some(out)
}

fn round2(v: f64) -> f64 {
    let r = (v * 100.0).round() / 100.0;
    if r == 0.0 { 0.0 } else { r }
}

fn coefficient(v: f64) -> String {
    round2(v).to_string()
}

/// Render `c0 + c1·x + c2·x^2 ...` highest power first.
fn polynomial_terms(coefficients: &[f64]) -> String {
    let mut out = String::new();
    for (power, c) in coefficients.iter().enumerate().rev() {
        let c = round2(*c);
        let magnitude = c.abs().to_string();
        let term = match power {
            0 => magnitude,
            1 => format!("{}x", magnitude),
            p => format!("{}x^{}", magnitude, p),
        };
        if out.is_empty() {
            if c < 0.0 {
                out.push('-');
            }
            out.push_str(&term);
        } else {
            out.push_str(if c < 0.0 { " - " } else { " + " });
            out.push_str(&term);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(points: &[(f64, Option<f64>)]) -> Vec<TrendPoint> {
        points.iter().map(|(x, y)| TrendPoint::new(*x, *y)).collect()
    }

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-6, "{} != {}", a, e);
        }
    }

    #[test]
    fn test_linear_two_points_exact() {
        let pts = series(&[(1.0, Some(3.0)), (4.0, Some(9.0))]);
        let result = compute_trendline(&pts, TrendlineKind::Linear);
        assert_close(&result.values, &[3.0, 9.0]);
        assert_eq!(result.equation.as_deref(), Some("y = 2x + 1"));
    }

    #[test]
    fn test_linear_epoch_seconds_x() {
        let pts = series(&[(1.7e9, Some(1.0)), (1.7e9 + 60.0, Some(5.0))]);
        let result = compute_trendline(&pts, TrendlineKind::Linear);
        assert_close(&result.values, &[1.0, 5.0]);

        let pts = series(&[(1e8, Some(1.0)), (1e8 + 1.0, Some(5.0))]);
        assert_close(&compute_trendline(&pts, TrendlineKind::Linear).values, &[1.0, 5.0]);
    }

    #[test]
    fn test_linear_same_x_is_empty() {
        let pts = series(&[(1.7e9, Some(1.0)), (1.7e9, Some(5.0))]);
        assert!(compute_trendline(&pts, TrendlineKind::Linear).is_empty());
    }

    #[test]
    fn test_linear_needs_two_points() {
        let pts = series(&[(1.0, Some(3.0)), (2.0, None)]);
        assert!(compute_trendline(&pts, TrendlineKind::Linear).is_empty());
        assert!(compute_trendline(&[], TrendlineKind::Linear).is_empty());
    }

    #[test]
    fn test_linear_fills_gaps() {
        let pts = series(&[(0.0, Some(0.0)), (1.0, None), (2.0, Some(4.0))]);
        let result = compute_trendline(&pts, TrendlineKind::Linear);
        assert_close(&result.values, &[0.0, 2.0, 4.0]);
    }

    #[test]
    fn test_constant_kinds() {
        let pts = series(&[(0.0, Some(1.0)), (1.0, Some(5.0)), (2.0, None), (3.0, Some(3.0))]);
        assert_close(&compute_trendline(&pts, TrendlineKind::Average).values, &[3.0; 4]);
        assert_close(&compute_trendline(&pts, TrendlineKind::Min).values, &[1.0; 4]);
        assert_close(&compute_trendline(&pts, TrendlineKind::Max).values, &[5.0; 4]);
        assert_close(&compute_trendline(&pts, TrendlineKind::Median).values, &[3.0; 4]);
    }

    #[test]
    fn test_median_even_count() {
        let pts = series(&[(0.0, Some(4.0)), (1.0, Some(1.0)), (2.0, Some(2.0)), (3.0, Some(3.0))]);
        assert_close(&compute_trendline(&pts, TrendlineKind::Median).values, &[2.5; 4]);
    }

    #[test]
    fn test_exponential_recovers_curve() {
        let pts: Vec<TrendPoint> = (0..5)
            .map(|i| TrendPoint::new(i as f64, Some(2.0 * (i as f64).exp())))
            .collect();
        let result = compute_trendline(&pts, TrendlineKind::ExponentialRegression);
        let expected: Vec<f64> = (0..5).map(|i| 2.0 * (i as f64).exp()).collect();
        for (a, e) in result.values.iter().zip(&expected) {
            assert!((a - e).abs() < 1e-6 * e.max(1.0));
        }
        assert_eq!(result.equation.as_deref(), Some("y = 2e^(1x)"));
    }

    #[test]
    fn test_exponential_shifts_non_positive() {
        let pts = series(&[(0.0, Some(-1.0)), (1.0, Some(0.0)), (2.0, Some(2.0))]);
        let result = compute_trendline(&pts, TrendlineKind::ExponentialRegression);
        assert_eq!(result.values.len(), 3);
        assert!(result.values.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_logarithmic_fit() {
        let pts: Vec<TrendPoint> = (1..6)
            .map(|i| TrendPoint::new(i as f64, Some(1.0 + 2.0 * (i as f64).ln())))
            .collect();
        let result = compute_trendline(&pts, TrendlineKind::LogarithmicRegression);
        let expected: Vec<f64> = (1..6).map(|i| 1.0 + 2.0 * (i as f64).ln()).collect();
        assert_close(&result.values, &expected);
        assert_eq!(result.equation.as_deref(), Some("y = 1 + 2 ln(x)"));
    }

    #[test]
    fn test_polynomial_fit() {
        let pts: Vec<TrendPoint> = (-2..4)
            .map(|i| {
                let x = i as f64;
                TrendPoint::new(x, Some(x * x - 3.0 * x + 2.0))
            })
            .collect();
        let result = compute_trendline(&pts, TrendlineKind::PolynomialRegression);
        let expected: Vec<f64> = pts.iter().map(|p| p.y.unwrap()).collect();
        assert_close(&result.values, &expected);
        assert_eq!(result.equation.as_deref(), Some("y = 1x^2 - 3x + 2"));
    }

    #[test]
    fn test_polynomial_epoch_seconds_x() {
        let pts: Vec<TrendPoint> = (0..5)
            .map(|i| TrendPoint::new(1.7e9 + 60.0 * i as f64, Some((i * i) as f64)))
            .collect();
        let result = compute_trendline(&pts, TrendlineKind::PolynomialRegression);
        assert_close(&result.values, &[0.0, 1.0, 4.0, 9.0, 16.0]);
    }

    #[test]
    fn test_polynomial_needs_three_points() {
        let pts = series(&[(0.0, Some(1.0)), (1.0, Some(2.0))]);
        assert!(compute_trendline(&pts, TrendlineKind::PolynomialRegression).is_empty());
    }
}
