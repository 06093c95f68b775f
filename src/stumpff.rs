//! Stumpff functions `c0..c3`, the series kernels of the universal Kepler equation.

/// Evaluate the Stumpff functions `c0(x)`, `c1(x)`, `c2(x)`, `c3(x)`.
///
/// Uses the reduce-evaluate-restore scheme from Danby §6.9: the argument is
/// quartered until `|x| < 0.1`, `c2` and `c3` are evaluated there by degree-6
/// truncations of the Maclaurin series, and the original argument is restored
/// with the half-angle duplication formulas. Direct series summation at large
/// `|x|` would lose precision to cancellation; the reduction keeps every step
/// well conditioned.
///
/// The outputs satisfy `c1 = 1 - x*c3` and `c0 = 1 - x*c2` to machine accuracy.
pub fn stumpff(x: f64) -> (f64, f64, f64, f64) {
    let mut x = x;
    let mut n = 0;
    while x.abs() >= 0.1 {
        n += 1;
        x /= 4.0;
    }

    let mut c2 =
        (1. - x * (1. - x * (1. - x * (1. - x * (1. - x * (1. - x / 182.) / 132.) / 90.) / 56.)
            / 30.)
            / 12.)
            / 2.;
    let mut c3 =
        (1. - x * (1. - x * (1. - x * (1. - x * (1. - x * (1. - x / 210.) / 156.) / 110.) / 72.)
            / 42.)
            / 20.)
            / 6.;
    let mut c1 = 1. - x * c3;
    let mut c0 = 1. - x * c2;

    for _ in 0..n {
        c3 = (c2 + c0 * c3) / 4.;
        c2 = c1 * c1 / 2.;
        c1 = c0 * c1;
        c0 = 2. * c0 * c0 - 1.;
        x *= 4.;
    }

    (c0, c1, c2, c3)
}

#[cfg(test)]
mod stumpff_test {

    use super::*;

    /// Closed forms: for x > 0, c0 = cos(sqrt(x)), c1 = sin(sqrt(x))/sqrt(x),
    /// c2 = (1 - cos(sqrt(x)))/x, c3 = (sqrt(x) - sin(sqrt(x)))/x^(3/2).
    fn reference_positive(x: f64) -> (f64, f64, f64, f64) {
        let sx = x.sqrt();
        (
            sx.cos(),
            sx.sin() / sx,
            (1.0 - sx.cos()) / x,
            (sx - sx.sin()) / (x * sx),
        )
    }

    fn reference_negative(x: f64) -> (f64, f64, f64, f64) {
        let sx = (-x).sqrt();
        (
            sx.cosh(),
            sx.sinh() / sx,
            (sx.cosh() - 1.0) / -x,
            (sx.sinh() - sx) / (-x * sx),
        )
    }

    #[test]
    fn test_stumpff_at_zero() {
        let (c0, c1, c2, c3) = stumpff(0.0);
        assert_eq!(c0, 1.0);
        assert_eq!(c1, 1.0);
        assert_eq!(c2, 0.5);
        assert_eq!(c3, 1.0 / 6.0);
    }

    #[test]
    fn test_stumpff_identities() {
        for i in 0..200 {
            let x = -10.0 + 0.1003 * i as f64;
            let (c0, c1, c2, c3) = stumpff(x);
            assert!(
                (c1 - (1.0 - x * c3)).abs() < 1e-14,
                "c1 identity broken at x={x}"
            );
            assert!(
                (c0 - (1.0 - x * c2)).abs() < 1e-14,
                "c0 identity broken at x={x}"
            );
        }
    }

    #[test]
    fn test_stumpff_elliptic_closed_form() {
        for &x in &[0.05, 0.5, 1.0, 2.3, 9.9] {
            let (c0, c1, c2, c3) = stumpff(x);
            let (r0, r1, r2, r3) = reference_positive(x);
            assert!((c0 - r0).abs() < 1e-13, "c0 at x={x}: {c0} vs {r0}");
            assert!((c1 - r1).abs() < 1e-13, "c1 at x={x}: {c1} vs {r1}");
            assert!((c2 - r2).abs() < 1e-13, "c2 at x={x}: {c2} vs {r2}");
            assert!((c3 - r3).abs() < 1e-13, "c3 at x={x}: {c3} vs {r3}");
        }
    }

    #[test]
    fn test_stumpff_hyperbolic_closed_form() {
        for &x in &[-0.05, -0.5, -2.0, -9.5] {
            let (c0, c1, c2, c3) = stumpff(x);
            let (r0, r1, r2, r3) = reference_negative(x);
            assert!((c0 - r0).abs() < 1e-12 * r0.abs().max(1.0));
            assert!((c1 - r1).abs() < 1e-12 * r1.abs().max(1.0));
            assert!((c2 - r2).abs() < 1e-12 * r2.abs().max(1.0));
            assert!((c3 - r3).abs() < 1e-12 * r3.abs().max(1.0));
        }
    }

    #[test]
    fn test_stumpff_large_argument() {
        // Several reduction passes are needed at x = 50; the restored values
        // must still match the closed forms.
        let x = 50.0;
        let (c0, c1, _, _) = stumpff(x);
        let (r0, r1, _, _) = reference_positive(x);
        assert!((c0 - r0).abs() < 1e-12, "c0(50) = {c0}, expected {r0}");
        assert!((c1 - r1).abs() < 1e-12, "c1(50) = {c1}, expected {r1}");
    }
}
