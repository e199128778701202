//! Shared iterative root-finder for financial functions.
//!
//! The algorithm, iteration cap, and tolerance arrive as an
//! [`IterationPolicy`] attached to function metadata, so IRR and RATE (and
//! any host-supplied handler) can switch between Newton-Raphson, secant, and
//! bisection without touching their own code.

use calcine_common::ExcelError;

use crate::function::{IterationPolicy, SolveAlgorithm};

/// Step used for the numeric derivative when no closed form is supplied.
const DERIVATIVE_STEP: f64 = 1e-7;

/// Find a root of `f` near `guess` under `policy`.
///
/// Converges when `|f(x)| < policy.tolerance`. Fails with `#NUM!` when the
/// iteration budget is exhausted, the derivative collapses to numerical
/// zero, or an iterate leaves the finite range.
pub fn solve(
    policy: &IterationPolicy,
    f: impl Fn(f64) -> f64,
    derivative: Option<&dyn Fn(f64) -> f64>,
    guess: f64,
) -> Result<f64, ExcelError> {
    match policy.algorithm {
        SolveAlgorithm::NewtonRaphson => newton(policy, &f, derivative, guess),
        SolveAlgorithm::Secant => secant(policy, &f, guess),
        SolveAlgorithm::Bisection => bisection(policy, &f, guess),
    }
}

fn non_convergence() -> ExcelError {
    ExcelError::new_num().with_message("solver did not converge")
}

fn newton(
    policy: &IterationPolicy,
    f: &impl Fn(f64) -> f64,
    derivative: Option<&dyn Fn(f64) -> f64>,
    guess: f64,
) -> Result<f64, ExcelError> {
    let mut x = guess;
    for _ in 0..policy.max_iterations {
        if !x.is_finite() {
            return Err(non_convergence());
        }
        let fx = f(x);
        if fx.abs() < policy.tolerance {
            return Ok(x);
        }
        let dfx = match derivative {
            Some(df) => df(x),
            None => (f(x + DERIVATIVE_STEP) - fx) / DERIVATIVE_STEP,
        };
        if dfx.abs() < f64::EPSILON || !dfx.is_finite() {
            return Err(non_convergence());
        }
        x -= fx / dfx;
    }
    #[cfg(feature = "tracing")]
    tracing::debug!(
        iterations = policy.max_iterations,
        "newton solver exhausted its budget"
    );
    Err(non_convergence())
}

fn secant(
    policy: &IterationPolicy,
    f: &impl Fn(f64) -> f64,
    guess: f64,
) -> Result<f64, ExcelError> {
    let mut x0 = guess;
    let mut x1 = guess + 1e-4;
    let mut f0 = f(x0);
    for _ in 0..policy.max_iterations {
        if !x1.is_finite() {
            return Err(non_convergence());
        }
        let f1 = f(x1);
        if f1.abs() < policy.tolerance {
            return Ok(x1);
        }
        let denom = f1 - f0;
        if denom.abs() < f64::EPSILON || !denom.is_finite() {
            return Err(non_convergence());
        }
        let next = x1 - f1 * (x1 - x0) / denom;
        x0 = x1;
        f0 = f1;
        x1 = next;
    }
    Err(non_convergence())
}

/// Bisection brackets outward from the guess first, then halves. Slower but
/// immune to derivative blow-ups.
fn bisection(
    policy: &IterationPolicy,
    f: &impl Fn(f64) -> f64,
    guess: f64,
) -> Result<f64, ExcelError> {
    let (mut lo, mut hi) = bracket(f, guess).ok_or_else(non_convergence)?;
    let mut flo = f(lo);
    for _ in 0..policy.max_iterations {
        let mid = (lo + hi) / 2.0;
        let fmid = f(mid);
        if fmid.abs() < policy.tolerance {
            return Ok(mid);
        }
        if (flo < 0.0) == (fmid < 0.0) {
            lo = mid;
            flo = fmid;
        } else {
            hi = mid;
        }
    }
    Err(non_convergence())
}

/// Expand around the guess until a sign change is found.
fn bracket(f: &impl Fn(f64) -> f64, guess: f64) -> Option<(f64, f64)> {
    let mut span = 0.5f64.max(guess.abs() * 0.5);
    for _ in 0..64 {
        let lo = guess - span;
        let hi = guess + span;
        let (flo, fhi) = (f(lo), f(hi));
        if flo.is_finite() && fhi.is_finite() && (flo < 0.0) != (fhi < 0.0) {
            return Some((lo, hi));
        }
        span *= 2.0;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use calcine_common::ErrorKind;

    fn policy(algorithm: SolveAlgorithm) -> IterationPolicy {
        IterationPolicy {
            algorithm,
            ..IterationPolicy::default()
        }
    }

    #[test]
    fn newton_finds_square_root() {
        let p = policy(SolveAlgorithm::NewtonRaphson);
        let root = solve(&p, |x| x * x - 2.0, Some(&|x| 2.0 * x), 1.0).unwrap();
        assert!((root - 2f64.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn newton_uses_numeric_derivative_when_absent() {
        let p = policy(SolveAlgorithm::NewtonRaphson);
        let root = solve(&p, |x| x * x * x - 8.0, None, 3.0).unwrap();
        assert!((root - 2.0).abs() < 1e-5);
    }

    #[test]
    fn all_algorithms_agree_on_a_simple_root() {
        for alg in [
            SolveAlgorithm::NewtonRaphson,
            SolveAlgorithm::Secant,
            SolveAlgorithm::Bisection,
        ] {
            let p = policy(alg);
            let root = solve(&p, |x| x - 3.5, None, 0.0).unwrap();
            assert!((root - 3.5).abs() < 1e-6, "{alg:?} missed: {root}");
        }
    }

    #[test]
    fn zero_derivative_is_num_error() {
        let p = policy(SolveAlgorithm::NewtonRaphson);
        // Flat objective away from any root: f' == 0 everywhere.
        let err = solve(&p, |_| 1.0, Some(&|_| 0.0), 0.0).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Num);
    }

    #[test]
    fn budget_exhaustion_is_num_error() {
        let p = IterationPolicy {
            max_iterations: 3,
            tolerance: 1e-12,
            algorithm: SolveAlgorithm::NewtonRaphson,
        };
        // cos(x) - x converges, but not in 3 iterations from a bad start.
        let err = solve(&p, |x| x.cos() - x, None, 40.0).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Num);
    }
}
