//! # Deterministic Decimal Maths
//!
//! Helpers over [`rust_decimal::Decimal`] for the consensus-observable
//! arithmetic paths. Floating point is banned in those paths; the square
//! root needed by robust statistics and the Kalman estimator is a Newton
//! iteration over `Decimal` with a typed failure mode.

use rust_decimal::Decimal;
use thiserror::Error;

/// Newton iterations are capped; convergence is quadratic so this is far
/// more than enough for 28 significant digits.
const SQRT_MAX_ITERATIONS: u32 = 64;

/// Failures of the deterministic math helpers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MathError {
    /// Square root of a negative value (indicates upstream corruption).
    #[error("square root of negative value")]
    NegativeSqrt,
    /// Intermediate value exceeded the representable decimal range.
    #[error("decimal overflow during {0}")]
    Overflow(&'static str),
}

/// Deterministic square root via Newton's method.
///
/// Identical inputs produce identical outputs on every replica: the
/// iteration count is fixed and all arithmetic is fixed-precision decimal.
/// Returns [`MathError::NegativeSqrt`] for negative input; zero maps to
/// zero.
pub fn approx_sqrt(value: Decimal) -> Result<Decimal, MathError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(MathError::NegativeSqrt);
    }
    if value.is_zero() {
        return Ok(Decimal::ZERO);
    }

    let two = Decimal::TWO;
    // Starting guess: value/2 + 1 is safe for all positive magnitudes.
    let mut guess = value
        .checked_div(two)
        .ok_or(MathError::Overflow("sqrt seed"))?
        + Decimal::ONE;

    for _ in 0..SQRT_MAX_ITERATIONS {
        let quotient = value
            .checked_div(guess)
            .ok_or(MathError::Overflow("sqrt divide"))?;
        let next = (guess + quotient)
            .checked_div(two)
            .ok_or(MathError::Overflow("sqrt average"))?;
        if next == guess {
            break;
        }
        guess = next;
    }

    Ok(guess)
}
