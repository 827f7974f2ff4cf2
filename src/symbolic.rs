//! Closed-form drive expressions for compiled expression evaluators.
//!
//! The rendered grammar has one free variable `t`, the constant `pi`, the
//! functions `sin(x)` and `heaviside(x, x0)` (value `x0` at `x == 0`), and
//! `+ - * /` with parentheses. The evaluator on the other side has no
//! conditionals, so piecewise envelopes are written as sums of windowed terms.
use std::{
    fmt,
    ops::{Add, Div, Mul, Sub},
};

use crate::envelope::{BoxRamp, Segment};

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(f64),
    T,
    Pi,
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Sin(Box<Expr>),
    Heaviside(Box<Expr>, Box<Expr>),
}

impl Expr {
    #[must_use]
    pub const fn num(value: f64) -> Self {
        Self::Num(value)
    }

    #[must_use]
    pub fn sin(arg: Self) -> Self {
        Self::Sin(Box::new(arg))
    }

    #[must_use]
    pub fn heaviside(arg: Self, at_zero: Self) -> Self {
        Self::Heaviside(Box::new(arg), Box::new(at_zero))
    }

    /// Evaluates the expression at time `t`.
    #[must_use]
    pub fn eval(&self, t: f64) -> f64 {
        match self {
            Self::Num(v) => *v,
            Self::T => t,
            Self::Pi => std::f64::consts::PI,
            Self::Add(a, b) => a.eval(t) + b.eval(t),
            Self::Sub(a, b) => a.eval(t) - b.eval(t),
            Self::Mul(a, b) => a.eval(t) * b.eval(t),
            Self::Div(a, b) => a.eval(t) / b.eval(t),
            Self::Sin(a) => a.eval(t).sin(),
            Self::Heaviside(x, x0) => heaviside(x.eval(t), x0.eval(t)),
        }
    }

    const fn precedence(&self) -> u8 {
        match self {
            Self::Add(..) | Self::Sub(..) => 1,
            Self::Mul(..) | Self::Div(..) => 2,
            _ => 3,
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, parens: bool) -> fmt::Result {
        if parens {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }

    fn fmt_binary(
        f: &mut fmt::Formatter<'_>,
        op: &str,
        prec: u8,
        lhs: &Self,
        rhs: &Self,
        non_associative: bool,
    ) -> fmt::Result {
        lhs.fmt_operand(f, lhs.precedence() < prec)?;
        f.write_str(op)?;
        let rhs_prec = rhs.precedence();
        rhs.fmt_operand(f, rhs_prec < prec || (non_associative && rhs_prec == prec))
    }
}

/// Step function with value `at_zero` at `x == 0`.
#[must_use]
pub fn heaviside(x: f64, at_zero: f64) -> f64 {
    if x < 0.0 {
        0.0
    } else if x > 0.0 {
        1.0
    } else if x == 0.0 {
        at_zero
    } else {
        f64::NAN
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Num(v) if v.is_sign_negative() => write!(f, "({v})"),
            Self::Num(v) => write!(f, "{v}"),
            Self::T => f.write_str("t"),
            Self::Pi => f.write_str("pi"),
            Self::Add(a, b) => Self::fmt_binary(f, "+", 1, a, b, false),
            Self::Sub(a, b) => Self::fmt_binary(f, "-", 1, a, b, true),
            Self::Mul(a, b) => Self::fmt_binary(f, "*", 2, a, b, false),
            Self::Div(a, b) => Self::fmt_binary(f, "/", 2, a, b, true),
            Self::Sin(a) => write!(f, "sin({a})"),
            Self::Heaviside(x, x0) => write!(f, "heaviside({x},{x0})"),
        }
    }
}

impl Add for Expr {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::Add(Box::new(self), Box::new(rhs))
    }
}

impl Sub for Expr {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::Sub(Box::new(self), Box::new(rhs))
    }
}

impl Mul for Expr {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Self::Mul(Box::new(self), Box::new(rhs))
    }
}

impl Div for Expr {
    type Output = Self;

    fn div(self, rhs: Self) -> Self::Output {
        Self::Div(Box::new(self), Box::new(rhs))
    }
}

/// `t - start - offset`, evaluated left to right like the numeric envelope
/// computes `t' - offset`.
fn local_time_minus(start: f64, offset: f64) -> Expr {
    let local = Expr::T - Expr::num(start);
    if offset == 0.0 {
        local
    } else {
        local - Expr::num(offset)
    }
}

/// `sin(pi*x/(2*rise))^2`, written as a product.
fn sin_squared(x: Expr, rise: f64) -> Expr {
    let arg = Expr::Pi * x / (Expr::num(2.0) * Expr::num(rise));
    Expr::sin(arg.clone()) * Expr::sin(arg)
}

/// Indicator of `[start + lo, start + hi)`.
fn window(start: f64, lo: f64, hi: f64) -> Expr {
    let step = |offset| Expr::heaviside(local_time_minus(start, offset), Expr::num(1.0));
    step(lo) - step(hi)
}

/// Envelope of a box pulse as a sum of windowed segments.
pub(crate) fn box_ramp_envelope(ramp: &BoxRamp) -> Expr {
    let start = ramp.start().value();
    let rise = ramp.rise_time().value();
    let duration = ramp.duration().value();
    ramp.segments()
        .into_iter()
        .map(|(segment, lo, hi)| {
            let w = window(start, lo, hi);
            match segment {
                Segment::RampUp => sin_squared(Expr::T - Expr::num(start), rise) * w,
                Segment::Flat => w,
                Segment::RampDown => {
                    let remaining = Expr::num(duration) - (Expr::T - Expr::num(start));
                    sin_squared(remaining, rise) * w
                }
            }
        })
        .reduce(|acc, term| acc + term)
        .unwrap_or(Expr::num(0.0))
}

/// `amplitude * sin(omega*t - phase) * envelope`.
pub(crate) fn modulated(amplitude: f64, omega: f64, phase: f64, envelope: Expr) -> Expr {
    let carrier = Expr::sin(Expr::num(omega) * Expr::T - Expr::num(phase));
    Expr::num(amplitude) * carrier * envelope
}
