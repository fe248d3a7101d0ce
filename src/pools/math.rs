//! Checked decimal helpers shared by the pool implementations

use rust_decimal::prelude::*;
use rust_decimal::MathematicalOps;

use crate::error::{Result, RouterError};

pub(crate) fn add(a: Decimal, b: Decimal, ctx: &'static str) -> Result<Decimal> {
    a.checked_add(b).ok_or(RouterError::Overflow(ctx))
}

pub(crate) fn sub(a: Decimal, b: Decimal, ctx: &'static str) -> Result<Decimal> {
    a.checked_sub(b).ok_or(RouterError::Overflow(ctx))
}

pub(crate) fn mul(a: Decimal, b: Decimal, ctx: &'static str) -> Result<Decimal> {
    a.checked_mul(b).ok_or(RouterError::Overflow(ctx))
}

/// Division; a zero divisor is reported as overflow
pub(crate) fn div(a: Decimal, b: Decimal, ctx: &'static str) -> Result<Decimal> {
    a.checked_div(b).ok_or(RouterError::Overflow(ctx))
}

pub(crate) fn pow(base: Decimal, exp: Decimal, ctx: &'static str) -> Result<Decimal> {
    if exp == Decimal::ONE {
        return Ok(base);
    }
    base.checked_powd(exp).ok_or(RouterError::Overflow(ctx))
}

/// Round toward zero at `decimals` places (amounts paid out by a pool)
pub fn round_down(value: Decimal, decimals: u32) -> Decimal {
    value.round_dp_with_strategy(decimals, RoundingStrategy::ToZero)
}

/// Round away from zero at `decimals` places (amounts charged by a pool)
pub fn round_up(value: Decimal, decimals: u32) -> Decimal {
    value.round_dp_with_strategy(decimals, RoundingStrategy::AwayFromZero)
}
