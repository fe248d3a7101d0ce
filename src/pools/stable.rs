//! Stable Pool
//!
//! StableSwap invariant with `Ann = A · n`:
//!
//! ```text
//! Ann · Σx + D = Ann · D + D^(n+1) / (n^n · Πx)
//! ```
//!
//! Swaps solve the invariant for the counter balance with Newton's method.
//! The marginal rate along the curve is `(Ann + D_P/x_i) / (Ann + D_P/x_j)`
//! with `D_P = D^(n+1) / (n^n · Πx)`, which gives the spot price in closed
//! form; its derivative is taken numerically from that closed form.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::math::{add, div, mul, round_down, round_up, sub};
use super::traits::{pair_indices, set_balance, PairParams, Pool, PoolKind, PoolPairData, PoolToken};
use crate::config::pool_limits::{STABLE_CONVERGENCE, STABLE_MAX_ITERATIONS, STABLE_MAX_OUT_RATIO};
use crate::error::{Result, RouterError};
use crate::types::{normalize_token, SwapType};

/// Relative step used for the numerical spot price derivative
const DERIVATIVE_STEP: Decimal = dec!(0.000001);

#[derive(Debug, Clone)]
pub struct StablePool {
    id: String,
    address: String,
    swap_fee: Decimal,
    amp: Decimal,
    tokens: Vec<PoolToken>,
}

impl StablePool {
    pub fn new(
        id: &str,
        address: &str,
        swap_fee: Decimal,
        amp: Decimal,
        tokens: Vec<PoolToken>,
    ) -> Result<Self> {
        if amp <= Decimal::ZERO {
            return Err(RouterError::MissingParameter(id.to_string(), "amp"));
        }
        let mut tokens = tokens;
        for token in tokens.iter_mut() {
            token.address = normalize_token(&token.address);
        }

        Ok(Self {
            id: id.to_string(),
            address: normalize_token(address),
            swap_fee,
            amp,
            tokens,
        })
    }

    fn params<'a>(&self, pair: &'a PoolPairData) -> Result<(Decimal, &'a [Decimal])> {
        match &pair.params {
            PairParams::Stable { amp, balances } => Ok((*amp, balances.as_slice())),
            PairParams::Weighted { .. } => Err(RouterError::PairDataMismatch(self.id.clone())),
        }
    }

    /// Balances after `amount_in` (net of fee) enters and the curve is re-solved
    fn state_after_exact_in(&self, pair: &PoolPairData, amount_in: Decimal) -> Result<Vec<Decimal>> {
        let (amp, balances) = self.params(pair)?;
        let d = invariant(&self.id, amp, balances)?;
        let g = Decimal::ONE - pair.swap_fee;

        let mut next = balances.to_vec();
        next[pair.index_in] = add(next[pair.index_in], mul(amount_in, g, "stable swap")?, "stable swap")?;
        next[pair.index_out] = balance_given_invariant(&self.id, amp, &next, d, pair.index_out)?;
        Ok(next)
    }

    /// Balances after `amount_out` leaves and the curve is re-solved
    fn state_after_exact_out(&self, pair: &PoolPairData, amount_out: Decimal) -> Result<Vec<Decimal>> {
        let (amp, balances) = self.params(pair)?;
        if amount_out >= balances[pair.index_out] {
            return Err(RouterError::InsufficientBalance(self.id.clone()));
        }
        let d = invariant(&self.id, amp, balances)?;

        let mut next = balances.to_vec();
        next[pair.index_out] = sub(next[pair.index_out], amount_out, "stable swap")?;
        next[pair.index_in] = balance_given_invariant(&self.id, amp, &next, d, pair.index_in)?;
        Ok(next)
    }

    /// Price in `token_in` per `token_out` at a point on the curve, fee included
    fn marginal_price(&self, pair: &PoolPairData, state: &[Decimal]) -> Result<Decimal> {
        let (amp, _) = self.params(pair)?;
        let n = Decimal::from(state.len());
        let ann = mul(amp, n, "stable price")?;
        let d = invariant(&self.id, amp, state)?;

        let mut d_p = d;
        for x in state {
            d_p = div(mul(d_p, d, "stable price")?, mul(*x, n, "stable price")?, "stable price")?;
        }

        let f_in = add(ann, div(d_p, state[pair.index_in], "stable price")?, "stable price")?;
        let f_out = add(ann, div(d_p, state[pair.index_out], "stable price")?, "stable price")?;
        let g = Decimal::ONE - pair.swap_fee;
        div(f_out, mul(g, f_in, "stable price")?, "stable price")
    }

    fn spot_price(&self, pair: &PoolPairData, amount: Decimal, swap_type: SwapType) -> Result<Decimal> {
        let state = match swap_type {
            SwapType::ExactIn => self.state_after_exact_in(pair, amount)?,
            SwapType::ExactOut => self.state_after_exact_out(pair, amount)?,
        };
        self.marginal_price(pair, &state)
    }

    /// Central difference of the closed-form spot price
    fn spot_price_derivative(&self, pair: &PoolPairData, amount: Decimal, swap_type: SwapType) -> Result<Decimal> {
        let scale = match swap_type {
            SwapType::ExactIn => pair.balance_in,
            SwapType::ExactOut => pair.balance_out,
        };
        let h = mul(scale.max(Decimal::ONE), DERIVATIVE_STEP, "stable derivative")?;
        let upper = self.spot_price(pair, amount + h, swap_type)?;
        let lower = self.spot_price(pair, amount - h, swap_type)?;
        div(upper - lower, h + h, "stable derivative")
    }
}

/// Solve the invariant `D` for the given balances
fn invariant(pool_id: &str, amp: Decimal, balances: &[Decimal]) -> Result<Decimal> {
    let sum = balances.iter().try_fold(Decimal::ZERO, |acc, b| add(acc, *b, "stable invariant"))?;
    if sum.is_zero() {
        return Ok(Decimal::ZERO);
    }
    let n = Decimal::from(balances.len());
    let ann = mul(amp, n, "stable invariant")?;

    let mut d = sum;
    for _ in 0..STABLE_MAX_ITERATIONS {
        let mut d_p = d;
        for x in balances {
            d_p = div(mul(d_p, d, "stable invariant")?, mul(*x, n, "stable invariant")?, "stable invariant")?;
        }
        let prev = d;
        let numer = mul(
            add(mul(ann, sum, "stable invariant")?, mul(d_p, n, "stable invariant")?, "stable invariant")?,
            d,
            "stable invariant",
        )?;
        let denom = add(
            mul(ann - Decimal::ONE, d, "stable invariant")?,
            mul(n + Decimal::ONE, d_p, "stable invariant")?,
            "stable invariant",
        )?;
        d = div(numer, denom, "stable invariant")?;
        if (d - prev).abs() <= d * STABLE_CONVERGENCE {
            return Ok(d);
        }
    }
    Err(RouterError::InvariantDidNotConverge(pool_id.to_string()))
}

/// Solve for `balances[index]` keeping `D` and every other balance fixed
fn balance_given_invariant(
    pool_id: &str,
    amp: Decimal,
    balances: &[Decimal],
    d: Decimal,
    index: usize,
) -> Result<Decimal> {
    let n = Decimal::from(balances.len());
    let ann = mul(amp, n, "stable balance")?;

    let mut c = d;
    let mut others = Decimal::ZERO;
    for (j, x) in balances.iter().enumerate() {
        if j == index {
            continue;
        }
        others = add(others, *x, "stable balance")?;
        c = div(mul(c, d, "stable balance")?, mul(*x, n, "stable balance")?, "stable balance")?;
    }
    c = div(mul(c, d, "stable balance")?, mul(ann, n, "stable balance")?, "stable balance")?;
    let b = add(others, div(d, ann, "stable balance")?, "stable balance")?;

    let mut y = d;
    for _ in 0..STABLE_MAX_ITERATIONS {
        let prev = y;
        let numer = add(mul(y, y, "stable balance")?, c, "stable balance")?;
        let denom = sub(add(y + y, b, "stable balance")?, d, "stable balance")?;
        y = div(numer, denom, "stable balance")?;
        if (y - prev).abs() <= y * STABLE_CONVERGENCE {
            return Ok(y);
        }
    }
    Err(RouterError::InvariantDidNotConverge(pool_id.to_string()))
}

impl Pool for StablePool {
    fn id(&self) -> &str {
        &self.id
    }

    fn address(&self) -> &str {
        &self.address
    }

    fn kind(&self) -> PoolKind {
        PoolKind::Stable
    }

    fn tokens(&self) -> Vec<String> {
        self.tokens.iter().map(|t| t.address.clone()).collect()
    }

    fn parse_pool_pair_data(&self, token_in: &str, token_out: &str) -> Result<PoolPairData> {
        let (index_in, index_out) = pair_indices(&self.id, &self.tokens, token_in, token_out)?;
        let t_in = &self.tokens[index_in];
        let t_out = &self.tokens[index_out];

        Ok(PoolPairData {
            pool_id: self.id.clone(),
            pool_address: self.address.clone(),
            kind: PoolKind::Stable,
            token_in: t_in.address.clone(),
            token_out: t_out.address.clone(),
            index_in,
            index_out,
            decimals_in: t_in.decimals,
            decimals_out: t_out.decimals,
            balance_in: t_in.balance,
            balance_out: t_out.balance,
            swap_fee: self.swap_fee,
            params: PairParams::Stable {
                amp: self.amp,
                balances: self.tokens.iter().map(|t| t.balance).collect(),
            },
        })
    }

    fn normalized_liquidity(&self, pair: &PoolPairData) -> Decimal {
        pair.balance_out.checked_mul(self.amp).unwrap_or(Decimal::ZERO)
    }

    // Stable pairs trade near 1:1, so the out-balance caps both directions
    fn limit_amount_swap(&self, pair: &PoolPairData, _swap_type: SwapType) -> Decimal {
        pair.balance_out * STABLE_MAX_OUT_RATIO
    }

    fn exact_token_in_for_token_out(&self, pair: &PoolPairData, amount_in: Decimal) -> Result<Decimal> {
        if amount_in <= Decimal::ZERO {
            return Ok(Decimal::ZERO);
        }
        let next = self.state_after_exact_in(pair, amount_in)?;
        let out = sub(pair.balance_out, next[pair.index_out], "stable swap")?;
        Ok(round_down(out.max(Decimal::ZERO), pair.decimals_out))
    }

    fn token_in_for_exact_token_out(&self, pair: &PoolPairData, amount_out: Decimal) -> Result<Decimal> {
        if amount_out <= Decimal::ZERO {
            return Ok(Decimal::ZERO);
        }
        let next = self.state_after_exact_out(pair, amount_out)?;
        let net_in = sub(next[pair.index_in], pair.balance_in, "stable swap")?;
        let amount_in = div(net_in, Decimal::ONE - pair.swap_fee, "stable swap")?;
        Ok(round_up(amount_in, pair.decimals_in))
    }

    fn spot_price_after_swap_exact_token_in_for_token_out(
        &self,
        pair: &PoolPairData,
        amount_in: Decimal,
    ) -> Result<Decimal> {
        self.spot_price(pair, amount_in, SwapType::ExactIn)
    }

    fn spot_price_after_swap_token_in_for_exact_token_out(
        &self,
        pair: &PoolPairData,
        amount_out: Decimal,
    ) -> Result<Decimal> {
        self.spot_price(pair, amount_out, SwapType::ExactOut)
    }

    fn derivative_spot_price_after_swap_exact_token_in_for_token_out(
        &self,
        pair: &PoolPairData,
        amount_in: Decimal,
    ) -> Result<Decimal> {
        self.spot_price_derivative(pair, amount_in, SwapType::ExactIn)
    }

    fn derivative_spot_price_after_swap_token_in_for_exact_token_out(
        &self,
        pair: &PoolPairData,
        amount_out: Decimal,
    ) -> Result<Decimal> {
        self.spot_price_derivative(pair, amount_out, SwapType::ExactOut)
    }

    fn update_token_balance(&mut self, token: &str, new_balance: Decimal) -> Result<()> {
        set_balance(&self.id, &mut self.tokens, token, new_balance)
    }

    fn clone_box(&self) -> Box<dyn Pool> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::stable_pool;

    #[test]
    fn test_invariant_of_balanced_pool_is_sum() {
        let d = invariant("s", dec!(100), &[dec!(1000), dec!(1000)]).unwrap();
        assert!((d - dec!(2000)).abs() < dec!(0.000001));
    }

    #[test]
    fn test_swap_is_close_to_one_to_one() {
        let pool = stable_pool("s1", &["a", "b"], dec!(100), dec!(1000000), Decimal::ZERO);
        let pair = pool.parse_pool_pair_data("a", "b").unwrap();

        let out = pool.exact_token_in_for_token_out(&pair, dec!(1000)).unwrap();
        assert!(out < dec!(1000));
        assert!(out > dec!(999.9));
    }

    #[test]
    fn test_exact_out_inverts_exact_in() {
        let pool = stable_pool("s1", &["a", "b", "c"], dec!(50), dec!(10000), dec!(0.0004));
        let pair = pool.parse_pool_pair_data("a", "c").unwrap();

        let amount_in = pool.token_in_for_exact_token_out(&pair, dec!(250)).unwrap();
        let out = pool.exact_token_in_for_token_out(&pair, amount_in).unwrap();
        assert!((out - dec!(250)).abs() < dec!(0.000001));
    }

    #[test]
    fn test_spot_price_matches_finite_difference() {
        let pool = stable_pool("s1", &["a", "b"], dec!(10), dec!(10000), dec!(0.001));
        let pair = pool.parse_pool_pair_data("a", "b").unwrap();

        let amount = dec!(500);
        let h = dec!(0.01);
        let up = pool.exact_token_in_for_token_out(&pair, amount + h).unwrap();
        let down = pool.exact_token_in_for_token_out(&pair, amount - h).unwrap();
        let numeric = (h + h) / (up - down);

        let sp = pool
            .spot_price_after_swap_exact_token_in_for_token_out(&pair, amount)
            .unwrap();
        assert!((sp - numeric).abs() / sp < dec!(0.00001));
    }

    #[test]
    fn test_spot_price_rises_with_amount() {
        let pool = stable_pool("s1", &["a", "b"], dec!(10), dec!(10000), dec!(0.001));
        let pair = pool.parse_pool_pair_data("a", "b").unwrap();

        let d = pool
            .derivative_spot_price_after_swap_exact_token_in_for_token_out(&pair, dec!(100))
            .unwrap();
        assert!(d > Decimal::ZERO);
    }

    #[test]
    fn test_overflowing_liquidity_ranks_last() {
        let pool = stable_pool("s1", &["a", "b"], dec!(1000), Decimal::MAX / dec!(2), Decimal::ZERO);
        let pair = pool.parse_pool_pair_data("a", "b").unwrap();
        assert_eq!(pool.normalized_liquidity(&pair), Decimal::ZERO);
    }

    #[test]
    fn test_kind_and_limits() {
        let pool = stable_pool("s1", &["a", "b"], dec!(10), dec!(10000), Decimal::ZERO);
        let pair = pool.parse_pool_pair_data("a", "b").unwrap();
        assert_eq!(pool.kind(), PoolKind::Stable);
        assert_eq!(pool.limit_amount_swap(&pair, SwapType::ExactOut), dec!(9900));
    }
}
