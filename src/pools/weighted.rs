//! Weighted Pool
//!
//! Constant value function `Π B_k^{w_k} = const`. For a pair with
//! `g = 1 - fee`, `r = w_in / w_out`:
//!
//! - out(a)  = B_out · (1 − (B_in / (B_in + g·a))^r)
//! - in(b)   = B_in · ((B_out / (B_out − b))^(1/r) − 1) / g
//!
//! Spot prices and their derivatives are the closed forms of these curves.

use rust_decimal::Decimal;

use super::math::{add, div, mul, pow, round_down, round_up, sub};
use super::traits::{pair_indices, set_balance, PairParams, Pool, PoolKind, PoolPairData, PoolToken};
use crate::config::pool_limits::{WEIGHTED_MAX_IN_RATIO, WEIGHTED_MAX_OUT_RATIO};
use crate::error::{Result, RouterError};
use crate::types::{normalize_token, SwapType};

#[derive(Debug, Clone)]
pub struct WeightedPool {
    id: String,
    address: String,
    swap_fee: Decimal,
    tokens: Vec<PoolToken>,
}

/// Pair parameters unpacked for the pricing formulas
struct Curve {
    b_in: Decimal,
    b_out: Decimal,
    w_in: Decimal,
    w_out: Decimal,
    g: Decimal,
}

impl WeightedPool {
    pub fn new(id: &str, address: &str, swap_fee: Decimal, tokens: Vec<PoolToken>) -> Result<Self> {
        let mut tokens = tokens;
        for token in tokens.iter_mut() {
            token.address = normalize_token(&token.address);
            match token.weight {
                Some(w) if w > Decimal::ZERO => {}
                _ => return Err(RouterError::MissingParameter(id.to_string(), "weight")),
            }
        }

        Ok(Self {
            id: id.to_string(),
            address: normalize_token(address),
            swap_fee,
            tokens,
        })
    }

    fn curve(&self, pair: &PoolPairData) -> Result<Curve> {
        match pair.params {
            PairParams::Weighted { weight_in, weight_out } => Ok(Curve {
                b_in: pair.balance_in,
                b_out: pair.balance_out,
                w_in: weight_in,
                w_out: weight_out,
                g: Decimal::ONE - pair.swap_fee,
            }),
            PairParams::Stable { .. } => Err(RouterError::PairDataMismatch(self.id.clone())),
        }
    }
}

impl Pool for WeightedPool {
    fn id(&self) -> &str {
        &self.id
    }

    fn address(&self) -> &str {
        &self.address
    }

    fn kind(&self) -> PoolKind {
        PoolKind::Weighted
    }

    fn tokens(&self) -> Vec<String> {
        self.tokens.iter().map(|t| t.address.clone()).collect()
    }

    fn parse_pool_pair_data(&self, token_in: &str, token_out: &str) -> Result<PoolPairData> {
        let (index_in, index_out) = pair_indices(&self.id, &self.tokens, token_in, token_out)?;
        let t_in = &self.tokens[index_in];
        let t_out = &self.tokens[index_out];

        let weight_in = t_in
            .weight
            .ok_or_else(|| RouterError::MissingParameter(self.id.clone(), "weight"))?;
        let weight_out = t_out
            .weight
            .ok_or_else(|| RouterError::MissingParameter(self.id.clone(), "weight"))?;

        Ok(PoolPairData {
            pool_id: self.id.clone(),
            pool_address: self.address.clone(),
            kind: PoolKind::Weighted,
            token_in: t_in.address.clone(),
            token_out: t_out.address.clone(),
            index_in,
            index_out,
            decimals_in: t_in.decimals,
            decimals_out: t_out.decimals,
            balance_in: t_in.balance,
            balance_out: t_out.balance,
            swap_fee: self.swap_fee,
            params: PairParams::Weighted { weight_in, weight_out },
        })
    }

    fn normalized_liquidity(&self, pair: &PoolPairData) -> Decimal {
        match pair.params {
            PairParams::Weighted { weight_in, weight_out } => pair
                .balance_out
                .checked_mul(weight_in)
                .and_then(|n| n.checked_div(weight_in + weight_out))
                .unwrap_or(Decimal::ZERO),
            PairParams::Stable { .. } => Decimal::ZERO,
        }
    }

    fn limit_amount_swap(&self, pair: &PoolPairData, swap_type: SwapType) -> Decimal {
        match swap_type {
            SwapType::ExactIn => pair.balance_in * WEIGHTED_MAX_IN_RATIO,
            SwapType::ExactOut => pair.balance_out * WEIGHTED_MAX_OUT_RATIO,
        }
    }

    fn exact_token_in_for_token_out(&self, pair: &PoolPairData, amount_in: Decimal) -> Result<Decimal> {
        if amount_in <= Decimal::ZERO {
            return Ok(Decimal::ZERO);
        }
        let c = self.curve(pair)?;
        let denom = add(c.b_in, mul(c.g, amount_in, "weighted out")?, "weighted out")?;
        let base = div(c.b_in, denom, "weighted out")?;
        let ratio = div(c.w_in, c.w_out, "weighted out")?;
        let factor = pow(base, ratio, "weighted out")?;
        let out = mul(c.b_out, Decimal::ONE - factor, "weighted out")?;
        Ok(round_down(out.max(Decimal::ZERO), pair.decimals_out))
    }

    fn token_in_for_exact_token_out(&self, pair: &PoolPairData, amount_out: Decimal) -> Result<Decimal> {
        if amount_out <= Decimal::ZERO {
            return Ok(Decimal::ZERO);
        }
        let c = self.curve(pair)?;
        if amount_out >= c.b_out {
            return Err(RouterError::InsufficientBalance(self.id.clone()));
        }
        let base = div(c.b_out, sub(c.b_out, amount_out, "weighted in")?, "weighted in")?;
        let ratio = div(c.w_out, c.w_in, "weighted in")?;
        let factor = pow(base, ratio, "weighted in")?;
        let gross = mul(c.b_in, factor - Decimal::ONE, "weighted in")?;
        let amount_in = div(gross, c.g, "weighted in")?;
        Ok(round_up(amount_in, pair.decimals_in))
    }

    fn spot_price_after_swap_exact_token_in_for_token_out(
        &self,
        pair: &PoolPairData,
        amount_in: Decimal,
    ) -> Result<Decimal> {
        let c = self.curve(pair)?;
        let r = div(c.w_in, c.w_out, "weighted sp")?;
        let grown = add(c.b_in, mul(c.g, amount_in, "weighted sp")?, "weighted sp")?;
        let x_r = pow(div(c.b_in, grown, "weighted sp")?, r, "weighted sp")?;
        let denom = mul(mul(mul(c.b_out, c.g, "weighted sp")?, r, "weighted sp")?, x_r, "weighted sp")?;
        div(grown, denom, "weighted sp")
    }

    fn spot_price_after_swap_token_in_for_exact_token_out(
        &self,
        pair: &PoolPairData,
        amount_out: Decimal,
    ) -> Result<Decimal> {
        let c = self.curve(pair)?;
        let remaining = sub(c.b_out, amount_out, "weighted sp")?;
        if remaining <= Decimal::ZERO {
            return Err(RouterError::InsufficientBalance(self.id.clone()));
        }
        let q = div(c.w_out, c.w_in, "weighted sp")?;
        let y_q = pow(div(c.b_out, remaining, "weighted sp")?, q, "weighted sp")?;
        let lead = div(mul(c.b_in, q, "weighted sp")?, mul(c.g, remaining, "weighted sp")?, "weighted sp")?;
        mul(lead, y_q, "weighted sp")
    }

    fn derivative_spot_price_after_swap_exact_token_in_for_token_out(
        &self,
        pair: &PoolPairData,
        amount_in: Decimal,
    ) -> Result<Decimal> {
        let c = self.curve(pair)?;
        let r = div(c.w_in, c.w_out, "weighted dsp")?;
        let grown = add(c.b_in, mul(c.g, amount_in, "weighted dsp")?, "weighted dsp")?;
        let x_r = pow(div(c.b_in, grown, "weighted dsp")?, r, "weighted dsp")?;
        let denom = mul(mul(c.b_out, r, "weighted dsp")?, x_r, "weighted dsp")?;
        div(Decimal::ONE + r, denom, "weighted dsp")
    }

    fn derivative_spot_price_after_swap_token_in_for_exact_token_out(
        &self,
        pair: &PoolPairData,
        amount_out: Decimal,
    ) -> Result<Decimal> {
        let c = self.curve(pair)?;
        let remaining = sub(c.b_out, amount_out, "weighted dsp")?;
        if remaining <= Decimal::ZERO {
            return Err(RouterError::InsufficientBalance(self.id.clone()));
        }
        let q = div(c.w_out, c.w_in, "weighted dsp")?;
        let y_q = pow(div(c.b_out, remaining, "weighted dsp")?, q, "weighted dsp")?;
        let numer = mul(mul(c.b_in, q, "weighted dsp")?, q + Decimal::ONE, "weighted dsp")?;
        let denom = mul(c.g, mul(remaining, remaining, "weighted dsp")?, "weighted dsp")?;
        mul(div(numer, denom, "weighted dsp")?, y_q, "weighted dsp")
    }

    fn update_token_balance(&mut self, token: &str, new_balance: Decimal) -> Result<()> {
        set_balance(&self.id, &mut self.tokens, token, new_balance)
    }

    fn clone_box(&self) -> Box<dyn Pool> {
        Box::new(self.clone())
    }
}
