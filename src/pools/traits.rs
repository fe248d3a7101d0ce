use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, RouterError};
use crate::types::SwapType;

/// AMM family of a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PoolKind {
    Weighted,
    Stable,
}

impl PoolKind {
    /// Weighted pools are the default AMM type
    pub fn is_default(&self) -> bool {
        matches!(self, PoolKind::Weighted)
    }
}

impl fmt::Display for PoolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolKind::Weighted => write!(f, "Weighted"),
            PoolKind::Stable => write!(f, "Stable"),
        }
    }
}

/// A token held by a pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolToken {
    pub address: String,
    pub balance: Decimal,
    pub decimals: u32,
    /// Only meaningful for weighted pools
    pub weight: Option<Decimal>,
}

/// Pool-specific parameters captured in a pair snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairParams {
    Weighted {
        weight_in: Decimal,
        weight_out: Decimal,
    },
    Stable {
        amp: Decimal,
        balances: Vec<Decimal>,
    },
}

/// Snapshot of the state a pool needs to price `token_in -> token_out`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolPairData {
    pub pool_id: String,
    pub pool_address: String,
    pub kind: PoolKind,
    pub token_in: String,
    pub token_out: String,
    pub index_in: usize,
    pub index_out: usize,
    pub decimals_in: u32,
    pub decimals_out: u32,
    pub balance_in: Decimal,
    pub balance_out: Decimal,
    pub swap_fee: Decimal,
    pub params: PairParams,
}

/// Pricing capability every pool exposes to the router.
///
/// All pricing methods are pure functions of the pair snapshot; only
/// `update_token_balance` mutates the pool. Spot prices are quoted as
/// units of `token_in` per unit of `token_out` and include the swap fee.
pub trait Pool: fmt::Debug + Send + Sync {
    fn id(&self) -> &str;

    fn address(&self) -> &str;

    fn kind(&self) -> PoolKind;

    /// Token addresses in pool order
    fn tokens(&self) -> Vec<String>;

    fn parse_pool_pair_data(&self, token_in: &str, token_out: &str) -> Result<PoolPairData>;

    /// Ranking heuristic for parallel edges, never used for pricing
    fn normalized_liquidity(&self, pair: &PoolPairData) -> Decimal;

    /// Largest amount this pool alone can take (exact-in) or give (exact-out)
    fn limit_amount_swap(&self, pair: &PoolPairData, swap_type: SwapType) -> Decimal;

    /// Output received for `amount_in`
    fn exact_token_in_for_token_out(&self, pair: &PoolPairData, amount_in: Decimal)
        -> Result<Decimal>;

    /// Input required to receive `amount_out`
    fn token_in_for_exact_token_out(&self, pair: &PoolPairData, amount_out: Decimal)
        -> Result<Decimal>;

    fn spot_price_after_swap_exact_token_in_for_token_out(
        &self,
        pair: &PoolPairData,
        amount_in: Decimal,
    ) -> Result<Decimal>;

    fn spot_price_after_swap_token_in_for_exact_token_out(
        &self,
        pair: &PoolPairData,
        amount_out: Decimal,
    ) -> Result<Decimal>;

    /// d(spot price)/d(amount_in)
    fn derivative_spot_price_after_swap_exact_token_in_for_token_out(
        &self,
        pair: &PoolPairData,
        amount_in: Decimal,
    ) -> Result<Decimal>;

    /// d(spot price)/d(amount_out)
    fn derivative_spot_price_after_swap_token_in_for_exact_token_out(
        &self,
        pair: &PoolPairData,
        amount_out: Decimal,
    ) -> Result<Decimal>;

    fn update_token_balance(&mut self, token: &str, new_balance: Decimal) -> Result<()>;

    fn clone_box(&self) -> Box<dyn Pool>;
}

impl Clone for Box<dyn Pool> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Locate `token_in`/`token_out` in a token list
pub(crate) fn pair_indices(
    pool_id: &str,
    tokens: &[PoolToken],
    token_in: &str,
    token_out: &str,
) -> Result<(usize, usize)> {
    let find = |token: &str| {
        tokens
            .iter()
            .position(|t| t.address == token)
            .ok_or_else(|| RouterError::InvalidToken {
                pool_id: pool_id.to_string(),
                token: token.to_string(),
            })
    };
    let index_in = find(token_in)?;
    let index_out = find(token_out)?;
    if index_in == index_out {
        return Err(RouterError::InvalidToken {
            pool_id: pool_id.to_string(),
            token: token_out.to_string(),
        });
    }
    Ok((index_in, index_out))
}

/// Overwrite the balance of `token` in a token list
pub(crate) fn set_balance(
    pool_id: &str,
    tokens: &mut [PoolToken],
    token: &str,
    new_balance: Decimal,
) -> Result<()> {
    let entry = tokens
        .iter_mut()
        .find(|t| t.address == token)
        .ok_or_else(|| RouterError::InvalidToken {
            pool_id: pool_id.to_string(),
            token: token.to_string(),
        })?;
    entry.balance = new_balance;
    Ok(())
}
