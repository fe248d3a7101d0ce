use rust_decimal::Decimal;

use crate::pools::{PoolHandle, PoolPairData};
use crate::types::PathSegment;

/// Edge data representing a swap between two tokens through one pool
#[derive(Debug, Clone)]
pub struct EdgeData {
    pub pool: PoolHandle,
    pub pool_id: String,
    pub pool_address: String,
    pub token_in: String,
    pub token_out: String,
    pub pair: PoolPairData,
    pub normalized_liquidity: Decimal, // Ranking only
    pub is_phantom_hop: bool,          // Pool token is one of the endpoints
}

impl EdgeData {
    pub fn new(pool: PoolHandle, pair: PoolPairData, normalized_liquidity: Decimal) -> Self {
        let is_phantom_hop =
            pair.pool_address == pair.token_in || pair.pool_address == pair.token_out;
        Self {
            pool,
            pool_id: pair.pool_id.clone(),
            pool_address: pair.pool_address.clone(),
            token_in: pair.token_in.clone(),
            token_out: pair.token_out.clone(),
            pair,
            normalized_liquidity,
            is_phantom_hop,
        }
    }

    /// Edge key `poolId-tokenIn-tokenOut`
    pub fn key(&self) -> String {
        format!("{}-{}-{}", self.pool_id, self.token_in, self.token_out)
    }

    pub fn to_segment(&self) -> PathSegment {
        PathSegment {
            pool: self.pool,
            pool_id: self.pool_id.clone(),
            pool_address: self.pool_address.clone(),
            token_in: self.token_in.clone(),
            token_out: self.token_out.clone(),
            pair: self.pair.clone(),
            is_phantom_hop: self.is_phantom_hop,
        }
    }
}
