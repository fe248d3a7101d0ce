//! Fixtures shared by the unit tests

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::pools::{PoolArena, PoolToken, StablePool, WeightedPool};
use crate::types::{Path, PathSegment};

pub fn token(address: &str, balance: Decimal, weight: Option<Decimal>) -> PoolToken {
    PoolToken {
        address: address.to_string(),
        balance,
        decimals: 18,
        weight,
    }
}

/// Two-token 50/50 weighted pool whose address is its id
pub fn weighted_pool(
    id: &str,
    token_a: &str,
    token_b: &str,
    balance_a: Decimal,
    balance_b: Decimal,
    swap_fee: Decimal,
) -> WeightedPool {
    WeightedPool::new(
        id,
        id,
        swap_fee,
        vec![
            token(token_a, balance_a, Some(dec!(0.5))),
            token(token_b, balance_b, Some(dec!(0.5))),
        ],
    )
    .unwrap()
}

/// Equally balanced stable pool whose address is its id
pub fn stable_pool(
    id: &str,
    tokens: &[&str],
    amp: Decimal,
    balance: Decimal,
    swap_fee: Decimal,
) -> StablePool {
    StablePool::new(
        id,
        id,
        swap_fee,
        amp,
        tokens.iter().map(|t| token(t, balance, None)).collect(),
    )
    .unwrap()
}

/// Arena of 50/50 weighted pools given as `(id, token_a, token_b, balance_a, balance_b)`
pub fn weighted_arena(pools: &[(&str, &str, &str, Decimal, Decimal)]) -> PoolArena {
    let mut arena = PoolArena::new();
    for (id, a, b, balance_a, balance_b) in pools {
        arena
            .insert(Box::new(weighted_pool(id, a, b, *balance_a, *balance_b, dec!(0.003))))
            .unwrap();
    }
    arena
}

/// Path through `(pool_id, token_in, token_out)` hops of an arena
pub fn path_through(arena: &PoolArena, hops: &[(&str, &str, &str)]) -> Path {
    let swaps = hops
        .iter()
        .map(|(id, token_in, token_out)| {
            let handle = arena.handle_of(id).unwrap();
            let pool = arena.get(handle).unwrap();
            let pair = pool.parse_pool_pair_data(token_in, token_out).unwrap();
            PathSegment {
                pool: handle,
                pool_id: pool.id().to_string(),
                pool_address: pool.address().to_string(),
                token_in: pair.token_in.clone(),
                token_out: pair.token_out.clone(),
                is_phantom_hop: pool.address() == *token_in || pool.address() == *token_out,
                pair,
            }
        })
        .collect();
    Path::new(swaps)
}
