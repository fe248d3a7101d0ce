use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::stable::StablePool;
use super::traits::{Pool, PoolToken};
use super::weighted::WeightedPool;
use crate::error::{Result, RouterError};
use crate::types::normalize_token;

/// Index of a pool inside a `PoolArena`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoolHandle(usize);

impl PoolHandle {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Owns the mutable pool records a router prices against.
///
/// Paths refer to pools by `PoolHandle`. Execution simulation mutates
/// balances in place, so every independent simulation should run on its
/// own `snapshot()`.
#[derive(Debug, Clone, Default)]
pub struct PoolArena {
    pools: Vec<Box<dyn Pool>>,
    by_id: HashMap<String, PoolHandle>,
}

impl PoolArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, pool: Box<dyn Pool>) -> Result<PoolHandle> {
        let id = pool.id().to_string();
        if self.by_id.contains_key(&id) {
            return Err(RouterError::DuplicatePool(id));
        }
        let handle = PoolHandle(self.pools.len());
        self.pools.push(pool);
        self.by_id.insert(id, handle);
        Ok(handle)
    }

    pub fn get(&self, handle: PoolHandle) -> Option<&dyn Pool> {
        self.pools.get(handle.0).map(|p| p.as_ref())
    }

    pub fn get_mut(&mut self, handle: PoolHandle) -> Option<&mut (dyn Pool + 'static)> {
        self.pools.get_mut(handle.0).map(|p| p.as_mut())
    }

    pub fn handle_of(&self, pool_id: &str) -> Option<PoolHandle> {
        self.by_id.get(pool_id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PoolHandle, &dyn Pool)> {
        self.pools
            .iter()
            .enumerate()
            .map(|(i, p)| (PoolHandle(i), p.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    /// Deep copy for an independent simulation
    pub fn snapshot(&self) -> Self {
        self.clone()
    }

    /// Build an arena from decoded snapshot records
    pub fn from_records(records: Vec<PoolRecord>) -> Result<Self> {
        let mut arena = Self::new();
        for record in records {
            if record.tokens.len() < 2 {
                tracing::warn!("Skipping pool {} - fewer than two tokens", record.id);
                continue;
            }
            let pool = record.into_pool()?;
            arena.insert(pool)?;
        }
        tracing::debug!("Loaded {} pools into arena", arena.len());
        Ok(arena)
    }

    /// Parse a JSON array of `PoolRecord`
    pub fn from_json(raw: &str) -> Result<Self> {
        let records: Vec<PoolRecord> = serde_json::from_str(raw)?;
        Self::from_records(records)
    }
}

/// Serialized pool as found in a snapshot file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolRecord {
    pub id: String,
    pub address: String,
    pub pool_type: String,
    pub swap_fee: Decimal,
    #[serde(default)]
    pub amp: Option<Decimal>,
    pub tokens: Vec<PoolTokenRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolTokenRecord {
    pub address: String,
    pub balance: Decimal,
    pub decimals: u32,
    #[serde(default)]
    pub weight: Option<Decimal>,
}

impl PoolRecord {
    fn into_pool(self) -> Result<Box<dyn Pool>> {
        let tokens: Vec<PoolToken> = self
            .tokens
            .into_iter()
            .map(|t| PoolToken {
                address: normalize_token(&t.address),
                balance: t.balance,
                decimals: t.decimals,
                weight: t.weight,
            })
            .collect();

        match self.pool_type.to_lowercase().as_str() {
            "weighted" => Ok(Box::new(WeightedPool::new(
                &self.id,
                &self.address,
                self.swap_fee,
                tokens,
            )?)),
            "stable" => {
                let amp = self
                    .amp
                    .ok_or_else(|| RouterError::MissingParameter(self.id.clone(), "amp"))?;
                Ok(Box::new(StablePool::new(
                    &self.id,
                    &self.address,
                    self.swap_fee,
                    amp,
                    tokens,
                )?))
            }
            other => Err(RouterError::UnsupportedPoolType {
                pool_id: self.id.clone(),
                pool_type: other.to_string(),
            }),
        }
    }
}
