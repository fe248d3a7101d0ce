pub mod arena;
pub mod math;
pub mod stable;
pub mod traits;
pub mod weighted;

pub use arena::{PoolArena, PoolHandle, PoolRecord, PoolTokenRecord};
pub use stable::StablePool;
pub use traits::{PairParams, Pool, PoolKind, PoolPairData, PoolToken};
pub use weighted::WeightedPool;
