//! Path pricing, capacity and amount allocation
//!
//! - Path-level spot prices and derivatives composed from pool pricing
//! - Path limits propagated across hops
//! - Newton-style split of a swap amount across paths
//! - Execution of the chosen split on a pool snapshot

pub mod allocator;
pub mod formatter;
pub mod limits;
pub mod path_math;

pub use allocator::{SwapAllocation, SwapAllocator};
pub use formatter::{format_swaps, FormattedSwaps};
pub use limits::{calculate_path_limits, get_limit_amount_swap_for_path};
pub use path_math::{
    derivative_spot_price_after_swap_for_path, effective_price_for_path,
    output_amount_swap_for_path, spot_price_after_swap_for_path,
};
