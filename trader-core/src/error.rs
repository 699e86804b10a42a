//! Error types for world construction and trade fills.
//!
//! Only unrecoverable configuration states surface as `SimError`. Numeric
//! edge cases during a running simulation are clamped where they occur.

use thiserror::Error;

use crate::types::{FarmerId, GoodId, LocationId, Quantity};

/// Errors raised while building a world.
#[derive(Error, Debug)]
pub enum SimError {
    /// Parameter combination that can never produce a valid world
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Farmer whose propensities produce no value
    #[error("farmer {name} has non-positive daily production value {dpv}")]
    NonPositiveDpv { name: String, dpv: f64 },

    /// Base abundance needs at least one farmer
    #[error("no farmers to compute base abundance of {good}")]
    NoFarmers { good: String },

    #[error("{available} candidate location names for {requested} locations")]
    NotEnoughLocationNames { available: usize, requested: usize },

    /// Propensity draw never reached the minimum number of goods
    #[error("could not select {min_n_goods} goods for a farmer after {attempts} attempts")]
    GoodSelectionExhausted { min_n_goods: usize, attempts: usize },

    #[error("unknown good {0:?}")]
    UnknownGood(GoodId),

    /// Farmer bound to a location the world does not hold
    #[error("unknown location {0:?}")]
    UnknownLocation(LocationId),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for world construction.
pub type Result<T> = std::result::Result<T, SimError>;

/// Rejected fill. The farmer is left untouched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TradeError {
    #[error("quantity must be at least 1")]
    InvalidQuantity,

    #[error("unit price {0} must be non-negative and finite")]
    InvalidPrice(f64),

    #[error("farmer holds {available} of {good:?}, {requested} requested")]
    InsufficientInventory {
        good: GoodId,
        available: Quantity,
        requested: Quantity,
    },

    #[error("farmer has {available:.2}, fill costs {required:.2}")]
    InsufficientFunds { available: f64, required: f64 },

    #[error("fill would raise {good:?} to {resulting}, above capacity {max_amount}")]
    ExceedsCapacity {
        good: GoodId,
        resulting: Quantity,
        max_amount: Quantity,
    },

    #[error("unknown good {0:?}")]
    UnknownGood(GoodId),

    #[error("unknown farmer {0:?}")]
    UnknownFarmer(FarmerId),
}
