use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use tsify_next::Tsify;

// ============================================================================
// IDs - slotmap keys for entity arenas, dense index for goods
// ============================================================================

new_key_type! {
    pub struct LocationId;
    pub struct FarmerId;
}

/// Trait for converting SlotMap keys to u64 for the WASM boundary and logs
pub trait KeyToU64 {
    fn to_u64(self) -> u64;
}

impl KeyToU64 for LocationId {
    fn to_u64(self) -> u64 {
        self.0.as_ffi()
    }
}

impl KeyToU64 for FarmerId {
    fn to_u64(self) -> u64 {
        self.0.as_ffi()
    }
}

pub type Price = f64;
pub type Quantity = u32;

/// Index of a good in the world's good list.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct GoodId(pub u32);

impl GoodId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

// ============================================================================
// PerGood - dense per-good storage
// ============================================================================

/// One value per good, indexed by `GoodId`.
///
/// Iteration always follows good id order, which keeps every RNG draw made
/// while walking goods in a fixed sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerGood<T>(Vec<T>);

impl<T> PerGood<T> {
    pub fn from_vec(values: Vec<T>) -> Self {
        Self(values)
    }

    pub fn from_fn(len: usize, f: impl FnMut(usize) -> T) -> Self {
        Self((0..len).map(f).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, good: GoodId) -> Option<&T> {
        self.0.get(good.index())
    }

    pub fn get_mut(&mut self, good: GoodId) -> Option<&mut T> {
        self.0.get_mut(good.index())
    }

    pub fn iter(&self) -> impl Iterator<Item = (GoodId, &T)> {
        self.0
            .iter()
            .enumerate()
            .map(|(i, v)| (GoodId::new(i as u32), v))
    }

    pub fn values(&self) -> &[T] {
        &self.0
    }
}

impl<T: Clone> PerGood<T> {
    pub fn filled(len: usize, value: T) -> Self {
        Self(vec![value; len])
    }
}

impl<T> Index<GoodId> for PerGood<T> {
    type Output = T;

    fn index(&self, good: GoodId) -> &T {
        &self.0[good.index()]
    }
}

impl<T> IndexMut<GoodId> for PerGood<T> {
    fn index_mut(&mut self, good: GoodId) -> &mut T {
        &mut self.0[good.index()]
    }
}

// ============================================================================
// Position - a point in the unit square
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance
    pub fn distance(&self, other: &Position) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

// ============================================================================
// Trade side
// ============================================================================

/// Side of a fill, from the counterparty's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub enum Side {
    /// Counterparty buys goods from the farmer
    Buy,
    /// Counterparty sells goods to the farmer
    Sell,
}
