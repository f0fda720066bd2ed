use crate::libs::align::config::DEGREE_CEILING;
use crate::libs::align::error::AlignError;
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// A set of children of one node, bit `k` standing for the `k`-th child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ChildSubset(pub u32);

impl ChildSubset {
    pub const EMPTY: ChildSubset = ChildSubset(0);

    /// All `degree` children
    pub fn full(degree: usize) -> Self {
        if degree >= 32 {
            ChildSubset(u32::MAX)
        } else {
            ChildSubset((1u32 << degree) - 1)
        }
    }

    pub fn singleton(index: usize) -> Self {
        ChildSubset(1 << index)
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn contains(&self, index: usize) -> bool {
        self.0 & (1 << index) != 0
    }

    pub fn without(&self, other: ChildSubset) -> Self {
        ChildSubset(self.0 & !other.0)
    }

    /// Lowest child index in the set
    pub fn first(&self) -> Option<usize> {
        if self.0 == 0 {
            None
        } else {
            Some(self.0.trailing_zeros() as usize)
        }
    }

    /// Child indices, ascending
    pub fn singletons(&self) -> Singletons {
        Singletons { rest: self.0 }
    }

    /// Every subset of this set, the empty set and the set itself included,
    /// in ascending mask order
    pub fn sub_masks(&self) -> SubMasks {
        SubMasks {
            mask: self.0,
            next: Some(0),
        }
    }
}

pub struct Singletons {
    rest: u32,
}

impl Iterator for Singletons {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.rest == 0 {
            return None;
        }
        let k = self.rest.trailing_zeros() as usize;
        self.rest &= self.rest - 1;
        Some(k)
    }
}

pub struct SubMasks {
    mask: u32,
    next: Option<u32>,
}

impl Iterator for SubMasks {
    type Item = ChildSubset;

    fn next(&mut self) -> Option<ChildSubset> {
        let cur = self.next?;
        self.next = if cur == self.mask {
            None
        } else {
            Some((cur | !self.mask).wrapping_add(1) & self.mask)
        };
        Some(ChildSubset(cur))
    }
}

/// Subsets of a `degree`-element set in fill order: ascending size, ties by
/// ascending mask. Every proper subset of a set precedes the set itself.
#[derive(Debug, Clone)]
pub struct SubsetTable {
    degree: usize,
    order: Vec<ChildSubset>,
}

impl SubsetTable {
    pub fn new(degree: usize) -> Self {
        let mut order: Vec<ChildSubset> = (0..(1u32 << degree)).map(ChildSubset).collect();
        order.sort_by_key(|s| (s.len(), s.0));
        Self { degree, order }
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn full(&self) -> ChildSubset {
        ChildSubset::full(self.degree)
    }

    pub fn order(&self) -> &[ChildSubset] {
        &self.order
    }
}

/// Shared, lazily built subset tables keyed by degree.
pub struct SubsetCache {
    tables: RwLock<HashMap<usize, Arc<SubsetTable>>>,
}

lazy_static! {
    static ref GLOBAL_SUBSETS: SubsetCache = SubsetCache::new();
}

impl Default for SubsetCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SubsetCache {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// The process-wide cache
    pub fn global() -> &'static SubsetCache {
        &GLOBAL_SUBSETS
    }

    /// Table for `degree`, built on first request
    pub fn get(&self, degree: usize) -> Result<Arc<SubsetTable>, AlignError> {
        if degree > DEGREE_CEILING {
            return Err(AlignError::TooBushy {
                degree,
                limit: DEGREE_CEILING,
            });
        }
        if let Some(table) = self
            .tables
            .read()
            .map_err(|_| AlignError::Logic("subset cache poisoned".to_string()))?
            .get(&degree)
        {
            return Ok(table.clone());
        }

        let mut tables = self
            .tables
            .write()
            .map_err(|_| AlignError::Logic("subset cache poisoned".to_string()))?;
        // another thread may have built it meanwhile
        let table = tables
            .entry(degree)
            .or_insert_with(|| Arc::new(SubsetTable::new(degree)))
            .clone();
        Ok(table)
    }
}
