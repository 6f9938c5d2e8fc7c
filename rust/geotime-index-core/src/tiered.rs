//! Tiered space-filling-curve strategies.
//!
//! A tier is one full discretization of every dimension at a fixed number of
//! bits. A *single-tier* strategy always uses its configured precision. A
//! *full incremental tiered* strategy holds one tier for every precision from
//! the configured bits down to zero, and for each entity picks the finest tier
//! whose cell count stays within the duplicate ceiling. Large extents thus
//! land in few coarse cells instead of thousands of fine ones.

use std::collections::BTreeSet;

use geotime_common::{Result, verify_arg};
use itertools::Itertools;
use log::{trace, warn};

use crate::{
    CellRefinement, IndexStrategy, InsertionId,
    dimension::{BinnedRange, DimensionDefinition, NumericRange},
    sfc::{MAX_BITS_PER_DIMENSION, SfcType},
};

/// Factory for [`TieredSfcIndexStrategy`] configurations.
pub struct TieredSfcIndexFactory;

impl TieredSfcIndexFactory {
    /// A strategy with exactly one tier at the given precision and no duplicate ceiling.
    pub fn create_single_tier_strategy(
        dimensions: Vec<DimensionDefinition>,
        bits: &[u8],
        sfc: SfcType,
    ) -> Result<TieredSfcIndexStrategy> {
        Self::validate(&dimensions, bits)?;
        let finest = bits.iter().copied().max().unwrap_or(0);
        let tiers = vec![Tier {
            id: finest,
            bits: bits.to_vec(),
        }];
        Ok(TieredSfcIndexStrategy::new(
            format!("{sfc}_SINGLE_TIER[{}]", bits.iter().join(",")),
            dimensions,
            bits.to_vec(),
            sfc,
            tiers,
            None,
        ))
    }

    /// A strategy with tiers for every precision from `bits` down to zero.
    ///
    /// Tier `t` assigns `bits[d] - (max(bits) - t)` bits (saturating at zero) to
    /// dimension `d`, so all dimensions lose precision in lock step.
    pub fn create_full_incremental_tiered_strategy(
        dimensions: Vec<DimensionDefinition>,
        bits: &[u8],
        sfc: SfcType,
        max_duplicates: u64,
    ) -> Result<TieredSfcIndexStrategy> {
        Self::validate(&dimensions, bits)?;
        verify_arg!(max_duplicates, max_duplicates >= 1);
        let finest = bits.iter().copied().max().unwrap_or(0);
        let tiers = (0..=finest)
            .rev()
            .map(|t| Tier {
                id: t,
                bits: bits.iter().map(|b| b.saturating_sub(finest - t)).collect(),
            })
            .collect();
        Ok(TieredSfcIndexStrategy::new(
            format!("{sfc}_TIERED[{}]_{max_duplicates}", bits.iter().join(",")),
            dimensions,
            bits.to_vec(),
            sfc,
            tiers,
            Some(max_duplicates),
        ))
    }

    fn validate(dimensions: &[DimensionDefinition], bits: &[u8]) -> Result<()> {
        verify_arg!(dimensions, !dimensions.is_empty());
        verify_arg!(bits, bits.len() == dimensions.len());
        verify_arg!(bits, bits.iter().all(|&b| b <= MAX_BITS_PER_DIMENSION));
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct Tier {
    id: u8,
    bits: Vec<u8>,
}

/// A Hilbert or Z-order strategy with one or more precision tiers.
#[derive(Debug, Clone)]
pub struct TieredSfcIndexStrategy {
    id: String,
    dimensions: Vec<DimensionDefinition>,
    precision_bits: Vec<u8>,
    sfc: SfcType,
    /// Finest first.
    tiers: Vec<Tier>,
    max_duplicates: Option<u64>,
}

impl TieredSfcIndexStrategy {
    fn new(
        id: String,
        dimensions: Vec<DimensionDefinition>,
        precision_bits: Vec<u8>,
        sfc: SfcType,
        tiers: Vec<Tier>,
        max_duplicates: Option<u64>,
    ) -> Self {
        TieredSfcIndexStrategy {
            id,
            dimensions,
            precision_bits,
            sfc,
            tiers,
            max_duplicates,
        }
    }

    pub fn sfc(&self) -> SfcType {
        self.sfc
    }

    pub fn tier_count(&self) -> usize {
        self.tiers.len()
    }

    fn select_tier(&self, combos: &[Vec<&BinnedRange>]) -> &Tier {
        let finest = &self.tiers[0];
        let Some(max) = self.max_duplicates else {
            return finest;
        };
        for tier in &self.tiers {
            let estimate = estimate_cells(tier, combos);
            if estimate <= max as u128 {
                trace!(
                    "strategy {}: tier {} estimated at {estimate} cells (ceiling {max})",
                    self.id, tier.id
                );
                return tier;
            }
        }
        let coarsest = &self.tiers[self.tiers.len() - 1];
        warn!(
            "strategy {}: {} cells at the coarsest tier {} exceed the ceiling of {max}",
            self.id,
            estimate_cells(coarsest, combos),
            coarsest.id
        );
        coarsest
    }

    fn decompose(
        &self,
        tier: &Tier,
        combo: &[&BinnedRange],
        refinement: Option<&dyn CellRefinement>,
        ids: &mut BTreeSet<InsertionId>,
    ) {
        let spans = combo
            .iter()
            .zip(&tier.bits)
            .map(|(range, &bits)| range.cell_span(bits))
            .collect::<Vec<_>>();

        let mut prefix = vec![tier.id];
        for range in combo {
            if let Some(bin) = range.bin {
                prefix.extend_from_slice(&bin.id());
            }
        }

        let refined_dims = refinement.map(|r| r.dimensions()).unwrap_or(&[]);
        let free_dims = (0..combo.len())
            .filter(|d| !refined_dims.contains(d))
            .collect::<Vec<_>>();

        let accepted = match refinement {
            Some(refinement) if !refined_dims.is_empty() => {
                let sub_spans = refined_dims.iter().map(|&d| spans[d]).collect::<Vec<_>>();
                let mut accepted = Vec::new();
                let mut bounds = Vec::with_capacity(refined_dims.len());
                for_each_cell(&sub_spans, |cell| {
                    bounds.clear();
                    bounds.extend(
                        refined_dims
                            .iter()
                            .zip(cell)
                            .map(|(&d, &c)| combo[d].cell_bounds(c, tier.bits[d])),
                    );
                    if refinement.touches(&bounds) {
                        accepted.push(cell.to_vec());
                    }
                });
                if accepted.is_empty() {
                    // Numerical corner cases must not drop the entity from the index.
                    for_each_cell(&sub_spans, |cell| accepted.push(cell.to_vec()));
                }
                accepted
            }
            _ => vec![Vec::new()],
        };

        let free_spans = free_dims.iter().map(|&d| spans[d]).collect::<Vec<_>>();
        let mut coords = vec![0u64; combo.len()];
        for sub in &accepted {
            for (&d, &c) in refined_dims.iter().zip(sub) {
                coords[d] = c;
            }
            for_each_cell(&free_spans, |cell| {
                for (&d, &c) in free_dims.iter().zip(cell) {
                    coords[d] = c;
                }
                let mut key = prefix.clone();
                key.extend(self.sfc.encode(&coords, &tier.bits));
                ids.insert(InsertionId::new(key));
            });
        }
    }
}

impl IndexStrategy for TieredSfcIndexStrategy {
    fn id(&self) -> &str {
        &self.id
    }

    fn dimensions(&self) -> &[DimensionDefinition] {
        &self.dimensions
    }

    fn precision_bits(&self) -> &[u8] {
        &self.precision_bits
    }

    fn max_duplicates(&self) -> Option<u64> {
        self.max_duplicates
    }

    fn insertion_ids(
        &self,
        ranges: &[NumericRange],
        refinement: Option<&dyn CellRefinement>,
    ) -> Result<Vec<InsertionId>> {
        verify_arg!(ranges, ranges.len() == self.dimensions.len());
        let binned = self
            .dimensions
            .iter()
            .zip(ranges)
            .map(|(definition, range)| definition.normalize(*range))
            .collect::<Result<Vec<_>>>()?;
        let combos = binned
            .iter()
            .map(|pieces| pieces.iter())
            .multi_cartesian_product()
            .collect::<Vec<_>>();

        let refinement =
            refinement.filter(|r| r.dimensions().iter().all(|&d| d < self.dimensions.len()));
        let tier = self.select_tier(&combos);
        let mut ids = BTreeSet::new();
        for combo in &combos {
            self.decompose(tier, combo, refinement, &mut ids);
        }
        Ok(ids.into_iter().collect())
    }
}

fn estimate_cells(tier: &Tier, combos: &[Vec<&BinnedRange>]) -> u128 {
    combos
        .iter()
        .map(|combo| {
            combo
                .iter()
                .zip(&tier.bits)
                .map(|(range, &bits)| {
                    let (lo, hi) = range.cell_span(bits);
                    (hi - lo + 1) as u128
                })
                .fold(1u128, u128::saturating_mul)
        })
        .fold(0u128, u128::saturating_add)
}

/// Visits every cell of the inclusive box `spans` in row-major order.
fn for_each_cell(spans: &[(u64, u64)], mut visit: impl FnMut(&[u64])) {
    let mut cell = spans.iter().map(|s| s.0).collect::<Vec<_>>();
    loop {
        visit(&cell);
        let mut d = spans.len();
        loop {
            if d == 0 {
                return;
            }
            d -= 1;
            if cell[d] < spans[d].1 {
                cell[d] += 1;
                break;
            }
            cell[d] = spans[d].0;
        }
    }
}
