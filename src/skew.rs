//! ## Sector Skew
//!
//! Raw dumps hold sectors in logical order.  On the real medium they were
//! laid down with an interleave, so each arriving sector has to be placed
//! in a physical slot of the destination track.  The permutation is built
//! once per side and reused for every track.

use log::trace;

/// Arrival order to physical slot permutation, kept in both directions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkewTable {
    /// indexed by arrival order, value is physical slot
    slots: Vec<usize>,
    /// indexed by physical slot, value is arrival order
    arrivals: Vec<usize>,
}

impl SkewTable {
    /// No interleave, arrival `s` lands in slot `s`.
    pub fn identity(sectors: usize) -> Self {
        Self {
            slots: (0..sectors).collect(),
            arrivals: (0..sectors).collect(),
        }
    }

    /// Build the table for a skew factor.  Slot for arrival `s` starts at
    /// `s * |skew| mod sectors`; an occupied slot is probed forward, or
    /// backward for a negative skew, until a free one turns up.
    pub fn build(skew: i32, sectors: usize) -> Self {
        if skew.unsigned_abs() <= 1 || sectors == 0 {
            return Self::identity(sectors);
        }
        let step = skew.unsigned_abs() as usize % sectors;
        let mut slots = vec![0; sectors];
        let mut arrivals = vec![usize::MAX; sectors];
        for s in 0..sectors {
            let mut slot = (s * step) % sectors;
            while arrivals[slot] != usize::MAX {
                slot = if skew < 0 {
                    (slot + sectors - 1) % sectors
                } else {
                    (slot + 1) % sectors
                };
            }
            arrivals[slot] = s;
            slots[s] = slot;
        }
        trace!("skew {} over {} sectors: {:?}", skew, sectors, slots);
        Self { slots, arrivals }
    }

    /// Physical slot for the sector arriving `s`-th.
    pub fn slot(&self, s: usize) -> usize {
        self.slots[s]
    }

    /// Arrival index of the sector stored in `slot`.
    pub fn arrival(&self, slot: usize) -> usize {
        self.arrivals[slot]
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_identity(&self) -> bool {
        self.slots.iter().enumerate().all(|(s, &slot)| s == slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_bijection(table: &SkewTable, n: usize) {
        let mut seen = vec![false; n];
        for s in 0..n {
            let slot = table.slot(s);
            assert!(slot < n, "slot {} out of range for {} sectors", slot, n);
            assert!(!seen[slot], "slot {} assigned twice", slot);
            seen[slot] = true;
            assert_eq!(table.arrival(slot), s);
        }
    }

    #[test]
    fn every_table_is_a_bijection() {
        for n in 1..=32 {
            for k in -12..=12 {
                let table = SkewTable::build(k, n);
                assert_eq!(table.len(), n);
                assert_bijection(&table, n);
            }
        }
    }

    #[test]
    fn small_skew_is_identity() {
        for k in -1..=1 {
            assert!(SkewTable::build(k, 26).is_identity());
        }
        assert_eq!(SkewTable::build(1, 9), SkewTable::identity(9));
    }

    #[test]
    fn coprime_skew_needs_no_probe() {
        let table = SkewTable::build(2, 9);
        let slots: Vec<usize> = (0..9).map(|s| table.slot(s)).collect();
        assert_eq!(slots, vec![0, 2, 4, 6, 8, 1, 3, 5, 7]);
        assert_bijection(&SkewTable::build(4, 9), 9);
    }

    #[test]
    fn shared_factor_probes_forward() {
        let table = SkewTable::build(3, 9);
        let slots: Vec<usize> = (0..9).map(|s| table.slot(s)).collect();
        assert_eq!(slots, vec![0, 3, 6, 1, 4, 7, 2, 5, 8]);
        let table = SkewTable::build(2, 10);
        let slots: Vec<usize> = (0..10).map(|s| table.slot(s)).collect();
        assert_eq!(slots, vec![0, 2, 4, 6, 8, 1, 3, 5, 7, 9]);
    }

    #[test]
    fn huge_skew_reduces_modulo_sectors() {
        // 2^31 mod 255 == 128
        assert_eq!(SkewTable::build(i32::MIN, 255), SkewTable::build(-128, 255));
        assert_eq!(SkewTable::build(i32::MAX, 255), SkewTable::build(i32::MAX % 255, 255));
        assert_bijection(&SkewTable::build(i32::MIN, 255), 255);
        assert_eq!(SkewTable::build(3 + 9, 9), SkewTable::build(3, 9));
    }

    #[test]
    fn negative_skew_probes_backward() {
        let table = SkewTable::build(-2, 10);
        let slots: Vec<usize> = (0..10).map(|s| table.slot(s)).collect();
        assert_eq!(slots, vec![0, 2, 4, 6, 8, 9, 1, 3, 5, 7]);
    }
}
