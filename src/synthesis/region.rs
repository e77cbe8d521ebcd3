use std::collections::VecDeque;
use std::ops::Index;

use fixedbitset::FixedBitSet;

use crate::automaton::{Automaton, StateIndex};

/// A set of states of an automaton.
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct StateRegion {
    data: FixedBitSet,
}

impl Index<StateIndex> for StateRegion {
    type Output = bool;

    fn index(&self, index: StateIndex) -> &Self::Output {
        &self.data[index.index()]
    }
}

impl std::fmt::Display for StateRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for index in self.data.ones() {
            write!(f, " {}", index)?;
        }
        write!(f, " }}")?;
        Ok(())
    }
}

impl StateRegion {
    pub(crate) fn with_capacity(n: usize) -> Self {
        Self {
            data: FixedBitSet::with_capacity(n),
        }
    }

    /// Returns the region containing all `n` states.
    pub(crate) fn full(n: usize) -> Self {
        let mut data = FixedBitSet::with_capacity(n);
        data.insert_range(..);
        Self { data }
    }

    pub(crate) fn bits(&self) -> &FixedBitSet {
        &self.data
    }

    pub(crate) fn states(&self) -> impl Iterator<Item = StateIndex> + '_ {
        self.data.ones().map(StateIndex::new)
    }

    pub(crate) fn insert(&mut self, index: StateIndex) -> bool {
        !self.data.put(index.index())
    }

    pub(crate) fn remove(&mut self, index: StateIndex) {
        self.data.set(index.index(), false);
    }

    pub(crate) fn size(&self) -> usize {
        self.data.count_ones(..)
    }

    /// Returns the states of this region from which a marked state of this
    /// region is reachable without leaving the region.
    pub(crate) fn coreachable(
        &self,
        automaton: &Automaton,
        predecessors: &[Vec<StateIndex>],
    ) -> StateRegion {
        let mut region = StateRegion::with_capacity(automaton.num_states());
        let mut queue = VecDeque::with_capacity(automaton.num_states());
        for state in self.states().filter(|&s| automaton[s].is_marked()) {
            region.insert(state);
            queue.push_back(state);
        }
        while let Some(i) = queue.pop_front() {
            for &j in &predecessors[i.index()] {
                if self[j] && region.insert(j) {
                    queue.push_back(j);
                }
            }
        }
        region
    }
}
