// State-level navigation for walkers that drive the automaton themselves.
// Origin: transducer.cc:528-668
//
// States are addressed the way lookup addresses them: below
// TRANSITION_TARGET_TABLE_START a position in the index table, at or above it
// a position in the transition table. Transition indices taken by the
// `take_*` methods are plain offsets into the transition table.

use crate::transducer::Automaton;
use crate::transition::indexes_transition_table;
use crate::{NO_SYMBOL, SymbolNumber, TRANSITION_TARGET_TABLE_START, TableIndex, Weight};

/// A transition as seen from outside the traversal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepTransition {
    /// State the transition leads to.
    pub target: TableIndex,
    /// Output symbol.
    pub symbol: SymbolNumber,
    pub weight: Weight,
}

impl Automaton {
    fn is_epsilon_or_flag(&self, symbol: SymbolNumber) -> bool {
        symbol == 0 || self.alphabet().is_flag_diacritic(symbol)
    }

    fn step_at(&self, i: TableIndex) -> Option<StepTransition> {
        self.tables().transition(i).map(|entry| StepTransition {
            target: entry.target,
            symbol: entry.output_symbol,
            weight: entry.weight,
        })
    }

    /// Transition-table offsets of every transition leaving `state`, sorted.
    pub fn transitions_from_state(&self, state: TableIndex) -> Vec<TableIndex> {
        let tables = self.tables();
        let mut found = Vec::new();

        if indexes_transition_table(state) {
            let header = state - TRANSITION_TARGET_TABLE_START;
            if tables.transition(header).is_none()
                || tables.transition_input(header) != NO_SYMBOL
                || tables.transition_output(header) != NO_SYMBOL
            {
                return found;
            }
            let mut i = header + 1;
            while tables.transition_input(i) != NO_SYMBOL {
                found.push(i);
                i += 1;
            }
            return found;
        }

        // Epsilons and flags share the run behind slot 0.
        if tables.index_input(state + 1) == 0 {
            let mut i = tables.index_target(state + 1).wrapping_sub(TRANSITION_TARGET_TABLE_START);
            while self.is_epsilon_or_flag(tables.transition_input(i)) {
                found.push(i);
                i += 1;
            }
        }
        let symbol_count = self.alphabet().symbol_count();
        for symbol in 1..symbol_count as SymbolNumber {
            if self.alphabet().is_flag_diacritic(symbol) {
                continue;
            }
            let slot = state + 1 + TableIndex::from(symbol);
            if tables.index_input(slot) != symbol {
                continue;
            }
            let mut i = tables.index_target(slot).wrapping_sub(TRANSITION_TARGET_TABLE_START);
            while tables.transition_input(i) == symbol {
                found.push(i);
                i += 1;
            }
        }
        found.sort_unstable();
        found.dedup();
        found
    }

    /// First transition-table offset to try from `state` on `symbol`.
    ///
    /// For a transition-table state this is the start of its run whatever the
    /// symbol. For an index state it is the block registered for `symbol`,
    /// or `None` if there is none.
    pub fn next(&self, state: TableIndex, symbol: SymbolNumber) -> Option<TableIndex> {
        if indexes_transition_table(state) {
            return Some(state - TRANSITION_TARGET_TABLE_START + 1);
        }
        let slot = state + 1 + TableIndex::from(symbol);
        let tables = self.tables();
        (tables.index_input(slot) == symbol)
            .then(|| tables.index_target(slot).wrapping_sub(TRANSITION_TARGET_TABLE_START))
    }

    /// Whether `state` has at least one transition on `symbol`.
    pub fn has_transitions(&self, state: TableIndex, symbol: SymbolNumber) -> bool {
        let tables = self.tables();
        if indexes_transition_table(state) {
            let mut i = state - TRANSITION_TARGET_TABLE_START + 1;
            loop {
                match tables.transition_input(i) {
                    NO_SYMBOL => return false,
                    input if input == symbol => return true,
                    _ => i += 1,
                }
            }
        }
        if self.alphabet().is_flag_diacritic(symbol) {
            return self
                .transitions_from_state(state)
                .into_iter()
                .any(|i| tables.transition_input(i) == symbol);
        }
        tables.index_input(state + 1 + TableIndex::from(symbol)) == symbol
    }

    /// Whether `state` has any epsilon or flag transition.
    pub fn has_epsilons_or_flags(&self, state: TableIndex) -> bool {
        let tables = self.tables();
        if indexes_transition_table(state) {
            let first = tables.transition_input(state - TRANSITION_TARGET_TABLE_START + 1);
            first != NO_SYMBOL && self.is_epsilon_or_flag(first)
        } else {
            tables.index_input(state + 1) == 0
        }
    }

    /// The transition at offset `i`, if its input is epsilon.
    pub fn take_epsilons(&self, i: TableIndex) -> Option<StepTransition> {
        (self.tables().transition_input(i) == 0)
            .then(|| self.step_at(i))
            .flatten()
    }

    /// The transition at offset `i`, if its input is epsilon or a flag
    /// diacritic. Flag legality is the caller's to check.
    pub fn take_epsilons_and_flags(&self, i: TableIndex) -> Option<StepTransition> {
        self.is_epsilon_or_flag(self.tables().transition_input(i))
            .then(|| self.step_at(i))
            .flatten()
    }

    /// The transition at offset `i`, if its input is `symbol`.
    pub fn take_non_epsilons(&self, i: TableIndex, symbol: SymbolNumber) -> Option<StepTransition> {
        (symbol != NO_SYMBOL && self.tables().transition_input(i) == symbol)
            .then(|| self.step_at(i))
            .flatten()
    }

    pub fn is_final(&self, state: TableIndex) -> bool {
        if indexes_transition_table(state) {
            self.tables().transition_finality(state - TRANSITION_TARGET_TABLE_START)
        } else {
            self.tables().index_finality(state)
        }
    }

    /// Final weight of `state`; zero when not final or unweighted.
    pub fn final_weight(&self, state: TableIndex) -> Weight {
        if !self.is_final(state) {
            return 0.0;
        }
        if indexes_transition_table(state) {
            self.tables().weight(state - TRANSITION_TARGET_TABLE_START)
        } else {
            self.tables().final_weight(state)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{ModelBuilder, START};

    /// 0 (index) --a:A--> 1 (index) --b:B/0.5--> 2 (final 1.5)
    ///                      \--@P.F.V@:eps--> 3 --eps:C--> 2
    fn walker_model() -> Automaton {
        let symbols = ["", "a", "b", "@P.F.V@", "A", "B", "C"];
        let mut b = ModelBuilder::new(&symbols, 4).weighted();
        let s1 = b.dense_state();
        let s2 = b.state();
        let s3 = b.state();
        b.arc(0, "a", "A", s1, 0.0);
        b.arc(s1, "b", "B", s2, 0.5);
        b.arc(s1, "@P.F.V@", "", s3, 0.0);
        b.arc(s3, "", "C", s2, 0.25);
        b.set_final(s2, 1.5);
        Automaton::from_bytes(&b.build()).unwrap()
    }

    #[test]
    fn walk_index_states() {
        let fst = walker_model();
        assert!(!fst.is_final(0));
        assert!(!fst.has_epsilons_or_flags(0));
        assert!(fst.has_transitions(0, 1));
        assert!(!fst.has_transitions(0, 2));

        let i = fst.next(0, 1).unwrap();
        let step = fst.take_non_epsilons(i, 1).unwrap();
        assert_eq!(step.symbol, 4);
        assert!(fst.take_epsilons(i).is_none());
        assert!(fst.next(0, 2).is_none());

        let s1 = step.target;
        assert!(!indexes_transition_table(s1));
        assert!(fst.has_epsilons_or_flags(s1));
        assert!(fst.has_transitions(s1, 2));
        assert!(fst.has_transitions(s1, 3));
        assert_eq!(fst.transitions_from_state(s1).len(), 2);

        let j = fst.next(s1, 2).unwrap();
        let to_final = fst.take_non_epsilons(j, 2).unwrap();
        assert_eq!(to_final.weight, 0.5);
        assert!(fst.is_final(to_final.target));
        assert_eq!(fst.final_weight(to_final.target), 1.5);
    }

    #[test]
    fn walk_flag_then_epsilon() {
        let fst = walker_model();
        let s1 = fst.take_non_epsilons(fst.next(0, 1).unwrap(), 1).unwrap().target;
        let flags = fst.next(s1, 0).unwrap();
        assert!(fst.take_epsilons(flags).is_none());
        let via_flag = fst.take_epsilons_and_flags(flags).unwrap();
        assert_eq!(via_flag.symbol, 0);

        let s3 = via_flag.target;
        assert!(indexes_transition_table(s3));
        assert!(fst.has_epsilons_or_flags(s3));
        assert!(!fst.is_final(s3));
        assert_eq!(fst.final_weight(s3), 0.0);

        let run = fst.next(s3, 0).unwrap();
        let eps = fst.take_epsilons(run).unwrap();
        assert_eq!(eps.symbol, 6);
        assert_eq!(eps.weight, 0.25);
        assert_eq!(fst.final_weight(eps.target), 1.5);
        assert_eq!(fst.transitions_from_state(s3), vec![run]);
    }

    #[test]
    fn final_transition_state_has_empty_run() {
        let fst = walker_model();
        let s1 = fst.take_non_epsilons(fst.next(0, 1).unwrap(), 1).unwrap().target;
        let s2 = fst.take_non_epsilons(fst.next(s1, 2).unwrap(), 2).unwrap().target;
        assert!(s2 >= START);
        assert!(fst.transitions_from_state(s2).is_empty());
        assert!(!fst.has_epsilons_or_flags(s2));
        assert!(!fst.has_transitions(s2, 1));
    }

    #[test]
    fn out_of_range_positions_are_inert() {
        let fst = walker_model();
        assert!(fst.transitions_from_state(START + 10_000).is_empty());
        assert!(fst.take_epsilons_and_flags(10_000).is_none());
        assert!(fst.take_non_epsilons(0, NO_SYMBOL).is_none());
        assert!(!fst.is_final(5_000));
    }
}
