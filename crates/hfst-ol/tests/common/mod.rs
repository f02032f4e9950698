//! Hand-assembled optimized-lookup models for tests and benchmarks.
//!
//! Self-contained (no crate imports) so it can be included from unit tests,
//! integration tests and benches alike.

#![allow(dead_code)]

pub const NO_SYMBOL: u16 = u16::MAX;
pub const NO_TABLE_INDEX: u32 = u32::MAX;
pub const START: u32 = 2_147_483_648;

#[derive(Debug, Clone)]
struct ArcSpec {
    input: u16,
    output: u16,
    target: usize,
    weight: f32,
}

#[derive(Debug, Clone, Default)]
struct StateSpec {
    dense: bool,
    final_weight: Option<f32>,
    arcs: Vec<ArcSpec>,
}

/// Builds model bytes from a list of states.
///
/// State 0 is the start state and always lives in the index table. Other
/// states live in the transition table unless created with
/// [`dense_state`](Self::dense_state).
#[derive(Debug, Clone)]
pub struct ModelBuilder {
    symbols: Vec<String>,
    input_symbol_count: usize,
    weighted: bool,
    wrapper: Option<Vec<u8>>,
    states: Vec<StateSpec>,
}

fn looks_like_flag(symbol: &str) -> bool {
    let b = symbol.as_bytes();
    b.len() >= 5 && b[0] == b'@' && b[b.len() - 1] == b'@' && b[2] == b'.'
}

impl ModelBuilder {
    /// `symbols[0]` is epsilon; the first `input_symbol_count` symbols are
    /// input symbols.
    pub fn new(symbols: &[&str], input_symbol_count: usize) -> Self {
        Self {
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
            input_symbol_count,
            weighted: false,
            wrapper: None,
            states: vec![StateSpec {
                dense: true,
                ..StateSpec::default()
            }],
        }
    }

    pub fn weighted(mut self) -> Self {
        self.weighted = true;
        self
    }

    /// Prefix the model with a wrapper header carrying `metadata`.
    pub fn with_wrapper(mut self, metadata: &[u8]) -> Self {
        self.wrapper = Some(metadata.to_vec());
        self
    }

    pub fn state(&mut self) -> usize {
        self.states.push(StateSpec::default());
        self.states.len() - 1
    }

    pub fn dense_state(&mut self) -> usize {
        self.states.push(StateSpec {
            dense: true,
            ..StateSpec::default()
        });
        self.states.len() - 1
    }

    pub fn set_final(&mut self, state: usize, weight: f32) {
        self.states[state].final_weight = Some(weight);
    }

    pub fn symbol(&self, symbol: &str) -> u16 {
        if symbol.is_empty() {
            return 0;
        }
        self.symbols
            .iter()
            .position(|s| s == symbol)
            .unwrap_or_else(|| panic!("symbol {symbol:?} not in alphabet")) as u16
    }

    /// Add an arc; `""` stands for epsilon.
    pub fn arc(&mut self, from: usize, input: &str, output: &str, to: usize, weight: f32) {
        let arc = ArcSpec {
            input: self.symbol(input),
            output: self.symbol(output),
            target: to,
            weight,
        };
        self.states[from].arcs.push(arc);
    }

    fn is_epsilon_or_flag(&self, input: u16) -> bool {
        input == 0 || looks_like_flag(&self.symbols[input as usize])
    }

    /// Dense-state arc groups: the epsilon/flag group first, then one group per
    /// input symbol in ascending order. Insertion order is kept within a group.
    fn groups(&self, state: &StateSpec) -> Vec<(u16, Vec<ArcSpec>)> {
        let mut groups: Vec<(u16, Vec<ArcSpec>)> = Vec::new();
        let eps: Vec<ArcSpec> = state
            .arcs
            .iter()
            .filter(|a| self.is_epsilon_or_flag(a.input))
            .cloned()
            .collect();
        if !eps.is_empty() {
            groups.push((0, eps));
        }
        let mut inputs: Vec<u16> = state
            .arcs
            .iter()
            .filter(|a| !self.is_epsilon_or_flag(a.input))
            .map(|a| a.input)
            .collect();
        inputs.sort_unstable();
        inputs.dedup();
        for input in inputs {
            let arcs = state.arcs.iter().filter(|a| a.input == input).cloned().collect();
            groups.push((input, arcs));
        }
        groups
    }

    fn sparse_arcs(&self, state: &StateSpec) -> Vec<ArcSpec> {
        let mut arcs = state.arcs.clone();
        arcs.sort_by_key(|a| (!self.is_epsilon_or_flag(a.input), a.input));
        arcs
    }

    pub fn build(&self) -> Vec<u8> {
        let n_in = self.input_symbol_count;

        // Pass 1: positions.
        let mut position = vec![0u32; self.states.len()];
        let mut index_size = 0usize;
        let mut trans_size = 0usize;
        for (id, state) in self.states.iter().enumerate() {
            if state.dense {
                position[id] = index_size as u32;
                index_size += 1 + n_in;
                for (_, arcs) in self.groups(state) {
                    trans_size += arcs.len() + 1;
                }
            } else {
                position[id] = START + trans_size as u32;
                trans_size += 1 + state.arcs.len();
            }
        }
        trans_size += 1;

        // Pass 2: records.
        let mut index = vec![(NO_SYMBOL, NO_TABLE_INDEX); index_size];
        let mut trans: Vec<(u16, u16, u32, f32)> = Vec::with_capacity(trans_size);
        let sentinel = (NO_SYMBOL, NO_SYMBOL, NO_TABLE_INDEX, 0.0);
        let mut arc_count = 0u32;
        for (id, state) in self.states.iter().enumerate() {
            let record = |a: &ArcSpec| (a.input, a.output, position[a.target], a.weight);
            match state.dense {
                true => {
                    let base = position[id] as usize;
                    index[base] = match state.final_weight {
                        Some(w) if self.weighted => (NO_SYMBOL, w.to_bits()),
                        Some(_) => (NO_SYMBOL, 1),
                        None => (NO_SYMBOL, NO_TABLE_INDEX),
                    };
                    for (input, arcs) in self.groups(state) {
                        index[base + 1 + input as usize] = (input, START + trans.len() as u32);
                        arc_count += arcs.len() as u32;
                        trans.extend(arcs.iter().map(record));
                        trans.push(sentinel);
                    }
                }
                false => {
                    trans.push(match state.final_weight {
                        Some(w) => (NO_SYMBOL, NO_SYMBOL, 1, w),
                        None => sentinel,
                    });
                    let arcs = self.sparse_arcs(state);
                    arc_count += arcs.len() as u32;
                    trans.extend(arcs.iter().map(record));
                }
            }
        }
        trans.push(sentinel);
        assert_eq!(trans.len(), trans_size);

        let mut out = Vec::new();
        if let Some(meta) = &self.wrapper {
            out.extend_from_slice(b"HFST\0");
            out.extend_from_slice(&(meta.len() as u16).to_le_bytes());
            out.push(0);
            out.extend_from_slice(meta);
        }
        out.extend_from_slice(&(n_in as u16).to_le_bytes());
        out.extend_from_slice(&(self.symbols.len() as u16).to_le_bytes());
        out.extend_from_slice(&(index_size as u32).to_le_bytes());
        out.extend_from_slice(&(trans_size as u32).to_le_bytes());
        out.extend_from_slice(&(self.states.len() as u32).to_le_bytes());
        out.extend_from_slice(&arc_count.to_le_bytes());
        out.extend_from_slice(&u32::from(self.weighted).to_le_bytes());
        out.extend_from_slice(&[0u8; 32]);
        for symbol in &self.symbols {
            out.extend_from_slice(symbol.as_bytes());
            out.push(0);
        }
        for (input, target) in index {
            out.extend_from_slice(&input.to_le_bytes());
            out.extend_from_slice(&target.to_le_bytes());
        }
        for (input, output, target, weight) in trans {
            out.extend_from_slice(&input.to_le_bytes());
            out.extend_from_slice(&output.to_le_bytes());
            out.extend_from_slice(&target.to_le_bytes());
            if self.weighted {
                out.extend_from_slice(&weight.to_bits().to_le_bytes());
            }
        }
        out
    }
}

/// A small weighted noun analyzer used across tests.
///
/// - `talo` -> `talo<N><Sg>` (1.0)
/// - `talot` -> `talo<N><Pl>` (2.5)
/// - `tuo` -> `tuo<Pron><Dem>` (0.5) and `tuoda<V><Imp>` (3.0), in that order
/// - `a` -> `a<Punct>` (0.0)
pub fn noun_model() -> ModelBuilder {
    let symbols = [
        "", "a", "d", "l", "o", "t", "u", "<N>", "<Sg>", "<Pl>", "<Pron>", "<Dem>", "<V>", "<Imp>",
        "<Punct>",
    ];
    let mut b = ModelBuilder::new(&symbols, 7).weighted();

    // talo / talot
    let s1 = b.state();
    let s2 = b.state();
    let s3 = b.state();
    let s4 = b.state();
    b.arc(0, "t", "t", s1, 0.0);
    b.arc(s1, "a", "a", s2, 0.0);
    b.arc(s2, "l", "l", s3, 0.0);
    b.arc(s3, "o", "o", s4, 0.0);
    let sg1 = b.state();
    let sg2 = b.state();
    b.arc(s4, "", "<N>", sg1, 0.0);
    b.arc(sg1, "", "<Sg>", sg2, 1.0);
    b.set_final(sg2, 0.0);
    let pl1 = b.state();
    let pl2 = b.state();
    let pl3 = b.state();
    b.arc(s4, "t", "<N>", pl1, 0.0);
    b.arc(pl1, "", "<Pl>", pl2, 2.0);
    b.arc(pl2, "", "", pl3, 0.0);
    b.set_final(pl3, 0.5);

    // tuo
    let u1 = b.state();
    let u2 = b.state();
    b.arc(s1, "u", "u", u1, 0.0);
    b.arc(u1, "o", "o", u2, 0.0);
    let p1 = b.state();
    let p2 = b.state();
    b.arc(u2, "", "<Pron>", p1, 0.5);
    b.arc(p1, "", "<Dem>", p2, 0.0);
    b.set_final(p2, 0.0);
    let v1 = b.state();
    let v2 = b.state();
    let v3 = b.state();
    let v4 = b.state();
    let v5 = b.state();
    b.arc(u2, "", "d", v1, 1.0);
    b.arc(v1, "", "a", v2, 0.0);
    b.arc(v2, "", "<V>", v3, 0.0);
    b.arc(v3, "", "<Imp>", v4, 2.0);
    b.arc(v4, "", "", v5, 0.0);
    b.set_final(v5, 0.0);

    // a
    let a1 = b.state();
    b.arc(0, "a", "a", a1, 0.0);
    let a2 = b.state();
    b.arc(a1, "", "<Punct>", a2, 0.0);
    b.set_final(a2, 0.0);
    b
}
