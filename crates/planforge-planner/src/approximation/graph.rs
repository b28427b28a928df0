//! Arena-backed manifold graph.
//!
//! States live in one flat row-major buffer and edges are index pairs, so
//! the graph serializes without pointer fix-ups.

use smallvec::SmallVec;

/// Neighbour list of one state. Most states have few edges.
pub type Adjacency = SmallVec<[u32; 8]>;

/// Undirected graph of sampled states joined by validated local motions.
#[derive(Debug, Clone, Default)]
pub struct ManifoldGraph {
    dimension: usize,
    states: Vec<f64>,
    edges: Vec<(u32, u32)>,
    adjacency: Vec<Adjacency>,
}

/// Why [`ManifoldGraph::from_parts`] rejected its input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphDefect {
    ZeroDimension,
    RaggedStates { len: usize, dimension: usize },
    NonFiniteCoordinate(usize),
    TooManyStates(usize),
    EdgeOutOfRange(u32, u32),
    SelfLoop(u32),
    DuplicateEdge(u32, u32),
}

impl std::fmt::Display for GraphDefect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphDefect::ZeroDimension => write!(f, "dimension is zero"),
            GraphDefect::RaggedStates { len, dimension } => {
                write!(f, "{len} coordinates do not divide into states of dimension {dimension}")
            }
            GraphDefect::NonFiniteCoordinate(i) => write!(f, "coordinate {i} is not finite"),
            GraphDefect::TooManyStates(n) => write!(f, "{n} states exceed the index range"),
            GraphDefect::EdgeOutOfRange(a, b) => write!(f, "edge ({a}, {b}) is out of range"),
            GraphDefect::SelfLoop(a) => write!(f, "self loop on state {a}"),
            GraphDefect::DuplicateEdge(a, b) => write!(f, "duplicate edge ({a}, {b})"),
        }
    }
}

impl ManifoldGraph {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            ..Self::default()
        }
    }

    /// Rebuilds a graph from persisted parts, rejecting anything malformed.
    pub fn from_parts(
        dimension: usize,
        states: Vec<f64>,
        edges: Vec<(u32, u32)>,
    ) -> Result<Self, GraphDefect> {
        if dimension == 0 {
            return Err(GraphDefect::ZeroDimension);
        }
        if states.len() % dimension != 0 {
            return Err(GraphDefect::RaggedStates {
                len: states.len(),
                dimension,
            });
        }
        if let Some(i) = states.iter().position(|v| !v.is_finite()) {
            return Err(GraphDefect::NonFiniteCoordinate(i));
        }
        let count = states.len() / dimension;
        if u32::try_from(count).is_err() {
            return Err(GraphDefect::TooManyStates(count));
        }

        let mut graph = Self {
            dimension,
            states,
            edges: Vec::with_capacity(edges.len()),
            adjacency: vec![Adjacency::new(); count],
        };
        for (a, b) in edges {
            if a as usize >= count || b as usize >= count {
                return Err(GraphDefect::EdgeOutOfRange(a, b));
            }
            if a == b {
                return Err(GraphDefect::SelfLoop(a));
            }
            if !graph.add_edge(a, b) {
                return Err(GraphDefect::DuplicateEdge(a, b));
            }
        }
        Ok(graph)
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn state_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    pub fn state(&self, index: u32) -> &[f64] {
        let start = index as usize * self.dimension;
        &self.states[start..start + self.dimension]
    }

    pub fn states(&self) -> impl Iterator<Item = &[f64]> {
        self.states.chunks_exact(self.dimension.max(1))
    }

    /// The flat row-major state buffer.
    pub fn raw_states(&self) -> &[f64] {
        &self.states
    }

    pub fn edges(&self) -> &[(u32, u32)] {
        &self.edges
    }

    pub fn neighbors(&self, index: u32) -> &[u32] {
        &self.adjacency[index as usize]
    }

    /// Appends a state and returns its index.
    ///
    /// # Panics
    ///
    /// Panics if `state` does not have the graph's dimension.
    pub fn add_state(&mut self, state: &[f64]) -> u32 {
        assert_eq!(state.len(), self.dimension, "state dimension mismatch");
        let index = self.adjacency.len() as u32;
        self.states.extend_from_slice(state);
        self.adjacency.push(Adjacency::new());
        index
    }

    /// Adds an undirected edge. Returns false for self loops, unknown
    /// states and edges that already exist.
    pub fn add_edge(&mut self, a: u32, b: u32) -> bool {
        let count = self.adjacency.len();
        if a == b || a as usize >= count || b as usize >= count {
            return false;
        }
        if self.adjacency[a as usize].contains(&b) {
            return false;
        }
        self.adjacency[a as usize].push(b);
        self.adjacency[b as usize].push(a);
        self.edges.push((a.min(b), a.max(b)));
        true
    }

    /// Up to `k` states within `radius` of `query`, nearest first.
    pub fn nearest(&self, query: &[f64], k: usize, radius: f64) -> Vec<u32> {
        let mut found: Vec<(f64, u32)> = self
            .states()
            .enumerate()
            .filter_map(|(i, s)| {
                let d = euclidean(s, query);
                (d <= radius).then_some((d, i as u32))
            })
            .collect();
        found.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        found.truncate(k);
        found.into_iter().map(|(_, i)| i).collect()
    }

    /// Index of the state closest to `query`.
    pub fn closest(&self, query: &[f64]) -> Option<u32> {
        self.states()
            .enumerate()
            .min_by(|a, b| euclidean(a.1, query).total_cmp(&euclidean(b.1, query)))
            .map(|(i, _)| i as u32)
    }
}

/// Same states (bit-exact) and the same edge set.
impl PartialEq for ManifoldGraph {
    fn eq(&self, other: &Self) -> bool {
        self.dimension == other.dimension
            && self.states == other.states
            && self.edges == other.edges
    }
}

fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}
