//! Pareto ranking of non-covering candidates over the remaining goals.
//!
//! Each candidate is described by its fitness on every remaining goal
//! (lower is better, zero means covered). Candidates are sorted into
//! non-dominated fronts; inside a front, crowding distance orders them so
//! that truncation keeps spread across the fitness landscape.

use std::cmp::Ordering;

/// Non-dominated sorting with an optional preference front.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParetoRanker {
    preference_sorting: bool,
}

/// Fronts produced by [`ParetoRanker::rank`].
#[derive(Debug, Clone, Default)]
pub struct Ranking {
    /// Candidate indices per front, each front in crowding order.
    fronts: Vec<Vec<usize>>,
    /// Crowding distance per candidate index.
    crowding: Vec<f64>,
}

impl ParetoRanker {
    /// Create a ranker. With `preference_sorting`, the best candidate for
    /// each goal forms front 0 ahead of the non-dominated fronts.
    pub fn new(preference_sorting: bool) -> Self {
        Self { preference_sorting }
    }

    /// Rank candidates by their per-goal fitness rows.
    ///
    /// All rows must have the same length. Rows of length zero (no remaining
    /// goals) put every candidate in front 0.
    pub fn rank(&self, fitness: &[Vec<f64>]) -> Ranking {
        let n = fitness.len();
        if n == 0 {
            return Ranking::default();
        }

        let objectives = fitness[0].len();
        debug_assert!(fitness.iter().all(|row| row.len() == objectives));

        if objectives == 0 {
            return Ranking {
                fronts: vec![(0..n).collect()],
                crowding: vec![f64::INFINITY; n],
            };
        }

        let mut fronts = Vec::new();
        let mut pool: Vec<usize> = (0..n).collect();

        if self.preference_sorting {
            let preferred = preferred_front(fitness, objectives);
            pool.retain(|i| !preferred.contains(i));
            fronts.push(preferred);
        }

        fronts.extend(non_dominated_sort(fitness, &pool));

        let mut crowding = vec![0.0; n];
        for front in &mut fronts {
            assign_crowding(fitness, front, objectives, &mut crowding);
            front.sort_by(|&a, &b| {
                crowding[b]
                    .partial_cmp(&crowding[a])
                    .unwrap_or(Ordering::Equal)
            });
        }

        Ranking { fronts, crowding }
    }
}

impl Ranking {
    /// All fronts, best first.
    pub fn fronts(&self) -> &[Vec<usize>] {
        &self.fronts
    }

    /// Members of front `rank`, or an empty slice.
    pub fn front(&self, rank: usize) -> &[usize] {
        self.fronts.get(rank).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of fronts.
    pub fn number_of_fronts(&self) -> usize {
        self.fronts.len()
    }

    /// Crowding distance of a candidate.
    pub fn crowding_distance(&self, index: usize) -> f64 {
        self.crowding[index]
    }

    /// All candidates, best first.
    pub fn order(&self) -> Vec<usize> {
        self.fronts.iter().flatten().copied().collect()
    }

    /// Push each candidate back by `penalties[index]` fronts.
    ///
    /// Used to keep structures that already serve as witnesses out of the
    /// next generation. Empty fronts are dropped.
    pub fn demote(&mut self, penalties: &[usize]) {
        if penalties.iter().all(|&p| p == 0) {
            return;
        }

        let mut placed: Vec<(usize, usize, usize, usize)> = Vec::new();
        for (rank, front) in self.fronts.iter().enumerate() {
            for (pos, &index) in front.iter().enumerate() {
                let penalty = penalties.get(index).copied().unwrap_or(0);
                if penalty > 0 {
                    log::debug!("candidate {} demoted to front {}", index, rank + penalty);
                }
                placed.push((rank + penalty, rank, pos, index));
            }
        }
        placed.sort_unstable();

        let mut fronts: Vec<Vec<usize>> = Vec::new();
        let mut current_rank = None;
        for (rank, _, _, index) in placed {
            if current_rank != Some(rank) {
                fronts.push(Vec::new());
                current_rank = Some(rank);
            }
            if let Some(front) = fronts.last_mut() {
                front.push(index);
            }
        }
        self.fronts = fronts;
    }

    /// Take whole fronts in order until `count` candidates are selected; the
    /// front that would overflow is truncated in crowding order.
    pub fn select(&self, count: usize) -> Vec<usize> {
        let mut selected = Vec::with_capacity(count);
        for front in &self.fronts {
            let room = count - selected.len();
            if room == 0 {
                break;
            }
            if front.len() <= room {
                selected.extend_from_slice(front);
            } else {
                selected.extend_from_slice(&front[..room]);
                break;
            }
        }
        selected
    }
}

/// `a` dominates `b` when it is no worse on every goal and better on one.
pub fn dominates(a: &[f64], b: &[f64]) -> bool {
    debug_assert_eq!(a.len(), b.len());
    let mut strictly_better = false;
    for (ai, bi) in a.iter().zip(b) {
        if ai > bi {
            return false;
        }
        if ai < bi {
            strictly_better = true;
        }
    }
    strictly_better
}

/// Best candidate per goal, lowest index on ties, ascending and unique.
fn preferred_front(fitness: &[Vec<f64>], objectives: usize) -> Vec<usize> {
    let mut preferred: Vec<usize> = (0..objectives)
        .map(|j| {
            let mut best = 0;
            for i in 1..fitness.len() {
                if fitness[i][j] < fitness[best][j] {
                    best = i;
                }
            }
            best
        })
        .collect();
    preferred.sort_unstable();
    preferred.dedup();
    preferred
}

/// Fast non-dominated sort of `pool`.
fn non_dominated_sort(fitness: &[Vec<f64>], pool: &[usize]) -> Vec<Vec<usize>> {
    let k = pool.len();
    let mut domination_count = vec![0usize; k];
    let mut dominated: Vec<Vec<usize>> = vec![Vec::new(); k];

    for a in 0..k {
        for b in (a + 1)..k {
            if dominates(&fitness[pool[a]], &fitness[pool[b]]) {
                dominated[a].push(b);
                domination_count[b] += 1;
            } else if dominates(&fitness[pool[b]], &fitness[pool[a]]) {
                dominated[b].push(a);
                domination_count[a] += 1;
            }
        }
    }

    let mut fronts = Vec::new();
    let mut current: Vec<usize> = (0..k).filter(|&a| domination_count[a] == 0).collect();
    while !current.is_empty() {
        let mut next = Vec::new();
        for &a in &current {
            for &b in &dominated[a] {
                domination_count[b] -= 1;
                if domination_count[b] == 0 {
                    next.push(b);
                }
            }
        }
        fronts.push(current.iter().map(|&a| pool[a]).collect());
        next.sort_unstable();
        current = next;
    }

    fronts
}

/// Crowding distance of each front member; boundary members are infinite.
fn assign_crowding(fitness: &[Vec<f64>], front: &[usize], objectives: usize, out: &mut [f64]) {
    if front.len() <= 2 {
        for &i in front {
            out[i] = f64::INFINITY;
        }
        return;
    }

    for &i in front {
        out[i] = 0.0;
    }

    let mut sorted = front.to_vec();
    for j in 0..objectives {
        sorted.sort_by(|&a, &b| {
            fitness[a][j]
                .partial_cmp(&fitness[b][j])
                .unwrap_or(Ordering::Equal)
        });

        let first = sorted[0];
        let last = sorted[sorted.len() - 1];
        out[first] = f64::INFINITY;
        out[last] = f64::INFINITY;

        let range = fitness[last][j] - fitness[first][j];
        if range > 0.0 {
            for w in 1..sorted.len() - 1 {
                let gap = fitness[sorted[w + 1]][j] - fitness[sorted[w - 1]][j];
                out[sorted[w]] += gap / range;
            }
        }
    }
}
