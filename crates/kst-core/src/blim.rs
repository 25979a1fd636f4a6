//! C5: the Basic Local Independence Model. Posterior update over the
//! enumerated state set, next-item selection, and entropy (§4.5).

use tracing::warn;

use crate::downset::KnowledgeStructure;
use crate::error::{KstError, Result};
use crate::index::ItemIndex;

/// Guess (`g`) and slip (`s`) parameters, both expected in `(0, 0.5)` though
/// the spec only requires rejecting values outside `[0, 1]` (§4.5).
#[derive(Debug, Clone, Copy)]
pub struct BlimParams {
    pub guess: f64,
    pub slip: f64,
}

impl Default for BlimParams {
    fn default() -> Self {
        Self { guess: 0.1, slip: 0.1 }
    }
}

impl BlimParams {
    pub fn new(guess: f64, slip: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&guess) {
            return Err(KstError::InvalidParameter { name: "guess".to_string(), value: guess });
        }
        if !(0.0..=1.0).contains(&slip) {
            return Err(KstError::InvalidParameter { name: "slip".to_string(), value: slip });
        }
        Ok(Self { guess, slip })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    Correct,
    Incorrect,
}

/// A probability distribution over `KnowledgeStructure::states()`, indexed
/// in parallel (`probs[i]` is the mass on `states()[i]`).
#[derive(Debug, Clone)]
pub struct Posterior {
    probs: Vec<f64>,
}

impl Posterior {
    pub fn uniform(state_count: usize) -> Self {
        let p = if state_count == 0 { 0.0 } else { 1.0 / state_count as f64 };
        Self { probs: vec![p; state_count] }
    }

    pub fn from_prior(probs: Vec<f64>) -> Result<Self> {
        let sum: f64 = probs.iter().sum();
        if (sum - 1.0).abs() > 1e-9 {
            return Err(KstError::InvalidPrior { state_count: probs.len(), sum });
        }
        Ok(Self { probs })
    }

    pub fn probs(&self) -> &[f64] {
        &self.probs
    }

    pub fn mass_of(&self, state_index: usize) -> f64 {
        self.probs[state_index]
    }
}

/// Outcome of a single [`update`]: `degenerate` is set when the observation
/// had zero likelihood under every state, in which case the prior is left
/// unchanged (§4.5, §7 item 4).
#[derive(Debug, Clone, Copy)]
pub struct UpdateOutcome {
    pub degenerate: bool,
}

fn likelihood(mastered: bool, response: Response, params: &BlimParams) -> f64 {
    match (mastered, response) {
        (true, Response::Correct) => 1.0 - params.slip,
        (true, Response::Incorrect) => params.slip,
        (false, Response::Correct) => params.guess,
        (false, Response::Incorrect) => 1.0 - params.guess,
    }
}

/// Bayes' rule over the state set: `π'(K) ∝ π(K) · L(response|K)`, renormalized.
pub fn update(ks: &KnowledgeStructure, posterior: &Posterior, item: usize, response: Response, params: &BlimParams) -> (Posterior, UpdateOutcome) {
    let mut updated: Vec<f64> = Vec::with_capacity(posterior.probs.len());
    let mut total = 0.0;
    for (state, &prior) in ks.states().iter().zip(posterior.probs.iter()) {
        let mastered = state.contains(&item);
        let p = prior * likelihood(mastered, response, params);
        total += p;
        updated.push(p);
    }

    if total <= 0.0 {
        warn!(item, "BLIM update degenerate: zero-likelihood observation, retaining prior");
        return (posterior.clone(), UpdateOutcome { degenerate: true });
    }

    for p in updated.iter_mut() {
        *p /= total;
    }
    (Posterior { probs: updated }, UpdateOutcome { degenerate: false })
}

/// `P(item mastered) = Σ_{K ∋ item} π(K)`.
pub fn marginal_mastered(ks: &KnowledgeStructure, posterior: &Posterior, item: usize) -> f64 {
    ks.states()
        .iter()
        .zip(posterior.probs.iter())
        .filter(|(state, _)| state.contains(&item))
        .map(|(_, &p)| p)
        .sum()
}

/// The item whose mastery marginal is closest to 0.5, i.e. most informative
/// to assess next; ties broken by ascending item index (§4.5).
pub fn select_next_item(index: &ItemIndex, ks: &KnowledgeStructure, posterior: &Posterior, assessed: &std::collections::BTreeSet<usize>) -> Option<usize> {
    (0..index.len())
        .filter(|i| !assessed.contains(i))
        .map(|i| (i, (marginal_mastered(ks, posterior, i) - 0.5).abs()))
        .fold(None::<(usize, f64)>, |best, (item, uncertainty)| match best {
            None => Some((item, uncertainty)),
            Some((best_item, best_uncertainty)) => {
                if uncertainty < best_uncertainty || (uncertainty == best_uncertainty && item < best_item) {
                    Some((item, uncertainty))
                } else {
                    Some((best_item, best_uncertainty))
                }
            }
        })
        .map(|(item, _)| item)
}

/// Shannon entropy in bits, summed over states with nonzero mass (§4.5).
pub fn entropy(posterior: &Posterior) -> f64 {
    posterior.probs.iter().filter(|&&p| p > 0.0).map(|&p| -p * p.log2()).sum()
}

/// Bookkeeping for an assessment session (§4.5): current posterior, the set
/// of already-assessed items, and the response history. Every transition
/// delegates to `update`/`select_next_item`/`entropy` above; it adds no new
/// algebra of its own.
#[derive(Debug, Clone)]
pub struct AssessmentSession {
    posterior: Posterior,
    assessed: std::collections::BTreeSet<usize>,
    history: Vec<(usize, Response)>,
}

impl AssessmentSession {
    pub fn new(ks: &KnowledgeStructure) -> Self {
        Self { posterior: Posterior::uniform(ks.len()), assessed: Default::default(), history: Vec::new() }
    }

    pub fn with_prior(prior: Posterior) -> Self {
        Self { posterior: prior, assessed: Default::default(), history: Vec::new() }
    }

    pub fn posterior(&self) -> &Posterior {
        &self.posterior
    }

    pub fn assessed(&self) -> &std::collections::BTreeSet<usize> {
        &self.assessed
    }

    pub fn history(&self) -> &[(usize, Response)] {
        &self.history
    }

    pub fn next_item(&self, index: &ItemIndex, ks: &KnowledgeStructure) -> Option<usize> {
        select_next_item(index, ks, &self.posterior, &self.assessed)
    }

    pub fn record(&mut self, ks: &KnowledgeStructure, item: usize, response: Response, params: &BlimParams) -> UpdateOutcome {
        let (posterior, outcome) = update(ks, &self.posterior, item, response, params);
        self.posterior = posterior;
        self.assessed.insert(item);
        self.history.push((item, response));
        outcome
    }

    pub fn entropy(&self) -> f64 {
        entropy(&self.posterior)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, Graph};

    fn diamond_ks() -> (Graph, KnowledgeStructure) {
        let doc: Document = serde_json::from_value(serde_json::json!({
            "items": [{"id": "A"}, {"id": "B"}, {"id": "C"}, {"id": "D"}],
            "surmise_relations": [
                {"prerequisite": "A", "target": "B"},
                {"prerequisite": "A", "target": "C"},
                {"prerequisite": "B", "target": "D"},
                {"prerequisite": "C", "target": "D"},
            ],
        }))
        .unwrap();
        let graph = Graph::from_document(doc);
        let ks = KnowledgeStructure::build(&graph);
        (graph, ks)
    }

    #[test]
    fn diamond_correct_response_concentrates_posterior() {
        let (_graph, ks) = diamond_ks();
        let prior = Posterior::uniform(ks.len());
        let d = ks.index().index_of("D").unwrap();
        let params = BlimParams::new(0.1, 0.1).unwrap();
        let (posterior, outcome) = update(&ks, &prior, d, Response::Correct, &params);
        assert!(!outcome.degenerate);
        let full = ks.full_state();
        let full_idx = ks.position_of(&full).unwrap();
        assert!((posterior.mass_of(full_idx) - 0.643).abs() < 0.01);
        let sum: f64 = posterior.probs().iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn monotone_evidence_for_correct_and_incorrect_responses() {
        let (_graph, ks) = diamond_ks();
        let prior = Posterior::uniform(ks.len());
        let d = ks.index().index_of("D").unwrap();
        let params = BlimParams::new(0.1, 0.1).unwrap();
        let before = marginal_mastered(&ks, &prior, d);

        let (correct_posterior, _) = update(&ks, &prior, d, Response::Correct, &params);
        assert!(marginal_mastered(&ks, &correct_posterior, d) >= before);

        let (incorrect_posterior, _) = update(&ks, &prior, d, Response::Incorrect, &params);
        assert!(marginal_mastered(&ks, &incorrect_posterior, d) <= before);
    }

    #[test]
    fn entropy_is_maximal_under_uniform_prior() {
        let (_graph, ks) = diamond_ks();
        let uniform = Posterior::uniform(ks.len());
        let h = entropy(&uniform);
        assert!((h - (ks.len() as f64).log2()).abs() < 1e-9);
    }

    #[test]
    fn next_item_prefers_closest_to_half_mastery() {
        let (_graph, ks) = diamond_ks();
        let uniform = Posterior::uniform(ks.len());
        let next = select_next_item(ks.index(), &ks, &uniform, &Default::default());
        assert!(next.is_some());
    }

    #[test]
    fn degenerate_update_retains_prior() {
        let (_graph, ks) = diamond_ks();
        let prior = Posterior::uniform(ks.len());
        let a = ks.index().index_of("A").unwrap();
        // guess = 0 and slip = 0 with a response inconsistent with every
        // state can still normalize in this model (guess=0 never degenerates
        // here because every state yields some nonzero likelihood), so we
        // drive degeneracy from an explicit zero-mass prior instead.
        let mut zeroed = prior.probs().to_vec();
        for p in zeroed.iter_mut() {
            *p = 0.0;
        }
        let zero_prior = Posterior { probs: zeroed };
        let params = BlimParams::new(0.1, 0.1).unwrap();
        let (posterior, outcome) = update(&ks, &zero_prior, a, Response::Correct, &params);
        assert!(outcome.degenerate);
        assert_eq!(posterior.probs(), zero_prior.probs());
    }

    #[test]
    fn rejects_out_of_range_parameters() {
        assert!(BlimParams::new(1.5, 0.1).is_err());
        assert!(BlimParams::new(0.1, -0.1).is_err());
    }
}
