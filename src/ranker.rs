//! Naturalness ranking with an autoregressive language model.
use std::cell::RefCell;
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::retry::RetryPolicy;

pub trait LanguageModelScorer {
    /// Perplexity of `sentence`: the exponentiated mean negative
    /// log-likelihood of its tokens, each conditioned on the ones before it.
    fn perplexity(&self, sentence: &str) -> Result<f64>;
}

impl<S: LanguageModelScorer + ?Sized> LanguageModelScorer for &S {
    fn perplexity(&self, sentence: &str) -> Result<f64> {
        (**self).perplexity(sentence)
    }
}

pub struct NaturalOrderRanker<'s> {
    scorer: &'s dyn LanguageModelScorer,
    retry: RetryPolicy,
    // the same original sentence is scored against every one of its candidates;
    // cleared between arguments
    cache: RefCell<HashMap<String, f64>>,
}

impl<'s> NaturalOrderRanker<'s> {
    pub fn new(scorer: &'s dyn LanguageModelScorer) -> Self {
        NaturalOrderRanker {
            scorer,
            retry: RetryPolicy::default(),
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn clear_cache(&self) {
        self.cache.borrow_mut().clear();
    }

    /// Perplexity of `sentence`, lower is more natural.
    pub fn score(&self, sentence: &str) -> Result<f64> {
        if let Some(score) = self.cache.borrow().get(sentence) {
            return Ok(*score);
        }
        let score = self
            .retry
            .run(&format!("scoring {sentence:?}"), || self.scorer.perplexity(sentence))?;
        if !score.is_finite() || score <= 0.0 {
            return Err(Error::Model(format!("perplexity {score} for {sentence:?}")));
        }
        self.cache.borrow_mut().insert(sentence.to_owned(), score);
        Ok(score)
    }

    /// Indices of `sentences`, most natural first. Ties keep their input order.
    pub fn rank<S: AsRef<str>>(&self, sentences: &[S]) -> Result<Vec<usize>> {
        let scores = sentences
            .iter()
            .map(|s| self.score(s.as_ref()))
            .collect::<Result<Vec<f64>>>()?;
        Ok(order_by_score(&scores))
    }

    /// How interchangeable two phrasings are, in `(0, 1]`; 1 when equally natural.
    pub fn similarity(&self, a: &str, b: &str) -> Result<f64> {
        Ok(similarity_of_scores(self.score(a)?, self.score(b)?))
    }
}

pub fn order_by_score(scores: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&i, &j| scores[i].total_cmp(&scores[j]));
    order
}

/// Inverse of the mean of the two directional perplexity ratios.
pub fn similarity_of_scores(a: f64, b: f64) -> f64 {
    2.0 / (a / b + b / a)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    /// Perplexity grows with sentence length; "value first" sentences are penalised.
    struct LengthScorer {
        calls: Cell<usize>,
    }

    impl LanguageModelScorer for LengthScorer {
        fn perplexity(&self, sentence: &str) -> Result<f64> {
            self.calls.set(self.calls.get() + 1);
            let penalty = if sentence.contains("italian serves") { 10.0 } else { 0.0 };
            Ok(sentence.split_whitespace().count() as f64 + penalty)
        }
    }

    #[test]
    fn rank_is_most_natural_first() {
        let scorer = LengthScorer { calls: Cell::new(0) };
        let ranker = NaturalOrderRanker::new(&scorer);
        let order = ranker
            .rank(&["which restaurant italian serves ?", "which restaurant serves italian ?"])
            .unwrap();
        assert_eq!(order, vec![1, 0]);
    }

    #[test]
    fn ties_keep_input_order() {
        assert_eq!(order_by_score(&[2.0, 1.0, 2.0]), vec![1, 0, 2]);
    }

    #[test]
    fn scores_are_cached() {
        let scorer = LengthScorer { calls: Cell::new(0) };
        let ranker = NaturalOrderRanker::new(&scorer);
        ranker.score("a b c").unwrap();
        ranker.score("a b c").unwrap();
        assert_eq!(scorer.calls.get(), 1);

        ranker.clear_cache();
        ranker.score("a b c").unwrap();
        assert_eq!(scorer.calls.get(), 2);
    }

    #[test]
    fn similarity_is_symmetric_and_bounded() {
        assert_eq!(similarity_of_scores(4.0, 4.0), 1.0);
        let ab = similarity_of_scores(2.0, 8.0);
        let ba = similarity_of_scores(8.0, 2.0);
        assert_eq!(ab, ba);
        assert!(ab > 0.0 && ab < 1.0);
    }

    #[test]
    fn non_positive_perplexity_is_a_model_error() {
        struct Broken;
        impl LanguageModelScorer for Broken {
            fn perplexity(&self, _: &str) -> Result<f64> {
                Ok(f64::NAN)
            }
        }
        let ranker = NaturalOrderRanker::new(&Broken).with_retry(RetryPolicy::new(1, 0));
        assert!(matches!(ranker.score("x"), Err(Error::Model(_))));
    }
}
