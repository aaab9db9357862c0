//! Generational pipeline search
//!
//! Each generation breeds children from the current population by
//! crossover or mutation, scores the new ones by cross-validation, and
//! keeps the best `population_size` of parents and children. Scores are
//! cached by pipeline key, so a pipeline is never evaluated twice.

use super::cv::{cross_val_score, StratifiedKFold};
use super::{GenerationSummary, PipelineSearch, SearchConfig, SearchOutcome};
use crate::backend::{ConfigDictionary, EstimatorBackend};
use crate::data::Dataset;
use crate::error::{KolosalError, Result};
use crate::pipeline::PipelineSpec;
use ndarray::ArrayView2;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use std::collections::HashMap;
use tracing::{debug, info};

#[derive(Debug, Clone)]
struct Individual {
    spec: PipelineSpec,
    score: f64,
}

/// Reference [`PipelineSearch`] implementation
#[derive(Debug, Clone, Default)]
pub struct EvolutionarySearch;

impl EvolutionarySearch {
    pub fn new() -> Self {
        Self
    }
}

/// Random pipeline: one estimator behind up to `max_preprocessors` scalers
pub(crate) fn random_pipeline<R: Rng + ?Sized>(dict: &ConfigDictionary, rng: &mut R) -> PipelineSpec {
    let mut spec = PipelineSpec::new(dict.random_estimator(rng));
    let n_steps = rng.gen_range(0..=dict.max_preprocessors);
    for _ in 0..n_steps {
        if let Some(step) = dict.random_preprocessor(rng) {
            spec.preprocessors.push(step);
        }
    }
    spec
}

/// One of: resample a hyperparameter, add or drop a preprocessor, swap the estimator
pub(crate) fn mutate<R: Rng + ?Sized>(spec: &PipelineSpec, dict: &ConfigDictionary, rng: &mut R) -> PipelineSpec {
    let mut child = spec.clone();
    match rng.gen_range(0..3) {
        0 => match dict.choice_for(&spec.estimator) {
            Some(choice) => child.estimator = choice.mutate(&spec.estimator, rng),
            None => child.estimator = dict.random_estimator(rng),
        },
        1 => {
            let can_add = child.preprocessors.len() < dict.max_preprocessors && !dict.preprocessors.is_empty();
            let add = can_add && (child.preprocessors.is_empty() || rng.gen_bool(0.5));
            if add {
                if let Some(step) = dict.random_preprocessor(rng) {
                    let at = rng.gen_range(0..=child.preprocessors.len());
                    child.preprocessors.insert(at, step);
                }
            } else if !child.preprocessors.is_empty() {
                let at = rng.gen_range(0..child.preprocessors.len());
                child.preprocessors.remove(at);
            } else {
                child.estimator = dict.random_estimator(rng);
            }
        }
        _ => child.estimator = dict.random_estimator(rng),
    }
    child
}

/// Take `a`'s estimator with `b`'s preprocessors, or the other way round
pub(crate) fn crossover<R: Rng + ?Sized>(a: &PipelineSpec, b: &PipelineSpec, rng: &mut R) -> PipelineSpec {
    if rng.gen_bool(0.5) {
        PipelineSpec { preprocessors: b.preprocessors.clone(), estimator: a.estimator.clone() }
    } else {
        PipelineSpec { preprocessors: a.preprocessors.clone(), estimator: b.estimator.clone() }
    }
}

struct Scorer<'a> {
    x: ArrayView2<'a, f64>,
    y: &'a [i64],
    folds: Vec<super::cv::CvFold>,
    backend: &'a dyn EstimatorBackend,
    seed: u64,
    pool: rayon::ThreadPool,
    cache: HashMap<String, f64>,
    verbosity: u8,
}

impl Scorer<'_> {
    /// Score every spec, evaluating uncached ones in parallel.
    /// Returns how many were newly evaluated.
    fn score_all(&mut self, specs: Vec<PipelineSpec>) -> (Vec<Individual>, usize) {
        let mut pending: Vec<(String, PipelineSpec)> = Vec::new();
        for spec in &specs {
            let key = spec.key();
            if !self.cache.contains_key(&key) && !pending.iter().any(|(k, _)| *k == key) {
                pending.push((key, spec.clone()));
            }
        }

        let (x, y, folds, backend, seed, verbosity) =
            (self.x, self.y, &self.folds, self.backend, self.seed, self.verbosity);
        let scored: Vec<(String, f64)> = self.pool.install(|| {
            pending
                .par_iter()
                .map(|(key, spec)| {
                    let score = match cross_val_score(spec, x, y, folds, backend, seed) {
                        Ok(score) => score,
                        Err(e) => {
                            debug!(pipeline = %key, error = %e, "pipeline failed to evaluate");
                            f64::NEG_INFINITY
                        }
                    };
                    if verbosity >= 3 {
                        debug!(pipeline = %key, score, "evaluated pipeline");
                    }
                    (key.clone(), score)
                })
                .collect()
        });

        let evaluated = scored.len();
        self.cache.extend(scored);

        let individuals = specs
            .into_iter()
            .map(|spec| {
                let score = self.cache.get(&spec.key()).copied().unwrap_or(f64::NEG_INFINITY);
                Individual { spec, score }
            })
            .collect();
        (individuals, evaluated)
    }
}

/// Best first; equal scores prefer the shorter pipeline
fn rank(individuals: &mut [Individual]) {
    individuals.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.spec.n_steps().cmp(&b.spec.n_steps())));
}

fn summarize(generation: usize, population: &[Individual], evaluated: usize) -> GenerationSummary {
    let finite: Vec<f64> = population.iter().map(|i| i.score).filter(|s| s.is_finite()).collect();
    let mean_score = if finite.is_empty() {
        f64::NEG_INFINITY
    } else {
        finite.iter().sum::<f64>() / finite.len() as f64
    };
    GenerationSummary {
        generation,
        best_score: population.first().map(|i| i.score).unwrap_or(f64::NEG_INFINITY),
        mean_score,
        evaluated,
    }
}

impl PipelineSearch for EvolutionarySearch {
    fn name(&self) -> &str {
        "evolutionary"
    }

    fn search(&self, train: &Dataset, config: &SearchConfig, backend: &dyn EstimatorBackend) -> Result<SearchOutcome> {
        config.validate()?;
        if backend.pool() != config.pool {
            return Err(KolosalError::ConfigError(format!(
                "search targets the `{}` pool but backend `{}` serves `{}`",
                config.pool,
                backend.name(),
                backend.pool()
            )));
        }
        if train.is_empty() {
            return Err(KolosalError::InvalidInput("training set is empty".to_string()));
        }

        let dict = backend.operators();
        dict.validate()?;

        let x = train.features_f64();
        let y = train.labels().to_vec();
        let folds = StratifiedKFold::new(config.cv_folds, config.random_state)
            .with_max_train_rows(config.max_eval_rows)
            .split(&y)?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads())
            .build()
            .map_err(|e| KolosalError::SearchError(format!("failed to build worker pool: {}", e)))?;

        let mut scorer = Scorer {
            x: x.view(),
            y: &y,
            folds,
            backend,
            seed: config.random_state,
            pool,
            cache: HashMap::new(),
            verbosity: config.verbosity,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(config.random_state);

        let initial: Vec<PipelineSpec> = (0..config.population_size).map(|_| random_pipeline(&dict, &mut rng)).collect();
        let (mut population, _) = scorer.score_all(initial);
        rank(&mut population);

        let mut history = Vec::with_capacity(config.generations);
        for generation in 1..=config.generations {
            let mut children = Vec::with_capacity(config.offspring());
            for _ in 0..config.offspring() {
                let roll: f64 = rng.gen();
                let parent = match population.choose(&mut rng) {
                    Some(p) => &p.spec,
                    None => break,
                };
                let child = if roll < config.crossover_rate && population.len() > 1 {
                    let other = population.choose(&mut rng).map(|p| &p.spec).unwrap_or(parent);
                    crossover(parent, other, &mut rng)
                } else if roll < config.crossover_rate + config.mutation_rate {
                    mutate(parent, &dict, &mut rng)
                } else {
                    parent.clone()
                };
                children.push(child);
            }

            let (scored_children, evaluated) = scorer.score_all(children);
            population.extend(scored_children);
            rank(&mut population);
            let mut seen = std::collections::HashSet::new();
            population.retain(|i| seen.insert(i.spec.key()));
            population.truncate(config.population_size);

            let summary = summarize(generation, &population, evaluated);
            if config.verbosity >= 2 {
                info!("Generation {} - Current best internal CV score: {:.4}", generation, summary.best_score);
            } else {
                debug!("Generation {} - Current best internal CV score: {:.4}", generation, summary.best_score);
            }
            history.push(summary);
        }

        let best = population
            .first()
            .filter(|i| i.score.is_finite())
            .cloned()
            .ok_or_else(|| KolosalError::SearchError("every candidate pipeline failed to evaluate".to_string()))?;

        if config.verbosity >= 1 {
            info!(pipeline = %best.spec, score = best.score, "best pipeline");
        }

        // Refit under the same worker pool so `n_jobs` also bounds the final fit
        let x_full = x.view();
        let pipeline = scorer
            .pool
            .install(|| best.spec.fit(x_full, &y, backend, config.random_state))?;
        Ok(SearchOutcome {
            pipeline,
            best_spec: best.spec,
            best_score: best.score,
            generations: history,
            evaluated_pipelines: scorer.cache.len(),
        })
    }
}
