//! Compiles every round of an output on a bounded worker pool.

use rayon::prelude::*;

use crate::{
    compile::{compile_round_seeded, CompileOptions, RoundPlan},
    config::{OutputConfig, RoundConfig},
    preview::PreviewSurface,
    CutError, Result,
};

/// Derives the generator seed for one round so that rounds stay reproducible
/// no matter which worker picks them up.
pub fn round_seed(seed: u64, index: usize) -> u64 {
    // splitmix64 finaliser
    let mut z = seed.wrapping_add((index as u64 + 1).wrapping_mul(0x9e37_79b9_7f4a_7c15));
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Validates the whole output, then compiles its rounds in parallel.
///
/// `surface_for` hands each round its own preview surface. Plans come back in
/// round order; the first failing round aborts the batch.
pub fn compile_all<F>(output: &OutputConfig, seed: u64, surface_for: F) -> Result<Vec<RoundPlan>>
where
    F: Fn(usize, &RoundConfig) -> Box<dyn PreviewSurface> + Sync,
{
    output.validate()?;
    let options = CompileOptions::from(output);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(output.threads)
        .thread_name(|index| format!("beatcut-worker-{index}"))
        .build()
        .map_err(|err| CutError::WorkerPool(err.to_string()))?;

    tracing::info!(
        output = output.display_name(),
        rounds = output.rounds.len(),
        threads = output.threads,
        seed,
        "compiling output"
    );

    pool.install(|| {
        output
            .rounds
            .par_iter()
            .enumerate()
            .map(|(index, round)| {
                let mut surface = surface_for(index, round);
                compile_round_seeded(round, options, surface.as_mut(), round_seed(seed, index))
            })
            .collect::<Result<Vec<_>>>()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::SourceSpec, preview::HeadlessSurface};

    fn output(threads: usize) -> OutputConfig {
        let rounds = (0..4)
            .map(|i| {
                RoundConfig::new(
                    format!("round {i}"),
                    30.0 + i as f64,
                    vec![SourceSpec::new("a.mp4", 300.0), SourceSpec::new("b.mp4", 90.0)],
                )
            })
            .collect();
        OutputConfig {
            threads,
            rounds,
            ..Default::default()
        }
    }

    fn headless(_: usize, _: &RoundConfig) -> Box<dyn PreviewSurface> {
        Box::new(HeadlessSurface)
    }

    #[test]
    fn plans_come_back_in_round_order() {
        let plans = compile_all(&output(3), 9, headless).unwrap();

        let names: Vec<_> = plans.iter().map(|plan| plan.name.as_str()).collect();
        assert_eq!(names, ["round 0", "round 1", "round 2", "round 3"]);
        for (i, plan) in plans.iter().enumerate() {
            assert!((plan.total_length() - (30.0 + i as f64)).abs() < 1e-9);
        }
    }

    #[test]
    fn thread_count_does_not_change_the_result() {
        let single = compile_all(&output(1), 42, headless).unwrap();
        let parallel = compile_all(&output(4), 42, headless).unwrap();

        for (a, b) in single.iter().zip(&parallel) {
            assert_eq!(a.timeline, b.timeline);
        }
    }

    #[test]
    fn invalid_output_fails_before_compiling() {
        let mut bad = output(2);
        bad.rounds[2].speed = 9;

        let err = compile_all(&bad, 0, |_, _| -> Box<dyn PreviewSurface> {
            panic!("no round should be compiled")
        })
        .unwrap_err();
        assert_eq!(err.field(), Some("speed"));
    }

    #[test]
    fn round_seeds_differ() {
        assert_ne!(round_seed(1, 0), round_seed(1, 1));
        assert_ne!(round_seed(1, 0), round_seed(2, 0));
    }
}
