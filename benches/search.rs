//! Benchmarks for ranking, archive induction and full searches.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use multicover::{
    compute::{Chromosome, DiversitySelector, Evaluator, MulticoverArchive, MulticoverEngine, ParetoRanker},
    schema::SearchConfig,
    subject::{InputFactory, InputVector, SubjectExecutor, triangle},
};

fn bench_pareto_ranking(c: &mut Criterion) {
    let mut group = c.benchmark_group("pareto_rank");

    for pool in [50, 100, 200, 400] {
        let mut rng = StdRng::seed_from_u64(42);
        let fitness: Vec<Vec<f64>> = (0..pool)
            .map(|_| (0..8).map(|_| rng.gen_range(0.5..2.0)).collect())
            .collect();
        let ranker = ParetoRanker::new(true);

        group.bench_with_input(BenchmarkId::from_parameter(pool), &pool, |b, _| {
            b.iter(|| {
                let ranking = ranker.rank(black_box(&fitness));
                black_box(ranking.select(pool / 2));
            });
        });
    }

    group.finish();
}

fn bench_archive_induction(c: &mut Criterion) {
    let mut group = c.benchmark_group("archive_induction");

    let subject = triangle();
    let goals = subject.goals();
    let factory = InputFactory::for_subject(&subject);
    let evaluator = Evaluator::new(SubjectExecutor::new(subject));

    for candidates in [20, 80, 320] {
        let mut rng = StdRng::seed_from_u64(7);
        let population: Vec<Chromosome<InputVector>> = (0..candidates)
            .map(|_| Chromosome::Individual(factory.random_test(&mut rng)))
            .collect();
        let rows = evaluator.evaluate_batch(&population, &goals);

        group.bench_with_input(
            BenchmarkId::from_parameter(candidates),
            &candidates,
            |b, _| {
                b.iter(|| {
                    let mut archive = MulticoverArchive::new(5);
                    for (goal, row) in goals.iter().zip(&rows) {
                        let covering: Vec<_> =
                            row.iter().filter(|e| e.is_covered()).cloned().collect();
                        if covering.is_empty() {
                            continue;
                        }
                        for idx in DiversitySelector::new(goal).rank(&covering) {
                            let (chromosome, observation) = covering[idx].clone().into_parts();
                            archive.try_accept(goal, chromosome, observation, 0);
                        }
                    }
                    black_box(archive.len());
                });
            },
        );
    }

    group.finish();
}

fn bench_triangle_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("triangle_search");
    group.sample_size(10);

    for k in [1, 3, 5] {
        group.bench_with_input(BenchmarkId::from_parameter(format!("k{}", k)), &k, |b, &k| {
            b.iter(|| {
                let subject = triangle();
                let goals = subject.goals();
                let factory = InputFactory::for_subject(&subject);

                let mut config = SearchConfig::default();
                config.multicover_target = k;
                config.population.size = 20;
                config.population.max_generations = 20;
                config.random_seed = Some(1);

                let mut engine =
                    MulticoverEngine::new(config, factory, SubjectExecutor::new(subject), goals)
                        .unwrap();
                black_box(engine.run());
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_pareto_ranking,
    bench_archive_induction,
    bench_triangle_search
);
criterion_main!(benches);
