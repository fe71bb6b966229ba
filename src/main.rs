//! Multicover CLI - Run a k-cover search on a benchmark subject.

use std::path::PathBuf;
use std::time::Instant;

use multicover::{
    compute::{MulticoverEngine, TestCase},
    schema::SearchConfig,
    subject::{InputFactory, SubjectExecutor, subject_by_name, subjects},
};

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <subject> [config.json] [archive.json]", args[0]);
        eprintln!();
        eprintln!("Search for k distinct witnesses of every goal of a subject.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  subject       Benchmark subject to search on");
        eprintln!("  config.json   Path to search configuration (default: built-in)");
        eprintln!("  archive.json  Where to write the final archive");
        eprintln!();
        eprintln!("Subjects:");
        for subject in subjects() {
            eprintln!("  {:<20} {} goals", subject.name(), subject.goals().len());
        }
        eprintln!();
        eprintln!("Example configuration is generated with --example-config flag.");
        std::process::exit(1);
    }

    if args[1] == "--example-config" {
        print_example_config();
        return;
    }

    let subject = subject_by_name(&args[1]).unwrap_or_else(|| {
        eprintln!("Unknown subject: {}", args[1]);
        std::process::exit(1);
    });

    let config = match args.get(2) {
        Some(path) => SearchConfig::load(path).unwrap_or_else(|e| {
            eprintln!("Error loading config: {}", e);
            std::process::exit(1);
        }),
        None => SearchConfig::default(),
    };
    let archive_path = args.get(3).map(PathBuf::from);

    println!("Multicover Search");
    println!("=================");
    println!("Subject: {} ({})", subject.name(), subject.function());
    println!("Goals: {}", subject.goals().len());
    println!("Population: {}", config.population.size);
    println!("Generations: {}", config.population.max_generations);
    println!("Multicover target: {}", config.multicover_target);
    println!();

    let goals = subject.goals();
    let factory = InputFactory::for_subject(&subject);
    let mut engine =
        MulticoverEngine::new(config, factory, SubjectExecutor::new(subject), goals)
            .unwrap_or_else(|e| {
                eprintln!("Invalid configuration: {}", e);
                std::process::exit(1);
            });

    println!("Running search...");
    let start = Instant::now();

    let result = engine.run_with_callback(|progress| {
        println!(
            "  Generation {}/{}: {} goals remaining, archive {}, {} executions",
            progress.generation,
            progress.max_generations,
            progress.remaining_goals,
            progress.archive_size,
            progress.executions,
        );
    });

    println!();
    println!("Coverage:");
    for coverage in &result.coverage {
        println!(
            "  [{}] {} ({}/{})",
            if coverage.covered { "x" } else { " " },
            coverage.goal,
            coverage.witnesses,
            coverage.target
        );
    }

    println!();
    println!("Suite ({} tests):", result.suite.len());
    for test in &result.suite {
        println!("  {}", test.to_code());
    }

    println!();
    println!(
        "Stopped: {:?} after {} generations",
        result.stats.stop_reason, result.stats.generations
    );
    println!(
        "Executions: {} (cache hits {}, entries {})",
        result.stats.executions, result.stats.cache.hits, result.stats.cache.entries
    );
    println!("Time: {:.2}s", start.elapsed().as_secs_f32());

    if let Some(path) = archive_path {
        if let Err(e) = engine.archive().save_json(&path) {
            eprintln!("Error writing archive: {}", e);
            std::process::exit(1);
        }
        println!("Archive written to {}", path.display());
    }
}

fn print_example_config() {
    let config = SearchConfig::default();

    match serde_json::to_string_pretty(&config) {
        Ok(json) => {
            println!("Example configuration (config.json):");
            println!("{}", json);
        }
        Err(e) => {
            eprintln!("Error serializing config: {}", e);
            std::process::exit(1);
        }
    }
}
