// Moodscore CLI entry point.
//
// Builds (or loads) the emotion profile store and generates MIDI files from
// it. Configuration comes from an optional JSON file; flags override it.
//
// Usage:
//   moodscore profiles [--config PATH] [--seed N]
//   moodscore generate <emotion> [--duration SECS] [--output NAME]
//     [--seed N] [--config PATH]
//
// Log verbosity follows RUST_LOG (default: info).

use std::path::Path;

use moodscore_audio::SymphoniaDecoder;
use moodscore_music::corpus::load_or_build;
use moodscore_music::generate::generate;
use moodscore_music::profile::KNOWN_EMOTIONS;
use moodscore_music::{MusicConfig, ProfileStore, Result};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing_subscriber::EnvFilter;

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("");

    let outcome = match command {
        "profiles" => run_profiles(&args),
        "generate" => run_generate(&args),
        _ => {
            print_usage();
            std::process::exit(2);
        }
    };

    if let Err(e) = outcome {
        eprintln!("Error: {e}");
        let mut source = std::error::Error::source(&e);
        while let Some(cause) = source {
            eprintln!("  caused by: {cause}");
            source = cause.source();
        }
        std::process::exit(1);
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  moodscore profiles [--config PATH] [--seed N]");
    eprintln!("  moodscore generate <emotion> [--duration SECS] [--output NAME]");
    eprintln!("                     [--seed N] [--config PATH]");
    eprintln!();
    eprintln!("Emotions from the face classifier: {}", KNOWN_EMOTIONS.join(", "));
}

fn load_config(args: &[String]) -> Result<MusicConfig> {
    let mut config = match parse_flag::<String>(args, "--config") {
        Some(path) => MusicConfig::load(Path::new(&path))?,
        None => MusicConfig::default(),
    };
    if let Some(seed) = parse_flag(args, "--seed") {
        config.seed = Some(seed);
    }
    Ok(config)
}

fn make_rng(config: &MusicConfig) -> StdRng {
    match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

fn load_store(config: &MusicConfig, rng: &mut StdRng) -> Result<ProfileStore> {
    load_or_build(
        &config.cache_path,
        &config.corpus_dir,
        &SymphoniaDecoder,
        &config.analysis,
        config.sample_limit,
        rng,
    )
}

fn run_profiles(args: &[String]) -> Result<()> {
    let config = load_config(args)?;
    let mut rng = make_rng(&config);
    let store = load_store(&config, &mut rng)?;

    if store.is_empty() {
        println!("No profiles. Is {} populated?", config.corpus_dir.display());
        return Ok(());
    }
    for (label, p) in store.iter() {
        println!(
            "{label:>10}: tempo {}-{} BPM, {}, {:?} density, {:?} rhythm, [{}]",
            p.tempo_range.0,
            p.tempo_range.1,
            p.mode,
            p.note_density,
            p.rhythm_pattern,
            p.chord_progression.map(|c| c.symbol()).join(" "),
        );
    }
    Ok(())
}

fn run_generate(args: &[String]) -> Result<()> {
    let Some(emotion) = args.get(2).filter(|s| !s.starts_with("--")) else {
        print_usage();
        std::process::exit(2);
    };
    let duration: f64 = parse_flag(args, "--duration").unwrap_or(30.0);
    let output_name: String =
        parse_flag(args, "--output").unwrap_or_else(|| format!("{emotion}_generated.mid"));

    let config = load_config(args)?;
    let mut rng = make_rng(&config);
    let store = load_store(&config, &mut rng)?;

    let path = generate(&store, emotion, duration, &config.output_dir, &output_name, &mut rng)?;
    println!("{}", path.display());
    Ok(())
}

fn parse_flag<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse().ok())
}
