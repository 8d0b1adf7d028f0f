//! RarityLab CLI — validate, feasibility, probabilities and select commands.
//!
//! Commands:
//! - `validate` — full distribution validation with an optional Monte-Carlo check
//! - `feasibility` — combination-space utilisation report
//! - `probabilities` — rounded probabilities for an ad-hoc weight list
//! - `select` — draw trait combinations from a collection

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use raritylab_core::{CollectionConfig, EngineConfig, RandomSelector, WeightCalculator};
use raritylab_runner::{
    distribution_report, feasibility_report, DistributionValidator, FeasibilityChecker,
    SimulationConfig,
};

#[derive(Parser)]
#[command(
    name = "raritylab",
    about = "RarityLab CLI — rarity distribution engine for generative collections"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a collection's rarity distribution.
    Validate {
        /// Collection description (.json or .toml).
        config: PathBuf,

        /// Run the Monte-Carlo accuracy simulation.
        #[arg(long, default_value_t = false)]
        simulate: bool,

        /// Draws per category when simulating.
        #[arg(long, default_value_t = 10_000)]
        samples: usize,

        /// Master seed for the simulation.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Print the result as JSON instead of the text report.
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Engine options (TOML). Defaults apply when omitted.
        #[arg(long)]
        engine: Option<PathBuf>,
    },
    /// Report how well the collection size fits the combination space.
    Feasibility {
        /// Collection description (.json or .toml).
        config: PathBuf,
    },
    /// Print rounded probabilities for a comma-separated weight list.
    Probabilities {
        /// Weights, e.g. 100,50,25.
        #[arg(long, value_delimiter = ',', required = true, allow_negative_numbers = true)]
        weights: Vec<i64>,

        /// Decimal places (0-9).
        #[arg(long, default_value_t = 3)]
        precision: u32,
    },
    /// Draw one variant per category, `count` times.
    Select {
        /// Collection description (.json or .toml).
        config: PathBuf,

        /// Number of combinations to draw.
        #[arg(long, default_value_t = 1)]
        count: usize,

        /// Seed for reproducible draws. Entropy when omitted.
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate {
            config,
            simulate,
            samples,
            seed,
            json,
            engine,
        } => {
            let valid = run_validate(&config, simulate, samples, seed, json, engine.as_deref())?;
            if !valid {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Feasibility { config } => run_feasibility(&config),
        Commands::Probabilities { weights, precision } => run_probabilities(&weights, precision),
        Commands::Select {
            config,
            count,
            seed,
        } => run_select(&config, count, seed),
    }
}

/// Load a collection description, picking the parser by file extension.
fn load_collection(path: &Path) -> Result<CollectionConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    let config = match ext.as_deref() {
        Some("json") => CollectionConfig::from_json(&content),
        Some("toml") => CollectionConfig::from_toml(&content),
        _ => bail!(
            "unsupported config format '{}': expected .json or .toml",
            path.display()
        ),
    }
    .with_context(|| format!("failed to parse {}", path.display()))?;
    log::debug!(
        "loaded '{}' with {} categories",
        config.name,
        config.traits.len()
    );
    Ok(config)
}

fn load_engine(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    EngineConfig::from_toml(&content).with_context(|| format!("invalid engine config {}", path.display()))
}

fn run_validate(
    config_path: &Path,
    simulate: bool,
    samples: usize,
    seed: u64,
    json: bool,
    engine_path: Option<&Path>,
) -> Result<bool> {
    let config = load_collection(config_path)?;
    let validator = DistributionValidator::new(load_engine(engine_path)?)?;

    let simulation = simulate.then(|| SimulationConfig {
        sample_size: samples,
        seed: Some(seed),
        ..SimulationConfig::default()
    });
    let result = validator.validate_distribution(Some(&config), simulation.as_ref())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", distribution_report(&result));
    }
    Ok(result.is_valid)
}

fn run_feasibility(config_path: &Path) -> Result<()> {
    let config = load_collection(config_path)?;
    let result = FeasibilityChecker::default().check_feasibility(Some(&config))?;
    print!("{}", feasibility_report(&result));
    Ok(())
}

fn run_probabilities(weights: &[i64], precision: u32) -> Result<()> {
    let calc = WeightCalculator::new(precision, true)?;
    let result = calc.calculate_probabilities(weights)?;
    let width = precision as usize;

    println!("{:>6} {:>12} {:>12} {:>12}", "Index", "Weight", "Probability", "Cumulative");
    println!("{}", "-".repeat(45));
    for (i, ((w, p), c)) in result
        .weights
        .iter()
        .zip(&result.probabilities)
        .zip(&result.cumulative_probabilities)
        .enumerate()
    {
        println!("{i:>6} {w:>12} {p:>12.width$} {c:>12.width$}");
    }
    println!("Total weight: {}", result.total_weight);
    Ok(())
}

fn run_select(config_path: &Path, count: usize, seed: Option<u64>) -> Result<()> {
    if count == 0 {
        bail!("--count must be greater than zero");
    }
    let config = load_collection(config_path)?;
    let mut selector = RandomSelector::new(WeightCalculator::default(), seed);

    for n in 1..=count {
        let picks = selector.select_collection_traits(&config)?;
        let line: Vec<String> = picks
            .values()
            .map(|p| format!("{}={}", p.category_name, p.variant.name))
            .collect();
        println!("#{n}: {}", line.join(", "));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const JSON: &str = r#"{
        "name": "Tiny",
        "collection_size": 4,
        "traits": {
            "bg": {
                "name": "Background",
                "grid_position": {"row": 0, "column": 0},
                "variants": [
                    {"name": "Blue", "filename": "blue.png", "rarity_weight": 3},
                    {"name": "Red", "filename": "red.png", "rarity_weight": 1}
                ]
            }
        }
    }"#;

    const TOML: &str = r#"
name = "Tiny"
collection_size = 4

[traits.bg]
name = "Background"
grid_position = { row = 0, column = 0 }
variants = [
    { name = "Blue", filename = "blue.png", rarity_weight = 3 },
    { name = "Red", filename = "red.png", rarity_weight = 1 },
]
"#;

    fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn cli_parses() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn weights_flag_splits_on_commas() {
        let cli = Cli::try_parse_from(["raritylab", "probabilities", "--weights", "100,50,25"]).unwrap();
        match cli.command {
            Commands::Probabilities { weights, precision } => {
                assert_eq!(weights, vec![100, 50, 25]);
                assert_eq!(precision, 3);
            }
            _ => panic!("expected probabilities command"),
        }
    }

    #[test]
    fn json_and_toml_load_identically() {
        let json = write_temp(".json", JSON);
        let toml = write_temp(".toml", TOML);
        let a = load_collection(json.path()).unwrap();
        let b = load_collection(toml.path()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.traits["bg"].variants.len(), 2);
    }

    #[test]
    fn unknown_extension_rejected() {
        let file = write_temp(".yaml", JSON);
        let err = load_collection(file.path()).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));
    }

    #[test]
    fn missing_file_has_context() {
        let err = load_collection(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }

    #[test]
    fn validate_reports_validity() {
        let file = write_temp(".json", JSON);
        // 2 combinations cannot cover 4 unique items.
        let valid = run_validate(file.path(), false, 100, 1, true, None).unwrap();
        assert!(!valid);
    }

    #[test]
    fn engine_file_is_applied() {
        let collection = write_temp(".toml", TOML);
        let engine = write_temp(".toml", "precision = 12\n");
        let err = run_validate(collection.path(), false, 100, 1, false, Some(engine.path())).unwrap_err();
        assert!(err.to_string().contains("invalid engine config"));
    }

    #[test]
    fn select_requires_positive_count() {
        let file = write_temp(".json", JSON);
        assert!(run_select(file.path(), 0, Some(1)).is_err());
        assert!(run_select(file.path(), 3, Some(1)).is_ok());
    }
}
