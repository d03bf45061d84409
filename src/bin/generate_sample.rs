use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rand::distributions::WeightedIndex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use titanic_predictor::data::writer::write_dataset;
use titanic_predictor::data::{Dataset, Nominal, Passenger, Pclass, Sex, Survival};

/// Write a synthetic passenger table for demos and smoke tests.
#[derive(Parser)]
#[command(about)]
struct Args {
    /// Output directory
    #[arg(long, default_value = "data")]
    out: PathBuf,
    /// Labelled training rows
    #[arg(long, default_value_t = 600)]
    train_rows: usize,
    /// Unlabelled test rows
    #[arg(long, default_value_t = 20)]
    test_rows: usize,
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// Draws passengers with roughly the 1912 mix: mostly third class, about two
/// thirds men, survival driven by sex first, then class, then age.
struct PassengerSampler {
    pclass: WeightedIndex<f64>,
    sex: WeightedIndex<f64>,
    /// Age distribution per class, in level order.
    ages: [Normal<f64>; 3],
}

impl PassengerSampler {
    fn new() -> Result<Self> {
        Ok(PassengerSampler {
            pclass: WeightedIndex::new([0.24, 0.21, 0.55])?,
            sex: WeightedIndex::new([0.65, 0.35])?,
            ages: [
                Normal::new(38.0, 13.0)?,
                Normal::new(30.0, 13.0)?,
                Normal::new(25.0, 13.0)?,
            ],
        })
    }

    fn sample<R: Rng>(&self, rng: &mut R, labelled: bool) -> Passenger {
        let pclass = Pclass::VARIANTS[self.pclass.sample(rng)];
        let sex = Sex::VARIANTS[self.sex.sample(rng)];
        // about a fifth of the ages are unknown
        let age = rng
            .gen_bool(0.8)
            .then(|| self.ages[pclass.index()].sample(rng).clamp(0.5, 80.0).round());

        let survived = labelled.then(|| {
            let mut z = match sex {
                Sex::Female => 1.2,
                Sex::Male => -1.4,
            };
            z += match pclass {
                Pclass::First => 1.0,
                Pclass::Second => 0.2,
                Pclass::Third => -0.9,
            };
            z -= 0.02 * (age.unwrap_or(30.0) - 30.0);
            let p = 1.0 / (1.0 + (-z).exp());
            Survival::VARIANTS[usize::from(rng.gen_bool(p))]
        });

        Passenger {
            pclass,
            age,
            sex,
            survived,
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let mut rng = StdRng::seed_from_u64(args.seed);
    let sampler = PassengerSampler::new()?;

    let train = Dataset::new(
        (0..args.train_rows)
            .map(|_| sampler.sample(&mut rng, true))
            .collect(),
    );
    let test = Dataset::new(
        (0..args.test_rows)
            .map(|_| sampler.sample(&mut rng, false))
            .collect(),
    );

    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("creating {}", args.out.display()))?;

    for ext in ["arff", "csv", "parquet"] {
        for (name, dataset) in [("train", &train), ("test", &test)] {
            let path = args.out.join(format!("titanic.{name}.{ext}"));
            write_dataset(dataset, &path)?;
            println!("Wrote {} passengers to {}", dataset.len(), path.display());
        }
    }

    let [died, survived] = train.class_counts();
    println!("Training labels: {died} died, {survived} survived");
    Ok(())
}
