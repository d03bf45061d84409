use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use titanic_predictor::config::PipelineConfig;
use titanic_predictor::data::{Nominal, Survival};
use titanic_predictor::{eval, model, predict, report, Classifier, LogisticModel};

/// Titanic survival classifier: logistic regression over pclass, age and sex.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Train, cross-validate, save, reload, then predict the test file and
    /// the sample passenger (the default when no subcommand is given)
    Run {
        /// JSON pipeline config; missing keys use the defaults
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        train: Option<PathBuf>,
        #[arg(long)]
        test: Option<PathBuf>,
        #[arg(long)]
        model: Option<PathBuf>,
    },
    /// Fit a model on a labelled dataset and save it
    Train {
        #[arg(long)]
        data: PathBuf,
        #[arg(long)]
        model: PathBuf,
    },
    /// k-fold cross-validation of a fresh model
    Evaluate {
        #[arg(long)]
        data: PathBuf,
        #[arg(long, default_value_t = 10)]
        folds: usize,
        #[arg(long, default_value_t = 1)]
        seed: u64,
        /// Label counted as positive in the confusion matrix
        #[arg(long, default_value = "0", value_parser = parse_label)]
        positive_class: Survival,
    },
    /// Classify every row of a dataset with a saved model
    Predict {
        #[arg(long)]
        model: PathBuf,
        #[arg(long)]
        data: PathBuf,
    },
    /// Classify one passenger given on the command line
    PredictOne {
        #[arg(long)]
        model: PathBuf,
        #[arg(long)]
        pclass: String,
        #[arg(long)]
        age: f64,
        #[arg(long)]
        sex: String,
    },
}

fn parse_label(s: &str) -> std::result::Result<Survival, String> {
    Survival::parse_level(s).map_err(|e| e.to_string())
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Run {
        config: None,
        train: None,
        test: None,
        model: None,
    });

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match command {
        Command::Run {
            config,
            train,
            test,
            model: model_path,
        } => {
            let mut cfg = match config {
                Some(path) => PipelineConfig::from_file(&path)?,
                None => PipelineConfig::default(),
            };
            cfg.train = train.unwrap_or(cfg.train);
            cfg.test = test.unwrap_or(cfg.test);
            cfg.model = model_path.unwrap_or(cfg.model);
            run(&cfg, &mut out)?;
        }
        Command::Train {
            data,
            model: model_path,
        } => {
            let trained = titanic_predictor::train(&data)
                .with_context(|| format!("training on {}", data.display()))?;
            model::save(&trained, &model_path)?;
        }
        Command::Evaluate {
            data,
            folds,
            seed,
            positive_class,
        } => {
            let evaluation = eval::cross_validate(&data, folds, seed, positive_class)
                .with_context(|| format!("cross-validating {}", data.display()))?;
            report::write_evaluation(&mut out, &evaluation)?;
        }
        Command::Predict {
            model: model_path,
            data,
        } => {
            let loaded: LogisticModel = model::load(&model_path)?;
            let predictions = predict::predict(&loaded, &data)
                .with_context(|| format!("predicting {}", data.display()))?;
            report::write_predictions(&mut out, predictions)?;
        }
        Command::PredictOne {
            model: model_path,
            pclass,
            age,
            sex,
        } => {
            let loaded: LogisticModel = model::load(&model_path)?;
            let passenger = predict::single_record(&pclass, age, &sex)?;
            report::write_single(&mut out, &passenger, loaded.classify(&passenger))?;
        }
    }

    out.flush()?;
    Ok(())
}

/// The fixed reference pipeline.
fn run(cfg: &PipelineConfig, out: &mut impl Write) -> Result<()> {
    let trained = titanic_predictor::train(&cfg.train)
        .with_context(|| format!("training on {}", cfg.train.display()))?;

    let evaluation = eval::cross_validate(&cfg.train, cfg.folds, cfg.seed, cfg.positive_class)
        .with_context(|| format!("cross-validating {}", cfg.train.display()))?;
    report::write_evaluation(out, &evaluation)?;

    model::save(&trained, &cfg.model)?;
    let loaded: LogisticModel = model::load(&cfg.model)?;

    let predictions = predict::predict(&loaded, &cfg.test)
        .with_context(|| format!("predicting {}", cfg.test.display()))?;
    report::write_predictions(out, predictions)?;

    let q = &cfg.sample;
    let passenger = predict::single_record(&q.pclass, q.age, &q.sex)?;
    report::write_single(out, &passenger, loaded.classify(&passenger))?;
    Ok(())
}
