//! perfcast CLI: train, serve and manage workforce performance classifiers.

mod commands;
mod inputs;

use clap::Parser;
use perfcast_ml::{Architecture, PerformanceTarget};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// perfcast: versioned performance classifiers from per-period feature files
#[derive(Parser, Debug)]
#[command(name = "perfcast", version, about, long_about = None)]
struct Cli {
    /// Workspace directory (holds `.perfcast/`)
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Train, version and register a model
    Train(TrainArgs),
    /// Predict a score range with a registered model
    Predict(PredictArgs),
    /// Inspect and manage registered models
    Models {
        #[command(subcommand)]
        action: ModelsAction,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args, Debug)]
struct TrainArgs {
    /// Score to learn (satisfaction_score, improvement_rank, job_efficiency_rank)
    #[arg(short, long)]
    target: PerformanceTarget,

    /// Model family (decision_tree, knn, gaussian_nb, logistic_regression)
    #[arg(short, long, default_value = "decision_tree")]
    architecture: Architecture,

    /// Exam the model belongs to
    #[arg(long)]
    exam_id: i64,

    /// Job the model belongs to
    #[arg(long)]
    job_id: i64,

    /// Single table holding features and the target column
    #[arg(long, conflicts_with_all = ["scores", "features"])]
    data: Option<PathBuf>,

    /// Target column in `--data` (defaults to the target name)
    #[arg(long, requires = "data")]
    target_column: Option<String>,

    /// Scores table with person id, `period` and target columns
    #[arg(long, requires = "features")]
    scores: Option<PathBuf>,

    /// Feature file for a period, as PERIOD=PATH (repeatable)
    #[arg(long, value_parser = inputs::parse_period_file)]
    features: Vec<(i32, PathBuf)>,

    /// Directory namespace for the artifacts
    #[arg(long)]
    namespace: Option<String>,

    /// Number of score classes (overrides configuration)
    #[arg(long)]
    num_classes: Option<usize>,

    /// Train iterations (overrides configuration)
    #[arg(long)]
    iterations: Option<usize>,

    /// Hyperparameter grid as a JSON object of value lists
    #[arg(long, conflicts_with = "no_tune")]
    grid: Option<String>,

    /// Skip the grid search and use default hyperparameters
    #[arg(long)]
    no_tune: bool,
}

#[derive(clap::Args, Debug)]
struct PredictArgs {
    /// Registered model id
    #[arg(short, long)]
    model_id: i64,

    /// Score the caller expects the model to predict
    #[arg(short, long)]
    target: PerformanceTarget,

    /// Raw record as a JSON object
    #[arg(long, conflicts_with = "person_id", required_unless_present = "person_id")]
    record: Option<String>,

    /// Look up the person's most recent features instead
    #[arg(long, requires = "features")]
    person_id: Option<i64>,

    /// Feature file for a period, as PERIOD=PATH (repeatable)
    #[arg(long, value_parser = inputs::parse_period_file)]
    features: Vec<(i32, PathBuf)>,
}

#[derive(clap::Subcommand, Debug)]
enum ModelsAction {
    /// List all registered models
    List,
    /// Show one model card
    Show {
        /// Model id
        id: i64,
    },
    /// Models registered for an exam
    ByExam {
        /// Exam id
        exam_id: i64,
        /// Narrow to one job
        #[arg(long)]
        job_id: Option<i64>,
    },
    /// Models registered for a job
    ByJob {
        /// Job id
        job_id: i64,
    },
    /// Patch card fields with a JSON object
    Update {
        /// Model id
        id: i64,
        /// Fields to replace, e.g. '{"exam_id": 9}'
        patch: String,
    },
    /// Remove a model card
    Delete {
        /// Model id
        id: i64,
        /// Also remove the artifact and transform files
        #[arg(long)]
        purge: bool,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Create default configuration file
    Init,
    /// Show current configuration
    Show,
}

fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("dev", "perfcast", "perfcast")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "perfcast.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    commands::handle_command(cli.command, &workspace)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_train_with_period_files() {
        let cli = Cli::try_parse_from([
            "perfcast",
            "train",
            "--target",
            "satisfaction_score",
            "--architecture",
            "knn",
            "--exam-id",
            "3",
            "--job-id",
            "4",
            "--scores",
            "scores.csv",
            "--features",
            "2023=a.csv",
            "--features",
            "2024=b.csv",
        ])
        .unwrap();
        let Commands::Train(args) = cli.command else {
            panic!("expected train");
        };
        assert_eq!(args.target, PerformanceTarget::SatisfactionScore);
        assert_eq!(args.architecture, Architecture::KNearestNeighbors);
        assert_eq!(args.features.len(), 2);
        assert_eq!(args.features[1], (2024, PathBuf::from("b.csv")));
    }

    #[test]
    fn test_predict_requires_record_or_person() {
        let err = Cli::try_parse_from([
            "perfcast", "predict", "--model-id", "1", "--target", "improvement_rank",
        ]);
        assert!(err.is_err());
    }

    #[test]
    fn test_data_conflicts_with_scores() {
        let err = Cli::try_parse_from([
            "perfcast", "train", "--target", "improvement_rank", "--exam-id", "1", "--job-id",
            "1", "--data", "d.csv", "--scores", "s.csv", "--features", "2023=a.csv",
        ]);
        assert!(err.is_err());
    }
}
