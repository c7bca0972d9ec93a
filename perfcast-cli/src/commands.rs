//! CLI subcommand handlers.

use crate::inputs;
use crate::{Commands, ConfigAction, ModelsAction, PredictArgs, TrainArgs};
use anyhow::Context;
use perfcast_core::PerfcastConfig;
use perfcast_ml::{
    CardPatch, DatasetAssembler, ModelRegistry, ParamGrid, Predictor, SqliteModelRegistry,
    StoredCard, TrainingPipeline, TrainingRequest,
};
use serde::Serialize;
use std::path::Path;

/// Handle a CLI subcommand.
pub fn handle_command(command: Commands, workspace: &Path) -> anyhow::Result<()> {
    match command {
        Commands::Train(args) => handle_train(args, workspace),
        Commands::Predict(args) => handle_predict(args, workspace),
        Commands::Models { action } => handle_models(action, workspace),
        Commands::Config { action } => handle_config(action, workspace),
    }
}

/// Load configuration and anchor relative storage paths at `workspace`.
fn workspace_config(workspace: &Path) -> anyhow::Result<PerfcastConfig> {
    let mut config = perfcast_core::load_config(Some(workspace), None)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    for path in [
        &mut config.storage.model_dir,
        &mut config.storage.registry_path,
    ] {
        if path.is_relative() {
            *path = workspace.join(&*path);
        }
    }
    Ok(config)
}

fn open_registry(config: &PerfcastConfig) -> anyhow::Result<SqliteModelRegistry> {
    let path = &config.storage.registry_path;
    SqliteModelRegistry::open(path)
        .with_context(|| format!("Failed to open model registry at {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn assembler(config: &PerfcastConfig) -> DatasetAssembler {
    DatasetAssembler::new(config.data.person_id_column.clone(), config.data.delimiter)
}

fn handle_train(args: TrainArgs, workspace: &Path) -> anyhow::Result<()> {
    let mut config = workspace_config(workspace)?;
    if let Some(iterations) = args.iterations {
        config.training.iterations = iterations;
    }

    let (table, target) = if let Some(data) = &args.data {
        let column = args
            .target_column
            .clone()
            .unwrap_or_else(|| args.target.as_str().to_string());
        inputs::load_single_table(
            data,
            &column,
            &config.data.person_id_column,
            config.data.delimiter,
        )?
    } else if let Some(scores) = &args.scores {
        let performance = inputs::load_scores(
            scores,
            args.target.as_str(),
            &config.data.person_id_column,
            config.data.delimiter,
        )?;
        let files = inputs::files_by_period(&args.features);
        assembler(&config).assemble(&performance, &files)?
    } else {
        anyhow::bail!("Provide either --data or --scores with --features");
    };

    let grid: ParamGrid = if args.no_tune {
        ParamGrid::new()
    } else if let Some(grid) = &args.grid {
        serde_json::from_str(grid).context("--grid must be a JSON object of value lists")?
    } else {
        args.architecture.default_grid()
    };

    let mut request = TrainingRequest::new(args.target, args.exam_id, args.job_id).with_grid(grid);
    if let Some(namespace) = args.namespace {
        request = request.with_namespace(namespace);
    }
    if let Some(num_classes) = args.num_classes {
        request = request.with_num_classes(num_classes);
    }

    let registry = open_registry(&config)?;
    let mut pipeline = TrainingPipeline::new(&config, registry);
    let report = pipeline.run(&args.architecture, &request, &table, &target)?;

    tracing::info!(
        model_id = report.model_id,
        version = %report.card.version,
        "Training complete"
    );
    print_json(&serde_json::json!({
        "model_id": report.model_id,
        "architecture": report.card.architecture,
        "target": report.card.name_object_predict,
        "version": report.card.version,
        "artifact": report.card.address,
        "accuracy": report.card.accuracy_results,
        "f1_score": report.card.f1_score_results,
        "hyperparameters": report.card.hyperparameters,
    }))
}

fn handle_predict(args: PredictArgs, workspace: &Path) -> anyhow::Result<()> {
    let config = workspace_config(workspace)?;
    let predictor = Predictor::new(open_registry(&config)?).with_assembler(assembler(&config));

    let prediction = match (&args.record, args.person_id) {
        (Some(json), _) => {
            let record = inputs::parse_record(json)?;
            predictor.predict(args.model_id, args.target, &record)?
        }
        (None, Some(person_id)) => {
            let files = inputs::files_by_period(&args.features);
            predictor.predict_person(args.model_id, args.target, person_id, &files)?
        }
        (None, None) => anyhow::bail!("Provide either --record or --person-id"),
    };
    print_json(&prediction)
}

fn print_cards(cards: &[StoredCard]) {
    if cards.is_empty() {
        println!("No models registered.");
        return;
    }
    println!("{:>5}  {:<22} {:<20} {:>4} {:>4} {:>8}", "ID", "TARGET", "ARCHITECTURE", "EXAM", "JOB", "ACCURACY");
    for stored in cards {
        let card = &stored.card;
        println!(
            "{:>5}  {:<22} {:<20} {:>4} {:>4} {:>8.3}  {}",
            stored.id,
            card.name_object_predict,
            card.architecture,
            card.exam_id,
            card.job_id,
            card.accuracy_results.mean,
            card.version
        );
    }
}

fn handle_models(action: ModelsAction, workspace: &Path) -> anyhow::Result<()> {
    let config = workspace_config(workspace)?;
    let mut registry = open_registry(&config)?;
    match action {
        ModelsAction::List => print_cards(&registry.list()?),
        ModelsAction::Show { id } => print_json(&registry.get(id)?)?,
        ModelsAction::ByExam { exam_id, job_id } => {
            let cards = match job_id {
                Some(job_id) => registry.find_by_exam_and_job(exam_id, job_id)?,
                None => registry.find_by_exam(exam_id)?,
            };
            print_cards(&cards);
        }
        ModelsAction::ByJob { job_id } => print_cards(&registry.find_by_job(job_id)?),
        ModelsAction::Update { id, patch } => {
            let patch: CardPatch =
                serde_json::from_str(&patch).context("Patch must be a JSON object")?;
            print_json(&registry.update(id, &patch)?)?;
        }
        ModelsAction::Delete { id, purge } => {
            let stored = registry.get(id)?;
            registry.delete(id)?;
            if purge {
                let card_file = stored
                    .card
                    .address
                    .with_file_name(format!("model_card_{}.json", stored.card.version));
                for path in [
                    &stored.card.address,
                    &stored.card.feature_engineering_details_address,
                    &card_file,
                ] {
                    match std::fs::remove_file(path) {
                        Ok(()) => tracing::debug!(path = %path.display(), "Removed model file"),
                        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                        Err(e) => {
                            return Err(e).with_context(|| format!("Failed to remove {}", path.display()));
                        }
                    }
                }
            }
            println!("Deleted model {id}.");
        }
    }
    Ok(())
}

fn handle_config(action: ConfigAction, workspace: &Path) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_dir = workspace.join(".perfcast");
            std::fs::create_dir_all(&config_dir)?;

            let config_path = config_dir.join("config.toml");
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }

            let toml_str = toml::to_string_pretty(&PerfcastConfig::default())?;
            std::fs::write(&config_path, &toml_str)?;
            println!("Created default configuration at: {}", config_path.display());
            Ok(())
        }
        ConfigAction::Show => {
            let config = perfcast_core::load_config(Some(workspace), None)
                .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perfcast_ml::{Architecture, PerformanceTarget};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write_training_data(dir: &Path) -> PathBuf {
        let mut csv = String::from("person_id,tenure,dept,satisfaction_score\n");
        for i in 0..30 {
            let dept = ["ops", "hr", "it"][i % 3];
            let score = (i * 3 + 5).min(100);
            csv.push_str(&format!("{},{},{},{}\n", 100 + i, i, dept, score));
        }
        let path = dir.join("train.csv");
        std::fs::write(&path, csv).unwrap();
        path
    }

    fn train_args(data: PathBuf) -> TrainArgs {
        TrainArgs {
            target: PerformanceTarget::SatisfactionScore,
            architecture: Architecture::DecisionTree,
            exam_id: 2,
            job_id: 8,
            data: Some(data),
            target_column: None,
            scores: None,
            features: Vec::new(),
            namespace: None,
            num_classes: None,
            iterations: Some(2),
            grid: None,
            no_tune: true,
        }
    }

    #[test]
    fn test_config_init_creates_file() {
        let dir = TempDir::new().unwrap();
        let workspace = dir.path();

        handle_command(Commands::Config { action: ConfigAction::Init }, workspace).unwrap();

        let config_path = workspace.join(".perfcast").join("config.toml");
        let content = std::fs::read_to_string(&config_path).unwrap();
        let parsed: PerfcastConfig = toml::from_str(&content).unwrap();
        assert_eq!(parsed.training.iterations, 5);
        assert_eq!(parsed.data.person_id_column, "person_id");
    }

    #[test]
    fn test_config_init_idempotent() {
        let dir = TempDir::new().unwrap();
        let workspace = dir.path();
        let config_path = workspace.join(".perfcast").join("config.toml");

        handle_command(Commands::Config { action: ConfigAction::Init }, workspace).unwrap();
        std::fs::write(&config_path, "[training]\niterations = 9\n").unwrap();
        handle_command(Commands::Config { action: ConfigAction::Init }, workspace).unwrap();

        let content = std::fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("iterations = 9"));
    }

    #[test]
    fn test_storage_paths_anchor_at_workspace() {
        let dir = TempDir::new().unwrap();
        let config = workspace_config(dir.path()).unwrap();
        assert!(config.storage.model_dir.starts_with(dir.path()));
        assert!(config.storage.registry_path.starts_with(dir.path()));
    }

    #[test]
    fn test_train_predict_and_delete() {
        let dir = TempDir::new().unwrap();
        let workspace = dir.path();
        let data = write_training_data(workspace);

        handle_command(Commands::Train(train_args(data)), workspace).unwrap();

        let config = workspace_config(workspace).unwrap();
        let registry = open_registry(&config).unwrap();
        let cards = registry.list().unwrap();
        assert_eq!(cards.len(), 1);
        let stored = &cards[0];
        assert_eq!(stored.card.exam_id, 2);
        assert_eq!(stored.card.version, "v1");
        assert!(stored.card.address.exists());
        let card_file = stored.card.address.with_file_name("model_card_v1.json");
        assert!(card_file.exists());
        drop(registry);

        let predict = PredictArgs {
            model_id: stored.id,
            target: PerformanceTarget::SatisfactionScore,
            record: Some(r#"{"tenure": 12, "dept": "hr"}"#.to_string()),
            person_id: None,
            features: Vec::new(),
        };
        handle_command(Commands::Predict(predict), workspace).unwrap();

        let wrong_target = PredictArgs {
            model_id: stored.id,
            target: PerformanceTarget::ImprovementRank,
            record: Some(r#"{"tenure": 12, "dept": "hr"}"#.to_string()),
            person_id: None,
            features: Vec::new(),
        };
        assert!(handle_command(Commands::Predict(wrong_target), workspace).is_err());

        let delete = ModelsAction::Delete { id: stored.id, purge: true };
        handle_command(Commands::Models { action: delete }, workspace).unwrap();
        assert!(!stored.card.address.exists());
        assert!(!stored.card.feature_engineering_details_address.exists());
        assert!(!card_file.exists());
        assert!(open_registry(&config).unwrap().list().unwrap().is_empty());
    }

    #[test]
    fn test_train_rejects_bad_grid() {
        let dir = TempDir::new().unwrap();
        let workspace = dir.path();
        let mut args = train_args(write_training_data(workspace));
        args.no_tune = false;
        args.grid = Some("[1, 2]".to_string());
        assert!(handle_command(Commands::Train(args), workspace).is_err());
    }

    #[test]
    fn test_show_unknown_model_fails() {
        let dir = TempDir::new().unwrap();
        let action = ModelsAction::Show { id: 42 };
        assert!(handle_command(Commands::Models { action }, dir.path()).is_err());
    }
}
