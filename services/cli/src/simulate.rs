use std::path::{Path, PathBuf};

use clap::Args;
use silicon_samples::config::AppConfig;
use silicon_samples::documents::DocumentSummary;
use silicon_samples::error::AppError;
use silicon_samples::interview::{InterviewOrchestrator, InterviewState, SampleBatch};
use silicon_samples::llm::DryRunRespondent;
use silicon_samples::persona::PersonaTable;
use silicon_samples::prompts::PromptSet;
use silicon_samples::questionnaire::QuestionCatalog;
use silicon_samples::storage::JsonDirectorySink;
use silicon_samples::telemetry;
use tracing::info;

#[derive(Args, Debug)]
pub(crate) struct SimulateArgs {
    /// Questionnaire XML file
    #[arg(long)]
    pub(crate) questionnaire: PathBuf,
    /// Semicolon separated persona table; personas are cycled per sample
    #[arg(long)]
    pub(crate) personas: Option<PathBuf>,
    /// JSON array of prepared document summaries used in the briefing
    #[arg(long)]
    pub(crate) summaries: Option<PathBuf>,
    /// Number of simulated respondents
    #[arg(long, default_value_t = 1)]
    pub(crate) repetitions: usize,
    /// Seed for topic sampling and the dry-run respondent
    #[arg(long)]
    pub(crate) seed: Option<u64>,
    /// Directory for result files (defaults to SURVEY_RESULTS_DIR)
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
}

pub(crate) fn run_simulate(args: SimulateArgs) -> Result<(), AppError> {
    let SimulateArgs {
        questionnaire,
        personas,
        summaries,
        repetitions,
        seed,
        output,
    } = args;

    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let catalog = QuestionCatalog::load(&questionnaire)?;
    let personas = personas.map(PersonaTable::load).transpose()?;
    let documents = match summaries {
        Some(path) => load_summaries(&path)?,
        None => Vec::new(),
    };
    let prompts = match &config.interview.prompts_dir {
        Some(dir) => PromptSet::from_dir(dir)?,
        None => PromptSet::default(),
    };

    let orchestrator = InterviewOrchestrator::with_config(prompts, &config.interview);
    let mut state = match seed {
        Some(seed) => InterviewState::seeded(seed),
        None => InterviewState::new(),
    };
    let mut respondent = DryRunRespondent::new(seed);
    let sink = JsonDirectorySink::new(output.unwrap_or(config.storage.results_dir));

    let mut batch = SampleBatch::new(&catalog, &orchestrator, repetitions).with_documents(&documents);
    if let Some(table) = personas.as_ref() {
        batch = batch.with_personas(table);
    }

    info!(repetitions, dir = %sink.dir().display(), "simulation started");
    let locations = batch.run(&mut state, &mut respondent, &sink)?;

    println!("Simulated {} interview(s)", locations.len());
    for location in &locations {
        println!("- {location}");
    }
    Ok(())
}

fn load_summaries(path: &Path) -> Result<Vec<DocumentSummary>, AppError> {
    let json = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}
