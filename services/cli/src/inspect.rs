use std::path::PathBuf;

use clap::Args;
use silicon_samples::error::AppError;
use silicon_samples::questionnaire::QuestionCatalog;
use silicon_samples::storage::{JsonDirectorySink, ResultSink};

#[derive(Args, Debug)]
pub(crate) struct ValidateArgs {
    /// Questionnaire XML file
    #[arg(long)]
    pub(crate) questionnaire: PathBuf,
}

#[derive(Args, Debug)]
pub(crate) struct ShowArgs {
    /// Result file written by `simulate`
    pub(crate) result: PathBuf,
    /// Emit the flattened answer table as semicolon separated values
    #[arg(long)]
    pub(crate) csv: bool,
}

pub(crate) fn run_validate(args: ValidateArgs) -> Result<(), AppError> {
    let catalog = QuestionCatalog::load(&args.questionnaire)?;

    println!("Questionnaire {}", args.questionnaire.display());
    println!("- {} question(s)", catalog.len());
    for question in catalog.questions() {
        println!(
            "  - {}: {} option(s), {} topic(s)",
            question.id,
            question.options.len(),
            question.topics.len()
        );
        if let Some(link) = &question.parent {
            let mut dependency = format!("    follows {}", link.question_id);
            if let Some(option) = &link.required_option {
                dependency.push_str(&format!(" when answered {option}"));
            }
            if let Some(limit) = link.topic_limit {
                dependency.push_str(&format!(", at most {limit} parent topic(s)"));
            }
            if link.randomize_topics {
                dependency.push_str(", shuffled");
            }
            println!("{dependency}");
        }
    }
    Ok(())
}

pub(crate) fn run_show(args: ShowArgs) -> Result<(), AppError> {
    let location = args.result.display().to_string();
    let result = JsonDirectorySink::new(".").load(&location)?;

    if args.csv {
        result.write_answers_csv(std::io::stdout().lock())?;
        return Ok(());
    }

    println!("Interview sample {}", result.repetition);
    println!(
        "- started {} | finished {}",
        result.started_at.format("%Y-%m-%d %H:%M:%S"),
        result.finished_at.format("%Y-%m-%d %H:%M:%S")
    );
    if let Some(persona) = &result.persona {
        println!("- persona {}: {}", persona.index, persona.describe());
    }
    println!(
        "- {} document(s) | {} tokens",
        result.documents.len(),
        result.model.total_tokens()
    );
    for question in &result.questions {
        let Some(answer) = result.answers.get(&question.id) else {
            continue;
        };
        println!("{}", question.id);
        for entry in &answer.entries {
            let option = question.option_text(&entry.option_id).unwrap_or("?");
            println!(
                "  - {} ({}): {} {}",
                entry.topic_key,
                entry.topic_name.as_deref().unwrap_or("-"),
                entry.option_id,
                option
            );
        }
    }
    Ok(())
}
