use silicon_samples::interview::{
    CancellationFlag, InterviewError, InterviewOrchestrator, InterviewResult, InterviewState,
    SampleBatch,
};
use silicon_samples::llm::{DryRunRespondent, Role, ScriptedGenerator, TextGenerator};
use silicon_samples::persona::PersonaTable;
use silicon_samples::prompts::PromptSet;
use silicon_samples::questionnaire::QuestionCatalog;
use silicon_samples::storage::{InMemorySink, JsonDirectorySink, ResultSink};
use tempfile::TempDir;

const STATEMENTS: &str = r#"
<Questions>
  <Question id="Q">
    <Text>How much do you agree with these statements?</Text>
    <Options>
      <Option id="1">agree</Option><Option id="2">neutral</Option><Option id="3">disagree</Option>
    </Options>
    <Topics><Topic id="a">Prices are fair</Topic><Topic id="b">Staff is friendly</Topic><Topic id="c">Parking is easy</Topic></Topics>
  </Question>
</Questions>"#;

const BRANCHING: &str = r#"
<Questions>
  <Question id="P">
    <Text>Have you used these services?</Text>
    <Options><Option id="yes">yes</Option><Option id="no">no</Option></Options>
    <Topics><Topic id="bus">Bus</Topic><Topic id="train">Train</Topic><Topic id="bike">Bike rental</Topic></Topics>
  </Question>
  <Question id="C" parent="P" parent-option="yes">
    <Text>How satisfied are you with {{thema}} of the {{thema_prev}}?</Text>
    <Options><Option id="1">satisfied</Option><Option id="2">unsatisfied</Option></Options>
    <Topics><Topic id="price">the price</Topic><Topic id="speed">the speed</Topic></Topics>
  </Question>
  <Question id="E">
    <Text>Would you recommend public transport?</Text>
    <Options><Option id="1">yes</Option><Option id="2">no</Option></Options>
  </Question>
</Questions>"#;

fn catalog(xml: &str) -> QuestionCatalog {
    QuestionCatalog::from_xml(xml).expect("catalog parses")
}

fn run_statements(generator: &mut ScriptedGenerator) -> Result<InterviewResult, InterviewError> {
    let catalog = catalog(STATEMENTS);
    let orchestrator = InterviewOrchestrator::new(PromptSet::default());
    let mut state = InterviewState::seeded(1);
    orchestrator.run(&catalog, &mut state, &[], generator)
}

#[test]
fn incomplete_reply_is_corrected_and_retried() {
    let mut generator = ScriptedGenerator::new(["a: 1\nb: 2", "a: 1\nb: 2\nc: 3"]);
    let result = run_statements(&mut generator).expect("interview completes");

    assert_eq!(generator.calls(), 2);
    let retry_history = &generator.received()[1];
    let correction = retry_history.last().expect("correction sent");
    assert_eq!(correction.role, Role::User);
    assert!(correction.text().contains("Numbers still missing: c"));

    let answer = result.answers.get("Q").expect("answers recorded");
    let pairs: Vec<(&str, &str)> = answer
        .entries
        .iter()
        .map(|entry| (entry.topic_key.as_str(), entry.option_id.as_str()))
        .collect();
    assert_eq!(pairs, vec![("a", "1"), ("b", "2"), ("c", "3")]);
    assert_eq!(answer.entries[2].topic_name.as_deref(), Some("Parking is easy"));

    assert_eq!(result.model.transcripts.len(), 1);
    assert_eq!(result.model.transcripts[0].messages.len(), 5);
    assert_eq!(result.model.transcripts[0].messages[0].role, Role::System);
    assert!(result.model.total_tokens() > 0);
}

#[test]
fn question_message_lists_statements_and_options() {
    let mut generator = ScriptedGenerator::new(["a: 1\nb: 1\nc: 1"]);
    run_statements(&mut generator).expect("interview completes");

    let question = generator.received()[0][1].text();
    assert!(question.starts_with("Question: How much do you agree with these statements?"));
    assert!(question.contains("\nStatements:\na: Prices are fair\nb: Staff is friendly\nc: Parking is easy"));
    assert!(question.contains("\nOptions:\n1 (agree)\n2 (neutral)\n3 (disagree)"));
}

#[test]
fn exhausted_attempts_abort_without_commit() {
    let catalog = catalog(STATEMENTS);
    let orchestrator = InterviewOrchestrator::new(PromptSet::default()).with_max_attempts(2);
    let mut state = InterviewState::seeded(1);
    let mut generator = ScriptedGenerator::new(["I like everything", "a: 1"]);

    let error = orchestrator
        .run(&catalog, &mut state, &[], &mut generator)
        .expect_err("reply never completes");
    match error {
        InterviewError::AttemptsExhausted {
            question_id,
            attempts,
            missing,
            ..
        } => {
            assert_eq!(question_id, "Q");
            assert_eq!(attempts, 2);
            assert_eq!(missing, vec!["b".to_string(), "c".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(state.answers().is_empty());
}

#[test]
fn backend_failure_propagates() {
    let mut generator = ScriptedGenerator::new(Vec::<String>::new());
    let error = run_statements(&mut generator).expect_err("no replies available");
    assert!(matches!(error, InterviewError::Generation(_)));
}

#[test]
fn cancelled_run_stops_before_calling_the_model() {
    let catalog = catalog(STATEMENTS);
    let flag = CancellationFlag::new();
    let orchestrator = InterviewOrchestrator::new(PromptSet::default()).with_cancellation(flag.clone());
    let mut state = InterviewState::seeded(1);
    let mut generator = ScriptedGenerator::new(["a: 1\nb: 1\nc: 1"]);

    flag.cancel();
    assert!(orchestrator.cancellation().is_cancelled());
    let error = orchestrator
        .run(&catalog, &mut state, &[], &mut generator)
        .expect_err("cancelled");
    assert!(matches!(error, InterviewError::Cancelled));
    assert_eq!(generator.calls(), 0);
}

fn branching_generator() -> ScriptedGenerator {
    ScriptedGenerator::new([
        "bus: yes\ntrain: no\nbike: yes",
        "P::bus::price: 1",
        "P::bus::speed: 2",
        "P::bike::price: 2",
        "P::bike::speed: 1",
        "E: 1",
    ])
}

#[test]
fn follow_ups_open_one_conversation_per_parent_topic() {
    let catalog = catalog(BRANCHING);
    let orchestrator = InterviewOrchestrator::new(PromptSet::default());
    let mut state = InterviewState::seeded(3);
    let mut generator = branching_generator();

    let result = orchestrator
        .run(&catalog, &mut state, &[], &mut generator)
        .expect("interview completes");
    assert_eq!(generator.remaining(), 0);

    let names: Vec<&str> = result
        .model
        .transcripts
        .iter()
        .map(|transcript| transcript.name.as_str())
        .collect();
    assert_eq!(
        names,
        vec!["conversation-P", "conversation-C-bus", "conversation-C-bike", "conversation-E"]
    );

    // price and speed render different texts, so they are asked one after another
    // in the same conversation under a single briefing.
    let bus = &result.model.transcripts[1].messages;
    assert_eq!(bus.len(), 5);
    assert_eq!(bus.iter().filter(|m| m.role == Role::System).count(), 1);

    let child = result.answers.get("C").expect("child answered");
    assert_eq!(child.entries.len(), 4);
    assert_eq!(child.entries[0].topic_name.as_deref(), Some("the price"));
    assert!(state.answers().is_empty());
}

#[test]
fn result_round_trips_through_json_and_csv() {
    let mut generator = ScriptedGenerator::new(["a: 1\nb: 2\nc: 3"]);
    let result = run_statements(&mut generator).expect("interview completes");

    let first = serde_json::to_value(&result).expect("serializes");
    let restored: InterviewResult = serde_json::from_value(first.clone()).expect("deserializes");
    let second = serde_json::to_value(&restored).expect("serializes again");
    assert_eq!(first, second);
    assert_eq!(restored, result);
    assert_eq!(first["answers"]["Q"]["entries"][1]["topicKey"], "b");

    let mut csv = Vec::new();
    result.write_answers_csv(&mut csv).expect("csv written");
    let csv = String::from_utf8(csv).expect("utf8");
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(
        lines[0],
        "question_id;question_text;topic_key;parent_question_id;parent_topic_id;\
         parent_topic_text;topic_id;topic_text;option_id;option_text"
    );
    assert_eq!(
        lines[1],
        "Q;How much do you agree with these statements?;a;;;;a;Prices are fair;1;agree"
    );
    assert_eq!(lines.len(), 4);
}

#[test]
fn csv_rows_split_follow_up_keys_into_parent_and_own_topic() {
    let catalog = catalog(BRANCHING);
    let orchestrator = InterviewOrchestrator::new(PromptSet::default());
    let mut state = InterviewState::seeded(3);
    let mut generator = branching_generator();
    let result = orchestrator
        .run(&catalog, &mut state, &[], &mut generator)
        .expect("interview completes");

    let mut csv = Vec::new();
    result.write_answers_csv(&mut csv).expect("csv written");
    let csv = String::from_utf8(csv).expect("utf8");
    let lines: Vec<&str> = csv.lines().collect();

    assert!(lines.contains(&"P;Have you used these services?;bus;;;;bus;Bus;yes;yes"));
    assert!(lines.contains(
        &"C;How satisfied are you with {{thema}} of the {{thema_prev}}?;P::bus::price;P;bus;Bus;price;the price;1;satisfied"
    ));
    assert!(lines.contains(
        &"C;How satisfied are you with {{thema}} of the {{thema_prev}}?;P::bike::speed;P;bike;Bike rental;speed;the speed;1;satisfied"
    ));
    assert!(lines.contains(&"E;Would you recommend public transport?;E;;;;;;1;yes"));
    assert_eq!(lines.len(), 1 + 3 + 4 + 1);
}

#[test]
fn dry_run_batch_cycles_personas_and_persists_each_sample() {
    let catalog = catalog(BRANCHING);
    let personas = PersonaTable::from_reader("Gender;Age\nfemale;30\nmale;60\n".as_bytes())
        .expect("personas parse");
    let orchestrator = InterviewOrchestrator::new(PromptSet::default());
    let sink = InMemorySink::default();
    let mut state = InterviewState::seeded(11);
    let mut generator = DryRunRespondent::new(Some(11));

    let locations = SampleBatch::new(&catalog, &orchestrator, 3)
        .with_personas(&personas)
        .run(&mut state, &mut generator, &sink)
        .expect("batch completes");
    assert_eq!(locations.len(), 3);
    assert_eq!(sink.len(), 3);

    for (position, location) in locations.iter().enumerate() {
        let result = sink.load(location).expect("result stored");
        assert_eq!(result.repetition, position + 1);
        let persona = result.persona.expect("persona recorded");
        assert_eq!(persona.index, [1, 2, 1][position]);
        assert_eq!(result.answers.get("P").map(|a| a.entries.len()), Some(3));
        assert!(result.answers.get("E").is_some());
        assert_eq!(result.model.configuration["model"], "dry-run");
    }
    assert_eq!(generator.model_name(), "dry-run");
}

#[test]
fn directory_sink_never_overwrites_an_earlier_result() {
    let mut generator = ScriptedGenerator::new(["a: 1\nb: 2\nc: 3"]);
    let result = run_statements(&mut generator).expect("interview completes");
    let dir = TempDir::new().expect("temp dir");
    let sink = JsonDirectorySink::new(dir.path()).with_prefix("panel");

    let first = sink.persist(&result).expect("first result saved");
    let second = sink.persist(&result).expect("second result saved");
    assert_ne!(first, second);
    assert!(first.ends_with("-1.json"));
    assert!(second.ends_with("-1-2.json"));

    let file_name = std::path::Path::new(&first)
        .file_name()
        .and_then(|name| name.to_str())
        .expect("file name");
    assert!(file_name.starts_with("panel-"));
    assert_eq!(sink.load(&first).expect("first loads"), result);
    assert_eq!(sink.load(&second).expect("second loads"), result);
    assert_eq!(std::fs::read_dir(dir.path()).expect("dir listed").count(), 2);
}
