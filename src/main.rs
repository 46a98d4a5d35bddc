use std::sync::Arc;

use anyhow::Context as _;
use tokio::io::{AsyncBufReadExt, BufReader};

use intake_engine::config::IntakeConfig;
use intake_engine::error::ConfigError;
use intake_engine::intake::{
    AgeRange, CandidateSource, Chip, ConversationStep, EventOutcome, FixedTier, GenderPreference,
    IntakeEvent, IntakeSession, Message, MessageContent, RandomTier, Role, StaticCandidates,
    SubscriptionTier, TierPolicy,
};

const HELP: &str = "\
Commands:
  open <category>            open a category sheet
  toggle <category> <symptom>
  free                       describe in your own words
  text <description>         submit the description
  next                       the \"Next\" button
  gender male|female|any
  age 25-35|35-45|45+
  method <name>              toggle a therapy method
  skip                       skip the method question
  edit <n> <chip>            tap a chip on message #n (chip: category <id> | free |
                             gender <g> | age <r> | method <m> | skip)
  /log  /transcript  /restart  /help  /quit";

enum Command {
    Event(IntakeEvent),
    Log,
    Transcript,
    Help,
    Quit,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = match std::env::var("INTAKE_CONFIG_PATH") {
        Ok(path) => IntakeConfig::from_file(&path)
            .with_context(|| format!("Failed to load config from {}", path))?,
        Err(_) => match std::env::var("INTAKE_LAYOUT").as_deref() {
            Ok("compact") => IntakeConfig::compact(),
            _ => IntakeConfig::standard(),
        },
    };

    let candidates_path = std::env::var("INTAKE_CANDIDATES_PATH")
        .unwrap_or_else(|_| "./data/candidates.json".to_string());
    let candidates = StaticCandidates::from_file(&candidates_path)
        .with_context(|| format!("Failed to load candidates from {}", candidates_path))?;

    let tier_policy: Arc<dyn TierPolicy> = match std::env::var("INTAKE_TIER").as_deref() {
        Ok("random") | Err(_) => Arc::new(RandomTier::default()),
        Ok(other) => {
            let tier: SubscriptionTier = other.parse().map_err(|message| ConfigError::InvalidValue {
                key: "INTAKE_TIER".to_string(),
                message,
            })?;
            Arc::new(FixedTier(tier))
        }
    };

    eprintln!("🧭 Intake Engine v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Categories: {}", config.catalog.categories.len());
    eprintln!(
        "   Steps: {}",
        config
            .steps
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(" → ")
    );
    eprintln!("   Candidates: {} ({})", candidates.len(), candidates_path);
    eprintln!("   Type /help for commands.\n");

    let candidates: Arc<dyn CandidateSource> = Arc::new(candidates);
    let mut session =
        IntakeSession::new(Arc::new(config), candidates).with_tier_policy(tier_policy);

    let mut printed = print_new(&session, 0);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    eprint!("> ");
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            eprint!("> ");
            continue;
        }

        match parse_command(line, &session) {
            Some(Command::Quit) => break,
            Some(Command::Help) => eprintln!("{HELP}"),
            Some(Command::Log) => printed = print_new(&session, 0),
            Some(Command::Transcript) => println!("{}", session.log().transcript()),
            Some(Command::Event(event)) => {
                let outcome = session.dispatch(event);
                if matches!(outcome, EventOutcome::Rewound { .. })
                    || printed > session.messages().len()
                {
                    printed = 0;
                }
                if outcome == EventOutcome::Ignored {
                    eprintln!("(nothing to do at step '{}')", session.current_step());
                }
                if let EventOutcome::Updated = outcome {
                    print_selection(&session);
                }
                printed = print_new(&session, printed);
            }
            None => eprintln!("Unrecognized command. /help lists them."),
        }
        eprint!("> ");
    }

    Ok(())
}

fn parse_command(line: &str, session: &IntakeSession) -> Option<Command> {
    let (head, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();

    let event = match head {
        "/quit" | "/exit" => return Some(Command::Quit),
        "/help" => return Some(Command::Help),
        "/log" => return Some(Command::Log),
        "/transcript" => return Some(Command::Transcript),
        // This layout never asks about methods.
        "method" | "skip" if !session.config().asks(ConversationStep::Method) => return None,
        "/restart" => IntakeEvent::Restart,
        "open" => IntakeEvent::OpenCategory {
            category: rest.to_string(),
        },
        "toggle" => {
            let (category, symptom) = rest.split_once(' ')?;
            IntakeEvent::ToggleSymptom {
                category: category.to_string(),
                symptom: symptom.trim().to_string(),
            }
        }
        "free" => IntakeEvent::EnterFreeText,
        "text" => IntakeEvent::SubmitFreeText {
            text: rest.to_string(),
        },
        "next" => IntakeEvent::Advance,
        "gender" => IntakeEvent::SelectGender {
            gender: rest.parse().ok()?,
        },
        "age" => IntakeEvent::ToggleAge {
            range: rest.parse().ok()?,
        },
        "method" => IntakeEvent::ToggleMethod {
            method: rest.to_string(),
        },
        "skip" => IntakeEvent::SkipMethods,
        "edit" => {
            let (index, chip) = rest.split_once(' ')?;
            let index: usize = index.parse().ok()?;
            let message = session.messages().get(index.checked_sub(1)?)?;
            IntakeEvent::ClickChip {
                message_id: message.id,
                chip: parse_chip(chip.trim())?,
            }
        }
        _ => return None,
    };
    Some(Command::Event(event))
}

fn parse_chip(input: &str) -> Option<Chip> {
    let (kind, value) = input.split_once(' ').unwrap_or((input, ""));
    let value = value.trim();
    match kind {
        "category" => Some(Chip::Category(value.to_string())),
        "free" => Some(Chip::FreeText),
        "gender" => value.parse::<GenderPreference>().ok().map(Chip::Gender),
        "age" => value.parse::<AgeRange>().ok().map(Chip::Age),
        "method" => Some(Chip::Method(value.to_string())),
        "skip" => Some(Chip::SkipMethod),
        _ => None,
    }
}

/// Print messages from index `from` on; returns the new printed count.
fn print_new(session: &IntakeSession, from: usize) -> usize {
    for (i, message) in session.messages().iter().enumerate().skip(from) {
        println!("{}", render(i + 1, message));
    }
    session.messages().len()
}

fn print_selection(session: &IntakeSession) {
    let summary = session.selection().summary(&session.config().catalog);
    if !summary.is_empty() {
        eprintln!("   selected: {}", summary);
    }
    if let Some(category) = session
        .active_category()
        .and_then(|id| session.config().catalog.category(id))
    {
        eprintln!(
            "   {} ({} selected)",
            category.title,
            session.selected_count(&category.id)
        );
        for symptom in &category.symptoms {
            let mark = if session.selection().is_selected(&category.id, symptom) {
                "x"
            } else {
                " "
            };
            eprintln!("     [{mark}] {symptom}");
        }
    }
    if !session.age_ranges().is_empty() {
        let ages: Vec<&str> = session.age_ranges().iter().map(AgeRange::label).collect();
        eprintln!("   ages: {}", ages.join(", "));
    }
    if !session.methods().is_empty() {
        let methods: Vec<&str> = session.methods().iter().map(String::as_str).collect();
        eprintln!("   methods: {}", methods.join(", "));
    }
}

fn render(n: usize, message: &Message) -> String {
    let who = match message.role {
        Role::Bot => "bot",
        Role::User => "you",
    };
    let mut out = format!("#{n} [{who}] {}", message.text());

    match &message.content {
        MessageContent::Question { chips, .. } => {
            let labels: Vec<String> = chips
                .iter()
                .map(|c| match &c.chip {
                    Chip::Category(id) => format!("{} ({})", c.label, id),
                    _ => c.label.clone(),
                })
                .collect();
            out.push_str(&format!("\n     [{}]", labels.join(" | ")));
        }
        MessageContent::Results { recommendation, .. } => {
            for (i, r) in recommendation.results.iter().enumerate() {
                let c = &r.candidate;
                out.push_str(&format!(
                    "\n     {}. {} ({}, {}) ★{:.1}",
                    i + 1,
                    c.name,
                    c.gender,
                    c.age,
                    c.rating
                ));
                if !r.matched_symptoms.is_empty() {
                    let matched: Vec<&str> = r.matched_symptoms.iter().map(String::as_str).collect();
                    out.push_str(&format!(" · {}", matched.join(", ")));
                }
            }
        }
        MessageContent::ContentRecommendation { topics, reading, .. } => {
            out.push_str(&format!("\n     topics: {}", topics.join(", ")));
            for title in reading {
                out.push_str(&format!("\n     • {}", title));
            }
        }
        MessageContent::Text { .. } => {}
    }
    out
}
