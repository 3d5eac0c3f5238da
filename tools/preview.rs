/// Preview — interactive shell for trying the quest engine end to end.
///
/// Usage: preview [--catalog <path>] [--config <path>] [--state-dir <dir>] [--seed <n>]
///                [--default-quest]
///
/// Commands:
///   profile <CODE>          set personality type, e.g. ISTJ
///   situation <id>          office, home, cafe, bed, transit, outside
///   mood <id>               pick a mood leaf (run without args to list)
///   quest                   recommend a quest for the current state
///   feedback <score>        rate the last quest: positive, neutral, negative
///   bulk <n>                run n catalog-vs-generative routing trials
///   ledger                  show recently completed catalog quests
///   garden                  show growth stats
///   export                  print the history as JSON
///   seed <n>                reset the RNG seed
///   help                    list commands
///   quit                    exit
///
/// The generative provider is used when GEMINI_API_KEY (or API_KEY) is set,
/// including via a `.env` file. With `--default-quest`, provider failures
/// return the built-in breathing quest instead of a catalog quest.

use quest_engine::core::engine::QuestEngine;
use quest_engine::core::gemini::{GeminiConfig, GeminiProvider};
use quest_engine::core::history::export_json;
use quest_engine::core::provider::{DefaultingProvider, OfflineProvider};
use quest_engine::core::store::FileStore;
use quest_engine::schema::mood::{Mood, MoodCategory};
use quest_engine::schema::profile::{PersonalityProfile, Situation};
use quest_engine::schema::quest::{FeedbackScore, QuestResult};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return;
    }

    let mut catalog_path = None;
    let mut config_path = None;
    let mut state_dir = None;
    let mut seed: u64 = 42;
    let mut default_quest = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--catalog" if i + 1 < args.len() => {
                i += 1;
                catalog_path = Some(args[i].clone());
            }
            "--config" if i + 1 < args.len() => {
                i += 1;
                config_path = Some(args[i].clone());
            }
            "--state-dir" if i + 1 < args.len() => {
                i += 1;
                state_dir = Some(args[i].clone());
            }
            "--seed" if i + 1 < args.len() => {
                i += 1;
                seed = args[i].parse().unwrap_or(42);
            }
            "--default-quest" => {
                default_quest = true;
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let mut builder = QuestEngine::builder();
    if let Some(ref path) = catalog_path {
        builder = builder.catalog_path(path);
    }
    if let Some(ref path) = config_path {
        builder = builder.config_path(path);
    }
    if let Some(ref dir) = state_dir {
        builder = builder.with_store(Arc::new(FileStore::new(dir)));
    }

    let gemini = GeminiConfig::from_env();
    let gemini = if gemini.has_credential() {
        match GeminiProvider::new(gemini) {
            Ok(provider) => Some(provider),
            Err(e) => {
                eprintln!("WARNING: Gemini provider unavailable: {}", e);
                None
            }
        }
    } else {
        println!("No API key found; generative requests use the fallback.");
        None
    };
    builder = match (gemini, default_quest) {
        (Some(provider), true) => builder.with_provider(DefaultingProvider::new(provider)),
        (Some(provider), false) => builder.with_provider(provider),
        (None, true) => builder.with_provider(DefaultingProvider::new(OfflineProvider)),
        (None, false) => builder.with_provider(OfflineProvider),
    };

    let engine = match builder.build() {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    println!(
        "Loaded {} quests, provider: {}, on failure: {}",
        engine.policy().catalog().len(),
        engine.policy().provider_name(),
        if default_quest { "default quest" } else { "catalog" }
    );
    println!("Seed: {}", seed);
    println!("Type 'help' for commands.\n");

    // Session state
    let mut profile = PersonalityProfile::default();
    let mut situation = Situation::Home;
    let mut mood: &'static Mood = &quest_engine::schema::mood::MOODS[0];
    let mut last_quest: Option<QuestResult> = None;
    let mut rng = StdRng::seed_from_u64(seed);

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("preview [{} | {} | {}]> ", profile.code(), situation.id(), mood.id);
        stdout.flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() || line.is_empty() {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        let cmd = parts[0].to_lowercase();

        match cmd.as_str() {
            "quit" | "exit" | "q" => {
                println!("Goodbye.");
                break;
            }
            "help" | "h" | "?" => {
                print_help();
            }
            "profile" => {
                if parts.len() < 2 {
                    println!("Current profile: {}", profile.code());
                    continue;
                }
                match PersonalityProfile::parse_code(parts[1]) {
                    Ok(p) => {
                        profile = p;
                        println!("Profile set to {}", profile.code());
                    }
                    Err(e) => println!("ERROR: {}", e),
                }
            }
            "situation" => {
                if parts.len() < 2 {
                    let ids: Vec<&str> = Situation::ALL.iter().map(|s| s.id()).collect();
                    println!("Usage: situation <{}>", ids.join("|"));
                    continue;
                }
                match Situation::from_id(parts[1]) {
                    Ok(s) => {
                        situation = s;
                        println!("Situation set to {}", situation.label());
                    }
                    Err(e) => println!("ERROR: {}", e),
                }
            }
            "mood" => {
                if parts.len() < 2 {
                    print_moods();
                    continue;
                }
                match Mood::lookup(parts[1]) {
                    Some(m) => {
                        mood = m;
                        let extreme = if engine.policy().is_extreme(m.id) { " (extreme)" } else { "" };
                        println!("Mood set to '{}' in {}{}", m.label, m.category.id(), extreme);
                    }
                    None => println!("Unknown mood: {}", parts[1]),
                }
            }
            "quest" => match engine.recommend(profile, situation, mood.id, &mut rng).await {
                Ok(quest) => {
                    print_quest(&quest);
                    last_quest = Some(quest);
                }
                Err(e) => println!("ERROR: {}", e),
            },
            "feedback" => {
                let Some(quest) = last_quest.take() else {
                    println!("No quest to rate. Run 'quest' first.");
                    continue;
                };
                let score = match parts.get(1).and_then(|s| FeedbackScore::from_id(s)) {
                    Some(score) => score,
                    None => {
                        println!("Usage: feedback <positive|neutral|negative>");
                        last_quest = Some(quest);
                        continue;
                    }
                };
                match engine.record_feedback(&quest, score, Some(mood)) {
                    Ok(()) => println!(
                        "Recorded {:?} for '{}'{}",
                        score,
                        quest.title,
                        if quest.origin.is_catalog() { " (ledger updated)" } else { "" }
                    ),
                    Err(e) => println!("ERROR: {}", e),
                }
            }
            "bulk" => {
                let count: usize = match parts.get(1).map(|s| s.parse()) {
                    Some(Ok(n)) if n > 0 => n,
                    _ => {
                        println!("Usage: bulk <n>");
                        continue;
                    }
                };
                run_bulk(&engine, profile, situation, mood, count, &mut rng).await;
            }
            "ledger" => {
                let recent = engine.ledger().recent();
                if recent.is_empty() {
                    println!("Ledger is empty.");
                } else {
                    println!(
                        "{} / {} recent: {}",
                        recent.len(),
                        engine.ledger().capacity(),
                        recent.join(", ")
                    );
                }
            }
            "garden" => {
                let stats = engine.garden_stats();
                println!("Quests completed: {}", stats.total);
                println!("Active days:      {}", stats.active_days);
                println!("Level:            {}", stats.level.title());
            }
            "export" => match export_json(&engine.history().entries(), chrono::Utc::now()) {
                Ok(json) => println!("{}", json),
                Err(e) => println!("ERROR: {}", e),
            },
            "seed" => {
                if parts.len() < 2 {
                    println!("Usage: seed <n>");
                    continue;
                }
                match parts[1].parse::<u64>() {
                    Ok(s) => {
                        rng = StdRng::seed_from_u64(s);
                        println!("Seed set to {}", s);
                    }
                    Err(_) => println!("Invalid seed: {}", parts[1]),
                }
            }
            _ => {
                println!("Unknown command: {}. Type 'help' for commands.", cmd);
            }
        }
    }
}

/// Recommend `count` quests without recording feedback and report how
/// they were sourced.
async fn run_bulk(
    engine: &QuestEngine,
    profile: PersonalityProfile,
    situation: Situation,
    mood: &Mood,
    count: usize,
    rng: &mut StdRng,
) {
    let mut generative = 0usize;
    let mut by_id: HashMap<String, usize> = HashMap::new();

    for _ in 0..count {
        match engine.recommend(profile, situation, mood.id, rng).await {
            Ok(quest) if quest.is_ai_generated() => generative += 1,
            Ok(quest) => *by_id.entry(quest.id().to_string()).or_default() += 1,
            Err(e) => {
                println!("ERROR: {}", e);
                return;
            }
        }
    }

    println!("\n=== Bulk Stats ({} requests) ===", count);
    println!(
        "Generative: {} ({:.1}%)",
        generative,
        generative as f64 / count as f64 * 100.0
    );
    let mut ids: Vec<_> = by_id.into_iter().collect();
    ids.sort();
    for (id, n) in ids {
        println!("  {:<10} {}", id, n);
    }
    println!();
}

fn print_quest(quest: &QuestResult) {
    let source = if quest.is_ai_generated() {
        "generative"
    } else if quest.origin.is_catalog() {
        "catalog"
    } else {
        "default"
    };
    println!("\n--- {} ({}, {}) ---", quest.title, quest.id(), source);
    println!("{}", quest.instruction);
    println!("  > {}", quest.encouragement);
    println!("  why: {}", quest.rationale);
    println!("  [{} / {}]", quest.tag, quest.quest_type);
    println!("--- End ---\n");
}

fn print_moods() {
    for category in MoodCategory::ALL {
        let ids: Vec<&str> = category.moods().map(|m| m.id).collect();
        println!("  {:<18} {}", category.id(), ids.join(", "));
    }
}

fn print_usage() {
    println!("Usage: preview [--catalog <path>] [--config <path>] [--state-dir <dir>] [--seed <n>] [--default-quest]");
}

fn print_help() {
    println!("Commands:");
    println!("  profile <CODE>     Set personality type, e.g. ISTJ");
    println!("  situation <id>     office, home, cafe, bed, transit, outside");
    println!("  mood <id>          Pick a mood (no args lists them)");
    println!("  quest              Recommend a quest");
    println!("  feedback <score>   Rate the last quest: positive, neutral, negative");
    println!("  bulk <n>           Run n requests and show routing stats");
    println!("  ledger             Show recently completed catalog quests");
    println!("  garden             Show growth stats");
    println!("  export             Print history as JSON");
    println!("  seed <n>           Reset the RNG seed");
    println!("  help               Show this help");
    println!("  quit               Exit");
}
