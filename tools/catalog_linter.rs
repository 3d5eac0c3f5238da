/// Catalog Linter — validates quest catalog coverage and template quality.
///
/// Usage: catalog_linter <catalog.ron | dir> [--config <engine.ron>]

use quest_engine::core::catalog::QuestCatalog;
use quest_engine::core::config::EngineConfig;
use quest_engine::core::template::{Placeholder, ReplacementTable};
use quest_engine::schema::mood::MoodCategory;
use std::path::Path;
use std::process;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: catalog_linter <catalog.ron | dir> [--config <engine.ron>]");
        process::exit(0);
    }

    let catalog_arg = &args[1];
    let mut config_path = None;

    let mut i = 2;
    while i < args.len() {
        if args[i] == "--config" && i + 1 < args.len() {
            i += 1;
            config_path = Some(args[i].clone());
        }
        i += 1;
    }

    let mut catalog = QuestCatalog::default();
    let catalog_path = Path::new(catalog_arg);

    if catalog_path.is_file() {
        match QuestCatalog::load_from_ron(catalog_path) {
            Ok(c) => catalog.merge(c),
            Err(e) => {
                eprintln!("ERROR: Failed to load catalog file: {}", e);
                process::exit(1);
            }
        }
    } else if catalog_path.is_dir() {
        load_catalogs_recursive(catalog_path, &mut catalog);
    } else {
        eprintln!("ERROR: Path '{}' does not exist", catalog_arg);
        process::exit(1);
    }

    println!("Loaded {} quest templates", catalog.len());

    let replacements = match config_path {
        Some(ref path) => match EngineConfig::load_from_ron(Path::new(path)) {
            Ok(config) => config.replacements,
            Err(e) => {
                eprintln!("ERROR: Failed to load config: {}", e);
                process::exit(1);
            }
        },
        None => ReplacementTable::default(),
    };

    let (errors, warnings) = lint_catalog(&catalog, &replacements);

    println!("\n=== Catalog Lint Report ===\n");

    if errors.is_empty() && warnings.is_empty() {
        println!("All checks passed!");
    }

    for warning in &warnings {
        println!("WARNING: {}", warning);
    }

    for error in &errors {
        println!("ERROR: {}", error);
    }

    println!(
        "\nSummary: {} errors, {} warnings",
        errors.len(),
        warnings.len()
    );

    if errors.is_empty() {
        process::exit(0);
    } else {
        process::exit(1);
    }
}

fn load_catalogs_recursive(dir: &Path, catalog: &mut QuestCatalog) {
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                load_catalogs_recursive(&path, catalog);
            } else if path.extension().and_then(|s| s.to_str()) == Some("ron") {
                match QuestCatalog::load_from_ron(&path) {
                    Ok(c) => {
                        println!("  Loaded: {}", path.display());
                        catalog.merge(c);
                    }
                    Err(e) => {
                        eprintln!("  ERROR loading {}: {}", path.display(), e);
                    }
                }
            }
        }
    }
}

fn lint_catalog(catalog: &QuestCatalog, replacements: &ReplacementTable) -> (Vec<String>, Vec<String>) {
    let mut errors: Vec<String> = catalog.issues().iter().map(|e| e.to_string()).collect();
    let mut warnings = Vec::new();

    for template in catalog.templates() {
        // Unknown tokens are emitted verbatim to the user
        for token in template.instruction.unresolved() {
            errors.push(format!(
                "quest '{}' uses unknown placeholder [{}]",
                template.id, token
            ));
        }

        for placeholder in Placeholder::ALL {
            let uses = template
                .instruction
                .placeholders()
                .filter(|p| *p == placeholder)
                .count();
            if uses > 0 && replacements.len_of(placeholder) == 0 {
                errors.push(format!(
                    "quest '{}' uses [{}] but the replacement table has no values for it",
                    template.id,
                    placeholder.token()
                ));
            }
            if uses > 1 {
                warnings.push(format!(
                    "quest '{}' uses [{}] {} times; each occurrence gets an independent value",
                    template.id,
                    placeholder.token(),
                    uses
                ));
            }
        }

        for (field, value) in [
            ("title", &template.title),
            ("encouragement", &template.encouragement),
            ("rationale", &template.rationale),
            ("tag", &template.tag),
        ] {
            if value.trim().is_empty() {
                warnings.push(format!("quest '{}' has an empty {}", template.id, field));
            }
        }
    }

    // A pool of one repeats on every catalog request
    for category in MoodCategory::ALL {
        let size = catalog.pool(category).len();
        if size == 1 {
            warnings.push(format!(
                "category '{}' has a single quest; it will repeat every time",
                category.id()
            ));
        }
    }

    (errors, warnings)
}
