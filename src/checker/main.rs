//! Standalone checker for standup rules.
//!
//! Classifies a message the way the bot would, validates a rules file, or
//! writes an example rules file to start from.

use std::io::Read;
use std::process::ExitCode;

use clap::Parser;

use punisher_bot::config::{ClassifierPolicy, StandupRules};
use punisher_bot::standup::StandupClassifier;

/// Standup rules checker.
#[derive(Parser, Debug)]
#[command(name = "check_standup")]
#[command(about = "Checks whether a message counts as a standup report")]
#[command(version)]
struct Args {
    /// Message text. Read from stdin when omitted.
    text: Option<String>,

    /// JSON rules file. Built-in rules are used when omitted.
    #[arg(short, long)]
    rules: Option<String>,

    /// Overrides the policy from the rules file (tag or keywords).
    #[arg(short, long)]
    policy: Option<ClassifierPolicy>,

    /// Only validate the rules file.
    #[arg(long)]
    validate: bool,

    /// Generate an example rules file at the specified path.
    #[arg(long)]
    generate_example: Option<String>,

    /// Show which keyword groups the message misses.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Some(output_path) = &args.generate_example {
        return generate_example(output_path);
    }

    let mut rules = match &args.rules {
        Some(path) => match StandupRules::load_from_file(path) {
            Ok(rules) => rules,
            Err(e) => {
                eprintln!("✗ Failed to load rules: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => StandupRules::default(),
    };

    if let Some(policy) = args.policy {
        rules.policy = policy;
    }

    if args.validate {
        return validate_rules(&rules);
    }

    if let Err(e) = rules.validate() {
        eprintln!("✗ Rules are invalid: {e}");
        return ExitCode::FAILURE;
    }

    let text = match args.text {
        Some(text) => text,
        None => {
            let mut buf = String::new();
            if let Err(e) = std::io::stdin().read_to_string(&mut buf) {
                eprintln!("✗ Failed to read stdin: {e}");
                return ExitCode::FAILURE;
            }
            buf
        }
    };

    classify(&StandupClassifier::new(rules), &text, args.verbose)
}

fn generate_example(output_path: &str) -> ExitCode {
    let example = StandupRules::example();

    match example.save_to_file(output_path) {
        Ok(()) => {
            println!("✓ Example rules written to: {output_path}");
            println!(
                "\nPolicy '{}' with {} keyword groups.",
                example.policy,
                example.keyword_groups.len()
            );
            println!("Set \"policy\" to \"tag\" to accept any message containing \"{}\".", example.tag);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Failed to write example file: {e}");
            ExitCode::FAILURE
        }
    }
}

fn validate_rules(rules: &StandupRules) -> ExitCode {
    println!("Policy: {}", rules.policy);
    println!("Tag: {}\n", rules.tag);

    let mut errors = 0;
    if rules.keyword_groups.is_empty() {
        println!("  (no keyword groups)");
    }
    for (group, result) in rules.keyword_groups.iter().zip(rules.validate_groups()) {
        match result {
            Ok(()) => println!("  ✓ {} ({} keywords)", group.name, group.keywords.len()),
            Err(e) => {
                errors += 1;
                println!("  ✗ {}: {e}", group.name);
            }
        }
    }

    println!();

    match rules.validate() {
        Ok(()) if errors == 0 => {
            println!("✓ Rules are valid");
            ExitCode::SUCCESS
        }
        Ok(()) => {
            println!("✓ Rules are usable with the '{}' policy", rules.policy);
            println!("  ({errors} keyword group error(s), only relevant for 'keywords')");
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("✗ Validation failed: {e}");
            ExitCode::FAILURE
        }
    }
}

fn classify(classifier: &StandupClassifier, text: &str, verbose: bool) -> ExitCode {
    let text = text.trim_end_matches(['\r', '\n']);

    if classifier.is_standup(text) {
        println!("✓ Standup");
        return ExitCode::SUCCESS;
    }

    println!("✗ Not a standup");
    if verbose {
        match classifier.rules().policy {
            ClassifierPolicy::Tag => {
                println!("  Missing tag: {}", classifier.rules().tag);
            }
            ClassifierPolicy::Keywords => {
                for group in classifier.missing_groups(text) {
                    println!("  Missing group: {group}");
                }
            }
        }
    }

    ExitCode::FAILURE
}
