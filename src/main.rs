mod debug_report;

use colloquy::{Bot, Category, ChatSession, EngineConfig, KnowledgeBase};
use serde::Deserialize;
use std::collections::HashMap;
use std::io::{self, BufRead, IsTerminal};
use std::path::PathBuf;

fn main() {
    init_logging();

    let config = match parse_args() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    let mut bot = match build_bot(&config) {
        Ok(bot) => bot,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };
    let mut session = ChatSession::new("cli");

    if config.inputs.is_empty() {
        for line in io::stdin().lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    eprintln!("error: failed to read stdin: {err}");
                    std::process::exit(1);
                }
            };
            if !line.trim().is_empty() {
                answer(&mut bot, &mut session, &line, &config);
            }
        }
    } else {
        for input in &config.inputs {
            answer(&mut bot, &mut session, input, &config);
        }
    }
}

fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env("COLLOQUY_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).compact();
    let _ = subscriber.try_init();
}

fn answer(bot: &mut Bot, session: &mut ChatSession, input: &str, config: &CliConfig) {
    if !config.verbose {
        println!("{}", bot.respond_or_default(session, input).text);
        return;
    }
    match bot.respond_verbose(session, input) {
        Ok(details) => debug_report::print_reply(input, &details, config.color),
        Err(err) => debug_report::print_miss(input, &err, config.color),
    }
}

struct CliConfig {
    rules: Vec<PathBuf>,
    inputs: Vec<String>,
    verbose: bool,
    color: bool,
}

/// Rules file: either a bare array of categories or a bundle with the
/// auxiliary data alongside.
#[derive(Deserialize)]
#[serde(untagged)]
enum RulesFile {
    Categories(Vec<Category>),
    Bundle(RuleBundle),
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RuleBundle {
    categories: Vec<Category>,
    sets: HashMap<String, Vec<String>>,
    maps: HashMap<String, HashMap<String, String>>,
    properties: HashMap<String, String>,
}

fn build_bot(config: &CliConfig) -> Result<Bot, String> {
    let engine_config = EngineConfig::from_env().map_err(|err| format!("error: {err}"))?;
    let mut kb = KnowledgeBase::new();

    for path in &config.rules {
        let raw = std::fs::read_to_string(path).map_err(|err| format!("error: cannot read {}: {err}", path.display()))?;
        let bundle = match serde_json::from_str::<RulesFile>(&raw)
            .map_err(|err| format!("error: invalid rules file {}: {err}", path.display()))?
        {
            RulesFile::Categories(categories) => RuleBundle { categories, ..RuleBundle::default() },
            RulesFile::Bundle(bundle) => bundle,
        };

        for (name, members) in bundle.sets {
            kb.add_set(&name, members);
        }
        for (name, entries) in bundle.maps {
            kb.add_map(&name, entries);
        }
        for (name, value) in bundle.properties {
            kb.set_property(&name, value);
        }
        let count = bundle.categories.len();
        kb.add_categories(bundle.categories).map_err(|err| format!("error: {}: {err}", path.display()))?;
        tracing::info!(file = %path.display(), categories = count, "loaded rules");
    }

    Ok(Bot::with_config(kb, engine_config))
}

fn parse_args() -> Result<CliConfig, String> {
    let mut rules: Vec<PathBuf> = Vec::new();
    let mut inputs: Vec<String> = Vec::new();
    let mut verbose = false;
    let mut color = io::stdout().is_terminal();
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("colloquy {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "-v" | "--verbose" => verbose = true,
            "--color" => color = true,
            "--no-color" => color = false,
            "--rules" | "-r" => {
                let value = args.next().ok_or_else(|| "error: --rules expects a file".to_string())?;
                rules.push(PathBuf::from(value));
            }
            "--" => {
                inputs.extend(args.by_ref());
                break;
            }
            _ if arg.starts_with("--rules=") => {
                rules.push(PathBuf::from(arg.trim_start_matches("--rules=")));
            }
            _ if arg.starts_with('-') => {
                return Err(format!("error: unknown option '{arg}'\n\n{}", help_text()));
            }
            _ => inputs.push(arg),
        }
    }

    Ok(CliConfig { rules, inputs, verbose, color })
}

fn print_help() {
    println!("{}", help_text());
}

fn help_text() -> String {
    format!(
        "colloquy {version}

Rule-based conversational engine CLI.

Usage:
  colloquy [OPTIONS] [--] <input>...
  colloquy [OPTIONS] < lines.txt

Each input (or each stdin line) is one turn of the same conversation.

Options:
  -r, --rules <file>   Load categories from a JSON file. Repeatable.
  -v, --verbose        Print a match and template pass report per turn.
  --color              Force ANSI color output.
  --no-color           Disable ANSI color output.
  -h, --help           Show this help message.
  -V, --version        Print version information.

Environment:
  COLLOQUY_LOG             Log filter (default: warn).
  COLLOQUY_MAX_LOOPS       Self-match nesting bound.
  COLLOQUY_CACHE           Enable the response cache (true/false).
  COLLOQUY_CACHE_CAPACITY  Response cache size.

Exit codes:
  0  Success.
  1  Failed to load rules or read input.
  2  Invalid arguments.
",
        version = env!("CARGO_PKG_VERSION"),
    )
}
