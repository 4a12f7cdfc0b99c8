use crate::{
    app::{App, ImportReport},
    dungeons::{Dungeon, SEASON_NAME},
    history::CharacterSnapshot,
    player::PlayerData,
    times::{format_duration, WeeklyAffix},
};
use anyhow::{bail, Context, Result};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "json" => Some(OutputFormat::Json),
            "text" => Some(OutputFormat::Text),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct GlobalOptions {
    pub format: OutputFormat,
    pub verbose: bool,
}

#[derive(Debug, PartialEq)]
enum CliCommand {
    Import {
        region: Option<String>,
        realm: String,
        name: String,
        force: bool,
    },
    Times {
        hypothetical: bool,
    },
    Plan {
        dungeon: Dungeon,
        week: WeeklyAffix,
        level: u32,
        plus: Option<u32>,
        duration: Option<u64>,
    },
    Reset,
    History {
        all: bool,
    },
    Paths,
    Help,
    Version,
}

pub fn run(global: GlobalOptions, tokens: Vec<String>) -> Result<()> {
    match parse_command(&tokens)? {
        CliCommand::Help => {
            print_help();
            Ok(())
        }
        CliCommand::Version => {
            println!("KeySmith v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        command => {
            let mut app = App::initialize()?;
            run_command(&mut app, command, global.format)
        }
    }
}

pub fn parse_global_options(args: &[String]) -> (GlobalOptions, Vec<String>) {
    let mut format = OutputFormat::Text;
    let mut verbose = false;
    let mut tokens = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if let Some(value) = arg.strip_prefix("--format=") {
            if let Some(parsed) = OutputFormat::parse(value) {
                format = parsed;
            }
            continue;
        }
        if arg == "--format" {
            if let Some(value) = iter.next() {
                if let Some(parsed) = OutputFormat::parse(value) {
                    format = parsed;
                }
            }
            continue;
        }
        if arg == "--verbose" || arg == "-v" {
            verbose = true;
            continue;
        }
        tokens.push(arg.to_string());
    }

    (GlobalOptions { format, verbose }, tokens)
}

fn parse_command(tokens: &[String]) -> Result<CliCommand> {
    let Some(head) = tokens.first() else {
        return Ok(CliCommand::Help);
    };
    let rest = tokens.get(1..).unwrap_or(&[]);
    match head.as_str() {
        "import" => parse_import(rest),
        "times" => Ok(CliCommand::Times {
            hypothetical: rest
                .iter()
                .any(|arg| arg == "--hypothetical" || arg == "-H"),
        }),
        "plan" => parse_plan(rest),
        "reset" => Ok(CliCommand::Reset),
        "history" => Ok(CliCommand::History {
            all: rest.iter().any(|arg| arg == "--all" || arg == "-a"),
        }),
        "paths" => Ok(CliCommand::Paths),
        "help" | "--help" | "-h" => Ok(CliCommand::Help),
        "version" | "--version" | "-V" => Ok(CliCommand::Version),
        other => bail!("Unknown command: {other} (see 'keysmith help')"),
    }
}

fn parse_import(args: &[String]) -> Result<CliCommand> {
    let mut region = None;
    let mut force = false;
    let mut positional = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--force" | "-f" => force = true,
            "--region" | "-r" => {
                let Some(value) = iter.next() else {
                    bail!("--region requires a value");
                };
                region = Some(value.to_string());
            }
            value if value.starts_with("--region=") => {
                region = Some(value.trim_start_matches("--region=").to_string());
            }
            value if value.starts_with('-') => bail!("Unknown import option: {value}"),
            value => positional.push(value.to_string()),
        }
    }

    let [realm, name] = <[String; 2]>::try_from(positional)
        .map_err(|_| anyhow::anyhow!("import requires <realm> <name>"))?;
    Ok(CliCommand::Import {
        region,
        realm,
        name,
        force,
    })
}

fn parse_plan(args: &[String]) -> Result<CliCommand> {
    let mut plus = None;
    let mut duration = None;
    let mut positional = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--plus" => {
                let value = iter.next().context("--plus requires a value")?;
                plus = Some(value.parse().context("--plus must be a number")?);
            }
            "--duration" => {
                let value = iter.next().context("--duration requires milliseconds")?;
                duration = Some(value.parse().context("--duration must be milliseconds")?);
            }
            value => positional.push(value.to_string()),
        }
    }

    let [dungeon, week, level] = <[String; 3]>::try_from(positional)
        .map_err(|_| anyhow::anyhow!("plan requires <dungeon> <tyrannical|fortified> <level>"))?;
    let dungeon = Dungeon::from_short(&dungeon)
        .ok_or_else(|| anyhow::anyhow!("Unknown dungeon: {dungeon}"))?;
    let week =
        WeeklyAffix::parse(&week).ok_or_else(|| anyhow::anyhow!("Unknown week: {week}"))?;
    let level = level.parse().context("level must be a number")?;
    Ok(CliCommand::Plan {
        dungeon,
        week,
        level,
        plus,
        duration,
    })
}

fn run_command(app: &mut App, command: CliCommand, format: OutputFormat) -> Result<()> {
    match command {
        CliCommand::Import {
            region,
            realm,
            name,
            force,
        } => {
            let character = app.character_ref(region.as_deref(), &realm, &name);
            match app.import_character(&character, force) {
                Ok(report) => print_import(&report, format),
                Err(err) => {
                    app.dismiss_import_error();
                    Err(err)
                }
            }
        }
        CliCommand::Times { hypothetical } => list_times(&app.player, hypothetical, format),
        CliCommand::Plan {
            dungeon,
            week,
            level,
            plus,
            duration,
        } => {
            let timing = app.plan(dungeon, week, level, plus, duration)?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&timing)?),
                OutputFormat::Text => println!(
                    "{} {week}: +{} {} ({} upgrades)",
                    dungeon.name(),
                    timing.level,
                    format_duration(timing.duration),
                    timing.plus
                ),
            }
            Ok(())
        }
        CliCommand::Reset => {
            app.reset_hypothetical()?;
            if format == OutputFormat::Text {
                println!("Hypothetical times reset to imported times");
            }
            Ok(())
        }
        CliCommand::History { all } => list_history(app, all, format),
        CliCommand::Paths => list_paths(app, format),
        CliCommand::Help | CliCommand::Version => Ok(()),
    }
}

fn print_import(report: &ImportReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct ImportOutput<'a> {
                #[serde(flatten)]
                summary: &'a crate::importer::ImportSummary,
                diagnostics: &'a [crate::diagnostics::Diagnostic],
            }
            let output = ImportOutput {
                summary: &report.summary,
                diagnostics: &report.diagnostics.diagnostics,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => {
            let character = &report.summary.character;
            println!("Imported {}", character.display_name());
            println!("  {} {}", character.spec, character.class);
            if let Some(guild) = &character.guild_name {
                println!("  <{guild}>");
            }
            println!(
                "  {} runs, {} slots filled",
                report.summary.runs_seen, report.summary.slots_filled
            );
            println!(
                "  {} timer mismatches, {} score mismatches",
                report.diagnostics.timer_mismatches(),
                report.diagnostics.score_mismatches()
            );
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct TimeRow {
    dungeon: &'static str,
    name: &'static str,
    week: WeeklyAffix,
    level: u32,
    plus: u32,
    duration_ms: u64,
    score: f64,
}

fn list_times(player: &PlayerData, hypothetical: bool, format: OutputFormat) -> Result<()> {
    let (times, scores) = if hypothetical {
        (&player.hypothetical_times, player.hypothetical_scores())
    } else {
        (&player.original_times, player.original_scores())
    };

    let mut rows = Vec::new();
    for (dungeon, weeks) in times.iter() {
        for (week, timing) in weeks.iter() {
            rows.push(TimeRow {
                dungeon: dungeon.short(),
                name: dungeon.name(),
                week,
                level: timing.level,
                plus: timing.plus,
                duration_ms: timing.duration,
                score: scores[dungeon][week].value(),
            });
        }
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        OutputFormat::Text => {
            let label = if hypothetical { "Hypothetical" } else { "Imported" };
            println!("{label} times, {SEASON_NAME}");
            if let Some(character) = &player.character {
                println!("{}", character.display_name());
            }
            for row in rows {
                if row.level == 0 {
                    println!("  {:<5} {:<10} -", row.dungeon, row.week.as_str());
                    continue;
                }
                println!(
                    "  {:<5} {:<10} +{:<2} {} {:>2}* {:>6.1}",
                    row.dungeon,
                    row.week.as_str(),
                    row.level,
                    format_duration(row.duration_ms),
                    row.plus,
                    row.score
                );
            }
            println!("  Total {}", PlayerData::total_score(&scores));
        }
    }
    Ok(())
}

fn list_history(app: &App, all: bool, format: OutputFormat) -> Result<()> {
    let snapshots: Vec<&CharacterSnapshot> = if all {
        app.history.entries().iter().rev().collect()
    } else {
        app.history.latest_per_character()
    };
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&snapshots)?),
        OutputFormat::Text => {
            if snapshots.is_empty() {
                println!("No imports yet");
            }
            for snapshot in snapshots {
                println!(
                    "{}  {}",
                    snapshot.imported_at_label(),
                    snapshot.character.display_name()
                );
            }
        }
    }
    Ok(())
}

fn list_paths(app: &App, format: OutputFormat) -> Result<()> {
    #[derive(Serialize)]
    struct Paths<'a> {
        data_dir: &'a std::path::Path,
        cache_dir: &'a std::path::Path,
        api_base: &'a str,
    }
    let paths = Paths {
        data_dir: &app.data_dir,
        cache_dir: &app.cache_dir,
        api_base: &app.config.api_base,
    };
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&paths)?),
        OutputFormat::Text => {
            println!("Data:  {}", paths.data_dir.display());
            println!("Cache: {}", paths.cache_dir.display());
            println!("API:   {}", paths.api_base);
        }
    }
    Ok(())
}

fn print_help() {
    println!("KeySmith");
    println!("  import <realm> <name> [--region R] [--force]");
    println!("                        Import Mythic+ runs from Raider.IO");
    println!("  times [--hypothetical]  Show best times and base scores");
    println!("  plan <dungeon> <tyrannical|fortified> <level> [--plus N] [--duration MS]");
    println!("                        Edit a hypothetical run");
    println!("  reset                 Copy imported times over hypothetical times");
    println!("  history [--all]       Show imported characters");
    println!("  paths                 Show data and cache locations");
    println!("  --format text|json    Output format");
    println!("  --verbose             Debug logging");
    println!();
    println!("Dungeons: {}", dungeon_codes());
}

fn dungeon_codes() -> String {
    Dungeon::ALL
        .iter()
        .map(|dungeon| dungeon.short())
        .collect::<Vec<&str>>()
        .join(", ")
}
