use std::io::{self, Write};
use std::path::PathBuf;

use chrono::{NaiveDate, Weekday};
use clap::{Parser, ValueEnum};
use gantt_schedule::logging::init_logging;
use gantt_schedule::{
    Constraint, ConstraintKind, DayType, DependencyId, Hardness, JsonFileStore, NewTask, Schedule,
    ScheduleStore, TaskId, TimeDuration, TimeUnitStack,
};
use polars::prelude::{AnyValue, DataFrame};

/// Interactive editor for a task schedule.
#[derive(Debug, Clone, Parser)]
#[command(name = "cli", version, about = "Edit a task schedule from the terminal.", long_about = None)]
struct CliArgs {
    /// JSON snapshot to load at startup and write with `save`.
    #[arg(long, value_name = "PATH")]
    snapshot: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `GANTT_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    log_level: Option<LogLevel>,
}

#[derive(Debug, Copy, Clone, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

fn format_cell(column: &str, value: &AnyValue) -> String {
    match value {
        AnyValue::Null => String::new(),
        AnyValue::Int32(v) => v.to_string(),
        AnyValue::Int64(v) => v.to_string(),
        AnyValue::Boolean(v) => v.to_string(),
        AnyValue::String(s) => s.to_string(),
        AnyValue::List(inner) if column == "predecessors" => match inner.i32() {
            Ok(ca) => ca
                .into_iter()
                .flatten()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(","),
            Err(_) => value.to_string(),
        },
        _ => value.to_string(),
    }
}

fn render_df_as_text_table(df: &DataFrame) -> String {
    let columns = df.get_columns();
    let col_names: Vec<String> = columns.iter().map(|c| c.name().to_string()).collect();

    let rows: Vec<Vec<String>> = (0..df.height())
        .map(|row_idx| {
            columns
                .iter()
                .map(|col| {
                    col.get(row_idx)
                        .map(|av| format_cell(col.name(), &av))
                        .unwrap_or_default()
                })
                .collect()
        })
        .collect();

    let mut widths: Vec<usize> = col_names.iter().map(|n| n.len()).collect();
    for row in &rows {
        for (ci, cell) in row.iter().enumerate() {
            widths[ci] = widths[ci].max(cell.len());
        }
    }

    let mut sep = String::from("+");
    for w in &widths {
        sep.push_str(&"-".repeat(*w + 2));
        sep.push('+');
    }

    let render_row = |cells: &[String]| {
        let mut line = String::from("|");
        for (ci, cell) in cells.iter().enumerate() {
            line.push(' ');
            line.push_str(cell);
            line.push_str(&" ".repeat(widths[ci].saturating_sub(cell.len())));
            line.push_str(" |");
        }
        line
    };

    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');
    out.push_str(&render_row(&col_names));
    out.push('\n');
    out.push_str(&sep);
    out.push('\n');
    for row in &rows {
        out.push_str(&render_row(row));
        out.push('\n');
    }
    out.push_str(&sep);
    out.push('\n');
    out
}

fn print_help() {
    println!(
        "Commands:\n  help                               Show this help\n  show                               Show current schedule\n  add <name> <YYYY-MM-DD> <duration> [parent]\n                                     Add a task (duration like 3, 3d, 2w, 1month)\n  milestone <name> <YYYY-MM-DD> [parent]\n                                     Add a milestone\n  link <dependee> <dependant> [FS|SS|FF|SF] [lag] [strict|rubber]\n                                     Add a dependency\n  unlink  <dependency_id>            Remove a dependency\n  start   <id> <YYYY-MM-DD>          Move a task\n  end     <id> <YYYY-MM-DD>          Set exclusive end\n  dur     <id> <duration>            Set duration\n  shift   <id> <duration>            Shift task and subtree (negative allowed)\n  pct     <id> <0-100>               Set completion\n  parent  <id> <parent|none>         Move task in the hierarchy\n  delete  <id>                       Delete task and subtree\n  holiday <YYYY-MM-DD> [title...]    Add a holiday\n  weekday <mon..sun> <working|weekend|nonworking>\n                                     Set weekday type\n  critical                           List critical tasks\n  save [path]                        Write JSON snapshot\n  load <path>                        Replace schedule from JSON snapshot\n  quit|exit                          Exit"
    );
}

fn parse_id(s: Option<&str>) -> Option<TaskId> {
    s.and_then(|s| s.parse::<u32>().ok()).map(TaskId)
}

fn parse_date(s: Option<&str>) -> Option<NaiveDate> {
    s.and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
}

/// `3` is three days; a suffix picks the unit (`3d`, `2w`, `1month`).
fn parse_duration(units: &TimeUnitStack, s: Option<&str>) -> Option<TimeDuration> {
    let s = s?.trim();
    let split = s
        .char_indices()
        .find(|(i, c)| c.is_ascii_alphabetic() && *i > 0)
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    let (number, unit) = s.split_at(split);
    let length: f64 = number.parse().ok()?;
    let unit = if unit.is_empty() {
        units.day().clone()
    } else {
        units.find_unit(unit)?
    };
    Some(TimeDuration::new(length, unit))
}

fn parse_weekday(s: Option<&str>) -> Option<Weekday> {
    s?.parse::<Weekday>().ok()
}

fn parse_day_type(s: Option<&str>) -> Option<DayType> {
    match s?.to_ascii_lowercase().as_str() {
        "working" => Some(DayType::Working),
        "weekend" => Some(DayType::Weekend),
        "nonworking" | "non-working" => Some(DayType::NonWorking),
        _ => None,
    }
}

fn show(schedule: &Schedule) {
    match schedule.to_dataframe() {
        Ok(df) => println!("{}", render_df_as_text_table(&df)),
        Err(e) => println!("Error: {}", e),
    }
}

fn report<E: std::fmt::Display>(schedule: &Schedule, label: &str, result: Result<gantt_schedule::MutationReport, E>) {
    match result {
        Ok(summary) => {
            println!("{} ({})", label, summary.to_cli_summary());
            show(schedule);
        }
        Err(e) => println!("Error: {}", e),
    }
}

fn main() {
    let args = CliArgs::parse();
    init_logging(args.log_level.map(tracing::Level::from));

    let store = args.snapshot.as_ref().map(JsonFileStore::new);
    let mut schedule = match store.as_ref().map(|store| store.load_schedule()) {
        Some(Ok(Some(loaded))) => loaded,
        Some(Ok(None)) | None => Schedule::new(),
        Some(Err(e)) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    println!("Gantt Schedule (CLI) - type 'help' for commands\n");
    show(&schedule);

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let mut parts = input.split_whitespace();
        let cmd = parts.next().unwrap_or("");

        match cmd {
            "help" => print_help(),
            "quit" | "exit" => break,
            "show" => show(&schedule),
            "add" | "milestone" => {
                let name = parts.next();
                let date = parse_date(parts.next());
                let duration = if cmd == "add" {
                    parse_duration(schedule.units(), parts.next())
                } else {
                    None
                };
                let parent = parse_id(parts.next());
                let (Some(name), Some(date)) = (name, date) else {
                    println!("Usage: {} <name> <YYYY-MM-DD>{} [parent]", cmd, if cmd == "add" { " <duration>" } else { "" });
                    continue;
                };
                let mut new_task = NewTask::named(name).starting(date);
                if cmd == "milestone" {
                    new_task = new_task.milestone();
                } else if let Some(duration) = duration {
                    new_task = new_task.lasting(duration);
                } else {
                    println!("Invalid duration");
                    continue;
                }
                if let Some(parent) = parent {
                    new_task = new_task.under(parent);
                }
                match schedule.create_task(new_task) {
                    Ok(id) => {
                        println!("Added task id={}", id);
                        show(&schedule);
                    }
                    Err(e) => println!("Error: {}", e),
                }
            }
            "link" => {
                let (Some(dependee), Some(dependant)) = (parse_id(parts.next()), parse_id(parts.next())) else {
                    println!("Usage: link <dependee> <dependant> [FS|SS|FF|SF] [lag] [strict|rubber]");
                    continue;
                };
                let kind = match parts.next() {
                    None => ConstraintKind::FinishStart,
                    Some(code) => match ConstraintKind::from_code(code) {
                        Some(kind) => kind,
                        None => {
                            println!("Invalid constraint (FS|SS|FF|SF)");
                            continue;
                        }
                    },
                };
                let lag: i64 = match parts.next().map(str::parse) {
                    None => 0,
                    Some(Ok(lag)) => lag,
                    Some(Err(_)) => {
                        println!("Invalid lag");
                        continue;
                    }
                };
                let hardness = match parts.next().map(str::to_ascii_lowercase).as_deref() {
                    None | Some("strict") => Hardness::Strict,
                    Some("rubber") => Hardness::Rubber,
                    Some(_) => {
                        println!("Invalid hardness (strict|rubber)");
                        continue;
                    }
                };
                match schedule.add_dependency(dependant, dependee, Constraint::new(kind, lag), hardness) {
                    Ok(id) => {
                        println!("Added dependency id={} ({})", id, schedule.last_report().to_cli_summary());
                        show(&schedule);
                    }
                    Err(e) => println!("Error: {}", e),
                }
            }
            "unlink" => match parts.next().and_then(|s| s.parse::<u32>().ok()) {
                Some(id) => {
                    let result = schedule.remove_dependency(DependencyId(id));
                    report(&schedule, "Dependency removed", result);
                }
                None => println!("Usage: unlink <dependency_id>"),
            },
            "start" | "end" => {
                let (Some(id), Some(date)) = (parse_id(parts.next()), parse_date(parts.next())) else {
                    println!("Usage: {} <id> <YYYY-MM-DD>", cmd);
                    continue;
                };
                let result = if cmd == "start" {
                    schedule.set_start(id, date)
                } else {
                    schedule.set_end(id, date)
                };
                report(&schedule, &format!("{} set", cmd), result);
            }
            "dur" | "shift" => {
                let id = parse_id(parts.next());
                let duration = parse_duration(schedule.units(), parts.next());
                let (Some(id), Some(duration)) = (id, duration) else {
                    println!("Usage: {} <id> <duration>", cmd);
                    continue;
                };
                let result = if cmd == "dur" {
                    schedule.set_duration(id, duration)
                } else {
                    schedule.shift_task(id, &duration)
                };
                report(&schedule, if cmd == "dur" { "Duration set" } else { "Shifted" }, result);
            }
            "pct" => {
                let id = parse_id(parts.next());
                let value = parts.next().and_then(|s| s.parse::<u8>().ok());
                let (Some(id), Some(value)) = (id, value) else {
                    println!("Usage: pct <id> <0-100>");
                    continue;
                };
                let result = schedule.set_completion(id, value);
                report(&schedule, "Completion set", result);
            }
            "parent" => {
                let id = parse_id(parts.next());
                let parent_s = parts.next();
                let (Some(id), Some(parent_s)) = (id, parent_s) else {
                    println!("Usage: parent <id> <parent|none>");
                    continue;
                };
                let parent = if parent_s == "none" {
                    None
                } else {
                    match parse_id(Some(parent_s)) {
                        Some(parent) => Some(parent),
                        None => {
                            println!("Invalid parent");
                            continue;
                        }
                    }
                };
                let result = schedule.move_task(id, parent);
                report(&schedule, "Task moved", result);
            }
            "delete" => match parse_id(parts.next()) {
                Some(id) => {
                    let result = schedule.delete_task(id);
                    report(&schedule, "Task deleted", result);
                }
                None => println!("Usage: delete <id>"),
            },
            "holiday" => match parse_date(parts.next()) {
                Some(date) => {
                    let title = parts.collect::<Vec<_>>().join(" ");
                    let summary = schedule.add_holiday(date, title);
                    report::<std::convert::Infallible>(&schedule, "Holiday added", Ok(summary));
                }
                None => println!("Usage: holiday <YYYY-MM-DD> [title...]"),
            },
            "weekday" => {
                let (Some(day), Some(day_type)) = (parse_weekday(parts.next()), parse_day_type(parts.next())) else {
                    println!("Usage: weekday <mon..sun> <working|weekend|nonworking>");
                    continue;
                };
                let summary = schedule.set_weekday_type(day, day_type);
                report::<std::convert::Infallible>(&schedule, "Weekday set", Ok(summary));
            }
            "critical" => {
                let chain = schedule
                    .critical_path()
                    .chain()
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("->");
                match schedule.critical_path().project_finish() {
                    Some(finish) => println!("critical={} finish={}", chain, finish),
                    None => println!("critical= (empty schedule)"),
                }
            }
            "save" => {
                let target = parts.next().map(JsonFileStore::new).or_else(|| store.clone());
                match target {
                    Some(target) => match target.save_schedule(&schedule) {
                        Ok(()) => println!("Saved to {}", target.path().display()),
                        Err(e) => println!("Error: {}", e),
                    },
                    None => println!("Usage: save <path>"),
                }
            }
            "load" => match parts.next() {
                Some(path) => match JsonFileStore::new(path).load_schedule() {
                    Ok(Some(loaded)) => {
                        schedule = loaded;
                        println!("Loaded {}", path);
                        show(&schedule);
                    }
                    Ok(None) => println!("Error: {} does not exist", path),
                    Err(e) => println!("Error: {}", e),
                },
                None => println!("Usage: load <path>"),
            },
            _ => println!("Unknown command. Type 'help'."),
        }
    }
}
