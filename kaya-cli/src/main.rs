//! kaya: CLI driver for the engine core.
//!
//! Subcommands:
//! - bench        self-play over the built-in uniform model
//! - show-config  print the effective configuration

use std::process;
use std::sync::Arc;
use std::time::Instant;

use kaya_core::color::color_name;
use kaya_core::{Board, Config, Criterion, SearchRule, BLACK};
use kaya_infer::{Inference, InferenceService, Model, UniformModel};
use kaya_logging::{now_ms, InferStatsEventV1, MoveEventV1, NdjsonWriter};
use kaya_player::{Candidate, Player, PlayerConfig};

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();

    match args.first().map(String::as_str) {
        Some("bench") => cmd_bench(&args[1..]),
        Some("show-config") => cmd_show_config(&args[1..]),
        Some("--help") | Some("-h") | None => print_help(),
        Some(other) => {
            eprintln!("Unknown command: {other}");
            eprintln!("Run `kaya --help` for usage.");
            process::exit(1);
        }
    }
}

fn print_help() {
    eprintln!(
        r#"kaya - Go engine core driver

USAGE:
    kaya <COMMAND> [OPTIONS]

COMMANDS:
    bench          Run a self-play benchmark over the uniform model
    show-config    Print the effective configuration as YAML

Run `kaya <COMMAND> --help` for command options.
"#
    );
}

struct BenchOptions {
    config: Config,
    moves: u32,
    log_path: Option<String>,
}

fn parse_bench_options(args: &[String]) -> BenchOptions {
    let mut config = Config::default();
    let mut moves: u32 = 40;
    let mut log_path: Option<String> = None;

    let mut i = 0usize;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                println!(
                    r#"kaya bench

USAGE:
    kaya bench [--config PATH] [--moves N] [--visits N] [--threads N]
               [--boardsize N] [--log PATH]

OPTIONS:
    --config PATH   Load a YAML config (defaults apply otherwise)
    --moves N       Maximum moves to play (default: 40)
    --visits N      Override search.visits
    --threads N     Override search.threads
    --boardsize N   Override game.boardsize
    --log PATH      Append NDJSON move events to PATH
"#
                );
                process::exit(0);
            }
            "--config" => {
                let value = take_value(args, &mut i, "--config");
                config = Config::load(&value).unwrap_or_else(|err| {
                    eprintln!("Failed to load {value}: {err}");
                    process::exit(1);
                });
            }
            "--moves" => {
                moves = parse_number(args, &mut i, "--moves");
            }
            "--visits" => {
                config.search.visits = parse_number(args, &mut i, "--visits");
            }
            "--threads" => {
                config.search.threads = parse_number(args, &mut i, "--threads");
            }
            "--boardsize" => {
                config.game.boardsize = parse_number(args, &mut i, "--boardsize");
            }
            "--log" => {
                log_path = Some(take_value(args, &mut i, "--log"));
            }
            other => {
                eprintln!("Unknown option for `kaya bench`: {other}");
                eprintln!("Run `kaya bench --help` for usage.");
                process::exit(1);
            }
        }
        i += 1;
    }

    if let Err(err) = config.validate() {
        eprintln!("{err}");
        process::exit(1);
    }

    BenchOptions {
        config,
        moves,
        log_path,
    }
}

fn take_value(args: &[String], i: &mut usize, flag: &str) -> String {
    if *i + 1 >= args.len() {
        eprintln!("Missing value for {flag}");
        process::exit(1);
    }
    *i += 1;
    args[*i].clone()
}

fn parse_number<T: std::str::FromStr>(args: &[String], i: &mut usize, flag: &str) -> T {
    let value = take_value(args, i, flag);
    value.parse().unwrap_or_else(|_| {
        eprintln!("Invalid {flag} value: {value}");
        process::exit(1);
    })
}

fn cmd_show_config(args: &[String]) {
    let mut config = Config::default();
    if let Some(path) = args.first() {
        config = Config::load(path).unwrap_or_else(|err| {
            eprintln!("Failed to load {path}: {err}");
            process::exit(1);
        });
    }
    match serde_yaml_string(&config) {
        Ok(yaml) => println!("{yaml}"),
        Err(err) => {
            eprintln!("Failed to render config: {err}");
            process::exit(1);
        }
    }
}

fn serde_yaml_string(config: &Config) -> Result<String, String> {
    serde_yaml::to_string(config).map_err(|e| e.to_string())
}

fn cmd_bench(args: &[String]) {
    let options = parse_bench_options(args);
    let config = &options.config;

    let service = Arc::new(
        InferenceService::new(
            &config.inference.gpus,
            config.inference.threads_per_gpu,
            config.inference.batch_size,
            |_| Ok(Box::new(UniformModel) as Box<dyn Model>),
        )
        .unwrap_or_else(|err| {
            eprintln!("Failed to start inference service: {err}");
            process::exit(1);
        }),
    );

    let player = Player::new(
        Arc::clone(&service) as Arc<dyn Inference>,
        PlayerConfig::from_config(config),
    )
        .unwrap_or_else(|err| {
            eprintln!("Failed to start player: {err}");
            process::exit(1);
        });

    let mut log = options.log_path.as_ref().map(|path| {
        NdjsonWriter::open_append_with_flush(path, 16).unwrap_or_else(|err| {
            eprintln!("Failed to open {path}: {err}");
            process::exit(1);
        })
    });

    println!(
        "bench: {}x{} board, {} visits, {} threads, batch {}",
        config.game.boardsize,
        config.game.boardsize,
        config.search.visits,
        config.search.threads,
        config.inference.batch_size,
    );

    let search = &config.search;
    let mut passes_in_a_row = 0u32;

    for turn in 0..options.moves {
        let started = Instant::now();

        let candidate = if turn < search.initial_turn {
            player.get_random(search.temperature).remove(0)
        } else {
            player.start_evaluation(
                false,
                search.search == SearchRule::Ucb1,
                search.width,
                search.temperature,
                search.randomness,
            );
            player.wait_evaluation(
                search.visits as i64,
                search.playouts as i64,
                search.timelimit,
                !search.ponder,
            );

            let candidates = player.get_candidates();
            let best = match search.criterion {
                Criterion::Visits => candidates.iter().max_by_key(|c| c.visits),
                Criterion::Lcb => candidates.iter().max_by(|a, b| {
                    a.win_chance_lcb().total_cmp(&b.win_chance_lcb())
                }),
            };
            match best {
                Some(best) => best.clone(),
                None => break,
            }
        };

        // Resignation check after the opening.
        if turn >= search.min_turn && candidate.win_chance() < search.resign {
            println!(
                "turn {turn}: {} resigns ({:.1}% win chance)",
                color_name(candidate.color),
                candidate.win_chance() * 100.0
            );
            break;
        }

        let captured = player.play(candidate.x, candidate.y);
        passes_in_a_row = if candidate.is_pass() {
            passes_in_a_row + 1
        } else {
            0
        };

        println!(
            "turn {turn}: {} {} visits={} playouts={} value={:+.3} captured={} ({} ms)",
            color_name(candidate.color),
            move_name(&candidate),
            candidate.visits,
            candidate.playouts,
            candidate.value,
            captured.max(0),
            started.elapsed().as_millis(),
        );

        if let Some(log) = log.as_mut() {
            let event = MoveEventV1 {
                event: "move_v1",
                ts_ms: now_ms(),
                engine_version: kaya_player::VERSION,
                turn,
                color: candidate.color,
                x: candidate.x,
                y: candidate.y,
                visits: candidate.visits,
                playouts: candidate.playouts,
                value: candidate.value,
                win_chance: candidate.win_chance(),
                elapsed_ms: started.elapsed().as_millis() as u64,
            };
            if let Err(err) = log.write_event(&event) {
                eprintln!("Failed to write log event: {err}");
            }
        }

        if passes_in_a_row >= 2 {
            println!("turn {turn}: both sides passed");
            break;
        }
    }

    let mut board = Board::new(config.game.boardsize, config.game.boardsize);
    board.load_state(&player.get_board_state());
    print!("{board}");

    let owners = board.get_owners(BLACK, config.game.rule);
    let score: i32 = owners.iter().map(|&o| o as i32).sum();
    println!(
        "area score (black-positive, before komi): {score:+}, komi {}",
        config.game.komi
    );

    let stats = service.stats_snapshot();
    println!(
        "inference: {} forwards, {} rows, {} errors",
        stats.forwards, stats.rows, stats.errors
    );

    if let Some(log) = log.as_mut() {
        let event = InferStatsEventV1 {
            event: "infer_stats_v1",
            ts_ms: now_ms(),
            forwards: stats.forwards,
            rows: stats.rows,
            errors: stats.errors,
        };
        let _ = log.write_event(&event);
        let _ = log.flush();
    }
}

fn move_name(candidate: &Candidate) -> String {
    if candidate.is_pass() {
        "pass".to_string()
    } else {
        format!("({},{})", candidate.x, candidate.y)
    }
}
