use damas::board::Color;
use damas::game::{Game, GameResult, UndoInfo};
use damas::moves::movegen::{BestRule, CaptureRule};
use damas::search::eval::weighted_count;
use damas::search::search::{Searcher, TimeLimitedSearcher};
use indicatif::ProgressBar;
use std::io::{self, BufRead, Write};
use std::time::Duration;
use tracing::info;

fn main() {
    damas::logger::init_logging("logs/damas.log", "damas=debug");

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("autoplay") => {
            let games = args
                .get(1)
                .and_then(|arg| arg.parse().ok())
                .unwrap_or(10);
            autoplay(games);
        }
        Some("help") | Some("--help") => {
            println!("usage: damas [autoplay [n]]");
            println!("  (no args)     interactive game against the engine or yourself");
            println!("  autoplay [n]  run n engine-vs-engine games and tally the results");
        }
        _ => interactive(),
    }
}

fn interactive() {
    let mut game = Game::standard(CaptureRule::Mandatory, BestRule::Mandatory);
    let mut history: Vec<UndoInfo> = Vec::new();
    let stdin = io::stdin();

    loop {
        println!("{}", game.board());

        let result = game.result();
        if result.is_over() {
            match result.winner() {
                Some(winner) => println!("The winner is {winner}!"),
                None => println!("It's a draw, no one wins"),
            }
        } else {
            println!("It's {}'s turn", game.to_play());
        }

        let plies = game.plies().to_vec();
        for (index, ply) in plies.iter().enumerate() {
            println!("[{index:2}]: {ply}");
        }
        if !history.is_empty() {
            println!("[ u]: undo last ply");
        }
        if !result.is_over() {
            println!("[ai]: let the engine pick");
        }
        println!("[ q]: quit");

        print!("Your choice: ");
        let _ = io::stdout().flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }

        match line.trim() {
            "q" => break,
            "u" => {
                if let Some(undo) = history.pop() {
                    game.undo_ply(undo);
                }
            }
            "ai" if !result.is_over() => {
                let searcher = TimeLimitedSearcher {
                    to_max: game.to_play(),
                    heuristic: weighted_count,
                    time_limit: Duration::from_millis(1000),
                };
                match searcher.search(&mut game) {
                    Some(ply) => {
                        info!(%ply, "engine move");
                        println!("The engine plays {ply}");
                        apply(&mut game, &ply, &mut history);
                    }
                    None => println!("The engine has no move to make"),
                }
            }
            text => match text.parse::<usize>() {
                Ok(index) if index < plies.len() => {
                    apply(&mut game, &plies[index], &mut history);
                }
                _ => println!("Invalid choice, try again"),
            },
        }
    }
}

fn apply(game: &mut Game, ply: &damas::moves::types::Ply, history: &mut Vec<UndoInfo>) {
    match game.do_ply(ply) {
        Ok(undo) => history.push(undo),
        Err(err) => eprintln!("could not play {ply}: {err}"),
    }
}

fn autoplay(games: u32) {
    let white = TimeLimitedSearcher {
        to_max: Color::White,
        heuristic: weighted_count,
        time_limit: Duration::from_millis(400),
    };
    let black = TimeLimitedSearcher {
        to_max: Color::Black,
        heuristic: weighted_count,
        time_limit: Duration::from_millis(400),
    };

    let bar = ProgressBar::new(u64::from(games));
    let mut white_wins = 0u32;
    let mut black_wins = 0u32;
    let mut draws = 0u32;

    for game_number in 1..=games {
        let mut game = Game::standard(CaptureRule::Mandatory, BestRule::Mandatory);
        let result = loop {
            let result = game.result();
            if result.is_over() {
                break result;
            }
            let searcher: &dyn Searcher = if game.to_play() == Color::White {
                &white
            } else {
                &black
            };
            let Some(ply) = searcher.search(&mut game) else {
                break game.result();
            };
            if let Err(err) = game.do_ply(&ply) {
                eprintln!("game {game_number} aborted: {err}");
                break game.result();
            }
        };

        info!(game_number, %result, "autoplay game finished");
        match result {
            GameResult::WhiteWon => white_wins += 1,
            GameResult::BlackWon => black_wins += 1,
            _ => draws += 1,
        }
        bar.inc(1);
    }

    bar.finish();
    println!("white won: {white_wins}");
    println!("black won: {black_wins}");
    println!("draws:     {draws}");
}
