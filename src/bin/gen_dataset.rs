use clap::Clap;
use poker_features::cleaner::{CleanedRow, FeatureCleaner, PrivateRow};
use poker_features::equity::HandEquityCache;
use poker_features::error::FeatureError;
use poker_features::features::FeatureRecord;
use poker_features::odds::PreflopOddsTable;
use poker_features::record::GameRecord;
use poker_features::replay::GameReplayer;
use poker_features::scores::PlayerScoreTable;
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clap)]
#[clap(version = "1.0")]
struct Opts {
    /// Directory holding one recorded game per .json file
    games_dir: String,
    #[clap(short, long, default_value = "data")]
    output_dir: String,
    #[clap(long, default_value = "data/preflop_odds.txt")]
    odds_table: String,
    #[clap(long, default_value = "data/equity_cache.json")]
    equity_cache: String,
    /// Observe only seats with these names; games without a match are
    /// skipped entirely
    #[clap(long)]
    names: Vec<String>,
    /// Observe only the N best-scoring players from the tournament's
    /// players.csv; without that file every seat is observed
    #[clap(long)]
    top: Option<usize>,
}

/// Replays a directory of recorded games into features.csv/labels.csv
fn main() -> Result<(), FeatureError> {
    tracing_subscriber::fmt::init();
    let opts: Opts = Opts::parse();

    let odds = Arc::new(PreflopOddsTable::load(&opts.odds_table)?);
    let equity = Arc::new(HandEquityCache::load(&opts.equity_cache)?);
    let scores = PlayerScoreTable::load(Path::new(&opts.games_dir).join("players.csv"))?;
    let observed: Vec<String> = if !opts.names.is_empty() {
        opts.names.clone()
    } else {
        opts.top.map(|n| scores.top(n)).unwrap_or_default()
    };

    let mut paths: Vec<PathBuf> = std::fs::read_dir(&opts.games_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().map_or(false, |ext| ext == "json"))
        .collect();
    paths.sort();
    info!("replaying {} games from {}", paths.len(), opts.games_dir);

    let records: Vec<FeatureRecord> = paths
        .par_iter()
        .enumerate()
        .filter_map(|(i, path)| {
            match replay_game(i as i64, path, &observed, &scores, &equity) {
                Ok(records) => records,
                Err(err) => {
                    warn!("skipping {:?}: {}", path, err);
                    None
                }
            }
        })
        .flatten()
        .collect();
    info!("captured {} records", records.len());

    let cleaner = FeatureCleaner::new(odds);
    let (rows, labels) = cleaner.clean_all(&records);

    let out = Path::new(&opts.output_dir);
    std::fs::create_dir_all(out)?;
    write_features(&out.join("features.csv"), &rows)?;
    write_labels(&out.join("labels.csv"), &labels)?;
    equity.save(&opts.equity_cache)?;
    info!("wrote {} feature rows and {} label rows", rows.len(), labels.len());
    Ok(())
}

/// Replays one recorded game; None when the observer filter matched no
/// seat. Seat names are canonicalized through the score table before
/// matching, as the ranking file keys users rather than bot names.
fn replay_game(
    game_num: i64,
    path: &Path,
    observed: &[String],
    scores: &PlayerScoreTable,
    equity: &Arc<HandEquityCache>,
) -> Result<Option<Vec<FeatureRecord>>, FeatureError> {
    let mut game: GameRecord = serde_json::from_reader(BufReader::new(File::open(path)?))?;
    if !observed.is_empty() {
        let mut any = false;
        for seat in &mut game.seats {
            let name = scores.canonical_name(&seat.name).to_string();
            seat.top_player = observed.contains(&name);
            seat.name = name;
            any |= seat.top_player;
        }
        if !any {
            return Ok(None);
        }
    }
    let mut replayer = GameReplayer::new(Arc::clone(equity));
    // files are numbered deterministically so workers agree on game_num
    replayer.set_game_counter(game_num - 1);
    if !observed.is_empty() {
        replayer.filter_seats(|seat| seat.top_player);
    }
    replayer.replay(&game)?;
    Ok(Some(replayer.into_records()))
}

fn write_features(path: &Path, rows: &[CleanedRow]) -> Result<(), FeatureError> {
    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(writer, "{}", CleanedRow::columns().join(","))?;
    for row in rows {
        let values: Vec<String> = row.values().iter().map(|v| v.to_string()).collect();
        writeln!(writer, "{}", values.join(","))?;
    }
    Ok(())
}

fn write_labels(path: &Path, labels: &[PrivateRow]) -> Result<(), FeatureError> {
    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(writer, "{}", PrivateRow::columns().join(","))?;
    for label in labels {
        writeln!(writer, "{}", label.values().join(","))?;
    }
    Ok(())
}
