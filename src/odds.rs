use crate::error::FeatureError;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Number of opponent-count columns in the odds table
const OPPONENT_BUCKETS: usize = 9;

/// Static lookup of pre-computed preflop equity
///
/// Maps a canonical 2-card label ("AKo", "77") to its equity against
/// 1..=9 random opponents. Loaded once at startup from a tab-separated
/// table with a header line.
#[derive(Debug, Default)]
pub struct PreflopOddsTable {
    rows: HashMap<String, [f64; OPPONENT_BUCKETS]>,
}

impl PreflopOddsTable {
    /// Loads the table from a tab-separated file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, FeatureError> {
        Self::from_reader(BufReader::new(File::open(path)?))
    }

    /// Parses the table from any buffered reader
    ///
    /// The first line is a header; each following line is a label plus
    /// nine equity columns
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, FeatureError> {
        let mut rows = HashMap::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if i == 0 || line.trim().is_empty() {
                continue;
            }
            let mut fields = line.split('\t');
            let label = fields
                .next()
                .ok_or_else(|| FeatureError::MalformedRecord(format!("odds line {}", i + 1)))?
                .to_string();
            let mut odds = [0f64; OPPONENT_BUCKETS];
            for (j, slot) in odds.iter_mut().enumerate() {
                let field = fields.next().ok_or_else(|| {
                    FeatureError::MalformedRecord(format!("odds line {} column {}", i + 1, j + 2))
                })?;
                *slot = field.trim().parse::<f64>().map_err(|_| {
                    FeatureError::MalformedRecord(format!("odds line {} column {}", i + 1, j + 2))
                })?;
            }
            rows.insert(label, odds);
        }
        Ok(PreflopOddsTable { rows })
    }

    /// Equity of a canonical starting-hand label against `opponents`
    /// random opponents
    ///
    /// Unknown labels and an opponent count of zero yield 0; larger
    /// counts are clamped to the table's 1..=9 columns
    pub fn lookup(&self, label: &str, opponents: usize) -> f64 {
        if opponents == 0 {
            return 0.0;
        }
        let bucket = opponents.min(OPPONENT_BUCKETS);
        match self.rows.get(label) {
            Some(odds) => odds[bucket - 1],
            None => 0.0,
        }
    }

    /// Number of labels in the table
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
