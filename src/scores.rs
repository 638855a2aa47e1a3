//! Tournament player-score metadata
//!
//! Tournaments ship an optional `players.csv` ranking users by score.
//! The dataset generator uses it to canonicalize recorded seat names
//! (bot name -> user id) and to pick the top-N users as observers. A
//! missing file is not an error: filtering degrades to include-all.

use crate::error::FeatureError;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::info;

/// Score-ranked player metadata, keyed by recorded bot name
#[derive(Debug, Default)]
pub struct PlayerScoreTable {
    users_by_bot: HashMap<String, String>,
    /// user ids in file order, best score first
    ranked: Vec<String>,
}

impl PlayerScoreTable {
    /// Loads the ranking; a missing file yields an empty table
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, FeatureError> {
        let path = path.as_ref();
        if !path.exists() {
            info!("no player ranking at {:?}, observing all seats", path);
            return Ok(Self::default());
        }
        Self::from_reader(BufReader::new(File::open(path)?))
    }

    /// Parses the ranking from any buffered reader
    ///
    /// The first line is a header; each following line is
    /// `user,bot_name,score,final_stack,games`, ordered best first
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, FeatureError> {
        let mut table = Self::default();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if i == 0 || line.trim().is_empty() {
                continue;
            }
            let mut fields = line.split(',');
            let user = fields
                .next()
                .filter(|f| !f.trim().is_empty())
                .ok_or_else(|| FeatureError::MalformedRecord(format!("players line {}", i + 1)))?
                .trim()
                .to_string();
            let bot_name = fields
                .next()
                .ok_or_else(|| FeatureError::MalformedRecord(format!("players line {}", i + 1)))?
                .trim()
                .to_string();
            table.users_by_bot.insert(bot_name, user.clone());
            table.ranked.push(user);
        }
        Ok(table)
    }

    /// The user id a recorded bot name belongs to, or the name itself
    /// when no ranking is loaded
    pub fn canonical_name<'a>(&'a self, bot_name: &'a str) -> &'a str {
        self.users_by_bot
            .get(bot_name)
            .map(String::as_str)
            .unwrap_or(bot_name)
    }

    /// The best-scoring `n` user ids; empty when no ranking is loaded
    pub fn top(&self, n: usize) -> Vec<String> {
        self.ranked.iter().take(n).cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }
}
