//! Non-music slash commands.

use rand::{seq::SliceRandom, Rng};
use regex::Regex;

use crate::error::DiceError;

pub const MAX_DICE: u32 = 100;
pub const MAX_FACES: u32 = 1000;

/// A parsed `NdN` roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dice {
    pub count: u32,
    pub faces: u32,
}

pub fn add(left: i64, right: i64) -> String {
    left.saturating_add(right).to_string()
}

pub fn parse_dice(notation: &str) -> Result<Dice, DiceError> {
    let pattern = Regex::new(r"^\s*(\d+)\s*[dD]\s*(\d+)\s*$").map_err(|_| DiceError::Format)?;
    let captures = pattern.captures(notation).ok_or(DiceError::Format)?;
    let count: u32 = captures[1].parse().map_err(|_| DiceError::Format)?;
    let faces: u32 = captures[2].parse().map_err(|_| DiceError::Format)?;

    if !(1..=MAX_DICE).contains(&count) {
        return Err(DiceError::TooManyDice {
            got: count,
            max: MAX_DICE,
        });
    }
    if !(1..=MAX_FACES).contains(&faces) {
        return Err(DiceError::TooManyFaces {
            got: faces,
            max: MAX_FACES,
        });
    }

    Ok(Dice { count, faces })
}

/// Rolls `NdN` dice and joins the results with ", ".
pub fn roll<R: Rng + ?Sized>(notation: &str, rng: &mut R) -> String {
    match parse_dice(notation) {
        Ok(dice) => (0..dice.count)
            .map(|_| rng.gen_range(1..=dice.faces).to_string())
            .collect::<Vec<_>>()
            .join(", "),
        Err(e) => e.to_string(),
    }
}

/// Picks one of the whitespace-separated choices.
pub fn choose<R: Rng + ?Sized>(choices: &str, rng: &mut R) -> String {
    let options: Vec<&str> = choices.split_whitespace().collect();
    match options.choose(rng) {
        Some(choice) => choice.to_string(),
        None => "Nothing to choose from.".to_string(),
    }
}

/// Messages to post for `repeat`; `times` is capped at `max`.
pub fn repeat(times: i64, content: &str, max: usize) -> Vec<String> {
    let times = usize::try_from(times).unwrap_or(0).min(max);
    vec![content.to_string(); times]
}

pub fn cool(subject: &str) -> String {
    if subject.trim().eq_ignore_ascii_case("bot") {
        "Yes, the bot is cool.".to_string()
    } else {
        format!("No, {} is not cool", subject.trim())
    }
}

pub fn joined(name: &str, timestamp: &str) -> String {
    format!("{name} joined in {timestamp}")
}
