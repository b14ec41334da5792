//! Console commands read from stdin

use ap_core::LocationId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Report found locations
    Check(Vec<LocationId>),
    /// Ask what the locations hold, optionally announcing them as hints
    Scout { locations: Vec<LocationId>, hint: bool },
    Goal,
    Status,
    Connect,
    Disconnect,
    Quit,
}

/// Console input that is not a command
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("not a location id: {0}")]
    BadLocation(String),

    #[error("usage: {0} <location id>...")]
    MissingLocations(String),

    #[error("unknown command: {0}")]
    UnknownCommand(String),
}

fn parse_ids<'a>(words: impl Iterator<Item = &'a str>) -> Result<Vec<LocationId>, ParseError> {
    words
        .map(|w| {
            w.trim_end_matches(',')
                .parse()
                .map_err(|_| ParseError::BadLocation(w.to_string()))
        })
        .collect()
}

/// Parse one input line; blank lines yield `None`
pub fn parse(line: &str) -> Result<Option<Command>, ParseError> {
    let mut words = line.split_whitespace();
    let Some(first) = words.next() else {
        return Ok(None);
    };

    let command = match first {
        "!scout" | "!hint" => {
            let locations = parse_ids(words)?;
            if locations.is_empty() {
                return Err(ParseError::MissingLocations(first.to_string()));
            }
            Command::Scout {
                locations,
                hint: first == "!hint",
            }
        }
        "!goal" => Command::Goal,
        "!status" => Command::Status,
        "!connect" => Command::Connect,
        "!disconnect" => Command::Disconnect,
        "!quit" | "!exit" => Command::Quit,
        other if other.starts_with('!') => {
            return Err(ParseError::UnknownCommand(other.to_string()));
        }
        _ => Command::Check(parse_ids(line.split_whitespace())?),
    };
    Ok(Some(command))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_ids_are_checks() {
        assert_eq!(parse("12345").unwrap(), Some(Command::Check(vec![12345])));
        assert_eq!(
            parse(" 1, 2 3 ").unwrap(),
            Some(Command::Check(vec![1, 2, 3]))
        );
        assert_eq!(parse("   ").unwrap(), None);
    }

    #[test]
    fn test_bang_commands() {
        assert_eq!(
            parse("!hint 7 8").unwrap(),
            Some(Command::Scout {
                locations: vec![7, 8],
                hint: true
            })
        );
        assert_eq!(parse("!goal").unwrap(), Some(Command::Goal));
        assert_eq!(parse("!exit").unwrap(), Some(Command::Quit));
    }

    #[test]
    fn test_bad_input() {
        assert_eq!(
            parse("!scout").unwrap_err(),
            ParseError::MissingLocations("!scout".into())
        );
        assert_eq!(
            parse("!teleport").unwrap_err().to_string(),
            "unknown command: !teleport"
        );
        assert_eq!(
            parse("12 abc").unwrap_err().to_string(),
            "not a location id: abc"
        );
    }
}
