//! Line commands read from stdin.

use geoguide_geo::{CoordParseError, Position};
use geoguide_pins::{PinEdit, PinId};
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// A position fix typed as `lat, lng`.
    MoveTo(Position),
    /// Simulate the position source failing.
    Lost,
    Start,
    Toggle,
    Restart,
    /// Simulate an audio failure on the loaded narration.
    Fail,
    Status,
    Pins,
    Edit(PinEdit),
    Reset,
    Help,
    Quit,
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("unknown command: {0} (try 'help')")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error(transparent)]
    Coordinates(#[from] CoordParseError),
    #[error("invalid radius: {0}")]
    Radius(String),
}

const SET_USAGE: &str = "set <pin-id> coords <lat, lng> | radius <meters> | label <text>";

pub const HELP: &str = "\
commands:
  <lat>, <lng>       report a position fix
  lost               report a position error
  start              start the tour
  toggle             play or pause the active narration
  restart            play the active narration from the beginning
  fail               simulate an audio error
  status             show the current snapshot
  pins               list the stored pins
  set <pin-id> coords <lat, lng> | radius <meters> | label <text>
  reset              restore the default tour
  quit";

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word {
            "start" => Command::Start,
            "toggle" | "play" | "pause" => Command::Toggle,
            "restart" => Command::Restart,
            "lost" => Command::Lost,
            "fail" => Command::Fail,
            "status" => Command::Status,
            "pins" => Command::Pins,
            "reset" => Command::Reset,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            "set" => Command::Edit(parse_edit(rest)?),
            _ if line.contains(',') => Command::MoveTo(line.parse()?),
            _ => return Err(CommandError::Unknown(word.to_string())),
        };
        Ok(command)
    }
}

fn parse_edit(args: &str) -> Result<PinEdit, CommandError> {
    let mut parts = args.splitn(3, char::is_whitespace);
    let (Some(id), Some(field), Some(value)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(CommandError::Usage(SET_USAGE));
    };
    let id = PinId::new(id);
    let value = value.trim();

    match field {
        "coords" => Ok(PinEdit::SetCoordinates {
            id,
            position: value.parse()?,
        }),
        "radius" => {
            let meters = value
                .parse()
                .map_err(|_| CommandError::Radius(value.to_string()))?;
            Ok(PinEdit::SetRadius { id, meters })
        }
        "label" => Ok(PinEdit::SetLabel {
            id,
            label: value.to_string(),
        }),
        _ => Err(CommandError::Usage(SET_USAGE)),
    }
}
