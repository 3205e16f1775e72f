//! Line-oriented operator commands

use gridwatch_core::admin::UnknownCommand;
use gridwatch_core::{AdminCommand, DeviceId, Slider};
use thiserror::Error;

pub const HELP: &str = "\
commands:
  token <value>           set the operator token (panel closed only)
  submit                  open the control panel, or close it when open
  target <device-id>      select the device the sliders act on
  drag power|voltage <n>  move a slider without sending (preview only)
  set power|voltage <n>   release a slider and send the value
  admin-token <value>     set the admin token
  unlock                  insert the admin key
  admin <command>         shutdown | isolate | compromise_all
  refresh                 poll now
  dismiss <n>             dismiss notification n
  status                  show panel and admin state
  help                    this text
  quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Token(String),
    Submit,
    Target(DeviceId),
    Drag { slider: Slider, value: u8 },
    Set { slider: Slider, value: u8 },
    AdminToken(String),
    Unlock,
    Admin(AdminCommand),
    Refresh,
    Dismiss(usize),
    Status,
    Help,
    Quit,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("empty input")]
    Empty,
    #[error("unknown command '{0}', try 'help'")]
    UnknownCommand(String),
    #[error("'{0}' needs an argument")]
    MissingArgument(&'static str),
    #[error("unknown slider '{0}', expected power or voltage")]
    UnknownSlider(String),
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
    #[error(transparent)]
    UnknownAdmin(#[from] UnknownCommand),
}

fn parse_slider(word: Option<&str>) -> Result<Slider, InputError> {
    match word {
        Some(w) if w.eq_ignore_ascii_case("power") => Ok(Slider::Power),
        Some(w) if w.eq_ignore_ascii_case("voltage") => Ok(Slider::Voltage),
        Some(w) => Err(InputError::UnknownSlider(w.to_string())),
        None => Err(InputError::MissingArgument("slider")),
    }
}

fn parse_number<T: std::str::FromStr>(word: Option<&str>, what: &'static str) -> Result<T, InputError> {
    let word = word.ok_or(InputError::MissingArgument(what))?;
    word.parse()
        .map_err(|_| InputError::InvalidNumber(word.to_string()))
}

impl std::str::FromStr for Command {
    type Err = InputError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };
        let mut args = rest.split_whitespace();

        match verb.to_ascii_lowercase().as_str() {
            "" => Err(InputError::Empty),
            // Tokens may legitimately be blank to clear the field
            "token" => Ok(Command::Token(rest.to_string())),
            "admin-token" => Ok(Command::AdminToken(rest.to_string())),
            "submit" | "toggle" => Ok(Command::Submit),
            "target" => args
                .next()
                .map(|id| Command::Target(DeviceId::new(id)))
                .ok_or(InputError::MissingArgument("target")),
            "drag" => {
                let slider = parse_slider(args.next())?;
                let value = parse_number(args.next(), "drag")?;
                Ok(Command::Drag { slider, value })
            }
            "set" => {
                let slider = parse_slider(args.next())?;
                let value = parse_number(args.next(), "set")?;
                Ok(Command::Set { slider, value })
            }
            "unlock" => Ok(Command::Unlock),
            "admin" => {
                let name = args.next().ok_or(InputError::MissingArgument("admin"))?;
                Ok(Command::Admin(name.parse()?))
            }
            "refresh" => Ok(Command::Refresh),
            "dismiss" => Ok(Command::Dismiss(parse_number(args.next(), "dismiss")?)),
            "status" => Ok(Command::Status),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(InputError::UnknownCommand(other.to_string())),
        }
    }
}

/// Reading of an answer to a confirmation prompt
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_slider_commands() {
        assert_eq!(
            "drag power 90".parse::<Command>().unwrap(),
            Command::Drag {
                slider: Slider::Power,
                value: 90
            }
        );
        assert_eq!(
            "SET Voltage 30".parse::<Command>().unwrap(),
            Command::Set {
                slider: Slider::Voltage,
                value: 30
            }
        );
    }

    #[test]
    fn test_parse_tokens_keep_inner_text() {
        assert_eq!(
            "token  abc def ".parse::<Command>().unwrap(),
            Command::Token("abc def".to_string())
        );
        assert_eq!(
            "token".parse::<Command>().unwrap(),
            Command::Token(String::new())
        );
    }

    #[test]
    fn test_parse_admin() {
        assert_eq!(
            "admin compromise_all".parse::<Command>().unwrap(),
            Command::Admin(AdminCommand::CompromiseAll)
        );
        assert!(matches!(
            "admin reboot".parse::<Command>(),
            Err(InputError::UnknownAdmin(_))
        ));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<Command>(), Err(InputError::Empty));
        assert_eq!(
            "target".parse::<Command>(),
            Err(InputError::MissingArgument("target"))
        );
        assert_eq!(
            "drag fan 10".parse::<Command>(),
            Err(InputError::UnknownSlider("fan".to_string()))
        );
        assert_eq!(
            "set power 300".parse::<Command>(),
            Err(InputError::InvalidNumber("300".to_string()))
        );
        assert_eq!(
            "reboot".parse::<Command>(),
            Err(InputError::UnknownCommand("reboot".to_string()))
        );
    }

    #[test]
    fn test_affirmative() {
        assert!(is_affirmative(" YES "));
        assert!(is_affirmative("y"));
        assert!(!is_affirmative(""));
        assert!(!is_affirmative("no"));
    }
}
