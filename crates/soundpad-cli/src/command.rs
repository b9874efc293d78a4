//! Line commands understood by the console front-end

use std::path::PathBuf;
use std::str::FromStr;

use soundpad_core::MixMode;

pub const HELP: &str = "\
Commands:
  list                 loaded clips
  inputs | outputs     available devices (* = selected)
  play <id>            trigger a clip
  stop                 stop playback and close the gate
  gate open|close      push-to-talk
  seek <seconds>       move within the playing clip
  gain <0..1>          clip output gain
  mode mixed|pure      mix the microphone under clips or not
  input <name>         select microphone
  output <name>        select (virtual) output device
  start | halt         open / close the audio streams
  status               engine state and microphone level
  load <id> <path>     decode a file and add it to the manifest
  unload <id>          remove a clip from the manifest
  help | quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    List,
    Inputs,
    Outputs,
    Play(String),
    Stop,
    Gate(bool),
    Seek(f64),
    Gain(f32),
    Mode(MixMode),
    Input(String),
    Output(String),
    Start,
    Halt,
    Status,
    Load { id: String, path: PathBuf },
    Unload(String),
    Help,
    Quit,
}

fn required<'a>(arg: &'a str, usage: &str) -> Result<&'a str, String> {
    if arg.is_empty() {
        Err(format!("usage: {}", usage))
    } else {
        Ok(arg)
    }
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word.to_ascii_lowercase().as_str() {
            "list" | "ls" => Command::List,
            "inputs" => Command::Inputs,
            "outputs" => Command::Outputs,
            "play" => Command::Play(required(rest, "play <id>")?.to_string()),
            "stop" => Command::Stop,
            "gate" => match rest.to_ascii_lowercase().as_str() {
                "open" | "on" => Command::Gate(true),
                "close" | "off" => Command::Gate(false),
                _ => return Err("usage: gate open|close".to_string()),
            },
            "seek" => {
                let seconds = required(rest, "seek <seconds>")?;
                Command::Seek(
                    seconds
                        .parse()
                        .map_err(|_| format!("invalid position '{}'", seconds))?,
                )
            }
            "gain" => {
                let gain = required(rest, "gain <0..1>")?;
                Command::Gain(
                    gain.parse()
                        .map_err(|_| format!("invalid gain '{}'", gain))?,
                )
            }
            "mode" => Command::Mode(required(rest, "mode mixed|pure")?.parse()?),
            "input" => Command::Input(required(rest, "input <name>")?.to_string()),
            "output" => Command::Output(required(rest, "output <name>")?.to_string()),
            "start" => Command::Start,
            "halt" => Command::Halt,
            "status" => Command::Status,
            "load" => {
                let usage = "load <id> <path>";
                let (id, path) = required(rest, usage)?
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| format!("usage: {}", usage))?;
                Command::Load {
                    id: id.to_string(),
                    path: PathBuf::from(path.trim()),
                }
            }
            "unload" => Command::Unload(required(rest, "unload <id>")?.to_string()),
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            "" => return Err(String::new()),
            other => return Err(format!("unknown command '{}' (try 'help')", other)),
        };
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Result<Command, String> {
        line.parse()
    }

    #[test]
    fn test_simple_commands() {
        assert_eq!(parse("list"), Ok(Command::List));
        assert_eq!(parse("  STOP "), Ok(Command::Stop));
        assert_eq!(parse("halt"), Ok(Command::Halt));
        assert_eq!(parse("quit"), Ok(Command::Quit));
    }

    #[test]
    fn test_arguments() {
        assert_eq!(parse("play airhorn"), Ok(Command::Play("airhorn".to_string())));
        assert_eq!(parse("gate open"), Ok(Command::Gate(true)));
        assert_eq!(parse("gate close"), Ok(Command::Gate(false)));
        assert_eq!(parse("seek 1.25"), Ok(Command::Seek(1.25)));
        assert_eq!(parse("gain 0.8"), Ok(Command::Gain(0.8)));
        assert_eq!(parse("mode Pure"), Ok(Command::Mode(MixMode::Pure)));
    }

    #[test]
    fn test_names_keep_spaces() {
        assert_eq!(
            parse("output CABLE Input (VB-Audio Virtual Cable)"),
            Ok(Command::Output("CABLE Input (VB-Audio Virtual Cable)".to_string()))
        );
        assert_eq!(
            parse("load horn /home/me/My Sounds/horn.wav"),
            Ok(Command::Load {
                id: "horn".to_string(),
                path: PathBuf::from("/home/me/My Sounds/horn.wav"),
            })
        );
    }

    #[test]
    fn test_errors() {
        assert!(parse("play").is_err());
        assert!(parse("gate maybe").is_err());
        assert!(parse("seek soon").is_err());
        assert!(parse("mode loud").is_err());
        assert!(parse("load horn").is_err());
        assert!(parse("dance").unwrap_err().contains("unknown command"));
        assert_eq!(parse("   "), Err(String::new()));
    }
}
