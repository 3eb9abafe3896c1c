use std::path::PathBuf;

pub const HELP: &str = "\
Commands:
  open <path>          pick an image file
  drag                 start dragging over the upload area
  leave                drag leaves the upload area
  drop [<path> ...]    drop files (only the first one is used)
  example <name>       load a preset example image
  examples             list preset example images
  classify             send the current image for classification
  health               check that the backend is reachable
  help                 show this message
  quit                 exit";

/// A user gesture typed on the terminal.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Open(PathBuf),
    DragEnter,
    DragLeave,
    Drop(Vec<PathBuf>),
    Example(String),
    Examples,
    Classify,
    Health,
    Help,
    Quit,
}

impl TryFrom<&str> for Command {
    type Error = String;

    fn try_from(line: &str) -> Result<Self, Self::Error> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        match verb.to_lowercase().as_str() {
            "open" if !rest.is_empty() => Ok(Command::Open(PathBuf::from(rest))),
            "open" => Err("Usage: open <path>".to_string()),
            "drag" => Ok(Command::DragEnter),
            "leave" => Ok(Command::DragLeave),
            "drop" => Ok(Command::Drop(
                rest.split_whitespace().map(PathBuf::from).collect(),
            )),
            "example" if !rest.is_empty() => Ok(Command::Example(rest.to_string())),
            "example" => Err("Usage: example <name>".to_string()),
            "examples" => Ok(Command::Examples),
            "classify" | "predict" => Ok(Command::Classify),
            "health" => Ok(Command::Health),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(format!(
                "{} is not a supported command. Type `help` for the list.",
                other
            )),
        }
    }
}
