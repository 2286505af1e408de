use strum::Display;

#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum Action {
    SetTitle(String),
    SetTags(String),
    AppendBody(String),
    ClearBody,
    Save,
    PrintStatus,
    Quit,
    Error(String),
}

impl Action {
    /// Interprets one line of console input. Anything that isn't a known
    /// `:command` is body text.
    pub fn parse_line(line: &str) -> Self {
        let Some(command) = line.strip_prefix(':') else {
            return Self::AppendBody(line.to_owned());
        };
        let (name, arg) = command
            .split_once(char::is_whitespace)
            .map_or((command, ""), |(name, arg)| (name, arg.trim()));
        match name {
            "title" => Self::SetTitle(arg.to_owned()),
            "tags" => Self::SetTags(arg.to_owned()),
            "body" => Self::ClearBody,
            "save" | "w" => Self::Save,
            "status" => Self::PrintStatus,
            "quit" | "q" => Self::Quit,
            _ => Self::AppendBody(line.to_owned()),
        }
    }
}
