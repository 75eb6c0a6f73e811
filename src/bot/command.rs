pub const DEFAULT_TOP: usize = 10;
pub const MAX_TOP: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start,
    Help,
    Monitor,
    Stop,
    Status,
    Rates { symbol: Option<String> },
    Top { limit: usize },
    Settings(SettingsCommand),
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SettingsCommand {
    Show,
    /// Percent.
    Upper(f64),
    /// Percent.
    Lower(f64),
    /// Seconds.
    Interval(u64),
    Reset,
    Usage,
}

impl Command {
    /// Parse `/name args...`. Returns None for ordinary chat text.
    pub fn parse(text: &str) -> Option<Command> {
        let text = text.trim();
        let rest = text.strip_prefix('/')?;
        let mut parts = rest.split_whitespace();
        let head = parts.next()?;
        // "/top@my_bot" in group chats
        let name = head.split('@').next().unwrap_or(head).to_lowercase();
        let args: Vec<&str> = parts.collect();

        let cmd = match name.as_str() {
            "start" => Command::Start,
            "help" => Command::Help,
            "monitor" => Command::Monitor,
            "stop" => Command::Stop,
            "status" => Command::Status,
            "rates" => Command::Rates {
                symbol: args.first().map(|s| s.to_uppercase()),
            },
            "top" => Command::Top {
                limit: parse_limit(args.first().copied()),
            },
            "settings" => Command::Settings(SettingsCommand::parse(&args)),
            other => Command::Unknown(other.to_string()),
        };
        Some(cmd)
    }

    /// Inline keyboard callback payloads.
    pub fn from_callback(data: &str) -> Option<Command> {
        match data {
            "start_monitoring" => Some(Command::Monitor),
            "stop_monitoring" => Some(Command::Stop),
            "show_rates" => Some(Command::Rates { symbol: None }),
            "settings" => Some(Command::Settings(SettingsCommand::Show)),
            "reset_alerts" => Some(Command::Settings(SettingsCommand::Reset)),
            "status" => Some(Command::Status),
            _ => None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Command::Start => "start",
            Command::Help => "help",
            Command::Monitor => "monitor",
            Command::Stop => "stop",
            Command::Status => "status",
            Command::Rates { .. } => "rates",
            Command::Top { .. } => "top",
            Command::Settings(_) => "settings",
            Command::Unknown(name) => name.as_str(),
        }
    }
}

fn parse_limit(arg: Option<&str>) -> usize {
    match arg.and_then(|a| a.parse::<usize>().ok()) {
        Some(0) | None => DEFAULT_TOP,
        Some(n) => n.min(MAX_TOP),
    }
}

impl SettingsCommand {
    fn parse(args: &[&str]) -> SettingsCommand {
        let key = match args.first() {
            None => return SettingsCommand::Show,
            Some(k) => k.to_lowercase(),
        };
        let value = args.get(1).map(|v| v.trim_end_matches('%'));
        match (key.as_str(), value) {
            ("reset", _) => SettingsCommand::Reset,
            ("upper" | "high", Some(v)) => v.parse().map(SettingsCommand::Upper).unwrap_or(SettingsCommand::Usage),
            ("lower" | "low", Some(v)) => v.parse().map(SettingsCommand::Lower).unwrap_or(SettingsCommand::Usage),
            ("interval", Some(v)) => v.parse().map(SettingsCommand::Interval).unwrap_or(SettingsCommand::Usage),
            _ => SettingsCommand::Usage,
        }
    }
}
