//! Chat bot command layer
//!
//! Turns prefixed chat messages (`/add today`, `/view all`, ...) into tracker
//! operations and renders the results as reply text. The transport lives in
//! [`telegram`]; this module has no network code and is driven synchronously.
//!
//! Each caller's [`UserData`] is loaded on first use and kept in the bot's
//! session map until the bot exits. Changes are only written by `save`,
//! `saveall`, `kill` or [`Bot::save_all`].

pub mod telegram;

use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

use crate::config::Config;
use crate::tracker::{self, Tracker, UserData};
use crate::types::ViewLength;

const PROFILE_NOT_FOUND: &str = "Profile not found. Please use `init` to setup profile.";
const NO_PERMISSION: &str = "You do not have the permission to use this command.";

/// Who sent a message
#[derive(Debug, Clone)]
pub struct Caller {
    /// Stable platform user ID, used as the tracker user identifier
    pub id: String,
    /// Display name
    pub name: String,
}

/// Text to send back, plus whether the bot should stop afterwards
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    pub shutdown: bool,
}

impl Reply {
    fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), shutdown: false }
    }
}

/// A parsed bot command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Init,
    Add(Option<String>),
    Remove,
    Predict,
    View(Option<String>),
    Trim,
    Save,
    SaveAll,
    Kill,
    WhoAmI,
    Uptime,
    Unknown(String),
}

impl Command {
    /// Parse `text` if it starts with `prefix`
    ///
    /// A `@botname` suffix on the command word is ignored.
    pub fn parse(prefix: &str, text: &str) -> Option<Self> {
        let rest = text.trim().strip_prefix(prefix)?;
        let (word, arg) = match rest.split_once(char::is_whitespace) {
            Some((word, arg)) => (word, Some(arg.trim().to_string()).filter(|a| !a.is_empty())),
            None => (rest, None),
        };
        let word = word.split('@').next().unwrap_or(word).to_lowercase();

        Some(match word.as_str() {
            "help" | "start" => Command::Help,
            "init" => Command::Init,
            "add" => Command::Add(arg),
            "remove" => Command::Remove,
            "predict" => Command::Predict,
            "view" => Command::View(arg),
            "trim" => Command::Trim,
            "save" => Command::Save,
            "saveall" => Command::SaveAll,
            "kill" => Command::Kill,
            "whoami" => Command::WhoAmI,
            "uptime" => Command::Uptime,
            _ => Command::Unknown(word),
        })
    }
}

/// Command dispatcher holding per-user sessions
pub struct Bot {
    tracker: Tracker,
    sessions: HashMap<String, UserData>,
    prefix: String,
    owner_id: Option<String>,
    default_view: ViewLength,
    started: Instant,
}

impl Bot {
    /// Create a bot over `tracker` using the bot and tracker sections of `config`
    pub fn new(tracker: Tracker, config: &Config) -> Self {
        Self {
            tracker,
            sessions: HashMap::new(),
            prefix: config.bot.prefix.clone(),
            owner_id: config.bot.owner_id.clone(),
            default_view: config.tracker.view_length(),
            started: Instant::now(),
        }
    }

    /// Handle one incoming message; `None` if it is not a command
    pub fn handle(&mut self, caller: &Caller, text: &str) -> Option<Reply> {
        let command = Command::parse(&self.prefix, text)?;
        debug!("{} ({}): {:?}", caller.name, caller.id, command);

        Some(match self.dispatch(caller, command) {
            Ok(reply) => reply,
            Err(e) => {
                error!("Command from {} failed: {}", caller.id, e);
                Reply::text(format!("Error: {}", e))
            }
        })
    }

    /// Save every open session, returning the outcome per user
    pub fn save_all(&mut self) -> Vec<(String, tracker::Result<()>)> {
        let mut users: Vec<_> = self.sessions.keys().cloned().collect();
        users.sort();

        users
            .into_iter()
            .filter_map(|user| {
                let data = self.sessions.get_mut(&user)?;
                let result = data.save();
                Some((user, result))
            })
            .collect()
    }

    /// Number of users with a loaded session
    pub fn open_sessions(&self) -> usize {
        self.sessions.len()
    }

    fn dispatch(&mut self, caller: &Caller, command: Command) -> tracker::Result<Reply> {
        let reply = match command {
            Command::Help => Reply::text(self.help()),
            Command::Init => {
                if self.tracker.register_user(&caller.id)? {
                    Reply::text(format!("User `{}` initialized.", caller.id))
                } else {
                    Reply::text(format!("User `{}` already exists.", caller.id))
                }
            }
            Command::WhoAmI => Reply::text(format!("You are `{}`, ID: `{}`", caller.name, caller.id)),
            Command::Uptime => Reply::text(format_uptime(self.started.elapsed())),
            Command::SaveAll => {
                if !self.is_owner(caller) {
                    return Ok(Reply::text(NO_PERMISSION));
                }
                let mut lines: Vec<String> = self
                    .save_all()
                    .into_iter()
                    .map(|(user, result)| match result {
                        Ok(()) => format!("`{}` saved.", user),
                        Err(e) => format!("`{}` could not be saved: {}", user, e),
                    })
                    .collect();
                lines.push("Done.".to_string());
                Reply::text(lines.join("\n"))
            }
            Command::Kill => {
                if !self.is_owner(caller) {
                    return Ok(Reply::text(NO_PERMISSION));
                }
                for (user, result) in self.save_all() {
                    if let Err(e) = result {
                        error!("Failed to save {} before shutdown: {}", user, e);
                    }
                }
                info!("Shutdown requested by {}", caller.id);
                Reply { text: "Logging out.".to_string(), shutdown: true }
            }
            Command::Unknown(_) => Reply::text("Invalid command."),
            command => self.dispatch_user(caller, command)?,
        };
        Ok(reply)
    }

    /// Commands that operate on the caller's own record
    fn dispatch_user(&mut self, caller: &Caller, command: Command) -> tracker::Result<Reply> {
        let default_view = self.default_view;
        let Some(data) = self.session(&caller.id)? else {
            return Ok(Reply::text(PROFILE_NOT_FOUND));
        };

        let text = match command {
            Command::Add(None) => "Error: Please specify a date".to_string(),
            Command::Add(Some(date)) => match data.add(&date) {
                Some(label) => format!("{} added.", label),
                None => "Invalid date format!".to_string(),
            },
            Command::Remove => {
                if data.remove_previous() {
                    "Last date entry removed.".to_string()
                } else {
                    "Nothing to remove for now!".to_string()
                }
            }
            Command::Predict => data
                .predict()
                .unwrap_or_else(|| "Insufficient data for calculation!".to_string()),
            Command::View(arg) => {
                let length = match arg.as_deref().map(str::parse::<ViewLength>) {
                    None => default_view,
                    Some(Ok(length)) => length,
                    Some(Err(msg)) => return Ok(Reply::text(msg)),
                };
                match data.display(length)? {
                    Some(listing) => format!("```\n{}\n```", listing),
                    None => "Nothing to see for now!".to_string(),
                }
            }
            Command::Trim => {
                if data.trim() {
                    "Old entries trimmed.".to_string()
                } else {
                    "Nothing to trim.".to_string()
                }
            }
            Command::Save => {
                data.save()?;
                "Changes saved.".to_string()
            }
            other => format!("Unsupported command: {:?}", other),
        };
        Ok(Reply::text(text))
    }

    /// The caller's engine, loading it on first use; `None` if not registered
    fn session(&mut self, user: &str) -> tracker::Result<Option<&mut UserData>> {
        if !self.sessions.contains_key(user) {
            match self.tracker.open_user(user) {
                Ok(data) => {
                    self.sessions.insert(user.to_string(), data);
                }
                Err(e) if e.is_not_found() => return Ok(None),
                Err(e) => return Err(e),
            }
        }
        Ok(self.sessions.get_mut(user))
    }

    fn is_owner(&self, caller: &Caller) -> bool {
        self.owner_id.as_deref() == Some(caller.id.as_str())
    }

    fn help(&self) -> String {
        let p = &self.prefix;
        [
            format!("{p}init - Setup your user profile"),
            format!("{p}add <date> - Add a date (day/month/year, day-month-year, today, yesterday)"),
            format!("{p}remove - Remove previous date entry"),
            format!("{p}predict - Predict the next date"),
            format!("{p}view [n|all] - List entries (default {})", self.default_view),
            format!("{p}trim - Drop old entries"),
            format!("{p}save - Save changes"),
            format!("{p}whoami - Show your name and ID"),
            format!("{p}uptime - Show how long the bot is up"),
        ]
        .join("\n")
    }
}

/// Format elapsed time as `H:MM:SS`, prefixed with `N day(s), ` when over a day
pub fn format_uptime(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;

    let clock = format!("{}:{:02}:{:02}", hours, minutes, seconds);
    match days {
        0 => clock,
        1 => format!("1 day, {}", clock),
        n => format!("{} days, {}", n, clock),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller(id: &str) -> Caller {
        Caller { id: id.to_string(), name: format!("user{}", id) }
    }

    fn bot(owner: Option<&str>) -> (tempfile::TempDir, Bot) {
        let dir = tempfile::tempdir().unwrap();
        let tracker = Tracker::open(dir.path()).unwrap();
        let mut config = Config::default();
        config.bot.owner_id = owner.map(String::from);
        (dir, Bot::new(tracker, &config))
    }

    fn say(bot: &mut Bot, who: &str, text: &str) -> String {
        bot.handle(&caller(who), text).unwrap().text
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("/", "/add 5/3/2024"), Some(Command::Add(Some("5/3/2024".into()))));
        assert_eq!(Command::parse("/", "/add"), Some(Command::Add(None)));
        assert_eq!(Command::parse("/", "/add   "), Some(Command::Add(None)));
        assert_eq!(Command::parse("/", "/VIEW all"), Some(Command::View(Some("all".into()))));
        assert_eq!(Command::parse("/", "/predict@cadence_bot"), Some(Command::Predict));
        assert_eq!(Command::parse("!", "!whoami"), Some(Command::WhoAmI));
        assert_eq!(Command::parse("/", "/dance"), Some(Command::Unknown("dance".into())));
        assert_eq!(Command::parse("/", "hello there"), None);
    }

    #[test]
    fn test_profile_required() {
        let (_dir, mut bot) = bot(None);
        assert_eq!(say(&mut bot, "1", "/add today"), PROFILE_NOT_FOUND);
        assert_eq!(say(&mut bot, "1", "/predict"), PROFILE_NOT_FOUND);
        assert_eq!(bot.open_sessions(), 0);
    }

    #[test]
    fn test_init_twice() {
        let (_dir, mut bot) = bot(None);
        assert_eq!(say(&mut bot, "1", "/init"), "User `1` initialized.");
        assert_eq!(say(&mut bot, "1", "/init"), "User `1` already exists.");
    }

    #[test]
    fn test_tracking_flow() {
        let (_dir, mut bot) = bot(None);
        say(&mut bot, "1", "/init");

        assert_eq!(say(&mut bot, "1", "/add"), "Error: Please specify a date");
        assert_eq!(say(&mut bot, "1", "/add soon"), "Invalid date format!");
        assert_eq!(say(&mut bot, "1", "/predict"), "Insufficient data for calculation!");
        assert_eq!(say(&mut bot, "1", "/add 1/1/2024"), "2024-01-01 added.");
        assert_eq!(say(&mut bot, "1", "/add 08-01-2024"), "2024-01-08 added.");
        assert_eq!(say(&mut bot, "1", "/predict"), "2024-01-15");

        let view = say(&mut bot, "1", "/view all");
        assert!(view.starts_with("```\n2024-01-01\n"));
        assert!(view.contains("7 days"));

        assert_eq!(say(&mut bot, "1", "/remove"), "Last date entry removed.");
        assert_eq!(say(&mut bot, "1", "/remove"), "Last date entry removed.");
        assert_eq!(say(&mut bot, "1", "/remove"), "Nothing to remove for now!");
        assert_eq!(say(&mut bot, "1", "/view"), "Nothing to see for now!");
    }

    #[test]
    fn test_view_rejects_bad_length() {
        let (_dir, mut bot) = bot(None);
        say(&mut bot, "1", "/init");
        say(&mut bot, "1", "/add 1/1/2024");
        assert!(say(&mut bot, "1", "/view lots").starts_with("Invalid length"));
    }

    #[test]
    fn test_trim_command() {
        let (_dir, mut bot) = bot(None);
        say(&mut bot, "1", "/init");
        assert_eq!(say(&mut bot, "1", "/trim"), "Nothing to trim.");
        for d in 1..=8 {
            say(&mut bot, "1", &format!("/add {}/1/2024", d));
        }
        assert_eq!(say(&mut bot, "1", "/trim"), "Old entries trimmed.");
    }

    #[test]
    fn test_save_persists() {
        let (dir, mut bot) = bot(None);
        say(&mut bot, "1", "/init");
        say(&mut bot, "1", "/add 1/1/2024");
        assert_eq!(say(&mut bot, "1", "/save"), "Changes saved.");

        let data = Tracker::open(dir.path()).unwrap().open_user("1").unwrap();
        assert_eq!(data.dates().len(), 1);
    }

    #[test]
    fn test_owner_commands() {
        let (_dir, mut bot) = bot(Some("9"));
        say(&mut bot, "1", "/init");
        say(&mut bot, "1", "/add today");

        assert_eq!(say(&mut bot, "1", "/saveall"), NO_PERMISSION);
        assert_eq!(say(&mut bot, "1", "/kill"), NO_PERMISSION);

        assert_eq!(say(&mut bot, "9", "/saveall"), "`1` saved.\nDone.");

        let reply = bot.handle(&caller("9"), "/kill").unwrap();
        assert_eq!(reply.text, "Logging out.");
        assert!(reply.shutdown);
    }

    #[test]
    fn test_no_owner_configured() {
        let (_dir, mut bot) = bot(None);
        assert_eq!(say(&mut bot, "1", "/kill"), NO_PERMISSION);
    }

    #[test]
    fn test_whoami_and_unknown() {
        let (_dir, mut bot) = bot(None);
        assert_eq!(say(&mut bot, "7", "/whoami"), "You are `user7`, ID: `7`");
        assert_eq!(say(&mut bot, "7", "/fly"), "Invalid command.");
        assert!(bot.handle(&caller("7"), "just chatting").is_none());
    }

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(Duration::from_secs(0)), "0:00:00");
        assert_eq!(format_uptime(Duration::from_secs(3_725)), "1:02:05");
        assert_eq!(format_uptime(Duration::from_secs(86_400 + 61)), "1 day, 0:01:01");
        assert_eq!(format_uptime(Duration::from_secs(3 * 86_400)), "3 days, 0:00:00");
    }
}
