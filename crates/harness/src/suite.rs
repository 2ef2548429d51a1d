//! Named groups of scenarios

use clap::ValueEnum;
use std::fmt;

/// A named group of scenarios, runnable on its own or as part of `all`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Suite {
    /// Every suite below, in order, sharing fixtures
    All,
    /// Health, call-endpoint auth, Socket.IO and error format
    Calls,
    /// Register, login and current-user checks
    Auth,
    /// Tweet CRUD, feeds, like/retweet toggles and replies
    Tweets,
    /// User profile and per-user timelines
    Profiles,
    /// Tweet and user search with filters
    Search,
    /// Cross-user notification attribution and read state
    Notifications,
    /// Conversation and message sender/recipient checks
    Messaging,
    /// List lifecycle
    Lists,
    /// Bookmark lifecycle
    Bookmarks,
    /// Moment lifecycle
    Moments,
}

impl Suite {
    /// Order used by `all`
    pub const ORDER: &'static [Suite] = &[
        Suite::Calls,
        Suite::Auth,
        Suite::Tweets,
        Suite::Profiles,
        Suite::Search,
        Suite::Notifications,
        Suite::Messaging,
        Suite::Lists,
        Suite::Bookmarks,
        Suite::Moments,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Suite::All => "all",
            Suite::Calls => "calls",
            Suite::Auth => "auth",
            Suite::Tweets => "tweets",
            Suite::Profiles => "profiles",
            Suite::Search => "search",
            Suite::Notifications => "notifications",
            Suite::Messaging => "messaging",
            Suite::Lists => "lists",
            Suite::Bookmarks => "bookmarks",
            Suite::Moments => "moments",
        }
    }

    /// Whether the suite needs the two registered principals
    pub fn needs_principals(&self) -> bool {
        !matches!(self, Suite::All | Suite::Calls)
    }
}

impl fmt::Display for Suite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
