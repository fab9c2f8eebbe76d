use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// The two content domains served by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Events,
    Pages,
}

impl ContentKind {
    pub const ALL: [ContentKind; 2] = [ContentKind::Events, ContentKind::Pages];

    /// Field under `data` that holds the node list in a GraphQL response.
    pub fn root_field(self) -> &'static str {
        match self {
            ContentKind::Events => "allEvent",
            ContentKind::Pages => "pages",
        }
    }

    /// Default cache validity. Event data changes faster than pages.
    pub fn default_validity(self) -> Duration {
        match self {
            ContentKind::Events => Duration::from_secs(30 * 60),
            ContentKind::Pages => Duration::from_secs(60 * 60),
        }
    }

    /// Returned by the query engine when the cache holds no records.
    pub fn no_data_sentinel(self) -> &'static str {
        match self {
            ContentKind::Events => "Sorry, I couldn't retrieve any event data at this time.",
            ContentKind::Pages => "Sorry, I couldn't retrieve any page data at this time.",
        }
    }

    /// Prefix of the string returned when the model call fails.
    pub fn error_prefix(self) -> &'static str {
        match self {
            ContentKind::Events => "Ett fel uppstod vid sökning efter evenemang",
            ContentKind::Pages => "Ett fel uppstod vid sökning på webbplatsen",
        }
    }

    /// Singular label used in activity log lines ("Event tokens", "Event query").
    pub fn label(self) -> &'static str {
        match self {
            ContentKind::Events => "Event",
            ContentKind::Pages => "Page",
        }
    }

    /// Title used for a record whose own title could not be read.
    pub fn unknown_title(self) -> &'static str {
        match self {
            ContentKind::Events => "Unknown event",
            ContentKind::Pages => "Unknown page",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentKind::Events => write!(f, "events"),
            ContentKind::Pages => write!(f, "pages"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_expire_before_pages() {
        assert!(ContentKind::Events.default_validity() < ContentKind::Pages.default_validity());
    }

    #[test]
    fn test_sentinels_are_distinct() {
        assert_ne!(
            ContentKind::Events.no_data_sentinel(),
            ContentKind::Pages.no_data_sentinel()
        );
    }

    #[test]
    fn test_serde_uses_lowercase_names() {
        let json = serde_json::to_string(&ContentKind::Pages).unwrap();
        assert_eq!(json, "\"pages\"");
        let kind: ContentKind = serde_json::from_str("\"events\"").unwrap();
        assert_eq!(kind, ContentKind::Events);
    }
}
