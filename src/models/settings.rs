// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Dashboard settings persisted in the `settings` collection.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Defines a closed set of string-valued options with serde and parsing
/// support. The string form is what the frontend sends and displays.
macro_rules! string_options {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $value:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[cfg_attr(feature = "binding-generation", derive(TS))]
        #[cfg_attr(
            feature = "binding-generation",
            ts(export, export_to = "web/src/lib/generated/")
        )]
        pub enum $name {
            $(
                #[serde(rename = $value)]
                $variant,
            )+
        }

        impl $name {
            /// All accepted string values, in display order.
            pub const VALUES: &'static [&'static str] = &[$($value),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $value,)+
                }
            }
        }

        impl FromStr for $name {
            type Err = InvalidOption;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($value => Ok(Self::$variant),)+
                    _ => Err(InvalidOption {
                        value: s.to_string(),
                        allowed: Self::VALUES,
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_options! {
    /// How long log records are kept before the sweeper deletes them.
    RetentionPeriod {
        SevenDays => "7 days",
        ThirtyDays => "30 days",
        NinetyDays => "90 days",
    }
}

string_options! {
    /// Live console polling interval.
    RefreshInterval {
        FiveSeconds => "5s",
        TenSeconds => "10s",
        ThirtySeconds => "30s",
    }
}

string_options! {
    /// Maximum number of lines the live console keeps on screen.
    MaxLogsToDisplay {
        Hundred => "100",
        FiveHundred => "500",
        Thousand => "1000",
    }
}

impl RetentionPeriod {
    pub fn days(&self) -> i64 {
        match self {
            Self::SevenDays => 7,
            Self::ThirtyDays => 30,
            Self::NinetyDays => 90,
        }
    }
}

/// A string that is not one of an option set's accepted values.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{value:?} is not one of: {}", .allowed.join(", "))]
pub struct InvalidOption {
    pub value: String,
    pub allowed: &'static [&'static str],
}

/// Log retention settings.
///
/// Stored at: `settings/retention`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct RetentionSettings {
    pub retention_period: RetentionPeriod,
    pub auto_delete_old_logs: bool,
}

impl Default for RetentionSettings {
    fn default() -> Self {
        Self {
            retention_period: RetentionPeriod::ThirtyDays,
            auto_delete_old_logs: true,
        }
    }
}

/// Live console behaviour settings.
///
/// Stored at: `settings/live_console`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct LiveConsoleSettings {
    pub auto_refresh_interval: RefreshInterval,
    pub max_logs_to_display: MaxLogsToDisplay,
}

impl Default for LiveConsoleSettings {
    fn default() -> Self {
        Self {
            auto_refresh_interval: RefreshInterval::TenSeconds,
            max_logs_to_display: MaxLogsToDisplay::Hundred,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_dashboard() {
        let json = serde_json::to_value(RetentionSettings::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "retentionPeriod": "30 days", "autoDeleteOldLogs": true })
        );

        let json = serde_json::to_value(LiveConsoleSettings::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "autoRefreshInterval": "10s", "maxLogsToDisplay": "100" })
        );
    }

    #[test]
    fn test_option_parsing() {
        assert_eq!("7 days".parse(), Ok(RetentionPeriod::SevenDays));
        assert_eq!("90 days".parse::<RetentionPeriod>().unwrap().days(), 90);
        assert_eq!("30s".parse(), Ok(RefreshInterval::ThirtySeconds));
        assert_eq!("1000".parse(), Ok(MaxLogsToDisplay::Thousand));

        let err = "14 days".parse::<RetentionPeriod>().unwrap_err();
        assert_eq!(err.to_string(), "\"14 days\" is not one of: 7 days, 30 days, 90 days");
    }

    #[test]
    fn test_round_trip_through_display() {
        for value in MaxLogsToDisplay::VALUES {
            let parsed: MaxLogsToDisplay = value.parse().unwrap();
            assert_eq!(parsed.to_string(), *value);
        }
    }
}
