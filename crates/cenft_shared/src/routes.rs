//! # Routes
//!
//! The two pages of the application:
//!
//! - `/` - event listing
//! - `/checkin/:eventId/:qrCodeHash` - check-in for one event
//!
//! The check-in code hash travels in the URL path, so a QR code only has
//! to encode the check-in link.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Errors produced while resolving a path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// The path does not match any page.
    #[error("no route for path: {0}")]
    NotFound(String),

    /// The event segment is not a decimal event ID.
    #[error("invalid event id: {0}")]
    InvalidEventId(String),
}

/// A resolved page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route {
    /// Home / listing view.
    Home,
    /// Check-in view.
    CheckIn {
        /// Event to check in to.
        event_id: u64,
        /// Check-in code hash embedded in the link.
        qr_code_hash: String,
    },
}

impl Route {
    /// Builds the check-in route for an event.
    #[must_use]
    pub fn check_in(event_id: u64, qr_code_hash: impl Into<String>) -> Self {
        Self::CheckIn {
            event_id,
            qr_code_hash: qr_code_hash.into(),
        }
    }

    /// Resolves a URL path. Query strings and fragments are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError`] if the path matches no page.
    pub fn parse(path: &str) -> Result<Self, RouteError> {
        let path = path
            .split(['?', '#'])
            .next()
            .unwrap_or_default();

        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [] => Ok(Self::Home),
            ["checkin", event_id, qr_code_hash] => {
                let event_id = event_id
                    .parse()
                    .map_err(|_| RouteError::InvalidEventId((*event_id).to_string()))?;
                Ok(Self::check_in(event_id, *qr_code_hash))
            }
            _ => Err(RouteError::NotFound(path.to_string())),
        }
    }

    /// Full link to this page under `base_url`.
    #[must_use]
    pub fn url(&self, base_url: &str) -> String {
        format!("{}{self}", base_url.trim_end_matches('/'))
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Home => f.write_str("/"),
            Self::CheckIn {
                event_id,
                qr_code_hash,
            } => write!(f, "/checkin/{event_id}/{qr_code_hash}"),
        }
    }
}

impl FromStr for Route {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_home_route() {
        assert_eq!(Route::parse("/"), Ok(Route::Home));
        assert_eq!(Route::parse(""), Ok(Route::Home));
        assert_eq!(Route::Home.to_string(), "/");
    }

    #[test]
    fn test_check_in_route() {
        let route = Route::parse("/checkin/12/ab34?ref=qr").unwrap();
        assert_eq!(route, Route::check_in(12, "ab34"));
        assert_eq!(route.to_string(), "/checkin/12/ab34");
        assert_eq!(
            route.url("https://cenft.example/"),
            "https://cenft.example/checkin/12/ab34"
        );
    }

    #[test]
    fn test_bad_routes() {
        assert_eq!(
            Route::parse("/checkin/abc/ff"),
            Err(RouteError::InvalidEventId("abc".to_string()))
        );
        assert!(matches!(
            Route::parse("/checkin/1"),
            Err(RouteError::NotFound(_))
        ));
        assert!(matches!("/admin".parse::<Route>(), Err(RouteError::NotFound(_))));
    }
}
