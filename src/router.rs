//! Router states and URL generation.
//!
//! A [`RouterState`] is the ordered list of segments describing where the
//! user is, e.g. `page / home / edit`. Controllers compare segments by
//! structural equality to decide which lifecycle hooks fire.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A named entity in a URL: a human-readable name resolving to a company or user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamedEntityState {
    pub name: String,
}

impl NamedEntityState {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// One segment of a router state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateSegment {
    Name(String),
    NamedEntity(NamedEntityState),
}

impl StateSegment {
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    pub fn named_entity(name: impl Into<String>) -> Self {
        Self::NamedEntity(NamedEntityState::new(name))
    }

    /// True if this is the plain name `name`.
    pub fn is(&self, name: &str) -> bool {
        matches!(self, Self::Name(n) if n == name)
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Name(n) => Some(n),
            Self::NamedEntity(_) => None,
        }
    }

    pub fn as_named_entity(&self) -> Option<&NamedEntityState> {
        match self {
            Self::NamedEntity(e) => Some(e),
            Self::Name(_) => None,
        }
    }
}

impl fmt::Display for StateSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(n) => f.write_str(n),
            Self::NamedEntity(e) => write!(f, "@{}", e.name),
        }
    }
}

/// `name` parses to a plain segment, `@name` to a named entity.
impl FromStr for StateSegment {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.strip_prefix('@') {
            Some(entity) => Self::named_entity(entity),
            None => Self::name(s),
        })
    }
}

/// Ordered navigational position.
pub type RouterState = Vec<StateSegment>;

/// Build a router state from plain names.
pub fn state_list(names: &[&str]) -> RouterState {
    names.iter().map(|n| StateSegment::name(*n)).collect()
}

/// Parse the `page/home/edit` notation (segments separated by `/`, `@` marks
/// a named entity).
pub fn parse_state_list(s: &str) -> RouterState {
    s.split('/')
        .filter(|part| !part.is_empty())
        .map(|part| match part.parse() {
            Ok(segment) => segment,
            Err(never) => match never {},
        })
        .collect()
}

/// Render a state list in the `page/home/edit` notation.
pub fn format_state_list(states: &[StateSegment]) -> String {
    states
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("/")
}

/// Turns router states into URLs.
pub trait Router: Send + Sync {
    fn stringify(&self, states: &[StateSegment]) -> String;
}

/// Default URL scheme: `page` and `home` are implicit, a trailing `none` is
/// dropped, named entities use their name.
///
/// | state | URL |
/// |---|---|
/// | `page/home/none` | `/` |
/// | `page/home/edit` | `/edit` |
/// | `page/@acme/none` | `/acme` |
#[derive(Debug, Clone, Copy, Default)]
pub struct PathRouter;

impl Router for PathRouter {
    fn stringify(&self, states: &[StateSegment]) -> String {
        let parts: Vec<&str> = states
            .iter()
            .filter_map(|segment| match segment {
                StateSegment::Name(n) if n == "page" || n == "home" || n == "none" => None,
                StateSegment::Name(n) => Some(n.as_str()),
                StateSegment::NamedEntity(e) => Some(e.name.as_str()),
            })
            .collect();
        format!("/{}", parts.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_router_urls() {
        let router = PathRouter;
        assert_eq!(router.stringify(&state_list(&["page", "home", "none"])), "/");
        assert_eq!(router.stringify(&state_list(&["page", "home", "edit"])), "/edit");
        assert_eq!(router.stringify(&state_list(&["page", "home", "submit"])), "/submit");
        assert_eq!(
            router.stringify(&[StateSegment::name("page"), StateSegment::named_entity("acme")]),
            "/acme"
        );
    }

    #[test]
    fn notation_round_trips() {
        let states = parse_state_list("page/@acme/none");
        assert_eq!(
            states,
            vec![
                StateSegment::name("page"),
                StateSegment::named_entity("acme"),
                StateSegment::name("none"),
            ]
        );
        assert_eq!(format_state_list(&states), "page/@acme/none");
        assert!(parse_state_list("").is_empty());
    }

    #[test]
    fn segment_helpers() {
        let seg = StateSegment::name("edit");
        assert!(seg.is("edit"));
        assert!(!seg.is("none"));
        assert!(seg.as_named_entity().is_none());
        assert_eq!(StateSegment::named_entity("x").as_named_entity().unwrap().name, "x");
    }
}
