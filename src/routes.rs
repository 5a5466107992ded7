use std::fmt;

use serde::{Deserialize, Serialize};

/// Views of the web client
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// `/`, which only redirects to the login view
    Root,
    Login,
    Signup,
    Feed,
    Post,
    MyPosts,
    AiHelp,
    /// Any path the router does not know
    NotFound(String),
}

impl Route {
    /// Parse a location path. Query strings, fragments and trailing slashes
    /// are ignored.
    pub fn parse(location: &str) -> Self {
        let path = location
            .split(|c: char| c == '?' || c == '#')
            .next()
            .unwrap_or("")
            .trim_end_matches('/');

        match path {
            "" => Route::Root,
            "/login" => Route::Login,
            "/signup" => Route::Signup,
            "/feed" => Route::Feed,
            "/post" => Route::Post,
            "/my-posts" => Route::MyPosts,
            "/ai" => Route::AiHelp,
            other => Route::NotFound(other.to_string()),
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Route::Root => "/",
            Route::Login => "/login",
            Route::Signup => "/signup",
            Route::Feed => "/feed",
            Route::Post => "/post",
            Route::MyPosts => "/my-posts",
            Route::AiHelp => "/ai",
            Route::NotFound(path) => path,
        }
    }

    /// Whether the view requires a signed-in session
    pub fn is_protected(&self) -> bool {
        matches!(
            self,
            Route::Feed | Route::Post | Route::MyPosts | Route::AiHelp
        )
    }

    /// Unconditional redirect configured in the router, if any
    pub fn resolve_redirect(&self) -> Option<Route> {
        match self {
            Route::Root => Some(Route::Login),
            _ => None,
        }
    }

    /// Where a successful sign-in lands
    pub fn home() -> Route {
        Route::Feed
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_paths() {
        assert_eq!(Route::parse("/"), Route::Root);
        assert_eq!(Route::parse(""), Route::Root);
        assert_eq!(Route::parse("/login"), Route::Login);
        assert_eq!(Route::parse("/signup/"), Route::Signup);
        assert_eq!(Route::parse("/feed?filter=trending"), Route::Feed);
        assert_eq!(Route::parse("/my-posts#top"), Route::MyPosts);
        assert_eq!(Route::parse("/ai"), Route::AiHelp);
        assert_eq!(Route::parse("/post"), Route::Post);
    }

    #[test]
    fn test_unknown_path_keeps_location() {
        let route = Route::parse("/settings/");
        assert_eq!(route, Route::NotFound("/settings".to_string()));
        assert_eq!(route.path(), "/settings");
        assert!(!route.is_protected());
    }

    #[test]
    fn test_protection_and_redirects() {
        for route in [Route::Feed, Route::Post, Route::MyPosts, Route::AiHelp] {
            assert!(route.is_protected(), "{} should be protected", route);
        }
        for route in [Route::Root, Route::Login, Route::Signup] {
            assert!(!route.is_protected(), "{} should be public", route);
        }
        assert_eq!(Route::Root.resolve_redirect(), Some(Route::Login));
        assert_eq!(Route::Feed.resolve_redirect(), None);
    }

    #[test]
    fn test_path_round_trips_through_parse() {
        for route in [Route::Login, Route::Signup, Route::Feed, Route::Post, Route::MyPosts, Route::AiHelp] {
            assert_eq!(Route::parse(route.path()), route);
        }
    }
}
