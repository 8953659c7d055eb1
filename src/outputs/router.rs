use serde::Serialize;

/// Fragment-addressed views. Exactly one is visible at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Route {
    Home,
    History,
    /// Fragment that matches no view: every section stays hidden.
    Unknown(String),
}

impl Route {
    /// `""` and `"#"` fall back to home, as a page loaded without a fragment does.
    pub fn from_fragment(fragment: &str) -> Self {
        match fragment.trim() {
            "" | "#" | "#home" => Route::Home,
            "#historique" => Route::History,
            other => Route::Unknown(other.to_string()),
        }
    }

    pub fn fragment(&self) -> &str {
        match self {
            Route::Home => "#home",
            Route::History => "#historique",
            Route::Unknown(fragment) => fragment,
        }
    }

    /// Element id of the section this route reveals.
    pub fn section_id(&self) -> Option<&'static str> {
        match self {
            Route::Home => Some("home-view"),
            Route::History => Some("historique-view"),
            Route::Unknown(_) => None,
        }
    }

    pub fn is_home(&self) -> bool {
        matches!(self, Route::Home)
    }
}

/// Tracks the current route; fragment changes are the only navigation input.
#[derive(Debug, Clone)]
pub struct Router {
    current: Route,
}

impl Default for Router {
    fn default() -> Self {
        Self { current: Route::Home }
    }
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> &Route {
        &self.current
    }

    /// Returns true when the visible view changed.
    pub fn navigate(&mut self, fragment: &str) -> bool {
        let next = Route::from_fragment(fragment);
        if next == self.current {
            return false;
        }
        self.current = next;
        true
    }
}
