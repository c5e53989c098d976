use url::Url;

use crate::model::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Dashboard,
    FindWork,
    Messages { peer: Option<i64> },
}

impl Route {
    pub fn landing_for(role: Role) -> Self {
        match role {
            Role::Client => Route::Dashboard,
            Role::Freelancer => Route::FindWork,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Login => "/login".to_string(),
            Route::Dashboard => "/dashboard".to_string(),
            Route::FindWork => "/find-work".to_string(),
            Route::Messages { peer: None } => "/messages".to_string(),
            Route::Messages { peer: Some(peer) } => format!("/messages?user={peer}"),
        }
    }

    /// Parses a path produced by [`Route::path`]. Unknown paths yield `None`.
    pub fn parse(path: &str) -> Option<Self> {
        // Relative paths need a base to go through the url parser.
        let base = Url::parse("app://skillsync/").ok()?;
        let url = base.join(path.trim()).ok()?;
        match url.path() {
            "/login" => Some(Route::Login),
            "/dashboard" => Some(Route::Dashboard),
            "/find-work" => Some(Route::FindWork),
            "/messages" => {
                let peer = url
                    .query_pairs()
                    .find(|(key, _)| key == "user")
                    .and_then(|(_, value)| value.parse().ok());
                Some(Route::Messages { peer })
            }
            _ => None,
        }
    }
}
