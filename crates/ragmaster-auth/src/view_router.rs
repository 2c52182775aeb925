//! Top-level view selection.

use serde::Serialize;

/// The three top-level views of the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    Auth,
    Dashboard,
    Landing,
}

/// Inputs the router looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RouteInputs {
    pub has_identity: bool,
    pub show_auth: bool,
    pub has_profile: bool,
}

/// Select the view to render.
///
/// A signed-in identity always gets the dashboard, even while its profile is
/// still loading. `has_profile` only drives [`needs_profile_load`].
pub fn select_view(inputs: RouteInputs) -> View {
    match (inputs.has_identity, inputs.show_auth) {
        (true, _) => View::Dashboard,
        (false, true) => View::Auth,
        (false, false) => View::Landing,
    }
}

/// Startup check: an identity without a profile needs a profile load.
pub fn needs_profile_load(inputs: RouteInputs) -> bool {
    inputs.has_identity && !inputs.has_profile
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(has_identity: bool, show_auth: bool, has_profile: bool) -> RouteInputs {
        RouteInputs {
            has_identity,
            show_auth,
            has_profile,
        }
    }

    #[test]
    fn test_identity_always_routes_to_dashboard() {
        for show_auth in [false, true] {
            for has_profile in [false, true] {
                assert_eq!(
                    select_view(inputs(true, show_auth, has_profile)),
                    View::Dashboard
                );
            }
        }
    }

    #[test]
    fn test_no_identity_routes_on_show_auth() {
        for has_profile in [false, true] {
            assert_eq!(select_view(inputs(false, true, has_profile)), View::Auth);
            assert_eq!(select_view(inputs(false, false, has_profile)), View::Landing);
        }
    }

    #[test]
    fn test_needs_profile_load() {
        assert!(needs_profile_load(inputs(true, false, false)));
        assert!(!needs_profile_load(inputs(true, false, true)));
        assert!(!needs_profile_load(inputs(false, true, false)));
    }
}
