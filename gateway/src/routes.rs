//! Static route table (`spec.md` §4.1). One prefix maps to exactly one
//! upstream; matching is longest-prefix-first since `/api/profile` and
//! `/api/photos` would otherwise both match a naive `/api` prefix.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upstream {
    Auth,
    Profile,
    Discovery,
    Media,
    Chat,
}

impl Upstream {
    /// Name used to look up `GATEWAY_UPSTREAM_<NAME>`.
    pub fn env_name(self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::Profile => "profile",
            Self::Discovery => "discovery",
            Self::Media => "media",
            Self::Chat => "chat",
        }
    }
}

/// Resolve a public request path to an upstream and the path to forward.
/// Returns `None` for anything outside the declared route table.
pub fn resolve(path: &str) -> Option<(Upstream, String)> {
    if let Some(rest) = path.strip_prefix("/api/auth") {
        return Some((Upstream::Auth, format!("/auth{rest}")));
    }
    if path == "/auth" || path.starts_with("/auth/") {
        return Some((Upstream::Auth, path.to_owned()));
    }

    if path == "/api/profile" || path.starts_with("/api/profile/") {
        let rest = path.strip_prefix("/api/profile").unwrap_or("");
        return Some((Upstream::Profile, format!("/profiles{rest}")));
    }

    if path == "/api/discover" {
        return Some((Upstream::Discovery, "/discovery/candidates".to_owned()));
    }
    if path == "/api/like" {
        return Some((Upstream::Discovery, "/discovery/like".to_owned()));
    }
    if path == "/api/pass" {
        return Some((Upstream::Discovery, "/discovery/pass".to_owned()));
    }
    if path == "/api/matches" {
        return Some((Upstream::Discovery, "/discovery/matches".to_owned()));
    }
    if path == "/api/favorites" || path.starts_with("/api/favorites/") {
        let rest = path.strip_prefix("/api/favorites").unwrap_or("");
        return Some((Upstream::Discovery, format!("/discovery/favorites{rest}")));
    }

    if path == "/api/photos" || path.starts_with("/api/photos/") {
        let rest = path.strip_prefix("/api/photos").unwrap_or("");
        return Some((Upstream::Media, format!("/media{rest}")));
    }

    if let Some(rest) = path.strip_prefix("/v1/chat") {
        let rest = if rest.is_empty() { "/" } else { rest };
        return Some((Upstream::Chat, format!("/chat{rest}")));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_api_auth_by_stripping_api() {
        let (upstream, path) = resolve("/api/auth/verify").expect("route");
        assert_eq!(upstream, Upstream::Auth);
        assert_eq!(path, "/auth/verify");
    }

    #[test]
    fn leaves_bare_auth_prefix_untouched() {
        let (upstream, path) = resolve("/auth/validate").expect("route");
        assert_eq!(upstream, Upstream::Auth);
        assert_eq!(path, "/auth/validate");
    }

    #[test]
    fn maps_profile_subresource() {
        let (upstream, path) = resolve("/api/profile/photos").expect("route");
        assert_eq!(upstream, Upstream::Profile);
        assert_eq!(path, "/profiles/photos");
    }

    #[test]
    fn maps_discovery_verbs_individually() {
        assert_eq!(resolve("/api/discover").unwrap().1, "/discovery/candidates");
        assert_eq!(resolve("/api/like").unwrap().1, "/discovery/like");
        assert_eq!(resolve("/api/favorites/42").unwrap().1, "/discovery/favorites/42");
    }

    #[test]
    fn maps_chat_including_ws_path() {
        let (upstream, path) = resolve("/v1/chat/ws").expect("route");
        assert_eq!(upstream, Upstream::Chat);
        assert_eq!(path, "/chat/ws");
    }

    #[test]
    fn unmatched_path_is_none() {
        assert!(resolve("/nonexistent").is_none());
    }
}
