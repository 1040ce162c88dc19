use std::collections::HashMap;
use tokio::sync::oneshot;
use crate::connection::SessionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthAction {
    Publish,
    Play,
}

impl AuthAction {
    /// Status code sent when the action is refused
    pub fn unauthorized_code(&self) -> &'static str {
        match self {
            AuthAction::Publish => "NetStream.Publish.Unauthorized",
            AuthAction::Play => "NetStream.Play.Unauthorized",
        }
    }
}

/// What a session asks permission for
#[derive(Debug, Clone)]
pub struct AuthRequest {
    pub session_id: SessionId,
    pub action: AuthAction,
    pub app: String,
    /// Canonical `/app/name` path
    pub path: String,
    /// Arguments from the `?query` part of the stream name
    pub args: HashMap<String, String>,
}

/// Verdict of an [`Authorizer`]
#[derive(Debug)]
pub enum AuthDecision {
    Allow,
    Deny(String),
    /// Decided later; the sender resolves with `Ok(())` to allow or
    /// `Err(reason)` to deny. A dropped sender counts as a denial.
    Pending(oneshot::Receiver<Result<(), String>>),
}

/// Application hook consulted before publish and play
pub trait Authorizer: Send + Sync {
    fn authorize(&self, request: &AuthRequest) -> AuthDecision;
}

/// Authorizer that lets everything through
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl Authorizer for AllowAll {
    fn authorize(&self, _request: &AuthRequest) -> AuthDecision {
        AuthDecision::Allow
    }
}

impl<F> Authorizer for F
where
    F: Fn(&AuthRequest) -> AuthDecision + Send + Sync,
{
    fn authorize(&self, request: &AuthRequest) -> AuthDecision {
        self(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(action: AuthAction, token: Option<&str>) -> AuthRequest {
        AuthRequest {
            session_id: SessionId::new(),
            action,
            app: "live".to_string(),
            path: "/live/test".to_string(),
            args: token
                .map(|t| HashMap::from([("token".to_string(), t.to_string())]))
                .unwrap_or_default(),
        }
    }

    #[test]
    fn test_closure_authorizer() {
        let check = |req: &AuthRequest| match req.args.get("token").map(String::as_str) {
            Some("secret") => AuthDecision::Allow,
            _ => AuthDecision::Deny("bad token".to_string()),
        };

        assert!(matches!(check.authorize(&request(AuthAction::Publish, Some("secret"))), AuthDecision::Allow));
        assert!(matches!(check.authorize(&request(AuthAction::Publish, None)), AuthDecision::Deny(_)));
        assert!(matches!(AllowAll.authorize(&request(AuthAction::Play, None)), AuthDecision::Allow));
    }

    #[test]
    fn test_unauthorized_codes() {
        assert_eq!(AuthAction::Publish.unauthorized_code(), "NetStream.Publish.Unauthorized");
        assert_eq!(AuthAction::Play.unauthorized_code(), "NetStream.Play.Unauthorized");
    }
}
