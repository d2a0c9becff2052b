use std::sync::Arc;

use crate::http::ApiClient;
use crate::models::{LoginPayload, RegisterPayload, TokenPair, User};

/// Current tokens and profile, plus the status of the last session action.
pub struct SessionState {
    client: Arc<ApiClient>,
    pub access: String,
    pub refresh: String,
    pub user: Option<User>,
    pub username: String,
    pub loading: bool,
    pub error: Option<String>,
}

impl SessionState {
    /// Restores whatever session the credential store still holds.
    pub fn new(client: Arc<ApiClient>) -> Self {
        let tokens = client.credentials().get();
        let username = client.credentials().username();
        SessionState {
            client,
            access: tokens.access,
            refresh: tokens.refresh,
            user: None,
            username,
            loading: false,
            error: None,
        }
    }

    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    pub fn is_authenticated(&self) -> bool {
        !self.access.is_empty()
    }

    pub fn user_id(&self) -> Option<u64> {
        self.user.as_ref().map(|user| user.id)
    }

    /// Re-reads the token slots. The client rewrites them behind the
    /// session's back when it refreshes or gives up on a refresh.
    pub fn sync_tokens(&mut self) {
        let tokens = self.client.credentials().get();
        if tokens.access.is_empty() && self.is_authenticated() {
            tracing::info!("Stored session was cleared");
            self.user = None;
            self.username.clear();
        }
        self.access = tokens.access;
        self.refresh = tokens.refresh;
    }

    pub async fn login(&mut self, payload: &LoginPayload) -> bool {
        self.loading = true;
        self.error = None;

        let result = self.client.auth().login(payload).await;
        let ok = match result {
            Ok(tokens) => {
                self.set_session(tokens, &payload.username);
                self.load_me().await;
                true
            }
            Err(err) => {
                tracing::warn!(username = %payload.username, error = %err, "Login failed");
                self.error = Some(message_or(err.to_string(), "Login failed"));
                false
            }
        };

        self.loading = false;
        ok
    }

    /// Registers the account, then logs in with the same credentials.
    pub async fn register(&mut self, payload: &RegisterPayload) -> bool {
        self.loading = true;
        self.error = None;

        let login = LoginPayload {
            username: payload.username.clone(),
            password: payload.password.clone(),
        };
        let auth = self.client.auth();
        let result = match auth.register(payload).await {
            Ok(_) => auth.login(&login).await,
            Err(err) => Err(err),
        };

        let ok = match result {
            Ok(tokens) => {
                self.set_session(tokens, &payload.username);
                self.load_me().await;
                true
            }
            Err(err) => {
                tracing::warn!(username = %payload.username, error = %err, "Registration failed");
                self.error = Some(message_or(err.to_string(), "Registration failed"));
                false
            }
        };

        self.loading = false;
        ok
    }

    /// Local only, safe to call repeatedly.
    pub fn logout(&mut self) {
        self.client.auth().logout();
        self.access.clear();
        self.refresh.clear();
        self.user = None;
        self.username.clear();
        self.error = None;
    }

    /// Fetches the profile of the logged-in user. Never fails outward:
    /// any problem is logged and reported as `false`.
    pub async fn load_me(&mut self) -> bool {
        if !self.is_authenticated() {
            return false;
        }
        let result = self.client.auth().me().await;
        self.sync_tokens();
        match result {
            Ok(user) => {
                let username = user.username.clone();
                self.user = Some(user);
                self.set_username(&username);
                true
            }
            Err(err) => {
                tracing::debug!(error = %err, "Could not load current user");
                false
            }
        }
    }

    fn set_session(&mut self, tokens: TokenPair, username: &str) {
        self.client.credentials().set(&tokens);
        self.access = tokens.access;
        self.refresh = tokens.refresh;
        self.set_username(username);
    }

    fn set_username(&mut self, username: &str) {
        self.username = username.to_string();
        self.client.credentials().set_username(username);
    }
}

fn message_or(message: String, fallback: &str) -> String {
    if message.is_empty() {
        fallback.to_string()
    } else {
        message
    }
}

/// "First Last" when the profile has names, else the username, else a
/// generic label.
pub fn display_name(session: &SessionState) -> String {
    let full = session
        .user
        .as_ref()
        .map(|user| {
            format!(
                "{} {}",
                user.first_name.as_deref().unwrap_or(""),
                user.last_name.as_deref().unwrap_or("")
            )
            .trim()
            .to_string()
        })
        .unwrap_or_default();

    if !full.is_empty() {
        full
    } else if !session.username.is_empty() {
        session.username.clone()
    } else {
        "User".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::CredentialStore;

    fn session() -> SessionState {
        let client = ApiClient::with_reqwest("http://localhost:8000", CredentialStore::in_memory());
        SessionState::new(Arc::new(client))
    }

    #[test]
    fn test_display_name_fallbacks() {
        let mut s = session();
        assert_eq!(display_name(&s), "User");

        s.username = "alice".into();
        assert_eq!(display_name(&s), "alice");

        s.user = Some(User {
            id: 1,
            username: "alice".into(),
            email: None,
            first_name: Some("Alice".into()),
            last_name: None,
        });
        assert_eq!(display_name(&s), "Alice");
    }

    #[test]
    fn test_logout_is_local_and_idempotent() {
        let mut s = session();
        s.client().credentials().set(&TokenPair {
            access: "a".into(),
            refresh: "r".into(),
        });
        s.sync_tokens();
        assert!(s.is_authenticated());

        s.logout();
        s.logout();
        assert!(!s.is_authenticated());
        assert!(s.client().credentials().get().is_empty());
    }

    #[tokio::test]
    async fn test_load_me_without_session_is_noop() {
        let mut s = session();
        assert!(!s.load_me().await);
        assert!(s.user.is_none());
    }
}
