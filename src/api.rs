use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::http::{ApiClient, RequestOptions};
use crate::models::{
    LoginPayload, Project, ProjectPatch, ProjectRequest, RegisterPayload, Task, TaskPatch,
    TaskRequest, Team, TeamPatch, TeamRequest, TokenPair, User, UserPatch, UserRequest,
    UserSummary,
};

/// Query parameters accepted by the list endpoints.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ListFilter {
    pub search: Option<String>,
    pub ordering: Option<String>,
    /// Collection-specific filters such as `project`, `status` or `due_before`.
    pub params: Vec<(String, String)>,
}

impl ListFilter {
    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn ordering(mut self, ordering: impl Into<String>) -> Self {
        self.ordering = Some(ordering.into());
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            query.push(("search".to_string(), search.to_string()));
        }
        if let Some(ordering) = self.ordering.as_deref().filter(|s| !s.is_empty()) {
            query.push(("ordering".to_string(), ordering.to_string()));
        }
        query.extend(self.params.iter().cloned());
        query
    }
}

/// A REST collection living under a fixed path.
pub trait Resource: DeserializeOwned {
    const PATH: &'static str;
    type Create: Serialize + Sync;
    type Patch: Serialize + Sync;
}

impl Resource for Project {
    const PATH: &'static str = "/api/projects/";
    type Create = ProjectRequest;
    type Patch = ProjectPatch;
}

impl Resource for Task {
    const PATH: &'static str = "/api/tasks/";
    type Create = TaskRequest;
    type Patch = TaskPatch;
}

impl Resource for Team {
    const PATH: &'static str = "/api/teams/";
    type Create = TeamRequest;
    type Patch = TeamPatch;
}

impl Resource for UserSummary {
    const PATH: &'static str = "/api/users/";
    type Create = UserRequest;
    type Patch = UserPatch;
}

/// Typed pass-through to the client for one collection.
pub struct Collection<'c, R> {
    client: &'c ApiClient,
    _resource: PhantomData<fn() -> R>,
}

impl<'c, R: Resource> Collection<'c, R> {
    fn new(client: &'c ApiClient) -> Self {
        Collection {
            client,
            _resource: PhantomData,
        }
    }

    fn item_path(id: u64) -> String {
        format!("{}{}/", R::PATH, id)
    }

    pub async fn list(&self, filter: &ListFilter) -> Result<Vec<R>, ApiError> {
        self.client
            .request(R::PATH, RequestOptions::get().query(filter.to_query()))
            .await
    }

    pub async fn get(&self, id: u64) -> Result<R, ApiError> {
        self.client
            .request(&Self::item_path(id), RequestOptions::get())
            .await
    }

    pub async fn create(&self, payload: &R::Create) -> Result<R, ApiError> {
        self.client
            .request(R::PATH, RequestOptions::post(payload)?)
            .await
    }

    pub async fn update(&self, id: u64, patch: &R::Patch) -> Result<R, ApiError> {
        self.client
            .request(&Self::item_path(id), RequestOptions::patch(patch)?)
            .await
    }

    pub async fn delete(&self, id: u64) -> Result<(), ApiError> {
        self.client
            .request_value(&Self::item_path(id), RequestOptions::delete())
            .await?;
        Ok(())
    }
}

pub struct AuthApi<'c> {
    client: &'c ApiClient,
}

impl<'c> AuthApi<'c> {
    /// Exchanges credentials for a token pair and stores it.
    pub async fn login(&self, payload: &LoginPayload) -> Result<TokenPair, ApiError> {
        let tokens: TokenPair = self
            .client
            .request("/api/auth/login/", RequestOptions::post(payload)?.without_auth())
            .await?;
        self.client.credentials().set(&tokens);
        tracing::info!(username = %payload.username, "Logged in");
        Ok(tokens)
    }

    /// Registration does not return tokens; callers log in afterwards.
    pub async fn register(&self, payload: &RegisterPayload) -> Result<Value, ApiError> {
        let created = self
            .client
            .request_value(
                "/api/auth/register/",
                RequestOptions::post(payload)?.without_auth(),
            )
            .await?;
        Ok(created.unwrap_or(Value::Null))
    }

    /// Fetches the current profile. A body that does not have the shape of
    /// a user is reported as [`ApiError::Decode`].
    pub async fn me(&self) -> Result<User, ApiError> {
        self.client
            .request("/api/auth/me/", RequestOptions::get())
            .await
    }

    /// Local only: forgets the stored credentials.
    pub fn logout(&self) {
        self.client.credentials().clear();
    }
}

impl ApiClient {
    pub fn auth(&self) -> AuthApi<'_> {
        AuthApi { client: self }
    }

    pub fn projects(&self) -> Collection<'_, Project> {
        Collection::new(self)
    }

    pub fn tasks(&self) -> Collection<'_, Task> {
        Collection::new(self)
    }

    pub fn teams(&self) -> Collection<'_, Team> {
        Collection::new(self)
    }

    pub fn users(&self) -> Collection<'_, UserSummary> {
        Collection::new(self)
    }
}
