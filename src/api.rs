use std::sync::RwLock;
use std::time::Duration;

use reqwest::{Client as HttpClient, Method, RequestBuilder, Response, header};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::ClientConfig;
use crate::error::AppError;
use crate::models::*;

/// Adapter HTTP verso l'API remota: un metodo per endpoint, corpo JSON,
/// header `Authorization: Bearer <token>` quando un token è impostato.
///
/// Il token vive dentro l'istanza, non in uno stato globale di modulo: il
/// client viene passato per `Arc` a servizi e sessione, e i test possono
/// costruire istanze indipendenti.
pub struct ApiClient {
    http: HttpClient,
    base_url: String,
    token: RwLock<Option<String>>,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self, AppError> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.api_base_url.clone(),
            token: RwLock::new(None),
        })
    }

    /// Da chiamare una volta all'apertura della sessione.
    pub fn set_token(&self, token: &str) {
        *self.token.write().unwrap() = Some(token.to_string());
    }

    /// Da chiamare al sign-out.
    pub fn clear_token(&self) {
        *self.token.write().unwrap() = None;
    }

    pub fn has_token(&self) -> bool {
        self.token.read().unwrap().is_some()
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut builder = self
            .http
            .request(method, format!("{}{}", self.base_url, path));
        if let Some(token) = self.token.read().unwrap().as_deref() {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder
    }

    /// Punto unico di classificazione: qui, e solo qui, lo status HTTP
    /// diventa un `ErrorKind`.
    async fn decode<T: DeserializeOwned>(res: Response) -> Result<T, AppError> {
        let status = res.status();
        if status.is_success() {
            Ok(res.json::<T>().await?)
        } else {
            Err(AppError::from_response(status.as_u16(), res.text().await.ok()))
        }
    }

    async fn expect_ok(res: Response) -> Result<(), AppError> {
        let status = res.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(AppError::from_response(status.as_u16(), res.text().await.ok()))
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, AppError> {
        Self::decode(self.request(Method::GET, path).send().await?).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, AppError> {
        Self::decode(self.request(Method::POST, path).json(body).send().await?).await
    }

    // --- Auth ---

    pub async fn register(&self, payload: &RegisterPayload) -> Result<AuthResponse, AppError> {
        self.post_json("/api/auth/register", payload).await
    }

    pub async fn login(&self, payload: &LoginPayload) -> Result<AuthResponse, AppError> {
        self.post_json("/api/auth/login", payload).await
    }

    pub async fn get_me(&self) -> Result<User, AppError> {
        self.get_json("/api/auth/me").await
    }

    // --- Gruppi ---

    pub async fn get_groups(&self) -> Result<Vec<Group>, AppError> {
        self.get_json("/api/groups").await
    }

    pub async fn create_group(&self, payload: &CreateGroupPayload) -> Result<Group, AppError> {
        self.post_json("/api/groups", payload).await
    }

    pub async fn get_group(&self, group_id: i64) -> Result<Group, AppError> {
        self.get_json(&format!("/api/groups/{group_id}")).await
    }

    pub async fn update_group(
        &self,
        group_id: i64,
        payload: &UpdateGroupPayload,
    ) -> Result<Group, AppError> {
        Self::decode(
            self.request(Method::PUT, &format!("/api/groups/{group_id}"))
                .json(payload)
                .send()
                .await?,
        )
        .await
    }

    pub async fn delete_group(&self, group_id: i64) -> Result<(), AppError> {
        Self::expect_ok(
            self.request(Method::DELETE, &format!("/api/groups/{group_id}"))
                .send()
                .await?,
        )
        .await
    }

    // --- Inviti e membri ---

    pub async fn invite_user(
        &self,
        group_id: i64,
        payload: &InvitePayload,
    ) -> Result<Invitation, AppError> {
        self.post_json(&format!("/api/groups/{group_id}/invite"), payload)
            .await
    }

    pub async fn pending_invitations(&self) -> Result<Vec<Invitation>, AppError> {
        self.get_json("/api/groups/invitations/pending").await
    }

    pub async fn accept_invitation(&self, invitation_id: i64) -> Result<(), AppError> {
        Self::expect_ok(
            self.request(
                Method::POST,
                &format!("/api/groups/invitations/{invitation_id}/accept"),
            )
            .send()
            .await?,
        )
        .await
    }

    pub async fn reject_invitation(&self, invitation_id: i64) -> Result<(), AppError> {
        Self::expect_ok(
            self.request(
                Method::POST,
                &format!("/api/groups/invitations/{invitation_id}/reject"),
            )
            .send()
            .await?,
        )
        .await
    }

    pub async fn cancel_invitation(
        &self,
        group_id: i64,
        invitation_id: i64,
    ) -> Result<(), AppError> {
        Self::expect_ok(
            self.request(
                Method::DELETE,
                &format!("/api/groups/{group_id}/invitations/{invitation_id}"),
            )
            .send()
            .await?,
        )
        .await
    }

    pub async fn remove_member(&self, group_id: i64, user_id: i64) -> Result<(), AppError> {
        Self::expect_ok(
            self.request(
                Method::DELETE,
                &format!("/api/groups/{group_id}/members/{user_id}"),
            )
            .send()
            .await?,
        )
        .await
    }

    // --- Abbinamenti ---

    pub async fn assign_secret_santa(&self, group_id: i64) -> Result<(), AppError> {
        Self::expect_ok(
            self.request(Method::POST, &format!("/api/groups/{group_id}/assign"))
                .send()
                .await?,
        )
        .await
    }

    pub async fn get_assignment(&self, group_id: i64) -> Result<Assignment, AppError> {
        self.get_json(&format!("/api/groups/{group_id}/assignment"))
            .await
    }

    pub async fn delete_assignments(&self, group_id: i64) -> Result<(), AppError> {
        Self::expect_ok(
            self.request(
                Method::DELETE,
                &format!("/api/groups/{group_id}/assignments"),
            )
            .send()
            .await?,
        )
        .await
    }

    // --- Idee regalo ---

    pub async fn create_gift_idea(
        &self,
        group_id: i64,
        payload: &CreateGiftIdeaPayload,
    ) -> Result<GiftIdea, AppError> {
        self.post_json(&format!("/api/groups/{group_id}/gift-ideas"), payload)
            .await
    }

    pub async fn list_gift_ideas(&self, group_id: i64) -> Result<Vec<GiftIdea>, AppError> {
        self.get_json(&format!("/api/groups/{group_id}/gift-ideas"))
            .await
    }

    pub async fn update_gift_idea(
        &self,
        group_id: i64,
        idea_id: i64,
        payload: &UpdateGiftIdeaPayload,
    ) -> Result<GiftIdea, AppError> {
        Self::decode(
            self.request(
                Method::PUT,
                &format!("/api/groups/{group_id}/gift-ideas/{idea_id}"),
            )
            .json(payload)
            .send()
            .await?,
        )
        .await
    }

    pub async fn delete_gift_idea(&self, group_id: i64, idea_id: i64) -> Result<(), AppError> {
        Self::expect_ok(
            self.request(
                Method::DELETE,
                &format!("/api/groups/{group_id}/gift-ideas/{idea_id}"),
            )
            .send()
            .await?,
        )
        .await
    }
}
