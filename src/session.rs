use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use crate::api::ApiClient;
use crate::error::AppError;
use crate::models::{LoginPayload, RegisterPayload, User};

// Chiavi fisse nello storage locale.
const TOKEN_KEY: &str = "auth_token";
const IDENTITY_KEY: &str = "current_user.json";

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Anonymous,
    Authenticating,
    Authenticated(User),
}

/// Persistenza di token e identità su due chiavi fisse in una directory
/// locale. La scrittura non è atomica tra le due chiavi: prima il token, poi
/// l'identità; un crash nel mezzo lascia una sessione inutilizzabile che il
/// restore tratta come assente e ripulisce.
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn load(&self) -> Option<(String, User)> {
        let token = fs::read_to_string(self.dir.join(TOKEN_KEY)).ok()?;
        let token = token.trim().to_string();
        if token.is_empty() {
            return None;
        }
        let raw = fs::read_to_string(self.dir.join(IDENTITY_KEY)).ok()?;
        let user = serde_json::from_str::<User>(&raw).ok()?;
        Some((token, user))
    }

    pub fn save(&self, token: &str, user: &User) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.dir.join(TOKEN_KEY), token)?;
        let raw = serde_json::to_string(user).map_err(io::Error::other)?;
        fs::write(self.dir.join(IDENTITY_KEY), raw)
    }

    pub fn purge(&self) {
        let _ = fs::remove_file(self.dir.join(TOKEN_KEY));
        let _ = fs::remove_file(self.dir.join(IDENTITY_KEY));
    }
}

/// Macchina a stati della sessione: `Anonymous → Authenticating →
/// Authenticated → Anonymous`, con ritorno ad `Anonymous` su fallimento.
///
/// Possiede lo store su disco e imposta/azzera il token sull'`ApiClient`
/// condiviso, così l'adapter resta l'unico a conoscere l'header Bearer.
pub struct Session {
    api: Arc<ApiClient>,
    store: SessionStore,
    state: SessionState,
}

impl Session {
    pub fn new(api: Arc<ApiClient>, store: SessionStore) -> Self {
        Self {
            api,
            store,
            state: SessionState::Anonymous,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn current_user(&self) -> Option<&User> {
        match &self.state {
            SessionState::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    /// All'avvio: legge token e identità persistiti, marca subito la sessione
    /// come autenticata in via ottimistica, poi la verifica con `get_me`. Se
    /// la verifica fallisce si torna ad `Anonymous` e lo storage viene
    /// ripulito.
    pub async fn restore(&mut self) -> &SessionState {
        let Some((token, user)) = self.store.load() else {
            self.state = SessionState::Anonymous;
            return &self.state;
        };
        self.api.set_token(&token);
        self.state = SessionState::Authenticated(user);

        match self.api.get_me().await {
            Ok(me) => {
                // Identità aggiornata dal server, ripersistita.
                if let Err(e) = self.store.save(&token, &me) {
                    tracing::warn!("failed to persist refreshed identity: {e}");
                }
                self.state = SessionState::Authenticated(me);
            }
            Err(e) => {
                tracing::info!("session verification failed, signing out: {e}");
                self.store.purge();
                self.api.clear_token();
                self.state = SessionState::Anonymous;
            }
        }
        &self.state
    }

    pub async fn sign_in(&mut self, username: &str, password: &str) -> Result<User, AppError> {
        self.state = SessionState::Authenticating;
        let result = self
            .api
            .login(&LoginPayload {
                username: username.to_string(),
                password: password.to_string(),
            })
            .await;
        self.finish_auth(result)
    }

    pub async fn sign_up(
        &mut self,
        username: &str,
        display_name: &str,
        password: &str,
    ) -> Result<User, AppError> {
        self.state = SessionState::Authenticating;
        let result = self
            .api
            .register(&RegisterPayload {
                username: username.to_string(),
                display_name: display_name.to_string(),
                password: password.to_string(),
            })
            .await;
        self.finish_auth(result)
    }

    fn finish_auth(
        &mut self,
        result: Result<crate::models::AuthResponse, AppError>,
    ) -> Result<User, AppError> {
        match result {
            Ok(auth) => {
                self.api.set_token(&auth.token);
                if let Err(e) = self.store.save(&auth.token, &auth.user) {
                    tracing::warn!("failed to persist session: {e}");
                }
                self.state = SessionState::Authenticated(auth.user.clone());
                Ok(auth.user)
            }
            Err(e) => {
                self.state = SessionState::Anonymous;
                Err(e)
            }
        }
    }

    /// Ripulisce storage e token prima di azzerare l'identità in memoria.
    pub fn sign_out(&mut self) {
        self.store.purge();
        self.api.clear_token();
        self.state = SessionState::Anonymous;
    }

    /// Un 401 da un qualunque endpoint autenticato invalida la sessione.
    pub fn handle_auth_failure(&mut self, err: &AppError) {
        if err.is_auth_failure() && self.state != SessionState::Anonymous {
            tracing::info!("authentication rejected by server, purging session");
            self.sign_out();
        }
    }
}
