use serde::Deserialize;

/// Classificazione chiusa di tutto ciò che può andare storto parlando con l'API.
/// Ogni errore viene classificato una sola volta, al confine dell'adapter HTTP;
/// gli strati superiori consumano la classificazione senza rideriverla.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Nessuna risposta raggiunta (DNS, connessione rifiutata, timeout).
    Network,
    /// Errore generico riportato dal server (status non mappati altrove).
    Api,
    /// 400, oppure input locale non valido sintetizzato lato client.
    Validation,
    Authentication,
    Authorization,
    NotFound,
    /// 5xx.
    Server,
    Unknown,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct AppError {
    pub kind: ErrorKind,
    /// Messaggio "macchina", per i log.
    pub message: String,
    pub status: Option<u16>,
    /// Messaggio da mostrare all'utente.
    pub user_message: String,
}

/// Corpo d'errore standard dell'API: `{"error": "..."}`.
#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

pub fn classify_status(status: u16) -> ErrorKind {
    match status {
        400 => ErrorKind::Validation,
        401 => ErrorKind::Authentication,
        403 => ErrorKind::Authorization,
        404 => ErrorKind::NotFound,
        500..=599 => ErrorKind::Server,
        _ => ErrorKind::Api,
    }
}

fn default_user_message(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Network => "Unable to reach the server. Check your connection.",
        ErrorKind::Api => "The server could not complete the request.",
        ErrorKind::Validation => "Some of the provided data is not valid.",
        ErrorKind::Authentication => "Your session has expired. Please sign in again.",
        ErrorKind::Authorization => "You are not allowed to perform this action.",
        ErrorKind::NotFound => "The requested item could not be found.",
        ErrorKind::Server => "The server ran into a problem. Try again later.",
        ErrorKind::Unknown => "Something went wrong.",
    }
}

impl AppError {
    /// Errore di classe `Validation` sintetizzato lato client, senza round-trip di rete.
    pub fn validation(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind: ErrorKind::Validation,
            user_message: message.clone(),
            message,
            status: None,
        }
    }

    /// Classifica una risposta non-2xx. Se il corpo porta `{"error": ...}`,
    /// quel testo diventa il messaggio per l'utente.
    pub fn from_response(status: u16, body: Option<String>) -> Self {
        let kind = classify_status(status);
        let server_message = body
            .as_deref()
            .and_then(|text| serde_json::from_str::<ErrorBody>(text).ok())
            .map(|b| b.error);
        let user_message = server_message
            .clone()
            .unwrap_or_else(|| default_user_message(kind).to_string());
        Self {
            kind,
            message: server_message.unwrap_or_else(|| format!("HTTP {status}")),
            status: Some(status),
            user_message,
        }
    }

    pub fn is_auth_failure(&self) -> bool {
        self.kind == ErrorKind::Authentication
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        // Una risposta c'è stata ma il corpo non è decodificabile: non è un
        // problema di rete, è il server che parla un dialetto inatteso.
        let kind = if e.is_decode() {
            ErrorKind::Api
        } else {
            ErrorKind::Network
        };
        Self {
            kind,
            message: e.to_string(),
            status: e.status().map(|s| s.as_u16()),
            user_message: default_user_message(kind).to_string(),
        }
    }
}
