use std::env;
use std::path::PathBuf;

/// Configurazione del client, letta dalle variabili d'ambiente (eventualmente
/// caricate da un file .env tramite dotenvy all'avvio del binario).
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base URL dell'API remota, senza slash finale.
    pub api_base_url: String,
    /// Directory dove vengono persistiti token e identità della sessione.
    pub session_dir: PathBuf,
    pub request_timeout_secs: u64,
    /// Dopo una mutazione riuscita, gli schermi richiedono un re-fetch completo
    /// invece di applicare una patch locale ottimistica.
    pub refetch_after_mutation: bool,
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self {
            api_base_url: trim_base_url(
                env::var("RENNA_API_URL").unwrap_or_else(|_| "http://127.0.0.1:3000".into()),
            ),
            session_dir: env::var("RENNA_SESSION_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".renna")),
            request_timeout_secs: env::var("RENNA_REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            refetch_after_mutation: env::var("RENNA_REFETCH_AFTER_MUTATION")
                .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
                .unwrap_or(true),
        }
    }

    /// Configurazione puntata a un server arbitrario, usata dai test con il
    /// server fittizio in-process.
    pub fn with_base_url(base_url: impl Into<String>, session_dir: impl Into<PathBuf>) -> Self {
        Self {
            api_base_url: trim_base_url(base_url.into()),
            session_dir: session_dir.into(),
            request_timeout_secs: 10,
            refetch_after_mutation: true,
        }
    }
}

fn trim_base_url(mut url: String) -> String {
    while url.ends_with('/') {
        url.pop();
    }
    url
}
