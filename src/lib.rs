// Strato di workflow del client Secret Santa: adapter HTTP, servizi di
// dominio, sessione persistente e contenitori di stato per schermo. Nessun
// codice di rendering.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod screens;
pub mod services;
pub mod session;

pub use api::ApiClient;
pub use config::ClientConfig;
pub use error::{AppError, ErrorKind};
pub use services::{AssignmentLookup, GiftIdeaService, GroupService};
pub use session::{Session, SessionState, SessionStore};
