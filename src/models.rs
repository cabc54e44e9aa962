use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

// --- Entità di dominio ---

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Group {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub creator_id: i64,
    // Presenti solo nella risposta di dettaglio, non nella lista.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<GroupMember>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_invitations: Option<Vec<Invitation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<User>,
}

impl Group {
    pub fn member_count(&self) -> Option<usize> {
        self.members.as_ref().map(|m| m.len())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GroupMember {
    pub user_id: i64,
    pub username: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub joined_at: OffsetDateTime,
}

/// Invito in sospeso. Porta campi denormalizzati (nome del gruppo, nome di chi
/// invita) così la lista degli inviti non richiede fetch aggiuntivi.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Invitation {
    pub id: i64,
    pub group_id: i64,
    pub inviter_id: i64,
    pub invitee_username: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub group_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_description: Option<String>,
    pub inviter_display_name: String,
}

/// L'unico arco del grafo degli abbinamenti visibile al chiamante: la persona
/// a cui deve fare il regalo. Il grafo completo resta sul server.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Assignment {
    pub receiver_id: i64,
    pub receiver_username: String,
    pub receiver_display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_image: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GiftIdea {
    pub id: i64,
    pub group_id: i64,
    pub for_user_id: i64,
    pub creator_id: i64,
    pub idea: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub for_user: Option<User>,
}

// --- Payload delle richieste ---

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterPayload {
    pub username: String,
    pub display_name: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginPayload {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateGroupPayload {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Solo immagine e descrizione sono mutabili, e solo dal creatore.
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct UpdateGroupPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InvitePayload {
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateGiftIdeaPayload {
    pub for_user_id: i64,
    pub idea: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct UpdateGiftIdeaPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idea: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}
