use std::sync::Arc;

use crate::api::ApiClient;
use crate::error::{AppError, ErrorKind};
use crate::models::*;

/// Esito della ricerca del proprio abbinamento. Sostituisce il `null`
/// sovraccarico del client originale: chiamanti e test possono distinguere
/// "non sono membro", "non ancora estratto" e "errore".
#[derive(Debug, Clone)]
pub enum AssignmentLookup {
    Drawn(Assignment),
    NotDrawnYet,
    NotMember,
    Unavailable(AppError),
}

impl AssignmentLookup {
    pub fn drawn(&self) -> Option<&Assignment> {
        match self {
            AssignmentLookup::Drawn(a) => Some(a),
            _ => None,
        }
    }
}

/// Gli schermi forniscono identificatori come stringhe (navigazione, deep
/// link). Un ID valido è un intero strettamente positivo; tutto il resto viene
/// rifiutato prima di toccare la rete.
pub fn parse_id(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok().filter(|id| *id > 0)
}

fn invalid_id_error(what: &str) -> AppError {
    AppError::validation(format!("{what} ID must be a positive number."))
}

/// Operazioni di dominio su gruppi, inviti, membri e abbinamenti.
///
/// Asimmetria deliberata: le letture degradano a risultato vuoto (la UI mostra
/// uno stato vuoto invece di un banner d'errore), le scritture restituiscono
/// sempre un errore tipizzato che il chiamante deve gestire.
pub struct GroupService {
    api: Arc<ApiClient>,
}

impl GroupService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    // --- Letture (degradano, non falliscono mai) ---

    pub async fn groups(&self) -> Vec<Group> {
        match self.api.get_groups().await {
            Ok(groups) => groups,
            Err(e) => {
                tracing::warn!("fetching groups failed, rendering empty list: {e}");
                Vec::new()
            }
        }
    }

    pub async fn group(&self, raw_id: &str) -> Option<Group> {
        let Some(group_id) = parse_id(raw_id) else {
            tracing::warn!("invalid group id {raw_id:?}, skipping fetch");
            return None;
        };
        match self.api.get_group(group_id).await {
            Ok(group) => Some(group),
            Err(e) => {
                tracing::warn!("fetching group {group_id} failed: {e}");
                None
            }
        }
    }

    pub async fn pending_invitations(&self) -> Vec<Invitation> {
        match self.api.pending_invitations().await {
            Ok(invitations) => invitations,
            Err(e) => {
                tracing::warn!("fetching invitations failed, rendering empty list: {e}");
                Vec::new()
            }
        }
    }

    /// Il proprio arco di abbinamento, con esito etichettato.
    pub async fn assignment(&self, raw_id: &str) -> AssignmentLookup {
        let Some(group_id) = parse_id(raw_id) else {
            return AssignmentLookup::Unavailable(invalid_id_error("Group"));
        };
        match self.api.get_assignment(group_id).await {
            Ok(assignment) => AssignmentLookup::Drawn(assignment),
            Err(e) if e.kind == ErrorKind::NotFound => AssignmentLookup::NotDrawnYet,
            Err(e) if e.kind == ErrorKind::Authorization => AssignmentLookup::NotMember,
            Err(e) => {
                tracing::warn!("fetching assignment for group {group_id} failed: {e}");
                AssignmentLookup::Unavailable(e)
            }
        }
    }

    // --- Scritture (errore tipizzato al chiamante) ---

    pub async fn create_group(
        &self,
        name: &str,
        description: Option<String>,
    ) -> Result<Group, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::validation("Group name cannot be empty."));
        }
        self.api
            .create_group(&CreateGroupPayload {
                name: name.to_string(),
                description: description.filter(|d| !d.trim().is_empty()),
                image: None,
            })
            .await
    }

    pub async fn update_group(
        &self,
        raw_id: &str,
        payload: UpdateGroupPayload,
    ) -> Result<Group, AppError> {
        let group_id = parse_id(raw_id).ok_or_else(|| invalid_id_error("Group"))?;
        self.api.update_group(group_id, &payload).await
    }

    pub async fn delete_group(&self, raw_id: &str) -> Result<(), AppError> {
        let group_id = parse_id(raw_id).ok_or_else(|| invalid_id_error("Group"))?;
        self.api.delete_group(group_id).await
    }

    pub async fn invite(&self, raw_id: &str, username: &str) -> Result<Invitation, AppError> {
        let group_id = parse_id(raw_id).ok_or_else(|| invalid_id_error("Group"))?;
        let username = username.trim();
        if username.is_empty() {
            return Err(AppError::validation("You must name a user to invite."));
        }
        self.api
            .invite_user(
                group_id,
                &InvitePayload {
                    username: username.to_string(),
                },
            )
            .await
    }

    pub async fn accept_invitation(&self, raw_id: &str) -> Result<(), AppError> {
        let invitation_id = parse_id(raw_id).ok_or_else(|| invalid_id_error("Invitation"))?;
        self.api.accept_invitation(invitation_id).await
    }

    pub async fn reject_invitation(&self, raw_id: &str) -> Result<(), AppError> {
        let invitation_id = parse_id(raw_id).ok_or_else(|| invalid_id_error("Invitation"))?;
        self.api.reject_invitation(invitation_id).await
    }

    /// Annullamento da parte del proprietario del gruppo.
    pub async fn cancel_invitation(&self, raw_gid: &str, raw_iid: &str) -> Result<(), AppError> {
        let group_id = parse_id(raw_gid).ok_or_else(|| invalid_id_error("Group"))?;
        let invitation_id = parse_id(raw_iid).ok_or_else(|| invalid_id_error("Invitation"))?;
        self.api.cancel_invitation(group_id, invitation_id).await
    }

    pub async fn remove_member(&self, raw_id: &str, user_id: i64) -> Result<(), AppError> {
        let group_id = parse_id(raw_id).ok_or_else(|| invalid_id_error("Group"))?;
        self.api.remove_member(group_id, user_id).await
    }

    /// Lasciare il gruppo è rimuovere sé stessi.
    pub async fn leave_group(&self, raw_id: &str, own_user_id: i64) -> Result<(), AppError> {
        let group_id = parse_id(raw_id).ok_or_else(|| invalid_id_error("Group"))?;
        self.api.remove_member(group_id, own_user_id).await
    }

    /// Nessuna logica di abbinamento lato client: una singola POST. La
    /// permutazione senza punti fissi, e la verifica del minimo di due membri,
    /// avvengono sul server.
    pub async fn assign_secret_santa(&self, raw_id: &str) -> Result<(), AppError> {
        let group_id = parse_id(raw_id).ok_or_else(|| invalid_id_error("Group"))?;
        self.api.assign_secret_santa(group_id).await
    }

    /// Undo: distrugge in blocco tutti gli abbinamenti del gruppo.
    pub async fn delete_assignments(&self, raw_id: &str) -> Result<(), AppError> {
        let group_id = parse_id(raw_id).ok_or_else(|| invalid_id_error("Group"))?;
        self.api.delete_assignments(group_id).await
    }
}

/// Idee regalo: CRUD ristretto al creatore, visibilità risolta dal server.
pub struct GiftIdeaService {
    api: Arc<ApiClient>,
}

impl GiftIdeaService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    pub async fn ideas(&self, raw_id: &str) -> Vec<GiftIdea> {
        let Some(group_id) = parse_id(raw_id) else {
            tracing::warn!("invalid group id {raw_id:?}, skipping gift idea fetch");
            return Vec::new();
        };
        match self.api.list_gift_ideas(group_id).await {
            Ok(ideas) => ideas,
            Err(e) => {
                tracing::warn!("fetching gift ideas for group {group_id} failed: {e}");
                Vec::new()
            }
        }
    }

    pub async fn add(
        &self,
        raw_id: &str,
        for_user_id: i64,
        idea: &str,
        link: Option<String>,
    ) -> Result<GiftIdea, AppError> {
        let group_id = parse_id(raw_id).ok_or_else(|| invalid_id_error("Group"))?;
        let idea = idea.trim();
        if idea.is_empty() {
            return Err(AppError::validation("A gift idea cannot be empty."));
        }
        self.api
            .create_gift_idea(
                group_id,
                &CreateGiftIdeaPayload {
                    for_user_id,
                    idea: idea.to_string(),
                    link: link.filter(|l| !l.trim().is_empty()),
                },
            )
            .await
    }

    pub async fn update(
        &self,
        raw_id: &str,
        idea_id: i64,
        payload: UpdateGiftIdeaPayload,
    ) -> Result<GiftIdea, AppError> {
        let group_id = parse_id(raw_id).ok_or_else(|| invalid_id_error("Group"))?;
        if let Some(text) = &payload.idea {
            if text.trim().is_empty() {
                return Err(AppError::validation("A gift idea cannot be empty."));
            }
        }
        self.api.update_gift_idea(group_id, idea_id, &payload).await
    }

    pub async fn remove(&self, raw_id: &str, idea_id: i64) -> Result<(), AppError> {
        let group_id = parse_id(raw_id).ok_or_else(|| invalid_id_error("Group"))?;
        self.api.delete_gift_idea(group_id, idea_id).await
    }
}
