use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::AppError;
use crate::models::*;
use crate::services::AssignmentLookup;

/// Macchina a stati primaria di ogni schermo legato a una risorsa remota.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadState<T> {
    Idle,
    Loading,
    Loaded(T),
    Failed(String),
}

impl<T> LoadState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }

    pub fn loaded(&self) -> Option<&T> {
        match self {
            LoadState::Loaded(value) => Some(value),
            _ => None,
        }
    }
}

// Ogni refresh ritira un biglietto di generazione; le risposte portano il
// biglietto sotto cui sono partite e vengono scartate se nel frattempo lo
// schermo è stato ricaricato o abbandonato. I biglietti sono unici nel
// processo, non per istanza: anche quando uno schermo viene sostituito da uno
// nuovo (aprire il gruppo 5 e subito dopo il 7), la risposta in ritardo del
// vecchio non può essere assorbita dal successore. Le richieste in volo non
// vengono abortite, ma una risposta stantia non può più mutare lo stato.

static GENERATION_TICKETS: AtomicU64 = AtomicU64::new(0);

// Parte da 1: la generazione 0 di uno schermo mai ricaricato non combacia
// con nessuna risposta.
fn next_generation() -> u64 {
    GENERATION_TICKETS.fetch_add(1, Ordering::Relaxed) + 1
}

/// Schermo home: lista gruppi e inviti in sospeso. Le due fette si caricano
/// in parallelo e possono completare in qualsiasi ordine.
pub struct GroupListScreen {
    refetch_after_mutation: bool,
    generation: u64,
    pub groups: LoadState<Vec<Group>>,
    pub invitations: LoadState<Vec<Invitation>>,
    creating: bool,
    accepting_invitation: bool,
    rejecting_invitation: bool,
    cancelling_invitation: bool,
    alert: Option<String>,
    refetch_wanted: bool,
}

impl GroupListScreen {
    pub fn new(refetch_after_mutation: bool) -> Self {
        Self {
            refetch_after_mutation,
            generation: 0,
            groups: LoadState::Idle,
            invitations: LoadState::Idle,
            creating: false,
            accepting_invitation: false,
            rejecting_invitation: false,
            cancelling_invitation: false,
            alert: None,
            refetch_wanted: false,
        }
    }

    pub fn begin_refresh(&mut self) -> u64 {
        self.generation = next_generation();
        self.groups = LoadState::Loading;
        self.invitations = LoadState::Loading;
        self.generation
    }

    pub fn apply_groups(&mut self, generation: u64, groups: Vec<Group>) {
        if generation != self.generation {
            return;
        }
        self.groups = LoadState::Loaded(groups);
    }

    pub fn apply_invitations(&mut self, generation: u64, invitations: Vec<Invitation>) {
        if generation != self.generation {
            return;
        }
        self.invitations = LoadState::Loaded(invitations);
    }

    pub fn begin_create(&mut self) -> bool {
        if self.creating {
            return false;
        }
        self.creating = true;
        true
    }

    pub fn finish_create(&mut self, result: Result<Group, AppError>) {
        self.creating = false;
        self.note_mutation(result.map(drop));
    }

    pub fn is_creating(&self) -> bool {
        self.creating
    }

    // Accettare, rifiutare e annullare un invito sono azioni indipendenti:
    // una non blocca le altre.
    pub fn begin_accept_invitation(&mut self) -> bool {
        if self.accepting_invitation {
            return false;
        }
        self.accepting_invitation = true;
        true
    }

    pub fn finish_accept_invitation(&mut self, result: Result<(), AppError>) {
        self.accepting_invitation = false;
        self.note_mutation(result);
    }

    pub fn begin_reject_invitation(&mut self) -> bool {
        if self.rejecting_invitation {
            return false;
        }
        self.rejecting_invitation = true;
        true
    }

    pub fn finish_reject_invitation(&mut self, result: Result<(), AppError>) {
        self.rejecting_invitation = false;
        self.note_mutation(result);
    }

    pub fn begin_cancel_invitation(&mut self) -> bool {
        if self.cancelling_invitation {
            return false;
        }
        self.cancelling_invitation = true;
        true
    }

    pub fn finish_cancel_invitation(&mut self, result: Result<(), AppError>) {
        self.cancelling_invitation = false;
        self.note_mutation(result);
    }

    /// Messaggio transitorio da mostrare una volta sola.
    pub fn take_alert(&mut self) -> Option<String> {
        self.alert.take()
    }

    /// Dopo una mutazione riuscita lo schermo chiede un re-fetch completo
    /// (se abilitato in configurazione) invece di applicare patch locali.
    pub fn take_refetch_request(&mut self) -> bool {
        std::mem::take(&mut self.refetch_wanted)
    }

    fn note_mutation(&mut self, result: Result<(), AppError>) {
        match result {
            Ok(()) => self.refetch_wanted = self.refetch_after_mutation,
            // L'errore diventa un alert transitorio; lo stato primario già
            // caricato non regredisce.
            Err(e) => self.alert = Some(e.user_message),
        }
    }
}

/// Schermo di dettaglio gruppo: membri, inviti del gruppo, proprio
/// abbinamento, azioni del proprietario.
pub struct GroupDetailScreen {
    raw_group_id: String,
    refetch_after_mutation: bool,
    generation: u64,
    pub group: LoadState<Group>,
    pub assignment: LoadState<AssignmentLookup>,
    inviting: bool,
    assigning: bool,
    unassigning: bool,
    removing_member: bool,
    deleting: bool,
    leaving: bool,
    alert: Option<String>,
    refetch_wanted: bool,
}

impl GroupDetailScreen {
    pub fn new(raw_group_id: impl Into<String>, refetch_after_mutation: bool) -> Self {
        Self {
            raw_group_id: raw_group_id.into(),
            refetch_after_mutation,
            generation: 0,
            group: LoadState::Idle,
            assignment: LoadState::Idle,
            inviting: false,
            assigning: false,
            unassigning: false,
            removing_member: false,
            deleting: false,
            leaving: false,
            alert: None,
            refetch_wanted: false,
        }
    }

    pub fn raw_group_id(&self) -> &str {
        &self.raw_group_id
    }

    pub fn begin_refresh(&mut self) -> u64 {
        self.generation = next_generation();
        self.group = LoadState::Loading;
        self.assignment = LoadState::Loading;
        self.generation
    }

    pub fn apply_group(&mut self, generation: u64, group: Option<Group>) {
        if generation != self.generation {
            return;
        }
        self.group = match group {
            Some(group) => LoadState::Loaded(group),
            None => LoadState::Failed("This group is unavailable.".into()),
        };
    }

    pub fn apply_assignment(&mut self, generation: u64, lookup: AssignmentLookup) {
        if generation != self.generation {
            return;
        }
        self.assignment = LoadState::Loaded(lookup);
    }

    /// Precondizione puramente consultiva: il controllo autoritativo sul
    /// minimo di due membri resta al server. Restituisce l'ID del gruppo
    /// dello schermo, così l'estrazione parte sempre per il gruppo su cui il
    /// controllo è stato fatto.
    pub fn request_assign(&mut self) -> Result<String, String> {
        if self.assigning {
            return Err("An extraction is already in progress.".into());
        }
        if let Some(count) = self.group.loaded().and_then(Group::member_count) {
            if count < 2 {
                return Err("A group needs at least two members before drawing names.".into());
            }
        }
        self.assigning = true;
        Ok(self.raw_group_id.clone())
    }

    pub fn finish_assign(&mut self, result: Result<(), AppError>) {
        self.assigning = false;
        self.note_mutation(result);
    }

    pub fn begin_unassign(&mut self) -> bool {
        if self.unassigning {
            return false;
        }
        self.unassigning = true;
        true
    }

    pub fn finish_unassign(&mut self, result: Result<(), AppError>) {
        self.unassigning = false;
        self.note_mutation(result);
    }

    pub fn begin_invite(&mut self) -> bool {
        if self.inviting {
            return false;
        }
        self.inviting = true;
        true
    }

    pub fn finish_invite(&mut self, result: Result<Invitation, AppError>) {
        self.inviting = false;
        self.note_mutation(result.map(drop));
    }

    pub fn begin_remove_member(&mut self) -> bool {
        if self.removing_member {
            return false;
        }
        self.removing_member = true;
        true
    }

    pub fn finish_remove_member(&mut self, result: Result<(), AppError>) {
        self.removing_member = false;
        self.note_mutation(result);
    }

    pub fn begin_delete(&mut self) -> bool {
        if self.deleting {
            return false;
        }
        self.deleting = true;
        true
    }

    pub fn finish_delete(&mut self, result: Result<(), AppError>) {
        self.deleting = false;
        self.note_mutation(result);
    }

    pub fn begin_leave(&mut self) -> bool {
        if self.leaving {
            return false;
        }
        self.leaving = true;
        true
    }

    pub fn finish_leave(&mut self, result: Result<(), AppError>) {
        self.leaving = false;
        self.note_mutation(result);
    }

    pub fn is_busy(&self) -> bool {
        self.inviting
            || self.assigning
            || self.unassigning
            || self.removing_member
            || self.deleting
            || self.leaving
    }

    pub fn take_alert(&mut self) -> Option<String> {
        self.alert.take()
    }

    pub fn take_refetch_request(&mut self) -> bool {
        std::mem::take(&mut self.refetch_wanted)
    }

    fn note_mutation(&mut self, result: Result<(), AppError>) {
        match result {
            Ok(()) => self.refetch_wanted = self.refetch_after_mutation,
            Err(e) => self.alert = Some(e.user_message),
        }
    }
}

/// Schermo delle idee regalo per il proprio assegnatario.
pub struct GiftIdeaScreen {
    raw_group_id: String,
    refetch_after_mutation: bool,
    generation: u64,
    pub ideas: LoadState<Vec<GiftIdea>>,
    saving: bool,
    deleting: bool,
    alert: Option<String>,
    refetch_wanted: bool,
}

impl GiftIdeaScreen {
    pub fn new(raw_group_id: impl Into<String>, refetch_after_mutation: bool) -> Self {
        Self {
            raw_group_id: raw_group_id.into(),
            refetch_after_mutation,
            generation: 0,
            ideas: LoadState::Idle,
            saving: false,
            deleting: false,
            alert: None,
            refetch_wanted: false,
        }
    }

    pub fn raw_group_id(&self) -> &str {
        &self.raw_group_id
    }

    pub fn begin_refresh(&mut self) -> u64 {
        self.generation = next_generation();
        self.ideas = LoadState::Loading;
        self.generation
    }

    pub fn apply_ideas(&mut self, generation: u64, ideas: Vec<GiftIdea>) {
        if generation != self.generation {
            return;
        }
        self.ideas = LoadState::Loaded(ideas);
    }

    pub fn begin_save(&mut self) -> bool {
        if self.saving {
            return false;
        }
        self.saving = true;
        true
    }

    pub fn finish_save(&mut self, result: Result<GiftIdea, AppError>) {
        self.saving = false;
        self.note_mutation(result.map(drop));
    }

    pub fn begin_delete(&mut self) -> bool {
        if self.deleting {
            return false;
        }
        self.deleting = true;
        true
    }

    pub fn finish_delete(&mut self, result: Result<(), AppError>) {
        self.deleting = false;
        self.note_mutation(result);
    }

    pub fn take_alert(&mut self) -> Option<String> {
        self.alert.take()
    }

    pub fn take_refetch_request(&mut self) -> bool {
        std::mem::take(&mut self.refetch_wanted)
    }

    fn note_mutation(&mut self, result: Result<(), AppError>) {
        match result {
            Ok(()) => self.refetch_wanted = self.refetch_after_mutation,
            Err(e) => self.alert = Some(e.user_message),
        }
    }
}
