// Server fittizio in-process: abbastanza API Secret Santa da esercitare il
// client vero. Stato in memoria, un contatore di richieste per verificare che
// gli ID non validi non tocchino mai la rete.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde_json::{Value, json};
use time::OffsetDateTime;

use renna::models::*;

pub type Shared = Arc<Mutex<StubState>>;
type Reject = (StatusCode, Json<Value>);

#[derive(Default)]
pub struct StubState {
    next_id: i64,
    users: Vec<StubUser>,
    groups: Vec<StubGroup>,
    members: Vec<StubMember>,
    invitations: Vec<StubInvitation>,
    // group_id -> (giver -> ricevente)
    assignments: HashMap<i64, HashMap<i64, i64>>,
    ideas: Vec<GiftIdea>,
    pub hits: usize,
}

pub struct StubUser {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    pub password: String,
    pub token: String,
}

struct StubGroup {
    id: i64,
    name: String,
    description: Option<String>,
    image: Option<String>,
    creator_id: i64,
    created_at: OffsetDateTime,
}

struct StubMember {
    group_id: i64,
    user_id: i64,
    joined_at: OffsetDateTime,
}

struct StubInvitation {
    id: i64,
    group_id: i64,
    inviter_id: i64,
    invitee_id: i64,
    created_at: OffsetDateTime,
}

pub struct TestApp {
    pub base_url: String,
    pub state: Shared,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let state: Shared = Arc::new(Mutex::new(StubState::default()));
        let router = build_router(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    pub fn hits(&self) -> usize {
        self.state.lock().unwrap().hits
    }

    /// Simula la scadenza lato server di tutti i token emessi.
    pub fn revoke_all_tokens(&self) {
        for user in &mut self.state.lock().unwrap().users {
            user.token = format!("revoked-{}", user.id);
        }
    }
}

fn build_router(state: Shared) -> Router {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/me", get(me))
        .route("/api/groups", get(list_groups).post(create_group))
        .route(
            "/api/groups/:group_id",
            get(get_group).put(update_group).delete(delete_group),
        )
        .route("/api/groups/:group_id/invite", post(invite))
        .route("/api/groups/invitations/pending", get(pending_invitations))
        .route(
            "/api/groups/invitations/:invitation_id/accept",
            post(accept_invitation),
        )
        .route(
            "/api/groups/invitations/:invitation_id/reject",
            post(reject_invitation),
        )
        .route(
            "/api/groups/:group_id/invitations/:invitation_id",
            delete(cancel_invitation),
        )
        .route("/api/groups/:group_id/members/:user_id", delete(remove_member))
        .route("/api/groups/:group_id/assign", post(assign))
        .route("/api/groups/:group_id/assignment", get(get_assignment))
        .route("/api/groups/:group_id/assignments", delete(delete_assignments))
        .route(
            "/api/groups/:group_id/gift-ideas",
            get(list_ideas).post(create_idea),
        )
        .route(
            "/api/groups/:group_id/gift-ideas/:idea_id",
            put(update_idea).delete(delete_idea),
        )
        .layer(middleware::from_fn_with_state(state.clone(), count_hits))
        .with_state(state)
}

async fn count_hits(State(state): State<Shared>, req: Request, next: Next) -> Response {
    state.lock().unwrap().hits += 1;
    next.run(req).await
}

fn err(status: StatusCode, message: &str) -> Reject {
    (status, Json(json!({ "error": message })))
}

impl StubState {
    fn fresh_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn authenticate(&self, headers: &HeaderMap) -> Result<i64, Reject> {
        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| err(StatusCode::UNAUTHORIZED, "Missing authentication token"))?;
        self.users
            .iter()
            .find(|u| u.token == token)
            .map(|u| u.id)
            .ok_or_else(|| err(StatusCode::UNAUTHORIZED, "Invalid authentication token"))
    }

    fn user(&self, id: i64) -> &StubUser {
        self.users.iter().find(|u| u.id == id).unwrap()
    }

    fn user_model(&self, id: i64) -> User {
        let u = self.user(id);
        User {
            id: u.id,
            username: u.username.clone(),
            display_name: u.display_name.clone(),
            image: None,
        }
    }

    fn is_member(&self, group_id: i64, user_id: i64) -> bool {
        self.members
            .iter()
            .any(|m| m.group_id == group_id && m.user_id == user_id)
    }

    fn group(&self, group_id: i64) -> Result<&StubGroup, Reject> {
        self.groups
            .iter()
            .find(|g| g.id == group_id)
            .ok_or_else(|| err(StatusCode::NOT_FOUND, "Group not found"))
    }

    fn group_model(&self, g: &StubGroup, detailed: bool) -> Group {
        Group {
            id: g.id,
            name: g.name.clone(),
            description: g.description.clone(),
            image: g.image.clone(),
            created_at: g.created_at,
            creator_id: g.creator_id,
            members: detailed.then(|| {
                self.members
                    .iter()
                    .filter(|m| m.group_id == g.id)
                    .map(|m| {
                        let u = self.user(m.user_id);
                        GroupMember {
                            user_id: u.id,
                            username: u.username.clone(),
                            display_name: u.display_name.clone(),
                            image: None,
                            joined_at: m.joined_at,
                        }
                    })
                    .collect()
            }),
            pending_invitations: detailed.then(|| {
                self.invitations
                    .iter()
                    .filter(|i| i.group_id == g.id)
                    .map(|i| self.invitation_model(i))
                    .collect()
            }),
            owner: detailed.then(|| self.user_model(g.creator_id)),
        }
    }

    fn invitation_model(&self, i: &StubInvitation) -> Invitation {
        let group = self.groups.iter().find(|g| g.id == i.group_id).unwrap();
        Invitation {
            id: i.id,
            group_id: i.group_id,
            inviter_id: i.inviter_id,
            invitee_username: self.user(i.invitee_id).username.clone(),
            created_at: i.created_at,
            group_name: group.name.clone(),
            group_description: group.description.clone(),
            inviter_display_name: self.user(i.inviter_id).display_name.clone(),
        }
    }
}

// --- Auth ---

async fn register(
    State(state): State<Shared>,
    Json(payload): Json<RegisterPayload>,
) -> Result<Json<AuthResponse>, Reject> {
    let mut s = state.lock().unwrap();
    if s.users.iter().any(|u| u.username == payload.username) {
        return Err(err(StatusCode::CONFLICT, "Username already exists"));
    }
    let id = s.fresh_id();
    let token = format!("tok-{id}");
    s.users.push(StubUser {
        id,
        username: payload.username,
        display_name: payload.display_name,
        password: payload.password,
        token: token.clone(),
    });
    Ok(Json(AuthResponse {
        token,
        user: s.user_model(id),
    }))
}

async fn login(
    State(state): State<Shared>,
    Json(payload): Json<LoginPayload>,
) -> Result<Json<AuthResponse>, Reject> {
    let s = state.lock().unwrap();
    let user = s
        .users
        .iter()
        .find(|u| u.username == payload.username && u.password == payload.password)
        .ok_or_else(|| err(StatusCode::UNAUTHORIZED, "Invalid username or password"))?;
    Ok(Json(AuthResponse {
        token: user.token.clone(),
        user: s.user_model(user.id),
    }))
}

async fn me(State(state): State<Shared>, headers: HeaderMap) -> Result<Json<User>, Reject> {
    let s = state.lock().unwrap();
    let uid = s.authenticate(&headers)?;
    Ok(Json(s.user_model(uid)))
}

// --- Gruppi ---

async fn list_groups(
    State(state): State<Shared>,
    headers: HeaderMap,
) -> Result<Json<Vec<Group>>, Reject> {
    let s = state.lock().unwrap();
    let uid = s.authenticate(&headers)?;
    let groups = s
        .groups
        .iter()
        .filter(|g| s.is_member(g.id, uid))
        .map(|g| s.group_model(g, false))
        .collect();
    Ok(Json(groups))
}

async fn create_group(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(payload): Json<CreateGroupPayload>,
) -> Result<Json<Group>, Reject> {
    let mut s = state.lock().unwrap();
    let uid = s.authenticate(&headers)?;
    if payload.name.trim().is_empty() {
        return Err(err(StatusCode::BAD_REQUEST, "Group name cannot be empty"));
    }
    let id = s.fresh_id();
    let now = OffsetDateTime::now_utc();
    s.groups.push(StubGroup {
        id,
        name: payload.name,
        description: payload.description,
        image: payload.image,
        creator_id: uid,
        created_at: now,
    });
    s.members.push(StubMember {
        group_id: id,
        user_id: uid,
        joined_at: now,
    });
    let group = s.group_model(s.group(id)?, false);
    Ok(Json(group))
}

async fn get_group(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(group_id): Path<i64>,
) -> Result<Json<Group>, Reject> {
    let s = state.lock().unwrap();
    let uid = s.authenticate(&headers)?;
    let group = s.group(group_id)?;
    if !s.is_member(group_id, uid) {
        return Err(err(StatusCode::FORBIDDEN, "You are not a member of this group"));
    }
    Ok(Json(s.group_model(group, true)))
}

async fn update_group(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(group_id): Path<i64>,
    Json(payload): Json<UpdateGroupPayload>,
) -> Result<Json<Group>, Reject> {
    let mut s = state.lock().unwrap();
    let uid = s.authenticate(&headers)?;
    if s.group(group_id)?.creator_id != uid {
        return Err(err(StatusCode::FORBIDDEN, "Only the group creator can edit it"));
    }
    let group = s.groups.iter_mut().find(|g| g.id == group_id).unwrap();
    if payload.description.is_some() {
        group.description = payload.description;
    }
    if payload.image.is_some() {
        group.image = payload.image;
    }
    let group = s.group_model(s.group(group_id)?, false);
    Ok(Json(group))
}

async fn delete_group(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(group_id): Path<i64>,
) -> Result<StatusCode, Reject> {
    let mut s = state.lock().unwrap();
    let uid = s.authenticate(&headers)?;
    if s.group(group_id)?.creator_id != uid {
        return Err(err(StatusCode::FORBIDDEN, "Only the group creator can delete it"));
    }
    // Cascata: membri, inviti, abbinamenti, idee.
    s.groups.retain(|g| g.id != group_id);
    s.members.retain(|m| m.group_id != group_id);
    s.invitations.retain(|i| i.group_id != group_id);
    s.assignments.remove(&group_id);
    s.ideas.retain(|i| i.group_id != group_id);
    Ok(StatusCode::NO_CONTENT)
}

// --- Inviti e membri ---

async fn invite(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(group_id): Path<i64>,
    Json(payload): Json<InvitePayload>,
) -> Result<Json<Invitation>, Reject> {
    let mut s = state.lock().unwrap();
    let uid = s.authenticate(&headers)?;
    s.group(group_id)?;
    if !s.is_member(group_id, uid) {
        return Err(err(StatusCode::FORBIDDEN, "You are not a member of this group"));
    }
    let invitee_id = s
        .users
        .iter()
        .find(|u| u.username == payload.username)
        .map(|u| u.id)
        .ok_or_else(|| err(StatusCode::NOT_FOUND, "User not found"))?;
    if s.is_member(group_id, invitee_id) {
        return Err(err(StatusCode::CONFLICT, "User is already a member of this group"));
    }
    if s.invitations
        .iter()
        .any(|i| i.group_id == group_id && i.invitee_id == invitee_id)
    {
        return Err(err(
            StatusCode::CONFLICT,
            "An invitation for this user to this group already exists",
        ));
    }
    let id = s.fresh_id();
    s.invitations.push(StubInvitation {
        id,
        group_id,
        inviter_id: uid,
        invitee_id,
        created_at: OffsetDateTime::now_utc(),
    });
    let invitation = s.invitation_model(s.invitations.last().unwrap());
    Ok(Json(invitation))
}

async fn pending_invitations(
    State(state): State<Shared>,
    headers: HeaderMap,
) -> Result<Json<Vec<Invitation>>, Reject> {
    let s = state.lock().unwrap();
    let uid = s.authenticate(&headers)?;
    let invitations = s
        .invitations
        .iter()
        .filter(|i| i.invitee_id == uid)
        .map(|i| s.invitation_model(i))
        .collect();
    Ok(Json(invitations))
}

async fn accept_invitation(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(invitation_id): Path<i64>,
) -> Result<StatusCode, Reject> {
    let mut s = state.lock().unwrap();
    let uid = s.authenticate(&headers)?;
    let invitation = s
        .invitations
        .iter()
        .find(|i| i.id == invitation_id && i.invitee_id == uid)
        .ok_or_else(|| err(StatusCode::NOT_FOUND, "Invitation not found"))?;
    let group_id = invitation.group_id;
    s.members.push(StubMember {
        group_id,
        user_id: uid,
        joined_at: OffsetDateTime::now_utc(),
    });
    s.invitations.retain(|i| i.id != invitation_id);
    Ok(StatusCode::NO_CONTENT)
}

async fn reject_invitation(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(invitation_id): Path<i64>,
) -> Result<StatusCode, Reject> {
    let mut s = state.lock().unwrap();
    let uid = s.authenticate(&headers)?;
    if !s
        .invitations
        .iter()
        .any(|i| i.id == invitation_id && i.invitee_id == uid)
    {
        return Err(err(StatusCode::NOT_FOUND, "Invitation not found"));
    }
    s.invitations.retain(|i| i.id != invitation_id);
    Ok(StatusCode::NO_CONTENT)
}

async fn cancel_invitation(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path((group_id, invitation_id)): Path<(i64, i64)>,
) -> Result<StatusCode, Reject> {
    let mut s = state.lock().unwrap();
    let uid = s.authenticate(&headers)?;
    if s.group(group_id)?.creator_id != uid {
        return Err(err(StatusCode::FORBIDDEN, "Only the group creator can cancel invitations"));
    }
    if !s
        .invitations
        .iter()
        .any(|i| i.id == invitation_id && i.group_id == group_id)
    {
        return Err(err(StatusCode::NOT_FOUND, "Invitation not found"));
    }
    s.invitations.retain(|i| i.id != invitation_id);
    Ok(StatusCode::NO_CONTENT)
}

async fn remove_member(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path((group_id, user_id)): Path<(i64, i64)>,
) -> Result<StatusCode, Reject> {
    let mut s = state.lock().unwrap();
    let uid = s.authenticate(&headers)?;
    let creator_id = s.group(group_id)?.creator_id;
    // Il proprietario rimuove chiunque; gli altri solo sé stessi (leave).
    if uid != creator_id && uid != user_id {
        return Err(err(StatusCode::FORBIDDEN, "You cannot remove other members"));
    }
    if !s.is_member(group_id, user_id) {
        return Err(err(StatusCode::NOT_FOUND, "Member not found"));
    }
    s.members
        .retain(|m| !(m.group_id == group_id && m.user_id == user_id));
    Ok(StatusCode::NO_CONTENT)
}

// --- Abbinamenti ---

async fn assign(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(group_id): Path<i64>,
) -> Result<StatusCode, Reject> {
    let mut s = state.lock().unwrap();
    let uid = s.authenticate(&headers)?;
    s.group(group_id)?;
    if !s.is_member(group_id, uid) {
        return Err(err(StatusCode::FORBIDDEN, "You are not a member of this group"));
    }
    let mut ids: Vec<i64> = s
        .members
        .iter()
        .filter(|m| m.group_id == group_id)
        .map(|m| m.user_id)
        .collect();
    ids.sort_unstable();
    if ids.len() < 2 {
        return Err(err(
            StatusCode::BAD_REQUEST,
            "A group needs at least two members before drawing names",
        ));
    }
    // Rotazione: permutazione senza punti fissi, deterministica per i test.
    let edges = ids
        .iter()
        .enumerate()
        .map(|(i, &giver)| (giver, ids[(i + 1) % ids.len()]))
        .collect();
    // Sostituisce in blocco qualunque estrazione precedente.
    s.assignments.insert(group_id, edges);
    Ok(StatusCode::NO_CONTENT)
}

async fn get_assignment(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(group_id): Path<i64>,
) -> Result<Json<Assignment>, Reject> {
    let s = state.lock().unwrap();
    let uid = s.authenticate(&headers)?;
    s.group(group_id)?;
    if !s.is_member(group_id, uid) {
        return Err(err(StatusCode::FORBIDDEN, "You are not a member of this group"));
    }
    let receiver_id = s
        .assignments
        .get(&group_id)
        .and_then(|edges| edges.get(&uid).copied())
        .ok_or_else(|| err(StatusCode::NOT_FOUND, "No assignment yet"))?;
    let receiver = s.user(receiver_id);
    Ok(Json(Assignment {
        receiver_id,
        receiver_username: receiver.username.clone(),
        receiver_display_name: receiver.display_name.clone(),
        receiver_image: None,
    }))
}

async fn delete_assignments(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(group_id): Path<i64>,
) -> Result<StatusCode, Reject> {
    let mut s = state.lock().unwrap();
    let uid = s.authenticate(&headers)?;
    s.group(group_id)?;
    if !s.is_member(group_id, uid) {
        return Err(err(StatusCode::FORBIDDEN, "You are not a member of this group"));
    }
    s.assignments.remove(&group_id);
    Ok(StatusCode::NO_CONTENT)
}

// --- Idee regalo ---

async fn create_idea(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(group_id): Path<i64>,
    Json(payload): Json<CreateGiftIdeaPayload>,
) -> Result<Json<GiftIdea>, Reject> {
    let mut s = state.lock().unwrap();
    let uid = s.authenticate(&headers)?;
    s.group(group_id)?;
    if !s.is_member(group_id, uid) {
        return Err(err(StatusCode::FORBIDDEN, "You are not a member of this group"));
    }
    let id = s.fresh_id();
    let now = OffsetDateTime::now_utc();
    let idea = GiftIdea {
        id,
        group_id,
        for_user_id: payload.for_user_id,
        creator_id: uid,
        idea: payload.idea,
        link: payload.link,
        created_at: now,
        updated_at: now,
        creator: Some(s.user_model(uid)),
        for_user: Some(s.user_model(payload.for_user_id)),
    };
    s.ideas.push(idea.clone());
    Ok(Json(idea))
}

async fn list_ideas(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(group_id): Path<i64>,
) -> Result<Json<Vec<GiftIdea>>, Reject> {
    let s = state.lock().unwrap();
    let uid = s.authenticate(&headers)?;
    s.group(group_id)?;
    if !s.is_member(group_id, uid) {
        return Err(err(StatusCode::FORBIDDEN, "You are not a member of this group"));
    }
    // Visibili le proprie idee, più quelle per il proprio assegnatario.
    let my_receiver = s
        .assignments
        .get(&group_id)
        .and_then(|edges| edges.get(&uid).copied());
    let ideas = s
        .ideas
        .iter()
        .filter(|i| i.group_id == group_id)
        .filter(|i| i.creator_id == uid || Some(i.for_user_id) == my_receiver)
        .cloned()
        .collect();
    Ok(Json(ideas))
}

async fn update_idea(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path((group_id, idea_id)): Path<(i64, i64)>,
    Json(payload): Json<UpdateGiftIdeaPayload>,
) -> Result<Json<GiftIdea>, Reject> {
    let mut s = state.lock().unwrap();
    let uid = s.authenticate(&headers)?;
    let idea = s
        .ideas
        .iter_mut()
        .find(|i| i.id == idea_id && i.group_id == group_id)
        .ok_or_else(|| err(StatusCode::NOT_FOUND, "Gift idea not found"))?;
    if idea.creator_id != uid {
        return Err(err(StatusCode::FORBIDDEN, "Only the creator can edit a gift idea"));
    }
    if let Some(text) = payload.idea {
        idea.idea = text;
    }
    if payload.link.is_some() {
        idea.link = payload.link;
    }
    idea.updated_at = OffsetDateTime::now_utc();
    let idea = idea.clone();
    Ok(Json(idea))
}

async fn delete_idea(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path((group_id, idea_id)): Path<(i64, i64)>,
) -> Result<StatusCode, Reject> {
    let mut s = state.lock().unwrap();
    let uid = s.authenticate(&headers)?;
    let idea = s
        .ideas
        .iter()
        .find(|i| i.id == idea_id && i.group_id == group_id)
        .ok_or_else(|| err(StatusCode::NOT_FOUND, "Gift idea not found"))?;
    if idea.creator_id != uid {
        return Err(err(StatusCode::FORBIDDEN, "Only the creator can delete a gift idea"));
    }
    s.ideas.retain(|i| i.id != idea_id);
    Ok(StatusCode::NO_CONTENT)
}
