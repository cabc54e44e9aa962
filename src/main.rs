use std::sync::{Arc, OnceLock};

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::{self, Receiver, Sender};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use renna::api::ApiClient;
use renna::config::ClientConfig;
use renna::error::AppError;
use renna::models::*;
use renna::screens::{GiftIdeaScreen, GroupDetailScreen, GroupListScreen, LoadState};
use renna::services::{AssignmentLookup, GiftIdeaService, GroupService};
use renna::session::{Session, SessionState, SessionStore};

static LOG_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

// --- Messaggi tra UI e task di rete ---

enum ToBackend {
    Restore,
    SignIn { username: String, password: String },
    SignUp { username: String, display_name: String, password: String },
    SignOut,
    FetchHome { generation: u64 },
    CreateGroup { name: String, description: Option<String> },
    FetchGroup { generation: u64, raw_id: String },
    Invite { raw_id: String, username: String },
    AcceptInvitation { raw_id: String },
    RejectInvitation { raw_id: String },
    CancelInvitation { raw_gid: String, raw_iid: String },
    RemoveMember { raw_id: String, user_id: i64 },
    LeaveGroup { raw_id: String, own_user_id: i64 },
    DeleteGroup { raw_id: String },
    Assign { raw_id: String },
    Unassign { raw_id: String },
    FetchIdeas { generation: u64, raw_id: String },
    AddIdea { raw_id: String, for_user_id: i64, idea: String, link: Option<String> },
    DeleteIdea { raw_id: String, idea_id: i64 },
}

enum FromBackend {
    SessionChanged(SessionState),
    AuthFailed(String),
    GroupsFetched(u64, Vec<Group>),
    InvitationsFetched(u64, Vec<Invitation>),
    GroupCreated(Result<Group, AppError>),
    GroupFetched(u64, Option<Group>),
    AssignmentFetched(u64, AssignmentLookup),
    Invited(Result<Invitation, AppError>),
    InvitationAccepted(Result<(), AppError>),
    InvitationRejected(Result<(), AppError>),
    InvitationCancelled(Result<(), AppError>),
    MemberRemoved(Result<(), AppError>),
    LeftGroup(Result<(), AppError>),
    GroupDeleted(Result<(), AppError>),
    Assigned(Result<(), AppError>),
    Unassigned(Result<(), AppError>),
    IdeasFetched(u64, Vec<GiftIdea>),
    IdeaSaved(Result<GiftIdea, AppError>),
    IdeaDeleted(Result<(), AppError>),
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    initialize_logging();

    let config = ClientConfig::from_env();
    tracing::info!("starting against {}", config.api_base_url);

    let api = match ApiClient::new(&config) {
        Ok(api) => Arc::new(api),
        Err(e) => {
            eprintln!("Cannot build HTTP client: {e}");
            return;
        }
    };
    let groups_svc = Arc::new(GroupService::new(api.clone()));
    let ideas_svc = Arc::new(GiftIdeaService::new(api.clone()));
    let session = Session::new(api.clone(), SessionStore::new(config.session_dir.clone()));

    let (to_backend_tx, to_backend_rx) = mpsc::channel(32);
    let (from_backend_tx, from_backend_rx) = mpsc::channel(32);

    tokio::spawn(network_task(
        to_backend_rx,
        from_backend_tx,
        session,
        groups_svc,
        ideas_svc,
    ));

    let _ = to_backend_tx.send(ToBackend::Restore).await;
    ui_loop(to_backend_tx, from_backend_rx, config.refetch_after_mutation).await;
}

fn initialize_logging() {
    let file_appender = tracing_appender::rolling::daily("logs", "renna.log");
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);
    LOG_GUARD.set(guard).ok();

    // In console solo quel che chiede RUST_LOG; il file resta a info.
    let console_layer = fmt::Layer::new()
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")));
    let file_layer = fmt::Layer::new()
        .with_writer(non_blocking_writer)
        .with_filter(EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init()
}

// --- Task di rete ---
//
// I comandi di sessione sono gestiti in linea (serializzati); letture e
// mutazioni partono in task indipendenti, quindi richieste concorrenti
// possono completare in qualsiasi ordine. Gli schermi tollerano l'arrivo
// fuori ordine tramite le generazioni.

async fn network_task(
    mut rx: Receiver<ToBackend>,
    tx: Sender<FromBackend>,
    mut session: Session,
    groups: Arc<GroupService>,
    ideas: Arc<GiftIdeaService>,
) {
    while let Some(action) = rx.recv().await {
        match action {
            ToBackend::Restore => {
                let state = session.restore().await.clone();
                let _ = tx.send(FromBackend::SessionChanged(state)).await;
            }
            ToBackend::SignIn { username, password } => {
                match session.sign_in(&username, &password).await {
                    Ok(_) => {
                        let _ = tx
                            .send(FromBackend::SessionChanged(session.state().clone()))
                            .await;
                    }
                    Err(e) => {
                        let _ = tx.send(FromBackend::AuthFailed(e.user_message)).await;
                    }
                }
            }
            ToBackend::SignUp { username, display_name, password } => {
                match session.sign_up(&username, &display_name, &password).await {
                    Ok(_) => {
                        let _ = tx
                            .send(FromBackend::SessionChanged(session.state().clone()))
                            .await;
                    }
                    Err(e) => {
                        let _ = tx.send(FromBackend::AuthFailed(e.user_message)).await;
                    }
                }
            }
            ToBackend::SignOut => {
                session.sign_out();
                let _ = tx
                    .send(FromBackend::SessionChanged(session.state().clone()))
                    .await;
            }
            ToBackend::FetchHome { generation } => {
                let (svc, out) = (groups.clone(), tx.clone());
                tokio::spawn(async move {
                    let list = svc.groups().await;
                    let _ = out.send(FromBackend::GroupsFetched(generation, list)).await;
                });
                let (svc, out) = (groups.clone(), tx.clone());
                tokio::spawn(async move {
                    let list = svc.pending_invitations().await;
                    let _ = out
                        .send(FromBackend::InvitationsFetched(generation, list))
                        .await;
                });
            }
            ToBackend::CreateGroup { name, description } => {
                let (svc, out) = (groups.clone(), tx.clone());
                tokio::spawn(async move {
                    let res = svc.create_group(&name, description).await;
                    let _ = out.send(FromBackend::GroupCreated(res)).await;
                });
            }
            ToBackend::FetchGroup { generation, raw_id } => {
                let (svc, out, id) = (groups.clone(), tx.clone(), raw_id.clone());
                tokio::spawn(async move {
                    let group = svc.group(&id).await;
                    let _ = out.send(FromBackend::GroupFetched(generation, group)).await;
                });
                let (svc, out) = (groups.clone(), tx.clone());
                tokio::spawn(async move {
                    let lookup = svc.assignment(&raw_id).await;
                    let _ = out
                        .send(FromBackend::AssignmentFetched(generation, lookup))
                        .await;
                });
            }
            ToBackend::Invite { raw_id, username } => {
                let (svc, out) = (groups.clone(), tx.clone());
                tokio::spawn(async move {
                    let res = svc.invite(&raw_id, &username).await;
                    let _ = out.send(FromBackend::Invited(res)).await;
                });
            }
            ToBackend::AcceptInvitation { raw_id } => {
                let (svc, out) = (groups.clone(), tx.clone());
                tokio::spawn(async move {
                    let res = svc.accept_invitation(&raw_id).await;
                    let _ = out.send(FromBackend::InvitationAccepted(res)).await;
                });
            }
            ToBackend::RejectInvitation { raw_id } => {
                let (svc, out) = (groups.clone(), tx.clone());
                tokio::spawn(async move {
                    let res = svc.reject_invitation(&raw_id).await;
                    let _ = out.send(FromBackend::InvitationRejected(res)).await;
                });
            }
            ToBackend::CancelInvitation { raw_gid, raw_iid } => {
                let (svc, out) = (groups.clone(), tx.clone());
                tokio::spawn(async move {
                    let res = svc.cancel_invitation(&raw_gid, &raw_iid).await;
                    let _ = out.send(FromBackend::InvitationCancelled(res)).await;
                });
            }
            ToBackend::RemoveMember { raw_id, user_id } => {
                let (svc, out) = (groups.clone(), tx.clone());
                tokio::spawn(async move {
                    let res = svc.remove_member(&raw_id, user_id).await;
                    let _ = out.send(FromBackend::MemberRemoved(res)).await;
                });
            }
            ToBackend::LeaveGroup { raw_id, own_user_id } => {
                let (svc, out) = (groups.clone(), tx.clone());
                tokio::spawn(async move {
                    let res = svc.leave_group(&raw_id, own_user_id).await;
                    let _ = out.send(FromBackend::LeftGroup(res)).await;
                });
            }
            ToBackend::DeleteGroup { raw_id } => {
                let (svc, out) = (groups.clone(), tx.clone());
                tokio::spawn(async move {
                    let res = svc.delete_group(&raw_id).await;
                    let _ = out.send(FromBackend::GroupDeleted(res)).await;
                });
            }
            ToBackend::Assign { raw_id } => {
                let (svc, out) = (groups.clone(), tx.clone());
                tokio::spawn(async move {
                    let res = svc.assign_secret_santa(&raw_id).await;
                    let _ = out.send(FromBackend::Assigned(res)).await;
                });
            }
            ToBackend::Unassign { raw_id } => {
                let (svc, out) = (groups.clone(), tx.clone());
                tokio::spawn(async move {
                    let res = svc.delete_assignments(&raw_id).await;
                    let _ = out.send(FromBackend::Unassigned(res)).await;
                });
            }
            ToBackend::FetchIdeas { generation, raw_id } => {
                let (svc, out) = (ideas.clone(), tx.clone());
                tokio::spawn(async move {
                    let list = svc.ideas(&raw_id).await;
                    let _ = out.send(FromBackend::IdeasFetched(generation, list)).await;
                });
            }
            ToBackend::AddIdea { raw_id, for_user_id, idea, link } => {
                let (svc, out) = (ideas.clone(), tx.clone());
                tokio::spawn(async move {
                    let res = svc.add(&raw_id, for_user_id, &idea, link).await;
                    let _ = out.send(FromBackend::IdeaSaved(res)).await;
                });
            }
            ToBackend::DeleteIdea { raw_id, idea_id } => {
                let (svc, out) = (ideas.clone(), tx.clone());
                tokio::spawn(async move {
                    let res = svc.remove(&raw_id, idea_id).await;
                    let _ = out.send(FromBackend::IdeaDeleted(res)).await;
                });
            }
        }
    }
}

// --- Loop interattivo ---

struct Ui {
    tx: Sender<ToBackend>,
    refetch_after_mutation: bool,
    current_user: Option<User>,
    home: GroupListScreen,
    detail: Option<GroupDetailScreen>,
    idea_screen: Option<GiftIdeaScreen>,
}

async fn ui_loop(
    tx: Sender<ToBackend>,
    mut rx: Receiver<FromBackend>,
    refetch_after_mutation: bool,
) {
    let mut ui = Ui {
        tx,
        refetch_after_mutation,
        current_user: None,
        home: GroupListScreen::new(refetch_after_mutation),
        detail: None,
        idea_screen: None,
    };

    println!("renna, Secret Santa client. Type 'help' for commands.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        if !ui.handle_command(line.trim()).await {
                            break;
                        }
                    }
                    _ => break,
                }
            }
            Some(msg) = rx.recv() => {
                ui.handle_backend_message(msg).await;
            }
        }
    }
}

impl Ui {
    /// `false` per uscire.
    async fn handle_command(&mut self, line: &str) -> bool {
        let mut parts = line.split_whitespace();
        let Some(cmd) = parts.next() else { return true };
        let args: Vec<&str> = parts.collect();

        match (cmd, args.as_slice()) {
            ("help", _) => print_help(),
            ("quit", _) | ("exit", _) => return false,

            ("register", [username, display_name, password]) => {
                self.send(ToBackend::SignUp {
                    username: username.to_string(),
                    display_name: display_name.to_string(),
                    password: password.to_string(),
                })
                .await;
            }
            ("login", [username, password]) => {
                self.send(ToBackend::SignIn {
                    username: username.to_string(),
                    password: password.to_string(),
                })
                .await;
            }
            ("logout", _) => self.send(ToBackend::SignOut).await,

            ("groups", _) => self.refresh_home().await,
            ("create", [name, rest @ ..]) => {
                let description = if rest.is_empty() {
                    None
                } else {
                    Some(rest.join(" "))
                };
                if self.home.begin_create() {
                    self.send(ToBackend::CreateGroup {
                        name: name.to_string(),
                        description,
                    })
                    .await;
                } else {
                    println!("Already creating a group, hold on.");
                }
            }
            ("open", [raw_id]) => {
                let mut screen = GroupDetailScreen::new(*raw_id, self.refetch_after_mutation);
                let generation = screen.begin_refresh();
                let raw_id = screen.raw_group_id().to_string();
                self.detail = Some(screen);
                self.send(ToBackend::FetchGroup { generation, raw_id }).await;
            }
            ("invite", [raw_id, username]) => {
                if self.detail_begin(|d| d.begin_invite()) {
                    self.send(ToBackend::Invite {
                        raw_id: raw_id.to_string(),
                        username: username.to_string(),
                    })
                    .await;
                }
            }
            ("accept", [raw_id]) => {
                if self.home.begin_accept_invitation() {
                    self.send(ToBackend::AcceptInvitation { raw_id: raw_id.to_string() }).await;
                }
            }
            ("reject", [raw_id]) => {
                if self.home.begin_reject_invitation() {
                    self.send(ToBackend::RejectInvitation { raw_id: raw_id.to_string() }).await;
                }
            }
            ("cancel", [raw_gid, raw_iid]) => {
                if self.home.begin_cancel_invitation() {
                    self.send(ToBackend::CancelInvitation {
                        raw_gid: raw_gid.to_string(),
                        raw_iid: raw_iid.to_string(),
                    })
                    .await;
                }
            }
            ("remove", [raw_id, raw_uid]) => match raw_uid.parse::<i64>() {
                Ok(user_id) if self.detail_begin(|d| d.begin_remove_member()) => {
                    self.send(ToBackend::RemoveMember {
                        raw_id: raw_id.to_string(),
                        user_id,
                    })
                    .await;
                }
                Ok(_) => {}
                Err(_) => println!("User ID must be a number."),
            },
            ("leave", [raw_id]) => {
                let Some(user) = &self.current_user else {
                    println!("Sign in first.");
                    return true;
                };
                let own_user_id = user.id;
                if self.detail_begin(|d| d.begin_leave()) {
                    self.send(ToBackend::LeaveGroup {
                        raw_id: raw_id.to_string(),
                        own_user_id,
                    })
                    .await;
                }
            }
            ("delete", [raw_id]) => {
                if self.detail_begin(|d| d.begin_delete()) {
                    self.send(ToBackend::DeleteGroup { raw_id: raw_id.to_string() }).await;
                }
            }
            ("assign", _) => {
                // L'estrazione riguarda sempre il gruppo aperto: il controllo
                // consultivo e la richiesta condividono lo stesso ID.
                let outcome = match &mut self.detail {
                    Some(detail) => detail.request_assign(),
                    None => Err("Open the group first.".into()),
                };
                match outcome {
                    Ok(raw_id) => self.send(ToBackend::Assign { raw_id }).await,
                    Err(msg) => println!("{msg}"),
                }
            }
            ("unassign", [raw_id]) => {
                if self.detail_begin(|d| d.begin_unassign()) {
                    self.send(ToBackend::Unassign { raw_id: raw_id.to_string() }).await;
                }
            }
            ("ideas", [raw_id]) => {
                let mut screen = GiftIdeaScreen::new(*raw_id, self.refetch_after_mutation);
                let generation = screen.begin_refresh();
                let raw_id = screen.raw_group_id().to_string();
                self.idea_screen = Some(screen);
                self.send(ToBackend::FetchIdeas { generation, raw_id }).await;
            }
            ("idea", [raw_id, raw_uid, rest @ ..]) if !rest.is_empty() => {
                match raw_uid.parse::<i64>() {
                    Ok(for_user_id) => {
                        if self.ideas_begin(|s| s.begin_save()) {
                            self.send(ToBackend::AddIdea {
                                raw_id: raw_id.to_string(),
                                for_user_id,
                                idea: rest.join(" "),
                                link: None,
                            })
                            .await;
                        }
                    }
                    Err(_) => println!("User ID must be a number."),
                }
            }
            ("idea-del", [raw_id, raw_idea_id]) => match raw_idea_id.parse::<i64>() {
                Ok(idea_id) if self.ideas_begin(|s| s.begin_delete()) => {
                    self.send(ToBackend::DeleteIdea {
                        raw_id: raw_id.to_string(),
                        idea_id,
                    })
                    .await;
                }
                Ok(_) => {}
                Err(_) => println!("Idea ID must be a number."),
            },
            _ => println!("Unknown command. Type 'help'."),
        }
        true
    }

    async fn handle_backend_message(&mut self, msg: FromBackend) {
        match msg {
            FromBackend::SessionChanged(state) => {
                match &state {
                    SessionState::Authenticated(user) => {
                        println!("Signed in as {} ({}).", user.display_name, user.username);
                        self.current_user = Some(user.clone());
                        self.refresh_home().await;
                    }
                    SessionState::Anonymous => {
                        println!("Signed out.");
                        self.current_user = None;
                        self.home = GroupListScreen::new(self.refetch_after_mutation);
                        self.detail = None;
                        self.idea_screen = None;
                    }
                    SessionState::Authenticating => {}
                }
            }
            FromBackend::AuthFailed(message) => println!("Sign-in failed: {message}"),

            FromBackend::GroupsFetched(generation, groups) => {
                self.home.apply_groups(generation, groups);
                if let Some(groups) = self.home.groups.loaded() {
                    if groups.is_empty() {
                        println!("No groups yet.");
                    } else {
                        println!("Your groups:");
                        for g in groups {
                            println!("  [{}] {}", g.id, g.name);
                        }
                    }
                }
            }
            FromBackend::InvitationsFetched(generation, invitations) => {
                self.home.apply_invitations(generation, invitations);
                if let Some(invitations) = self.home.invitations.loaded() {
                    for i in invitations {
                        println!(
                            "  invitation [{}] to '{}' from {}",
                            i.id, i.group_name, i.inviter_display_name
                        );
                    }
                }
            }
            FromBackend::GroupCreated(result) => {
                if let Ok(group) = &result {
                    println!("Created group '{}' with ID {}.", group.name, group.id);
                }
                self.check_auth(&result).await;
                self.home.finish_create(result);
                self.drain_home().await;
            }
            FromBackend::GroupFetched(generation, group) => {
                if let Some(detail) = &mut self.detail {
                    detail.apply_group(generation, group);
                    match &detail.group {
                        LoadState::Loaded(g) => print_group(g),
                        LoadState::Failed(msg) => println!("{msg}"),
                        _ => {}
                    }
                }
            }
            FromBackend::AssignmentFetched(generation, lookup) => {
                if let Some(detail) = &mut self.detail {
                    detail.apply_assignment(generation, lookup);
                    if let Some(lookup) = detail.assignment.loaded() {
                        match lookup {
                            AssignmentLookup::Drawn(a) => {
                                println!("You are the Secret Santa of {}.", a.receiver_display_name)
                            }
                            AssignmentLookup::NotDrawnYet => println!("Names not drawn yet."),
                            AssignmentLookup::NotMember => {
                                println!("You are not a member of this group.")
                            }
                            AssignmentLookup::Unavailable(e) => {
                                println!("Assignment unavailable: {}", e.user_message)
                            }
                        }
                    }
                }
            }
            FromBackend::Invited(result) => {
                if let Ok(invitation) = &result {
                    println!("Invitation sent to {}.", invitation.invitee_username);
                }
                self.check_auth(&result).await;
                if let Some(detail) = &mut self.detail {
                    detail.finish_invite(result);
                }
                self.drain_detail().await;
            }
            FromBackend::InvitationAccepted(result) => {
                self.check_auth(&result).await;
                self.home.finish_accept_invitation(result);
                self.drain_home().await;
            }
            FromBackend::InvitationRejected(result) => {
                self.check_auth(&result).await;
                self.home.finish_reject_invitation(result);
                self.drain_home().await;
            }
            FromBackend::InvitationCancelled(result) => {
                self.check_auth(&result).await;
                self.home.finish_cancel_invitation(result);
                self.drain_home().await;
            }
            FromBackend::MemberRemoved(result) => {
                self.check_auth(&result).await;
                if let Some(detail) = &mut self.detail {
                    detail.finish_remove_member(result);
                }
                self.drain_detail().await;
            }
            FromBackend::LeftGroup(result) => {
                self.check_auth(&result).await;
                match result {
                    // Dopo aver lasciato il gruppo si torna alla home.
                    Ok(()) => {
                        self.detail = None;
                        self.refresh_home().await;
                    }
                    Err(e) => {
                        if let Some(detail) = &mut self.detail {
                            detail.finish_leave(Err(e));
                        }
                        self.drain_detail().await;
                    }
                }
            }
            FromBackend::GroupDeleted(result) => {
                self.check_auth(&result).await;
                match result {
                    Ok(()) => {
                        self.detail = None;
                        self.refresh_home().await;
                    }
                    Err(e) => {
                        if let Some(detail) = &mut self.detail {
                            detail.finish_delete(Err(e));
                        }
                        self.drain_detail().await;
                    }
                }
            }
            FromBackend::Assigned(result) => {
                self.check_auth(&result).await;
                if let Some(detail) = &mut self.detail {
                    detail.finish_assign(result);
                }
                self.drain_detail().await;
            }
            FromBackend::Unassigned(result) => {
                self.check_auth(&result).await;
                if let Some(detail) = &mut self.detail {
                    detail.finish_unassign(result);
                }
                self.drain_detail().await;
            }
            FromBackend::IdeasFetched(generation, ideas) => {
                if let Some(screen) = &mut self.idea_screen {
                    screen.apply_ideas(generation, ideas);
                    if let Some(ideas) = screen.ideas.loaded() {
                        if ideas.is_empty() {
                            println!("No gift ideas recorded.");
                        }
                        for idea in ideas {
                            println!("  [{}] for user {}: {}", idea.id, idea.for_user_id, idea.idea);
                        }
                    }
                }
            }
            FromBackend::IdeaSaved(result) => {
                self.check_auth(&result).await;
                if let Some(screen) = &mut self.idea_screen {
                    screen.finish_save(result);
                }
                self.drain_ideas().await;
            }
            FromBackend::IdeaDeleted(result) => {
                self.check_auth(&result).await;
                if let Some(screen) = &mut self.idea_screen {
                    screen.finish_delete(result);
                }
                self.drain_ideas().await;
            }
        }
    }

    async fn send(&self, msg: ToBackend) {
        let _ = self.tx.send(msg).await;
    }

    async fn refresh_home(&mut self) {
        let generation = self.home.begin_refresh();
        self.send(ToBackend::FetchHome { generation }).await;
    }

    fn detail_begin(&mut self, begin: impl FnOnce(&mut GroupDetailScreen) -> bool) -> bool {
        match &mut self.detail {
            Some(detail) => {
                if begin(detail) {
                    true
                } else {
                    println!("That action is already in progress.");
                    false
                }
            }
            None => {
                println!("Open the group first.");
                false
            }
        }
    }

    fn ideas_begin(&mut self, begin: impl FnOnce(&mut GiftIdeaScreen) -> bool) -> bool {
        match &mut self.idea_screen {
            Some(screen) => {
                if begin(screen) {
                    true
                } else {
                    println!("That action is already in progress.");
                    false
                }
            }
            None => {
                println!("Open the idea list first with 'ideas <group>'.");
                false
            }
        }
    }

    /// Un 401 su qualunque endpoint autenticato chiude la sessione.
    async fn check_auth<T>(&self, result: &Result<T, AppError>) {
        if let Err(e) = result {
            if e.is_auth_failure() {
                self.send(ToBackend::SignOut).await;
            }
        }
    }

    async fn drain_home(&mut self) {
        if let Some(alert) = self.home.take_alert() {
            println!("! {alert}");
        }
        if self.home.take_refetch_request() {
            self.refresh_home().await;
        }
    }

    async fn drain_detail(&mut self) {
        let mut refetch = None;
        if let Some(detail) = &mut self.detail {
            if let Some(alert) = detail.take_alert() {
                println!("! {alert}");
            }
            if detail.take_refetch_request() {
                refetch = Some((detail.begin_refresh(), detail.raw_group_id().to_string()));
            }
        }
        if let Some((generation, raw_id)) = refetch {
            self.send(ToBackend::FetchGroup { generation, raw_id }).await;
        }
    }

    async fn drain_ideas(&mut self) {
        let mut refetch = None;
        if let Some(screen) = &mut self.idea_screen {
            if let Some(alert) = screen.take_alert() {
                println!("! {alert}");
            }
            if screen.take_refetch_request() {
                refetch = Some((screen.begin_refresh(), screen.raw_group_id().to_string()));
            }
        }
        if let Some((generation, raw_id)) = refetch {
            self.send(ToBackend::FetchIdeas { generation, raw_id }).await;
        }
    }
}

fn print_group(group: &Group) {
    println!("[{}] {}", group.id, group.name);
    if let Some(description) = &group.description {
        println!("  {description}");
    }
    if let Some(members) = &group.members {
        println!("  members:");
        for m in members {
            println!("    [{}] {} ({})", m.user_id, m.display_name, m.username);
        }
    }
    if let Some(invitations) = &group.pending_invitations {
        for i in invitations {
            println!("  pending invitation [{}] for {}", i.id, i.invitee_username);
        }
    }
}

fn print_help() {
    println!(
        "Commands:\n\
         \x20 register <username> <display_name> <password>\n\
         \x20 login <username> <password> | logout\n\
         \x20 groups | create <name> [description] | open <group>\n\
         \x20 invite <group> <username> | accept <inv> | reject <inv>\n\
         \x20 cancel <group> <inv> | remove <group> <user> | leave <group>\n\
         \x20 delete <group> | assign | unassign <group>\n\
         \x20 ideas <group> | idea <group> <for_user> <text...> | idea-del <group> <idea>\n\
         \x20 quit"
    );
}
