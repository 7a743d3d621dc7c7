//! The client-facing service, leader and follower behaviour in one handler.
//!
//! Mirrors [`parlor_replica::handle_peer_request`]'s shape: a single
//! dispatch function consults [`Node::role`] at the moment each call lands
//! rather than binding a different listener per role, so promotion never
//! needs to stop and restart the client-facing socket — only the role flag
//! flips underneath it.

use std::sync::Arc;

use parlor_replica::{Node, Role};
use parlor_store::{DeletedMessage, MutationEvent, Row};
use parlor_types::{ErrorCode, SessionToken};
use parlor_wire::{ClientRequest, ClientResponse, WireMessage};
use tracing::instrument;

use crate::auth::PasswordHasher;

/// Everything the client-facing handler needs beyond the replicated [`Node`].
pub struct ClientContext {
    pub node: Arc<Node>,
    pub hasher: Arc<dyn PasswordHasher>,
}

#[instrument(skip_all, fields(self_id = %ctx.node.self_id))]
pub async fn handle_client_request(ctx: &ClientContext, request: ClientRequest) -> ClientResponse {
    if ctx.node.role() != Role::Leader {
        return not_leader_response(&request);
    }
    match request {
        ClientRequest::CreateAccount { username, password } => {
            create_account(ctx, &username, &password)
        }
        ClientRequest::Login { username, password } => login(ctx, &username, &password),
        ClientRequest::Logout { session_id } => logout(ctx, &session_id),
        ClientRequest::DeleteAccount { session_id } => delete_account(ctx, &session_id),
        ClientRequest::Send {
            session_id,
            to,
            message,
        } => send(ctx, &session_id, &to, &message),
        ClientRequest::GetMessages { session_id } => get_messages(ctx, &session_id),
        ClientRequest::GetChat {
            session_id,
            username,
        } => get_chat(ctx, &session_id, &username),
        ClientRequest::DeleteMessages {
            session_id,
            message_ids,
        } => delete_messages(ctx, &session_id, &message_ids),
        ClientRequest::ListUsers { wildcard } => list_users(ctx, &wildcard),
        ClientRequest::GetUnreadCounts { session_id } => get_unread_counts(ctx, &session_id),
    }
}

/// Every method fails the same way on a follower, so clients rotate to the
/// next address rather than parsing a method-specific error.
fn not_leader_response(request: &ClientRequest) -> ClientResponse {
    let code = ErrorCode::NotLeader;
    match request {
        ClientRequest::CreateAccount { .. } => ClientResponse::CreateAccount { code },
        ClientRequest::Login { .. } => ClientResponse::Login {
            code,
            session_id: String::new(),
        },
        ClientRequest::Logout { .. } => ClientResponse::Logout { code },
        ClientRequest::DeleteAccount { .. } => ClientResponse::DeleteAccount { code },
        ClientRequest::Send { .. } => ClientResponse::Send { code },
        ClientRequest::GetMessages { .. } => ClientResponse::GetMessages {
            code,
            messages: Vec::new(),
        },
        ClientRequest::GetChat { .. } => ClientResponse::GetChat {
            code,
            messages: Vec::new(),
        },
        ClientRequest::DeleteMessages { .. } => ClientResponse::DeleteMessages { code },
        ClientRequest::ListUsers { .. } => ClientResponse::ListUsers {
            code,
            users: Vec::new(),
        },
        ClientRequest::GetUnreadCounts { .. } => ClientResponse::GetUnreadCounts {
            code,
            counts: Vec::new(),
        },
    }
}

fn create_account(ctx: &ClientContext, username: &str, password: &str) -> ClientResponse {
    let Ok(hash) = ctx.hasher.hash(password) else {
        return ClientResponse::CreateAccount {
            code: ErrorCode::InvalidArguments,
        };
    };
    match ctx.node.store.create_user(username, hash) {
        Ok(user) => {
            ctx.node
                .queue
                .push(MutationEvent::add(Row::User(user)));
            ClientResponse::CreateAccount {
                code: ErrorCode::Success,
            }
        }
        Err(parlor_store::StoreError::UserNameExists(_)) => ClientResponse::CreateAccount {
            code: ErrorCode::UserNameExists,
        },
        Err(_) => ClientResponse::CreateAccount {
            code: ErrorCode::InvalidArguments,
        },
    }
}

/// Logs in against the password hash, which is the only column replicated
/// from the original `CreateAccount` — so `Login` against an account
/// created before a failover still works on the promoted follower.
fn login(ctx: &ClientContext, username: &str, password: &str) -> ClientResponse {
    let Some(user) = ctx.node.store.find_user_by_name(username) else {
        return ClientResponse::Login {
            code: ErrorCode::UserDoesntExist,
            session_id: String::new(),
        };
    };
    match ctx.hasher.verify(password, &user.password_hash) {
        Ok(true) => {}
        _ => {
            return ClientResponse::Login {
                code: ErrorCode::IncorrectPassword,
                session_id: String::new(),
            }
        }
    }
    let token = SessionToken::new_random();
    if ctx
        .node
        .store
        .set_session(user.id, token.as_str().to_string())
        .is_err()
    {
        return ClientResponse::Login {
            code: ErrorCode::UserDoesntExist,
            session_id: String::new(),
        };
    }
    // Sessions are leader-local: no event is enqueued here.
    ClientResponse::Login {
        code: ErrorCode::Success,
        session_id: token.as_str().to_string(),
    }
}

fn logout(ctx: &ClientContext, session_id: &str) -> ClientResponse {
    let Some(user) = ctx.node.store.find_user_by_session(session_id) else {
        return ClientResponse::Logout {
            code: ErrorCode::UserNotLoggedIn,
        };
    };
    let _ = ctx.node.store.clear_session(user.id);
    ClientResponse::Logout {
        code: ErrorCode::Success,
    }
}

fn delete_account(ctx: &ClientContext, session_id: &str) -> ClientResponse {
    let Some(user) = ctx.node.store.find_user_by_session(session_id) else {
        return ClientResponse::DeleteAccount {
            code: ErrorCode::UserNotLoggedIn,
        };
    };
    match ctx.node.store.delete_user_cascade(user.id) {
        Ok((deleted_user, tombstoned)) => {
            for message in tombstoned {
                let tombstone = DeletedMessage::from_message(&message);
                ctx.node
                    .queue
                    .push(MutationEvent::delete(Row::Message(message)));
                ctx.node
                    .queue
                    .push(MutationEvent::add(Row::DeletedMessage(tombstone)));
            }
            ctx.node
                .queue
                .push(MutationEvent::delete(Row::User(deleted_user)));
            ClientResponse::DeleteAccount {
                code: ErrorCode::Success,
            }
        }
        Err(_) => ClientResponse::DeleteAccount {
            code: ErrorCode::UserNotLoggedIn,
        },
    }
}

fn send(ctx: &ClientContext, session_id: &str, to: &str, message: &str) -> ClientResponse {
    let Some(sender) = ctx.node.store.find_user_by_session(session_id) else {
        return ClientResponse::Send {
            code: ErrorCode::UserNotLoggedIn,
        };
    };
    let Some(receiver) = ctx.node.store.find_user_by_name(to) else {
        return ClientResponse::Send {
            code: ErrorCode::ReceiverDoesntExist,
        };
    };
    match ctx
        .node
        .store
        .insert_message(sender.id, receiver.id, message.to_string())
    {
        Ok(row) => {
            ctx.node.queue.push(MutationEvent::add(Row::Message(row)));
            ClientResponse::Send {
                code: ErrorCode::Success,
            }
        }
        Err(_) => ClientResponse::Send {
            code: ErrorCode::InvalidArguments,
        },
    }
}

/// No event is produced for the `is_received` flip: this design matches the
/// source and accepts that a failover can re-deliver already-seen messages.
fn get_messages(ctx: &ClientContext, session_id: &str) -> ClientResponse {
    let Some(user) = ctx.node.store.find_user_by_session(session_id) else {
        return ClientResponse::GetMessages {
            code: ErrorCode::UserNotLoggedIn,
            messages: Vec::new(),
        };
    };
    let rows = ctx.node.store.fetch_unread_for(user.id);
    if rows.is_empty() {
        return ClientResponse::GetMessages {
            code: ErrorCode::NoMessages,
            messages: Vec::new(),
        };
    }
    ClientResponse::GetMessages {
        code: ErrorCode::Success,
        messages: rows.into_iter().map(|m| to_wire_message(ctx, m)).collect(),
    }
}

fn get_chat(ctx: &ClientContext, session_id: &str, username: &str) -> ClientResponse {
    let Some(user) = ctx.node.store.find_user_by_session(session_id) else {
        return ClientResponse::GetChat {
            code: ErrorCode::UserNotLoggedIn,
            messages: Vec::new(),
        };
    };
    let Some(other) = ctx.node.store.find_user_by_name(username) else {
        return ClientResponse::GetChat {
            code: ErrorCode::NoMessages,
            messages: Vec::new(),
        };
    };
    let rows = ctx.node.store.fetch_chat(user.id, other.id);
    if rows.is_empty() {
        return ClientResponse::GetChat {
            code: ErrorCode::NoMessages,
            messages: Vec::new(),
        };
    }
    ClientResponse::GetChat {
        code: ErrorCode::Success,
        messages: rows.into_iter().map(|m| to_wire_message(ctx, m)).collect(),
    }
}

/// Deletes whichever of `message_ids` the caller is sender or receiver of,
/// silently ignoring foreign or unknown ids — an empty or fully-filtered
/// set still reports success, matching the original's "0 message(s)
/// deleted" behaviour rather than treating it as an argument error.
fn delete_messages(
    ctx: &ClientContext,
    session_id: &str,
    message_ids: &[parlor_types::MessageId],
) -> ClientResponse {
    let Some(user) = ctx.node.store.find_user_by_session(session_id) else {
        return ClientResponse::DeleteMessages {
            code: ErrorCode::UserNotLoggedIn,
        };
    };
    let deleted = ctx.node.store.delete_messages(message_ids, user.id);
    for message in deleted {
        let tombstone = DeletedMessage::from_message(&message);
        ctx.node
            .queue
            .push(MutationEvent::delete(Row::Message(message)));
        ctx.node
            .queue
            .push(MutationEvent::add(Row::DeletedMessage(tombstone)));
    }
    ClientResponse::DeleteMessages {
        code: ErrorCode::Success,
    }
}

/// A bare `foo` becomes the prefix match `foo*`; an empty wildcard or one
/// that already carries glob metacharacters is passed through unchanged.
fn list_users(ctx: &ClientContext, wildcard: &str) -> ClientResponse {
    let pattern = if wildcard.is_empty() || wildcard.contains(['*', '?']) {
        wildcard.to_string()
    } else {
        format!("{wildcard}*")
    };
    let users = ctx
        .node
        .store
        .list_users(&pattern)
        .into_iter()
        .map(|(username, logged_in)| {
            let status = if logged_in { "online" } else { "offline" }.to_string();
            (username, status)
        })
        .collect();
    ClientResponse::ListUsers {
        code: ErrorCode::Success,
        users,
    }
}

fn get_unread_counts(ctx: &ClientContext, session_id: &str) -> ClientResponse {
    let Some(user) = ctx.node.store.find_user_by_session(session_id) else {
        return ClientResponse::GetUnreadCounts {
            code: ErrorCode::UserNotLoggedIn,
            counts: Vec::new(),
        };
    };
    ClientResponse::GetUnreadCounts {
        code: ErrorCode::Success,
        counts: ctx.node.store.count_unread_by_sender(user.id),
    }
}

fn to_wire_message(ctx: &ClientContext, message: parlor_store::Message) -> WireMessage {
    let from = ctx
        .node
        .store
        .find_user_by_id(message.sender_id)
        .map(|u| u.username)
        .unwrap_or_default();
    WireMessage {
        from,
        content: message.content,
        message_id: message.id,
        time_stamp: message.time_stamp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Argon2Hasher;
    use parlor_replica::ReplicationConfig;
    use parlor_store::{MemoryStore, Store};
    use parlor_types::NodeId;

    fn leader_ctx() -> ClientContext {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let node = Node::new_leader(
            NodeId::new(1),
            "127.0.0.1:0".into(),
            "127.0.0.1:0".into(),
            store,
            ReplicationConfig::default(),
        );
        ClientContext {
            node,
            hasher: Arc::new(Argon2Hasher),
        }
    }

    #[tokio::test]
    async fn create_and_login_flow_matches_the_literal_scenario() {
        let ctx = leader_ctx();
        let response = handle_client_request(
            &ctx,
            ClientRequest::CreateAccount {
                username: "alice".into(),
                password: "pw".into(),
            },
        )
        .await;
        assert!(matches!(
            response,
            ClientResponse::CreateAccount {
                code: ErrorCode::Success
            }
        ));

        let response = handle_client_request(
            &ctx,
            ClientRequest::Login {
                username: "alice".into(),
                password: "pw".into(),
            },
        )
        .await;
        let ClientResponse::Login { code, session_id } = response else {
            panic!("unexpected response variant");
        };
        assert_eq!(code, ErrorCode::Success);
        assert!(!session_id.is_empty());

        let response = handle_client_request(
            &ctx,
            ClientRequest::Login {
                username: "alice".into(),
                password: "wrong".into(),
            },
        )
        .await;
        assert!(matches!(
            response,
            ClientResponse::Login {
                code: ErrorCode::IncorrectPassword,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn send_to_unknown_recipient_produces_no_event() {
        let ctx = leader_ctx();
        handle_client_request(
            &ctx,
            ClientRequest::CreateAccount {
                username: "alice".into(),
                password: "pw".into(),
            },
        )
        .await;
        let login = handle_client_request(
            &ctx,
            ClientRequest::Login {
                username: "alice".into(),
                password: "pw".into(),
            },
        )
        .await;
        let ClientResponse::Login { session_id, .. } = login else {
            unreachable!()
        };
        // Drain the CreateAccount event before asserting Send adds nothing.
        ctx.node.queue.try_pop();
        let response = handle_client_request(
            &ctx,
            ClientRequest::Send {
                session_id,
                to: "ghost".into(),
                message: "hi".into(),
            },
        )
        .await;
        assert!(matches!(
            response,
            ClientResponse::Send {
                code: ErrorCode::ReceiverDoesntExist
            }
        ));
        assert!(ctx.node.queue.is_empty());
    }

    #[tokio::test]
    async fn every_method_redirects_on_a_follower() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let node = Node::new_follower(
            NodeId::new(2),
            "127.0.0.1:0".into(),
            "127.0.0.1:0".into(),
            NodeId::new(1),
            "127.0.0.1:1".into(),
            store,
            ReplicationConfig::default(),
        );
        let ctx = ClientContext {
            node,
            hasher: Arc::new(Argon2Hasher),
        };
        let response = handle_client_request(
            &ctx,
            ClientRequest::ListUsers {
                wildcard: String::new(),
            },
        )
        .await;
        assert!(matches!(
            response,
            ClientResponse::ListUsers {
                code: ErrorCode::NotLeader,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn list_users_treats_a_bare_prefix_as_a_prefix_match() {
        let ctx = leader_ctx();
        handle_client_request(
            &ctx,
            ClientRequest::CreateAccount {
                username: "alice".into(),
                password: "pw".into(),
            },
        )
        .await;
        handle_client_request(
            &ctx,
            ClientRequest::CreateAccount {
                username: "bob".into(),
                password: "pw".into(),
            },
        )
        .await;
        let response = handle_client_request(
            &ctx,
            ClientRequest::ListUsers {
                wildcard: "al".into(),
            },
        )
        .await;
        let ClientResponse::ListUsers { users, .. } = response else {
            panic!("unexpected response variant");
        };
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].0, "alice");
    }

    #[tokio::test]
    async fn delete_messages_ignores_a_foreign_id_and_deletes_the_rest() {
        let ctx = leader_ctx();
        handle_client_request(
            &ctx,
            ClientRequest::CreateAccount {
                username: "alice".into(),
                password: "pw".into(),
            },
        )
        .await;
        handle_client_request(
            &ctx,
            ClientRequest::CreateAccount {
                username: "bob".into(),
                password: "pw".into(),
            },
        )
        .await;
        handle_client_request(
            &ctx,
            ClientRequest::CreateAccount {
                username: "carol".into(),
                password: "pw".into(),
            },
        )
        .await;
        let login_alice = handle_client_request(
            &ctx,
            ClientRequest::Login {
                username: "alice".into(),
                password: "pw".into(),
            },
        )
        .await;
        let ClientResponse::Login { session_id: alice_session, .. } = login_alice else {
            unreachable!()
        };
        let login_bob = handle_client_request(
            &ctx,
            ClientRequest::Login {
                username: "bob".into(),
                password: "pw".into(),
            },
        )
        .await;
        let ClientResponse::Login { session_id: bob_session, .. } = login_bob else {
            unreachable!()
        };

        handle_client_request(
            &ctx,
            ClientRequest::Send {
                session_id: alice_session.clone(),
                to: "bob".into(),
                message: "owned".into(),
            },
        )
        .await;
        handle_client_request(
            &ctx,
            ClientRequest::Send {
                session_id: bob_session,
                to: "carol".into(),
                message: "foreign".into(),
            },
        )
        .await;

        let owned_id = ctx.node.store.fetch_chat(
            ctx.node.store.find_user_by_name("alice").unwrap().id,
            ctx.node.store.find_user_by_name("bob").unwrap().id,
        )[0]
            .id;
        let foreign_id = ctx.node.store.fetch_chat(
            ctx.node.store.find_user_by_name("bob").unwrap().id,
            ctx.node.store.find_user_by_name("carol").unwrap().id,
        )[0]
            .id;

        let response = handle_client_request(
            &ctx,
            ClientRequest::DeleteMessages {
                session_id: alice_session,
                message_ids: vec![owned_id, foreign_id],
            },
        )
        .await;
        assert!(matches!(
            response,
            ClientResponse::DeleteMessages {
                code: ErrorCode::Success
            }
        ));

        let remaining = ctx.node.store.fetch_chat(
            ctx.node.store.find_user_by_name("bob").unwrap().id,
            ctx.node.store.find_user_by_name("carol").unwrap().id,
        );
        assert!(remaining.iter().any(|m| m.id == foreign_id));
    }

    #[tokio::test]
    async fn delete_messages_with_empty_ids_still_succeeds() {
        let ctx = leader_ctx();
        handle_client_request(
            &ctx,
            ClientRequest::CreateAccount {
                username: "alice".into(),
                password: "pw".into(),
            },
        )
        .await;
        let login = handle_client_request(
            &ctx,
            ClientRequest::Login {
                username: "alice".into(),
                password: "pw".into(),
            },
        )
        .await;
        let ClientResponse::Login { session_id, .. } = login else {
            unreachable!()
        };
        let response = handle_client_request(
            &ctx,
            ClientRequest::DeleteMessages {
                session_id,
                message_ids: vec![],
            },
        )
        .await;
        assert!(matches!(
            response,
            ClientResponse::DeleteMessages {
                code: ErrorCode::Success
            }
        ));
    }
}
