//! Connect/call API against a cluster whose leader may move at any time.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parlor_types::{ErrorCode, MessageId};
use parlor_wire::{read_message, write_message, ClientRequest, ClientResponse, WireMessage};
use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::error::ClientError;

/// A connected caller against the cluster's client-facing service.
///
/// Holds the full list of known addresses and rotates through them: a call
/// that hits a follower (rejected with `NOT_LEADER`) or an address that is
/// simply down advances to the next address rather than failing outright,
/// mirroring the original client's address-rotation-on-failure behavior.
pub struct Client {
    addresses: Vec<String>,
    current: AtomicUsize,
    timeout: Duration,
}

impl Client {
    pub fn new(addresses: Vec<String>, timeout: Duration) -> Self {
        Self {
            addresses,
            current: AtomicUsize::new(0),
            timeout,
        }
    }

    fn advance(&self) -> usize {
        self.current
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |i| {
                Some((i + 1) % self.addresses.len().max(1))
            })
            .unwrap_or(0)
    }

    async fn call(&self, request: ClientRequest) -> Result<ClientResponse, ClientError> {
        if self.addresses.is_empty() {
            return Err(ClientError::AllAddressesExhausted);
        }
        for _ in 0..self.addresses.len() {
            let idx = self.current.load(Ordering::SeqCst) % self.addresses.len();
            let address = &self.addresses[idx];
            match self.try_once(address, request.clone()).await {
                Ok(response) => {
                    if response_code(&response) == Some(ErrorCode::NotLeader) {
                        debug!(address, "address is a follower, rotating");
                        self.advance();
                        continue;
                    }
                    return Ok(response);
                }
                Err(e) => {
                    warn!(address, error = %e, "call failed, rotating to the next address");
                    self.advance();
                }
            }
        }
        Err(ClientError::AllAddressesExhausted)
    }

    async fn try_once(
        &self,
        address: &str,
        request: ClientRequest,
    ) -> Result<ClientResponse, ClientError> {
        let fut = async {
            let mut stream = TcpStream::connect(address).await?;
            write_message(&mut stream, &request).await?;
            let response: ClientResponse = read_message(&mut stream).await?;
            Ok::<_, parlor_wire::WireError>(response)
        };
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => Err(ClientError::Wire(e)),
            Err(_) => Err(ClientError::Wire(parlor_wire::WireError::ConnectionClosed)),
        }
    }

    pub async fn create_account(&self, username: &str, password: &str) -> Result<(), ClientError> {
        let response = self
            .call(ClientRequest::CreateAccount {
                username: username.to_string(),
                password: password.to_string(),
            })
            .await?;
        expect_bare(response, |r| matches!(r, ClientResponse::CreateAccount { .. }))
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<String, ClientError> {
        let response = self
            .call(ClientRequest::Login {
                username: username.to_string(),
                password: password.to_string(),
            })
            .await?;
        match response {
            ClientResponse::Login { code, session_id } if code == ErrorCode::Success => {
                Ok(session_id)
            }
            ClientResponse::Login { code, .. } => Err(ClientError::Server(code)),
            other => Err(unexpected(other)),
        }
    }

    pub async fn logout(&self, session_id: &str) -> Result<(), ClientError> {
        let response = self
            .call(ClientRequest::Logout {
                session_id: session_id.to_string(),
            })
            .await?;
        expect_bare(response, |r| matches!(r, ClientResponse::Logout { .. }))
    }

    pub async fn delete_account(&self, session_id: &str) -> Result<(), ClientError> {
        let response = self
            .call(ClientRequest::DeleteAccount {
                session_id: session_id.to_string(),
            })
            .await?;
        expect_bare(response, |r| matches!(r, ClientResponse::DeleteAccount { .. }))
    }

    pub async fn send(&self, session_id: &str, to: &str, message: &str) -> Result<(), ClientError> {
        let response = self
            .call(ClientRequest::Send {
                session_id: session_id.to_string(),
                to: to.to_string(),
                message: message.to_string(),
            })
            .await?;
        expect_bare(response, |r| matches!(r, ClientResponse::Send { .. }))
    }

    pub async fn get_messages(&self, session_id: &str) -> Result<Vec<WireMessage>, ClientError> {
        let response = self
            .call(ClientRequest::GetMessages {
                session_id: session_id.to_string(),
            })
            .await?;
        match response {
            ClientResponse::GetMessages { code, messages } if code == ErrorCode::Success => {
                Ok(messages)
            }
            ClientResponse::GetMessages { code, .. } => Err(ClientError::Server(code)),
            other => Err(unexpected(other)),
        }
    }

    pub async fn get_chat(
        &self,
        session_id: &str,
        username: &str,
    ) -> Result<Vec<WireMessage>, ClientError> {
        let response = self
            .call(ClientRequest::GetChat {
                session_id: session_id.to_string(),
                username: username.to_string(),
            })
            .await?;
        match response {
            ClientResponse::GetChat { code, messages } if code == ErrorCode::Success => {
                Ok(messages)
            }
            ClientResponse::GetChat { code, .. } => Err(ClientError::Server(code)),
            other => Err(unexpected(other)),
        }
    }

    pub async fn delete_messages(
        &self,
        session_id: &str,
        message_ids: Vec<MessageId>,
    ) -> Result<(), ClientError> {
        let response = self
            .call(ClientRequest::DeleteMessages {
                session_id: session_id.to_string(),
                message_ids,
            })
            .await?;
        expect_bare(response, |r| matches!(r, ClientResponse::DeleteMessages { .. }))
    }

    pub async fn list_users(&self, wildcard: &str) -> Result<Vec<(String, String)>, ClientError> {
        let response = self
            .call(ClientRequest::ListUsers {
                wildcard: wildcard.to_string(),
            })
            .await?;
        match response {
            ClientResponse::ListUsers { code, users } if code == ErrorCode::Success => Ok(users),
            ClientResponse::ListUsers { code, .. } => Err(ClientError::Server(code)),
            other => Err(unexpected(other)),
        }
    }

    pub async fn get_unread_counts(
        &self,
        session_id: &str,
    ) -> Result<Vec<(String, usize)>, ClientError> {
        let response = self
            .call(ClientRequest::GetUnreadCounts {
                session_id: session_id.to_string(),
            })
            .await?;
        match response {
            ClientResponse::GetUnreadCounts { code, counts } if code == ErrorCode::Success => {
                Ok(counts)
            }
            ClientResponse::GetUnreadCounts { code, .. } => Err(ClientError::Server(code)),
            other => Err(unexpected(other)),
        }
    }

    /// Re-validates a session after reconnecting (e.g. after a failover) by
    /// issuing a lightweight authenticated call and checking whether the
    /// server still recognizes the session.
    pub async fn reconnect_with_session(&self, session_id: &str) -> Result<(), ClientError> {
        match self.get_unread_counts(session_id).await {
            Ok(_) => Ok(()),
            Err(ClientError::Server(ErrorCode::UserNotLoggedIn)) => {
                Err(ClientError::SessionInvalidated)
            }
            Err(e) => Err(e),
        }
    }
}

fn response_code(response: &ClientResponse) -> Option<ErrorCode> {
    match response {
        ClientResponse::CreateAccount { code }
        | ClientResponse::Login { code, .. }
        | ClientResponse::Logout { code }
        | ClientResponse::DeleteAccount { code }
        | ClientResponse::Send { code }
        | ClientResponse::GetMessages { code, .. }
        | ClientResponse::GetChat { code, .. }
        | ClientResponse::DeleteMessages { code }
        | ClientResponse::GetUnreadCounts { code, .. }
        | ClientResponse::ListUsers { code, .. } => Some(*code),
    }
}

fn expect_bare(
    response: ClientResponse,
    matches_variant: impl Fn(&ClientResponse) -> bool,
) -> Result<(), ClientError> {
    if !matches_variant(&response) {
        return Err(unexpected(response));
    }
    match response_code(&response) {
        Some(ErrorCode::Success) | None => Ok(()),
        Some(code) => Err(ClientError::Server(code)),
    }
}

fn unexpected(response: ClientResponse) -> ClientError {
    ClientError::Server(response_code(&response).unwrap_or(ErrorCode::InvalidArguments))
}
