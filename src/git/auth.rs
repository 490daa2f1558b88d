//! Git authentication
//!
//! This module handles:
//! - Matching the supplied credential against the transport
//! - Answering libgit2 credential prompts with that credential only
//! - Verifying SSH host keys against the caller's `HostKeyPolicy`
//!
//! Nothing here consults the git config, credential helpers, the SSH agent
//! or `~/.ssh`; the credential supplied for the resolution is the only one
//! ever offered, and it is offered at most once.

use std::cell::{Cell, RefCell};

use git2::{CertificateCheckStatus, Cred, CredentialType, Error, ErrorClass, ErrorCode};
use git2::{RemoteCallbacks, cert::Cert};
use tracing::debug;

use super::url::Transport;
use crate::error::{ResolveError, Result};
use crate::source::Credential;

/// What happened inside the authentication callbacks during one clone
#[derive(Debug, Default)]
pub struct AuthOutcome {
    offered: Cell<bool>,
    rejected_host: RefCell<Option<String>>,
}

impl AuthOutcome {
    /// A credential was handed to the remote
    pub fn offered(&self) -> bool {
        self.offered.get()
    }

    /// Host whose key failed verification, if any
    pub fn rejected_host(&self) -> Option<String> {
        self.rejected_host.borrow().clone()
    }
}

/// Check the credential kind against the transport before any network call
///
/// Returns the credential that will be offered to the remote. Local
/// transports never authenticate, so any credential is dropped for them.
/// SSH always authenticates, so a missing credential fails immediately.
pub fn check_credential<'a>(
    transport: Transport,
    credential: Option<&'a Credential>,
    url: &str,
) -> Result<Option<&'a Credential>> {
    match (transport, credential) {
        (Transport::Local, Some(credential)) => {
            debug!(
                url,
                kind = credential.kind(),
                "ignoring credential for local repository"
            );
            Ok(None)
        }
        (Transport::Https, Some(Credential::Basic { .. }))
        | (Transport::Ssh, Some(Credential::SshKey { .. })) => Ok(credential),
        (Transport::Https | Transport::Ssh, Some(credential)) => {
            Err(ResolveError::CredentialMismatch {
                url: url.to_string(),
                expected: transport.credential_kind().to_string(),
                found: credential.kind().to_string(),
            })
        }
        (Transport::Ssh, None) => Err(ResolveError::AuthenticationRequired {
            url: url.to_string(),
        }),
        (Transport::Https | Transport::Local, None) => Ok(None),
    }
}

fn auth_error(message: &str) -> Error {
    Error::new(ErrorCode::Auth, ErrorClass::Http, message)
}

/// Answer a credential prompt from libgit2
pub fn provide_credentials(
    credential: Option<&Credential>,
    username_from_url: Option<&str>,
    allowed_types: CredentialType,
    outcome: &AuthOutcome,
) -> std::result::Result<Cred, Error> {
    // A second prompt after offering means the remote refused the credential
    if outcome.offered.get() {
        return Err(auth_error("credentials rejected"));
    }

    match credential {
        None => Err(auth_error("authentication required")),
        Some(Credential::Basic { username, password }) => {
            if !allowed_types.contains(CredentialType::USER_PASS_PLAINTEXT) {
                return Err(auth_error("remote does not accept basic authentication"));
            }
            outcome.offered.set(true);
            Cred::userpass_plaintext(username, password)
        }
        Some(Credential::SshKey {
            username,
            private_key,
            passphrase,
            ..
        }) => {
            let user = username_from_url.unwrap_or(username);
            // libgit2 asks for the user name separately when the URL has none
            if allowed_types.contains(CredentialType::USERNAME) {
                return Cred::username(user);
            }
            if !allowed_types.intersects(CredentialType::SSH_KEY | CredentialType::SSH_MEMORY) {
                return Err(auth_error("remote does not accept key authentication"));
            }
            outcome.offered.set(true);
            Cred::ssh_key_from_memory(user, None, private_key, passphrase.as_deref())
        }
    }
}

/// Verify the certificate or host key presented by the remote
///
/// TLS certificates are left to libgit2's own verification. SSH host keys
/// are checked against the credential's `HostKeyPolicy`.
pub fn check_certificate(
    credential: Option<&Credential>,
    cert: &Cert<'_>,
    host: &str,
    outcome: &AuthOutcome,
) -> std::result::Result<CertificateCheckStatus, Error> {
    let Some(hostkey) = cert.as_hostkey() else {
        return Ok(CertificateCheckStatus::CertificatePassthrough);
    };

    let accepted = match credential {
        Some(Credential::SshKey {
            host_key_policy, ..
        }) => host_key_policy.accepts(
            host,
            hostkey.hostkey(),
            hostkey.hash_sha256().map(<[u8; 32]>::as_slice),
        ),
        _ => false,
    };

    if accepted {
        Ok(CertificateCheckStatus::CertificateOk)
    } else {
        *outcome.rejected_host.borrow_mut() = Some(host.to_string());
        Err(Error::new(
            ErrorCode::Certificate,
            ErrorClass::Ssh,
            "host key verification failed",
        ))
    }
}

/// Set up authentication callbacks for git operations
pub fn setup_auth_callbacks<'a>(
    callbacks: &mut RemoteCallbacks<'a>,
    credential: Option<&'a Credential>,
    outcome: &'a AuthOutcome,
) {
    callbacks.credentials(move |_url, username_from_url, allowed_types| {
        provide_credentials(credential, username_from_url, allowed_types, outcome)
    });
    callbacks.certificate_check(move |cert, host| {
        check_certificate(credential, cert, host, outcome)
    });
}
