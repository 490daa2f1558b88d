//! Bundle resolver - deployment sources to deterministic bundles
//!
//! Fetches deployment content from git repositories (HTTPS, SSH or local),
//! Helm-style chart repositories and local directories, and materializes it
//! into a [`Bundle`]: an ordered, path-unique set of resource files.
//!
//! Credentials are supplied per resolution on the [`SourceDescriptor`] and
//! can be restricted to matching locations with a credential scope pattern.
//! Nothing is read from the user's git config, credential helpers or SSH
//! agent.
//!
//! ```no_run
//! use bundle_resolver::{Credential, Resolver, ResolverConfig, SourceDescriptor};
//!
//! # fn main() -> bundle_resolver::Result<()> {
//! let resolver = Resolver::new(ResolverConfig::default())?;
//! let source = SourceDescriptor::git("https://git.example.com/org/deploy.git")
//!     .with_sub_path("simple")
//!     .with_credential(Credential::basic("user", "token"));
//!
//! let bundle = resolver.resolve(&source)?;
//! for resource in bundle.resources() {
//!     println!("{} {}", resource.hash(), resource.path());
//! }
//! # Ok(())
//! # }
//! ```

pub mod assembler;
pub mod cancel;
pub mod collector;
pub mod config;
pub mod domain;
pub mod error;
pub mod git;
pub mod hash;
pub mod helm;
pub mod release;
pub mod resolver;
pub mod scope;
pub mod source;
pub mod temp;

pub use cancel::{CancellationExt, CancellationToken};
pub use config::{PathPolicy, ResolverConfig};
pub use domain::{Bundle, Resource};
pub use error::{ErrorKind, ResolveError, Result};
pub use release::ReleaseDefinition;
pub use resolver::Resolver;
pub use scope::CredentialScope;
pub use source::{Credential, HostKeyPolicy, SourceDescriptor, SourceKind};
