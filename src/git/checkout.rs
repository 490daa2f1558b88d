//! Revision resolution and checkout
//!
//! This module handles:
//! - Resolving refs (branches, tags, SHAs) to exact commits
//! - Checking out a commit as a detached HEAD

use git2::{Commit, Oid, Repository};

use crate::error::{ResolveError, Result};

/// Resolve a git ref (branch, tag, or partial SHA) to a full SHA
///
/// If no ref is provided, defaults to HEAD.
pub fn resolve_ref(repo: &Repository, git_ref: Option<&str>) -> Result<String> {
    let commit = match git_ref {
        Some(r) => resolve_reference(repo, r)?,
        None => repo
            .head()
            .and_then(|head| head.peel_to_commit())
            .map_err(|e| ResolveError::GitRefResolveFailed {
                git_ref: "HEAD".to_string(),
                reason: e.message().to_string(),
            })?,
    };

    Ok(commit.id().to_string())
}

/// Resolve a reference name to a commit
fn resolve_reference<'a>(repo: &'a Repository, refname: &str) -> Result<Commit<'a>> {
    // Try different reference formats in order
    let ref_candidates = [
        refname.to_string(),
        format!("refs/heads/{refname}"),
        format!("refs/tags/{refname}"),
        format!("refs/remotes/origin/{refname}"),
    ];

    for candidate in &ref_candidates {
        if let Ok(commit) = repo
            .find_reference(candidate)
            .and_then(|reference| reference.peel_to_commit())
        {
            return Ok(commit);
        }
    }

    if let Ok(commit) = Oid::from_str(refname).and_then(|oid| repo.find_commit(oid)) {
        return Ok(commit);
    }

    // Try revparse as last resort (short SHAs, `HEAD~1`, ...)
    if let Ok(commit) = repo
        .revparse_single(refname)
        .and_then(|obj| obj.peel_to_commit())
    {
        return Ok(commit);
    }

    Err(ResolveError::GitRefResolveFailed {
        git_ref: refname.to_string(),
        reason: "Could not resolve reference".to_string(),
    })
}

/// Checkout a specific commit in the repository
pub fn checkout_commit(repo: &Repository, sha: &str) -> Result<()> {
    let checkout_failed = |e: git2::Error| ResolveError::GitCheckoutFailed {
        sha: sha.to_string(),
        reason: e.message().to_string(),
    };

    let oid = Oid::from_str(sha).map_err(checkout_failed)?;
    let commit = repo.find_commit(oid).map_err(checkout_failed)?;

    // Create a detached HEAD at the commit
    repo.set_head_detached(commit.id())
        .map_err(checkout_failed)?;

    let mut checkout_builder = git2::build::CheckoutBuilder::new();
    checkout_builder.force();

    repo.checkout_head(Some(&mut checkout_builder))
        .map_err(checkout_failed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn init_repo_with_commit() -> (TempDir, Repository, Oid) {
        let temp = TempDir::new().unwrap();
        let repo = Repository::init(temp.path()).unwrap();
        let oid = {
            let sig = git2::Signature::now("Test", "test@test.com").unwrap();
            let tree_id = repo.index().unwrap().write_tree().unwrap();
            let tree = repo.find_tree(tree_id).unwrap();
            repo.commit(Some("HEAD"), &sig, &sig, "Initial commit", &tree, &[])
                .unwrap()
        };
        (temp, repo, oid)
    }

    #[test]
    fn test_resolve_ref_head() {
        let (_temp, repo, oid) = init_repo_with_commit();
        let sha = resolve_ref(&repo, None).unwrap();
        assert_eq!(sha.len(), 40);
        assert_eq!(sha, oid.to_string());
    }

    #[test]
    fn test_resolve_ref_by_branch_and_tag() {
        let (_temp, repo, oid) = init_repo_with_commit();
        let commit = repo.find_commit(oid).unwrap();
        repo.tag_lightweight("v1.0.0", commit.as_object(), false)
            .unwrap();

        let branch = repo.head().unwrap().shorthand().unwrap().to_string();
        assert_eq!(resolve_ref(&repo, Some(&branch)).unwrap(), oid.to_string());
        assert_eq!(resolve_ref(&repo, Some("v1.0.0")).unwrap(), oid.to_string());
    }

    #[test]
    fn test_resolve_ref_short_sha() {
        let (_temp, repo, oid) = init_repo_with_commit();
        let short = &oid.to_string()[..8];
        assert_eq!(resolve_ref(&repo, Some(short)).unwrap(), oid.to_string());
    }

    #[test]
    fn test_resolve_ref_invalid() {
        let (_temp, repo, _oid) = init_repo_with_commit();
        let result = resolve_ref(&repo, Some("nonexistent"));
        assert!(matches!(
            result,
            Err(ResolveError::GitRefResolveFailed { .. })
        ));
    }

    #[test]
    fn test_checkout_commit_detaches_head() {
        let (_temp, repo, oid) = init_repo_with_commit();
        checkout_commit(&repo, &oid.to_string()).unwrap();
        assert!(repo.head_detached().unwrap());
    }

    #[test]
    fn test_checkout_invalid_sha() {
        let (_temp, repo, _oid) = init_repo_with_commit();
        let result = checkout_commit(&repo, "0000000000000000000000000000000000000000");
        assert!(matches!(result, Err(ResolveError::GitCheckoutFailed { .. })));
    }
}
