use serde::{Deserialize, Serialize};

/// A reference to a third-party action used in a step, e.g. `actions/checkout@v4`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRef {
    pub full_ref: String,
    pub owner: String,
    pub repo: String,
    /// Tag, branch name, or commit SHA after the `@`.
    pub git_ref: String,
    pub is_pinned: bool,
}

impl ActionRef {
    /// Parse a `uses:` value into its components.
    ///
    /// Returns `None` for empty text, text without `/`, `docker://` images,
    /// `./` local actions, and references with no `@revision`. Extra path
    /// segments (`owner/repo/sub/dir@v1`) are ignored.
    pub fn parse(uses: &str) -> Option<Self> {
        if uses.is_empty() || !uses.contains('/') {
            tracing::debug!(uses, "Skipping non-action uses reference");
            return None;
        }

        if uses.starts_with("docker://") || uses.starts_with("./") {
            tracing::debug!(uses, "Skipping local/docker action");
            return None;
        }

        let Some((action_path, git_ref)) = uses.rsplit_once('@') else {
            tracing::debug!(uses, "Skipping action without version ref");
            return None;
        };

        let mut parts = action_path.split('/');
        let owner = parts.next()?;
        let repo = parts.next()?;

        let is_pinned = is_commit_sha(git_ref);
        tracing::debug!(owner, repo, git_ref, is_pinned, "Parsed action reference");

        Some(Self {
            full_ref: uses.to_string(),
            owner: owner.to_string(),
            repo: repo.to_string(),
            git_ref: git_ref.to_string(),
            is_pinned,
        })
    }

    /// `owner/repo` without the revision.
    pub fn action_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

/// True when `git_ref` is a full 40-character hex SHA-1, in either case.
pub fn is_commit_sha(git_ref: &str) -> bool {
    git_ref.len() == 40 && git_ref.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_tag_ref() {
        let r = ActionRef::parse("actions/checkout@v3").unwrap();
        assert_eq!(r.owner, "actions");
        assert_eq!(r.repo, "checkout");
        assert_eq!(r.git_ref, "v3");
        assert!(!r.is_pinned);
        assert_eq!(r.action_name(), "actions/checkout");
    }

    #[test]
    fn test_pinned_sha_ref() {
        let sha = "af513c7a016048ae468971c52ed77d9562c7c819";
        let r = ActionRef::parse(&format!("actions/checkout@{sha}")).unwrap();
        assert!(r.is_pinned);
        assert_eq!(r.git_ref, sha);
    }

    #[test]
    fn test_uppercase_sha_is_pinned() {
        let r = ActionRef::parse("actions/checkout@AF513C7A016048AE468971C52ED77D9562C7C819")
            .unwrap();
        assert!(r.is_pinned);
    }

    #[test]
    fn test_almost_sha_not_pinned() {
        let short = "a".repeat(39);
        let r = ActionRef::parse(&format!("actions/checkout@{short}")).unwrap();
        assert!(!r.is_pinned);

        let non_hex = format!("{}g", "a".repeat(39));
        assert!(!is_commit_sha(&non_hex));
    }

    #[test]
    fn test_branch_ref() {
        let r = ActionRef::parse("some-org/deploy-action@main").unwrap();
        assert_eq!(r.owner, "some-org");
        assert_eq!(r.repo, "deploy-action");
        assert_eq!(r.git_ref, "main");
        assert!(!r.is_pinned);
    }

    #[test]
    fn test_subpath_action() {
        let r = ActionRef::parse("actions/aws/s3-upload@v1").unwrap();
        assert_eq!(r.owner, "actions");
        assert_eq!(r.repo, "aws");
        assert_eq!(r.git_ref, "v1");
    }

    #[test]
    fn test_splits_on_last_at() {
        let r = ActionRef::parse("org/action@feature@v2").unwrap();
        assert_eq!(r.repo, "action@feature");
        assert_eq!(r.git_ref, "v2");
    }

    #[test]
    fn test_malformed_shapes_return_none() {
        for uses in [
            "",
            "checkout@v3",
            "actions/checkout",
            "docker://alpine:3.8",
            "./.github/actions/my-action",
            "@",
            "@/",
        ] {
            assert!(ActionRef::parse(uses).is_none(), "expected None for {uses:?}");
        }
    }
}
