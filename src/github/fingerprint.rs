// src/github/fingerprint.rs
// =============================================================================
// The change-detection token for a bound skill.
//
// A "fingerprint" is the SHA of the newest commit touching the skill's
// subpath on its ref. It is opaque: only ever compared for equality, never
// parsed or ordered.
// =============================================================================

use tracing::debug;

use super::client::GitHubClient;
use crate::error::Result;

// Latest commit SHA for `subpath` on `git_ref`, or None if nothing touched it
pub async fn latest_commit(
    client: &GitHubClient,
    owner: &str,
    repo: &str,
    subpath: &str,
    git_ref: &str,
) -> Result<Option<String>> {
    let sha = client
        .get_latest_commit_sha(owner, repo, subpath, git_ref)
        .await?;
    debug!(owner, repo, subpath, git_ref, ?sha, "latest commit");
    Ok(sha)
}

// Whether `latest` means the upstream moved away from `stored`
//
// An unknown latest fingerprint can't prove a change, so it counts as
// "no update".
pub fn has_changed(stored: Option<&str>, latest: Option<&str>) -> bool {
    match latest {
        Some(latest) => stored != Some(latest),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::client::tests::test_client;
    use mockito::{Matcher, Server};

    #[test]
    fn test_has_changed() {
        assert!(!has_changed(Some("abc"), Some("abc")));
        assert!(has_changed(Some("abc"), Some("def")));
        assert!(has_changed(None, Some("def")));
        assert!(!has_changed(Some("abc"), None));
        assert!(!has_changed(None, None));
    }

    #[tokio::test]
    async fn test_latest_commit_takes_newest() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/repos/acme/widget/commits")
            .match_query(Matcher::UrlEncoded("per_page".into(), "1".into()))
            .with_status(200)
            .with_body(r#"[{"sha": "c0ffee"}]"#)
            .create_async()
            .await;

        let client = test_client(&server, None);
        let sha = latest_commit(&client, "acme", "widget", "", "main")
            .await
            .unwrap();
        assert_eq!(sha.as_deref(), Some("c0ffee"));
    }
}
