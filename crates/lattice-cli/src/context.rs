//! Trigger context assembly from CLI arguments.

use lattice_core::Result;
use lattice_core::fingerprint::Fingerprint;
use lattice_core::trigger::{TriggerContext, TriggerKind};
use std::path::Path;
use tracing::debug;

/// Build the trigger context for one invocation.
///
/// The fingerprint digests the branch ref plus the contents of the
/// changed files. A changed path that no longer exists (a deletion)
/// contributes its path with empty content, so deletions still shift
/// the fingerprint.
pub fn build(
    kind: TriggerKind,
    branch: Option<String>,
    changed_paths: Vec<String>,
    workspace: &Path,
) -> Result<TriggerContext> {
    let mut files: Vec<(String, Vec<u8>)> = Vec::with_capacity(changed_paths.len());
    for path in &changed_paths {
        let content = match std::fs::read(workspace.join(path)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        files.push((path.clone(), content));
    }

    let fingerprint = Fingerprint::digest(
        branch.as_deref(),
        files.iter().map(|(path, content)| (path.as_str(), content.as_slice())),
    );
    debug!(%fingerprint, files = files.len(), "Computed trigger fingerprint");

    Ok(TriggerContext {
        kind,
        branch,
        changed_paths,
        fingerprint,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_tracks_file_content() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("lib.rs"), "fn a() {}").unwrap();

        let before = build(
            TriggerKind::Push,
            Some("main".to_string()),
            vec!["lib.rs".to_string()],
            dir.path(),
        )
        .unwrap();

        std::fs::write(dir.path().join("lib.rs"), "fn b() {}").unwrap();
        let after = build(
            TriggerKind::Push,
            Some("main".to_string()),
            vec!["lib.rs".to_string()],
            dir.path(),
        )
        .unwrap();

        assert_ne!(before.fingerprint, after.fingerprint);
    }

    #[test]
    fn test_missing_changed_path_is_tolerated() {
        let dir = tempfile::tempdir().unwrap();

        let ctx = build(
            TriggerKind::PullRequest,
            None,
            vec!["deleted.rs".to_string()],
            dir.path(),
        )
        .unwrap();

        assert_eq!(ctx.changed_paths, vec!["deleted.rs".to_string()]);
    }
}
