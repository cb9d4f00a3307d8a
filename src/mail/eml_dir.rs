use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::mail::raw::RawMessage;
use crate::mail::sort_newest_first;

/// Load every `*.eml` file under `dir`, newest first.
///
/// Files and subdirectories that cannot be read are logged and left out;
/// only a missing or unreadable `dir` itself is an error.
pub fn load_dir(dir: &Path, recursive: bool) -> Result<Vec<RawMessage>> {
    let mut paths = Vec::new();
    collect_eml_paths(dir, recursive, &mut paths)?;
    paths.sort();

    let mut out = Vec::with_capacity(paths.len());
    for path in paths {
        match fs::read(&path) {
            Ok(bytes) => out.push(RawMessage::new(path.display().to_string(), bytes)),
            Err(e) => log::warn!("skipping {}: {e}", path.display()),
        }
    }

    log::info!("loaded {} message files from {}", out.len(), dir.display());
    sort_newest_first(&mut out);
    Ok(out)
}

fn collect_eml_paths(dir: &Path, recursive: bool, out: &mut Vec<PathBuf>) -> Result<()> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("cannot read directory {}", dir.display()))?;
    collect_entries(entries, recursive, out);
    Ok(())
}

/// Subdirectories are best effort: one that cannot be listed is logged and
/// left out.
fn collect_subdir(dir: &Path, out: &mut Vec<PathBuf>) {
    match fs::read_dir(dir) {
        Ok(entries) => collect_entries(entries, true, out),
        Err(e) => log::warn!("skipping directory {}: {e}", dir.display()),
    }
}

fn collect_entries(entries: fs::ReadDir, recursive: bool, out: &mut Vec<PathBuf>) {
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("skipping unreadable directory entry: {e}");
                continue;
            }
        };
        let path = entry.path();
        if path.is_dir() {
            if recursive {
                collect_subdir(&path, out);
            }
            continue;
        }
        let is_eml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("eml"));
        if is_eml {
            out.push(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::message::MailItem;

    fn mail(date: &str, subject: &str) -> String {
        format!("From: a@b.c\r\nSubject: {subject}\r\nDate: {date}\r\n\r\nbody\r\n")
    }

    #[test]
    fn loads_eml_files_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("old.eml"),
            mail("Mon, 3 Mar 2025 08:00:00 +0000", "old"),
        )
        .unwrap();
        fs::write(
            dir.path().join("new.EML"),
            mail("Wed, 5 Mar 2025 08:00:00 +0000", "new"),
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "not mail").unwrap();

        let msgs = load_dir(dir.path(), false).unwrap();
        let subjects: Vec<_> = msgs.iter().map(|m| m.subject().unwrap()).collect();
        assert_eq!(subjects, vec!["new", "old"]);
    }

    #[test]
    fn recursion_is_opt_in() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("archive");
        fs::create_dir(&sub).unwrap();
        fs::write(sub.join("a.eml"), mail("Mon, 3 Mar 2025 08:00:00 +0000", "a")).unwrap();

        assert!(load_dir(dir.path(), false).unwrap().is_empty());
        assert_eq!(load_dir(dir.path(), true).unwrap().len(), 1);
    }

    #[test]
    fn unlistable_subdir_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut out = vec![PathBuf::from("kept.eml")];
        collect_subdir(&dir.path().join("vanished"), &mut out);
        assert_eq!(out, vec![PathBuf::from("kept.eml")]);
    }

    #[cfg(unix)]
    #[test]
    fn recursive_load_survives_locked_subdir() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("top.eml"),
            mail("Mon, 3 Mar 2025 08:00:00 +0000", "top"),
        )
        .unwrap();
        let open = dir.path().join("open");
        fs::create_dir(&open).unwrap();
        fs::write(open.join("a.eml"), mail("Tue, 4 Mar 2025 08:00:00 +0000", "a")).unwrap();
        let locked = dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::write(locked.join("b.eml"), mail("Wed, 5 Mar 2025 08:00:00 +0000", "b")).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // root can still list it; then all three load
        let expected = if fs::read_dir(&locked).is_ok() { 3 } else { 2 };
        let result = load_dir(dir.path(), true);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let msgs = result.unwrap();
        assert_eq!(msgs.len(), expected);
        let subjects: Vec<_> = msgs.iter().map(|m| m.subject().unwrap()).collect();
        assert!(subjects.contains(&"top".to_string()));
        assert!(subjects.contains(&"a".to_string()));
    }

    #[test]
    fn missing_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_dir(&dir.path().join("nope"), false).is_err());
    }
}
