use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub const DUMPS_DIR: [&str; 2] = ["etc", "dumps"];

#[must_use]
pub fn dumps_root(root: &Path) -> PathBuf {
    root.join(DUMPS_DIR[0]).join(DUMPS_DIR[1])
}

#[must_use]
pub fn dump_file_name(session_id: &str) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!(
        "dump-{session_id}-{}.{:03}.xml",
        now.as_secs(),
        now.subsec_millis()
    )
}

/// Freshly generated default dump path under `<root>/etc/dumps/`.
#[must_use]
pub fn generate_dump_path(root: &Path, session_id: &str) -> PathBuf {
    dumps_root(root).join(dump_file_name(session_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dump_file_name_embeds_session_id_and_extension() {
        let name = dump_file_name("11111111-2222-3333-4444-555555555555");
        assert!(name.starts_with("dump-11111111-2222-3333-4444-555555555555-"));
        assert!(name.ends_with(".xml"));
    }

    #[test]
    fn dumps_root_nests_under_etc() {
        let root = dumps_root(Path::new("/srv/synergy"));
        assert_eq!(root, PathBuf::from("/srv/synergy/etc/dumps"));
    }
}
