use thiserror::Error;
use uuid::Uuid;

/// Image formats the upload endpoint accepts, matched case-insensitively.
const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tiff", "bmp", "gif"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilenameError {
    #[error("no file selected")]
    Empty,
    #[error("file type not allowed: .{0}")]
    UnsupportedType(String),
}

/// How to name a stored file when the same filename is uploaded twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollisionPolicy {
    /// Random uuid base name, collisions cannot happen.
    #[default]
    Unique,
    /// Sanitized original base name, a second upload overwrites the first.
    Overwrite,
}

impl From<&str> for CollisionPolicy {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "unique" => CollisionPolicy::Unique,
            "overwrite" => CollisionPolicy::Overwrite,
            _ => CollisionPolicy::default(),
        }
    }
}

/// An on-disk name for an upload, split so the `.txt` sibling can share the base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredName {
    base: String,
    ext: String,
}

impl StoredName {
    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn image_name(&self) -> String {
        format!("{}.{}", self.base, self.ext)
    }

    pub fn artifact_name(&self) -> String {
        format!("{}.txt", self.base)
    }
}

/// Keep only characters that are safe in a flat storage directory and strip
/// any path components the client may have sent along.
pub fn secure_filename(raw: &str) -> String {
    let last = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(raw);

    let cleaned: String = last
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();

    cleaned.trim_matches(['.', '_']).to_string()
}

fn allowed_extension(name: &str) -> Option<String> {
    let ext = name.rsplit_once('.')?.1.to_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// Validate a user-supplied filename and produce the on-disk name for it
/// under the given collision policy.
pub fn storage_name(raw: &str, policy: CollisionPolicy) -> Result<StoredName, FilenameError> {
    if raw.trim().is_empty() {
        return Err(FilenameError::Empty);
    }

    let safe = secure_filename(raw);
    let ext = allowed_extension(&safe).ok_or_else(|| {
        let shown = safe
            .rsplit_once('.')
            .map(|(_, e)| e.to_string())
            .unwrap_or_default();
        FilenameError::UnsupportedType(shown)
    })?;

    let base = match policy {
        CollisionPolicy::Unique => Uuid::new_v4().simple().to_string(),
        CollisionPolicy::Overwrite => {
            let base = safe
                .rsplit_once('.')
                .map(|(b, _)| b.to_string())
                .unwrap_or_default();
            if base.is_empty() {
                return Err(FilenameError::Empty);
            }
            base
        }
    };

    Ok(StoredName { base, ext })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_allowed_extensions_case_insensitively() {
        for name in ["a.png", "a.JPG", "a.Jpeg", "a.TIFF", "a.bmp", "a.GIF"] {
            assert!(storage_name(name, CollisionPolicy::Overwrite).is_ok(), "{name}");
        }
    }

    #[test]
    fn rejects_unknown_extensions() {
        let err = storage_name("notes.exe", CollisionPolicy::Unique).unwrap_err();
        assert_eq!(err, FilenameError::UnsupportedType("exe".into()));
        assert!(storage_name("archive.tar.gz", CollisionPolicy::Unique).is_err());
        assert!(storage_name("noextension", CollisionPolicy::Unique).is_err());
    }

    #[test]
    fn rejects_empty_filename() {
        assert_eq!(storage_name("", CollisionPolicy::Unique), Err(FilenameError::Empty));
        assert_eq!(storage_name("   ", CollisionPolicy::Unique), Err(FilenameError::Empty));
    }

    #[test]
    fn strips_path_components() {
        assert_eq!(secure_filename("../../etc/passwd"), "passwd");
        assert_eq!(secure_filename("C:\\Users\\me\\shot.png"), "shot.png");
        let name = storage_name("../../evil.png", CollisionPolicy::Overwrite).unwrap();
        assert_eq!(name.image_name(), "evil.png");
    }

    #[test]
    fn replaces_unsafe_characters() {
        assert_eq!(secure_filename("my shot (1).png"), "my_shot__1_.png");
        assert_eq!(secure_filename("..hidden"), "hidden");
    }

    #[test]
    fn overwrite_policy_reuses_base_name() {
        let a = storage_name("scan.png", CollisionPolicy::Overwrite).unwrap();
        let b = storage_name("scan.png", CollisionPolicy::Overwrite).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.image_name(), "scan.png");
        assert_eq!(a.artifact_name(), "scan.txt");
    }

    #[test]
    fn unique_policy_generates_distinct_names() {
        let a = storage_name("scan.png", CollisionPolicy::Unique).unwrap();
        let b = storage_name("scan.png", CollisionPolicy::Unique).unwrap();
        assert_ne!(a.image_name(), b.image_name());
        assert!(a.image_name().ends_with(".png"));
    }

    #[test]
    fn artifact_shares_base_with_image() {
        let name = storage_name("receipt.jpeg", CollisionPolicy::Unique).unwrap();
        let image = name.image_name();
        let txt = name.artifact_name();
        assert_eq!(
            image.rsplit_once('.').unwrap().0,
            txt.rsplit_once('.').unwrap().0
        );
    }
}
