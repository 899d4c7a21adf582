use std::path::{Component, Path, PathBuf};

/// Placeholder accepted wherever a command reads an input file.
pub const STDIN_PLACEHOLDER: &str = "-";

/// Absolute, normalized form of `path` for log and error messages.
/// Falls back to lexical normalization when the path does not exist.
pub fn best_effort_path_display(path: &Path) -> String {
    if path.as_os_str() == STDIN_PLACEHOLDER {
        return "<stdin>".to_string();
    }
    if let Ok(canonical_path) = path.canonicalize() {
        return canonical_path.display().to_string();
    }

    let absolute_path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|current_dir| current_dir.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    normalize_path(&absolute_path).display().to_string()
}

fn normalize_path(path: &Path) -> PathBuf {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !matches!(components.last(), None | Some(Component::RootDir)) {
                    components.pop();
                }
            }
            _ => components.push(component),
        }
    }

    components.iter().collect()
}

pub trait BestEffortPathExt {
    fn best_effort_path_display(&self) -> String;
}

impl BestEffortPathExt for Path {
    fn best_effort_path_display(&self) -> String {
        best_effort_path_display(self)
    }
}

impl BestEffortPathExt for PathBuf {
    fn best_effort_path_display(&self) -> String {
        best_effort_path_display(self)
    }
}

impl BestEffortPathExt for str {
    fn best_effort_path_display(&self) -> String {
        best_effort_path_display(Path::new(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stdin_placeholder_is_named() {
        assert_eq!("-".best_effort_path_display(), "<stdin>");
    }

    #[cfg(target_family = "unix")]
    #[test]
    fn missing_paths_are_normalized_lexically() {
        let display = Path::new("/does/not/../exist/./plan.json").best_effort_path_display();
        assert_eq!(display, "/does/exist/plan.json");
    }

    #[test]
    fn existing_paths_are_canonicalized() {
        let dir = tempfile::TempDir::new().expect("Failed to create temp directory");
        let display = dir.path().join(".").best_effort_path_display();
        let expected = dir.path().canonicalize().unwrap().display().to_string();
        assert_eq!(display, expected);
    }
}
