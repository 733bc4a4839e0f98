//! Site template scaffolding for new repositories

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::artifact::artifacts_dir;
use crate::cli::run_git;
use crate::error::{PublishError, PublishResult};

/// Directories never copied out of a local template
const SKIPPED_DIRS: &[&str] = &[".git", "node_modules"];

/// Where a new repository's initial contents come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    /// A directory on this machine, copied recursively
    Local(PathBuf),
    /// A git URL cloned shallowly, history discarded
    Remote(String),
    /// Minimal gallery skeleton written in place
    Builtin,
}

impl TemplateSource {
    /// Local path wins over a remote URL; neither falls back to the skeleton
    pub fn resolve(local_path: Option<&str>, remote_url: Option<&str>) -> Self {
        match (local_path, remote_url) {
            (Some(path), _) if !path.trim().is_empty() => Self::Local(PathBuf::from(path)),
            (_, Some(url)) if !url.trim().is_empty() => Self::Remote(url.to_string()),
            _ => Self::Builtin,
        }
    }
}

/// Whether `dir` is absent or has no entries
pub async fn is_empty_dir(dir: &Path) -> PublishResult<bool> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(true),
        Err(e) => return Err(PublishError::io(dir, e)),
    };
    let first = entries
        .next_entry()
        .await
        .map_err(|e| PublishError::io(dir, e))?;
    Ok(first.is_none())
}

/// Populate `target` from `source`
pub async fn scaffold(source: &TemplateSource, target: &Path) -> PublishResult<()> {
    match source {
        TemplateSource::Local(template) => {
            info!(template = %template.display(), "copying local template");
            copy_tree(template, target).await
        }
        TemplateSource::Remote(url) => {
            info!(url = %url, "cloning template repository");
            clone_template(url, target).await
        }
        TemplateSource::Builtin => {
            debug!("writing built-in skeleton");
            write_skeleton(target).await
        }
    }
}

/// Recursive copy that skips VCS metadata and installed dependencies
pub async fn copy_tree(from: &Path, to: &Path) -> PublishResult<()> {
    let mut pending = vec![(from.to_path_buf(), to.to_path_buf())];

    while let Some((src, dst)) = pending.pop() {
        tokio::fs::create_dir_all(&dst)
            .await
            .map_err(|e| PublishError::io(&dst, e))?;

        let mut entries = tokio::fs::read_dir(&src)
            .await
            .map_err(|e| PublishError::io(&src, e))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| PublishError::io(&src, e))?
        {
            let name = entry.file_name();
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| PublishError::io(entry.path(), e))?;

            if file_type.is_dir() {
                if SKIPPED_DIRS.iter().any(|skip| name == *skip) {
                    continue;
                }
                pending.push((entry.path(), dst.join(&name)));
            } else {
                let out = dst.join(&name);
                tokio::fs::copy(entry.path(), &out)
                    .await
                    .map_err(|e| PublishError::io(&out, e))?;
            }
        }
    }
    Ok(())
}

async fn clone_template(url: &str, target: &Path) -> PublishResult<()> {
    let parent = target.parent().unwrap_or_else(|| Path::new("."));
    tokio::fs::create_dir_all(parent)
        .await
        .map_err(|e| PublishError::io(parent, e))?;

    let target_arg = target.to_string_lossy();
    run_git(&["clone", "--depth", "1", url, &target_arg], parent).await?;

    let git_dir = target.join(".git");
    tokio::fs::remove_dir_all(&git_dir)
        .await
        .map_err(|e| PublishError::io(&git_dir, e))?;
    Ok(())
}

const SKELETON_INDEX: &str = r#"<!doctype html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <title>Artifact Gallery</title>
  </head>
  <body>
    <main id="gallery"></main>
    <script>
      fetch("src/artifacts/manifest.json")
        .then((r) => r.json())
        .then((items) => {
          const main = document.getElementById("gallery");
          for (const item of items) {
            const link = document.createElement("a");
            link.href = item.file;
            link.textContent = item.title;
            main.appendChild(link);
            main.appendChild(document.createElement("br"));
          }
        });
    </script>
  </body>
</html>
"#;

async fn write_skeleton(target: &Path) -> PublishResult<()> {
    let dir = artifacts_dir(target);
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| PublishError::io(&dir, e))?;

    let files = [
        (target.join("index.html"), SKELETON_INDEX),
        (dir.join("manifest.json"), "[]\n"),
        (target.join(".gitignore"), "node_modules/\ndist/\n"),
    ];
    for (path, content) in files {
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| PublishError::io(&path, e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_prefers_local() {
        assert_eq!(
            TemplateSource::resolve(Some("/opt/tpl"), Some("https://x/y.git")),
            TemplateSource::Local(PathBuf::from("/opt/tpl"))
        );
        assert_eq!(
            TemplateSource::resolve(Some(""), Some("https://x/y.git")),
            TemplateSource::Remote("https://x/y.git".to_string())
        );
        assert_eq!(TemplateSource::resolve(None, None), TemplateSource::Builtin);
    }

    #[tokio::test]
    async fn test_copy_tree_skips_git_and_node_modules() {
        let template = TempDir::new().unwrap();
        let root = template.path();
        std::fs::create_dir_all(root.join("src/components")).unwrap();
        std::fs::create_dir_all(root.join(".git/objects")).unwrap();
        std::fs::create_dir_all(root.join("node_modules/react")).unwrap();
        std::fs::write(root.join("package.json"), "{}").unwrap();
        std::fs::write(root.join("src/components/App.jsx"), "export default 1").unwrap();
        std::fs::write(root.join(".git/HEAD"), "ref").unwrap();
        std::fs::write(root.join("node_modules/react/index.js"), "").unwrap();

        let out = TempDir::new().unwrap();
        let target = out.path().join("site");
        copy_tree(root, &target).await.unwrap();

        assert!(target.join("package.json").exists());
        assert!(target.join("src/components/App.jsx").exists());
        assert!(!target.join(".git").exists());
        assert!(!target.join("node_modules").exists());
    }

    #[tokio::test]
    async fn test_builtin_skeleton() {
        let out = TempDir::new().unwrap();
        let target = out.path().join("site");
        scaffold(&TemplateSource::Builtin, &target).await.unwrap();

        assert!(target.join("index.html").exists());
        let manifest = std::fs::read_to_string(target.join("src/artifacts/manifest.json")).unwrap();
        assert_eq!(manifest.trim(), "[]");
    }

    #[tokio::test]
    async fn test_is_empty_dir() {
        let dir = TempDir::new().unwrap();
        assert!(is_empty_dir(&dir.path().join("missing")).await.unwrap());
        assert!(is_empty_dir(dir.path()).await.unwrap());
        std::fs::write(dir.path().join("f"), "").unwrap();
        assert!(!is_empty_dir(dir.path()).await.unwrap());
    }
}
