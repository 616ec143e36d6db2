//! Import path resolution for the package a Go file belongs to.
//!
//! Generated code imports the scanned package, so we need the fully qualified
//! path (`github.com/org/repo/models`), not just the `package` clause name.
//! Resolution order:
//! 1. configured module path for a configured project root
//! 2. nearest `go.mod` above the file
//! 3. `$GOPATH/src` layout, for each GOPATH root
//! 4. any ancestor directory named `src`
//! 5. the directory name itself

use std::path::{Component, Path, PathBuf};

use crate::config::Config;

/// Resolve the import path of the package containing `file`.
pub fn resolve_import_path(file: &Path, config: &Config) -> String {
    let dir = package_dir(file);

    if let (Some(module), Some(root)) = (&config.module_path, &config.project_root) {
        if let Ok(rel) = dir.strip_prefix(root) {
            return join_import_path(module, rel);
        }
    }

    if let Some((module, module_dir)) = find_go_module(&dir) {
        if let Ok(rel) = dir.strip_prefix(&module_dir) {
            return join_import_path(&module, rel);
        }
    }

    for gopath in config.gopath_roots() {
        if let Ok(rel) = dir.strip_prefix(gopath.join("src")) {
            if rel.components().next().is_some() {
                return to_slash(rel);
            }
        }
    }

    if let Some(path) = path_after_src(&dir) {
        return path;
    }

    dir.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Absolute directory containing the file.
fn package_dir(file: &Path) -> PathBuf {
    let dir = file.parent().unwrap_or_else(|| Path::new(""));
    if dir.is_absolute() {
        return dir.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(dir),
        Err(_) => dir.to_path_buf(),
    }
}

/// Walk up from `dir` to the nearest `go.mod` and read its module path.
fn find_go_module(dir: &Path) -> Option<(String, PathBuf)> {
    for ancestor in dir.ancestors() {
        let go_mod = ancestor.join("go.mod");
        let Ok(content) = std::fs::read_to_string(&go_mod) else {
            continue;
        };
        match parse_module_directive(&content) {
            Some(module) => return Some((module, ancestor.to_path_buf())),
            None => {
                tracing::warn!("No module directive in {:?}", go_mod);
                return None;
            }
        }
    }
    None
}

/// Extract the path from a `module` directive in go.mod content.
fn parse_module_directive(content: &str) -> Option<String> {
    content.lines().find_map(|line| {
        let line = match line.find("//") {
            Some(idx) => &line[..idx],
            None => line,
        };
        let rest = line.trim().strip_prefix("module")?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let module = rest.trim().trim_matches(|c| c == '"' || c == '`');
        (!module.is_empty()).then(|| module.to_string())
    })
}

/// The part of `dir` after its last `src` component.
fn path_after_src(dir: &Path) -> Option<String> {
    let components: Vec<Component> = dir.components().collect();
    let src_idx = components
        .iter()
        .rposition(|c| matches!(c, Component::Normal(name) if *name == "src"))?;
    let rest: PathBuf = components[src_idx + 1..].iter().collect();
    if rest.as_os_str().is_empty() {
        None
    } else {
        Some(to_slash(&rest))
    }
}

fn join_import_path(module: &str, rel: &Path) -> String {
    let rel = to_slash(rel);
    if rel.is_empty() {
        module.to_string()
    } else {
        format!("{}/{}", module.trim_end_matches('/'), rel)
    }
}

fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
