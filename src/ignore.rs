//! Ignore-file style path filtering for folder scans.
//!
//! Patterns are evaluated in declared order and the **first** matching pattern
//! decides. This differs from git, where the last match wins and a later `!`
//! line can re-include an earlier exclude.

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use globset::{GlobBuilder, GlobMatcher};

use crate::error::{Error, Result};

/// Always in force, after any ignore-file lines.
pub const DEFAULT_PATTERNS: &[&str] = &[".git/", ".hg/"];

#[derive(Debug, Clone)]
pub enum Pattern {
    Include(GlobMatcher),
    Exclude(GlobMatcher),
}

impl Pattern {
    fn matcher(&self) -> &GlobMatcher {
        match self {
            Pattern::Include(matcher) | Pattern::Exclude(matcher) => matcher,
        }
    }

    pub fn glob(&self) -> &str {
        self.matcher().glob().glob()
    }

    /// Patterns for one ignore-file line; comments and blank lines yield none.
    pub fn parse_line(line: &str) -> Result<Vec<Pattern>> {
        let line = line.trim_end();
        if line.is_empty() || line.starts_with('#') {
            return Ok(Vec::new());
        }

        let (include, body) = match line.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, line),
        };

        let anchored = match body.strip_prefix('/') {
            Some(rest) => rest.to_string(),
            None => format!("**/{body}"),
        };

        let globs = match anchored.strip_suffix('/') {
            Some(dir) => vec![dir.to_string(), format!("{dir}/**")],
            None => vec![anchored],
        };

        globs
            .into_iter()
            .map(|glob| {
                let matcher = GlobBuilder::new(&glob)
                    .literal_separator(true)
                    .build()
                    .map_err(|source| Error::Pattern {
                        pattern: line.to_string(),
                        source,
                    })?
                    .compile_matcher();

                Ok(match include {
                    true => Pattern::Include(matcher),
                    false => Pattern::Exclude(matcher),
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct IgnoreMatcher {
    root: PathBuf,
    patterns: Vec<Pattern>,
}

impl IgnoreMatcher {
    pub fn new<I, S>(root: &Path, lines: I) -> Result<IgnoreMatcher>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut patterns = Vec::new();
        for line in lines {
            patterns.extend(Pattern::parse_line(line.as_ref())?);
        }

        Ok(IgnoreMatcher {
            root: root.to_path_buf(),
            patterns,
        })
    }

    /// The `.git`/`.hg` pattern set.
    pub fn with_defaults(root: &Path) -> IgnoreMatcher {
        let patterns = DEFAULT_PATTERNS
            .iter()
            .flat_map(|line| Pattern::parse_line(line).unwrap_or_default())
            .collect();

        IgnoreMatcher {
            root: root.to_path_buf(),
            patterns,
        }
    }

    /// Concatenates the lines of every named ignore file present in `root`, in
    /// order, followed by the defaults.
    pub fn from_ignore_files(root: &Path, file_names: &[String]) -> Result<IgnoreMatcher> {
        let mut lines = Vec::new();

        for name in file_names {
            let path = root.join(name);
            match fs::read_to_string(&path) {
                Ok(text) => lines.extend(text.lines().map(String::from)),
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(source) => return Err(Error::Io { path, source }),
            }
        }

        lines.extend(DEFAULT_PATTERNS.iter().map(|line| line.to_string()));
        IgnoreMatcher::new(root, lines)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    /// Whether `path` or one of its directories below the root is excluded.
    /// Paths outside the root never are.
    pub fn is_ignored(&self, path: &Path) -> bool {
        let Ok(relative) = path.strip_prefix(&self.root) else {
            return false;
        };

        let mut prefix = PathBuf::new();
        relative.components().any(|component| {
            prefix.push(component);
            self.excludes(&prefix)
        })
    }

    fn excludes(&self, relative: &Path) -> bool {
        self.patterns
            .iter()
            .find(|pattern| pattern.matcher().is_match(relative))
            .is_some_and(|pattern| matches!(pattern, Pattern::Exclude(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn root() -> &'static Path {
        Path::new("/work")
    }

    fn ignored(matcher: &IgnoreMatcher, relative: &str) -> bool {
        matcher.is_ignored(&root().join(relative))
    }

    #[test]
    fn default_patterns_ignore_vcs_directories_only() {
        let matcher = IgnoreMatcher::with_defaults(root());

        assert!(ignored(&matcher, ".git"));
        assert!(ignored(&matcher, ".git/HEAD"));
        assert!(ignored(&matcher, ".hg/store/data.md"));
        assert!(ignored(&matcher, "nested/project/.git/config"));

        assert!(!ignored(&matcher, "notes.md"));
        assert!(!ignored(&matcher, ".gitignore"));
        assert!(!ignored(&matcher, "docs/.github/readme.md"));
        assert!(!ignored(&matcher, "git/notes.md"));
    }

    #[test]
    fn line_syntax() {
        assert!(Pattern::parse_line("# comment").unwrap().is_empty());
        assert!(Pattern::parse_line("   ").unwrap().is_empty());

        let globs = |line| {
            Pattern::parse_line(line)
                .unwrap()
                .iter()
                .map(|p| p.glob().to_string())
                .collect::<Vec<_>>()
        };

        assert_eq!(globs("*.tmp"), vec!["**/*.tmp"]);
        assert_eq!(globs("/build"), vec!["build"]);
        assert_eq!(globs("drafts/"), vec!["**/drafts", "**/drafts/**"]);
        assert!(matches!(
            Pattern::parse_line("!keep.md").unwrap().as_slice(),
            [Pattern::Include(_)]
        ));
    }

    #[test]
    fn anchored_patterns_only_match_at_the_root() {
        let matcher = IgnoreMatcher::new(root(), ["/build/"]).unwrap();

        assert!(ignored(&matcher, "build/out.md"));
        assert!(!ignored(&matcher, "src/build/out.md"));
    }

    #[test]
    fn unanchored_patterns_match_at_any_depth() {
        let matcher = IgnoreMatcher::new(root(), ["*.tmp.md"]).unwrap();

        assert!(ignored(&matcher, "a.tmp.md"));
        assert!(ignored(&matcher, "deep/er/b.tmp.md"));
        assert!(!ignored(&matcher, "c.md"));
    }

    #[test]
    fn first_match_wins_include_before_exclude() {
        let matcher = IgnoreMatcher::new(root(), ["!keep.md", "*.md"]).unwrap();

        assert!(!ignored(&matcher, "keep.md"));
        assert!(ignored(&matcher, "drop.md"));
    }

    #[test]
    fn first_match_wins_exclude_before_include() {
        // with git semantics the later `!keep.md` would re-include the file
        let matcher = IgnoreMatcher::new(root(), ["*.md", "!keep.md"]).unwrap();

        assert!(ignored(&matcher, "keep.md"));
        assert!(ignored(&matcher, "drop.md"));
    }

    #[test]
    fn paths_outside_the_root_are_not_ignored() {
        let matcher = IgnoreMatcher::new(root(), ["*"]).unwrap();

        assert!(!matcher.is_ignored(Path::new("/other/a.md")));
        assert!(!matcher.is_ignored(root()));
    }

    #[test]
    fn invalid_glob_is_reported() {
        let err = IgnoreMatcher::new(root(), ["a[b"]).unwrap_err();
        assert!(matches!(err, Error::Pattern { .. }));
    }

    #[test]
    fn ignore_files_are_read_in_order() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".ignore"), "!important.md\n").unwrap();
        fs::write(dir.path().join(".gitignore"), "# generated\n*.md\n").unwrap();

        let matcher = IgnoreMatcher::from_ignore_files(
            dir.path(),
            &[".ignore".to_string(), ".gitignore".to_string()],
        )
        .unwrap();

        assert!(!matcher.is_ignored(&dir.path().join("important.md")));
        assert!(matcher.is_ignored(&dir.path().join("other.md")));
        assert!(matcher.is_ignored(&dir.path().join(".git")));
    }

    #[test]
    fn defaults_still_apply_alongside_an_ignore_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".gitignore"), "build/
").unwrap();

        let matcher =
            IgnoreMatcher::from_ignore_files(dir.path(), &[".gitignore".to_string()]).unwrap();

        assert!(matcher.is_ignored(&dir.path().join("build/out.md")));
        assert!(matcher.is_ignored(&dir.path().join(".git/notes.md")));
        assert!(matcher.is_ignored(&dir.path().join(".hg/store/data.md")));
        assert!(!matcher.is_ignored(&dir.path().join("notes.md")));
    }

    #[test]
    fn files_inside_an_ignored_directory_are_ignored() {
        // `drafts` names the directory only; its contents follow from it
        let matcher = IgnoreMatcher::new(root(), ["drafts", "/out"]).unwrap();

        assert!(ignored(&matcher, "drafts"));
        assert!(ignored(&matcher, "drafts/new.md"));
        assert!(ignored(&matcher, "nested/drafts/deep/old.md"));
        assert!(ignored(&matcher, "out/page.md"));
        assert!(!ignored(&matcher, "src/out/page.md"));
        assert!(!ignored(&matcher, "drafts.md"));
    }

    #[test]
    fn missing_ignore_files_fall_back_to_defaults() {
        let dir = TempDir::new().unwrap();

        let matcher =
            IgnoreMatcher::from_ignore_files(dir.path(), &[".gitignore".to_string()]).unwrap();

        assert_eq!(matcher.patterns().len(), 4);
        assert!(matcher.is_ignored(&dir.path().join(".git/config")));
    }
}
