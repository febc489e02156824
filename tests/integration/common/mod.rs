//! Shared fixtures for integration tests
#![allow(dead_code)]

use git2::{Commit as GitCommit, Repository, Signature};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use shotness::scanner::{Commit, DiffEdit, FileChange, FileDiff};
use shotness::uast::Node;

/// Go source with three functions; the literal in each body is the only
/// line that varies:
///
/// ```text
///  3-6   foo   (line 4 varies)
///  8-11  bar   (line 9 varies)
/// 13-16  baz   (line 14 varies)
/// ```
pub fn go_source(foo: u32, bar: u32, baz: u32) -> String {
    format!(
        "package main\n\nfunc foo() {{\n\ta := {}\n\t_ = a\n}}\n\nfunc bar() {{\n\tb := {}\n\t_ = b\n}}\n\nfunc baz() {{\n\tc := {}\n\t_ = c\n}}\n",
        foo, bar, baz
    )
}

pub struct TestRepo {
    pub dir: TempDir,
    pub repo: Repository,
}

impl TestRepo {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let repo = Repository::init(dir.path()).expect("Failed to init repository");
        Self { dir, repo }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.path().canonicalize().expect("Failed to canonicalize repo path")
    }

    /// Write `content` to `file` and commit it on HEAD
    pub fn commit_file(&self, file: &str, content: &str, message: &str) -> String {
        std::fs::write(self.dir.path().join(file), content).expect("Failed to write file");

        let mut index = self.repo.index().expect("Failed to open index");
        index.add_path(Path::new(file)).expect("Failed to stage file");
        index.write().expect("Failed to write index");
        let tree_id = index.write_tree().expect("Failed to write tree");
        let tree = self.repo.find_tree(tree_id).expect("Failed to find tree");

        let signature = Signature::now("Test User", "test@example.com").expect("Failed to create signature");
        let parents: Vec<GitCommit> = match self.repo.head() {
            Ok(head) => vec![head.peel_to_commit().expect("HEAD is not a commit")],
            Err(_) => Vec::new(),
        };
        let parent_refs: Vec<&GitCommit> = parents.iter().collect();

        self.repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &parent_refs)
            .expect("Failed to commit")
            .to_string()
    }
}

/// Repository whose four commits add `a.go`, then edit foo+bar, bar+baz and
/// foo+baz. Every unit ends with 3 changes and every pair with 2 co-changes.
pub fn three_function_repo() -> TestRepo {
    let repo = TestRepo::new();
    repo.commit_file("a.go", &go_source(1, 1, 1), "add a.go");
    repo.commit_file("a.go", &go_source(2, 2, 1), "edit foo and bar");
    repo.commit_file("a.go", &go_source(2, 3, 2), "edit bar and baz");
    repo.commit_file("a.go", &go_source(3, 3, 3), "edit foo and baz");
    repo
}

/// One function per block of ten lines in a synthetic 100 line file
pub const SYNTHETIC_LINES: usize = 100;

pub fn synthetic_tree(units: usize) -> Node {
    let mut root = Node::new("File").with_lines(1, SYNTHETIC_LINES);
    for unit in 0..units {
        let start = unit * 10 + 1;
        root = root.with_child(
            Node::new("Function")
                .with_role("Function")
                .with_prop("name", format!("f{}", unit))
                .with_lines(start, start + 9),
        );
    }
    root
}

/// Edit script replacing each listed 1-based line
pub fn edit_lines(lines: &[usize]) -> FileDiff {
    let mut sorted: Vec<usize> = lines.iter().copied().filter(|l| *l >= 1 && *l <= SYNTHETIC_LINES).collect();
    sorted.sort_unstable();
    sorted.dedup();

    let mut edits = Vec::new();
    let mut cursor = 0;
    for line in sorted {
        if line - 1 > cursor {
            edits.push(DiffEdit::equal(line - 1 - cursor));
        }
        edits.push(DiffEdit::delete(1));
        edits.push(DiffEdit::insert(1));
        cursor = line;
    }
    if SYNTHETIC_LINES > cursor {
        edits.push(DiffEdit::equal(SYNTHETIC_LINES - cursor));
    }
    FileDiff {
        old_lines: SYNTHETIC_LINES,
        new_lines: SYNTHETIC_LINES,
        edits,
    }
}

/// A commit modifying `file` (ten units) on the given lines
pub fn synthetic_commit(hash: &str, file: &str, lines: &[usize]) -> Commit {
    Commit::new(
        hash,
        1,
        vec![FileChange::modification(
            file,
            file,
            synthetic_tree(10),
            synthetic_tree(10),
            Some(edit_lines(lines)),
        )],
    )
}
