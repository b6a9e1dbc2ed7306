//! End-to-end pipeline tests against real temporary repositories.

use context_builder::{BuildOptions, DiffContextTree, Error, build_diff_context};
use git2::{IndexAddOption, Repository, Signature};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

struct TestRepo {
    dir: TempDir,
    repo: Repository,
}

impl TestRepo {
    fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let repo = Repository::init(dir.path()).expect("init repo");
        Self { dir, repo }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn write(&self, rel: &str, content: &str) {
        let path = self.root().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdir");
        }
        fs::write(path, content).expect("write file");
    }

    fn commit(&self, message: &str) -> git2::Oid {
        let mut index = self.repo.index().expect("index");
        index
            .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
            .expect("add all");
        index.update_all(["*"].iter(), None).expect("update all");
        index.write().expect("index write");
        let tree_id = index.write_tree().expect("write tree");
        let tree = self.repo.find_tree(tree_id).expect("find tree");
        let sig = Signature::now("Test User", "test@test.com").expect("sig");
        let parent = self
            .repo
            .head()
            .ok()
            .and_then(|head| head.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        self.repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .expect("commit")
    }
}

fn options(budget: u64) -> BuildOptions {
    BuildOptions {
        budget_tokens: budget,
        ..BuildOptions::default()
    }
}

fn paths_of(tree: &DiffContextTree) -> Vec<&str> {
    tree.fragments.iter().map(|f| f.path.as_str()).collect()
}

fn contents_of(tree: &DiffContextTree) -> String {
    tree.fragments
        .iter()
        .filter_map(|f| f.content.as_deref())
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn empty_diff_produces_empty_tree() {
    let repo = TestRepo::new();
    repo.write("only.py", "def only():\n    pass\n");
    let oid = repo.commit("only");
    let range = format!("{oid}..{oid}");

    let tree = build_diff_context(repo.root(), &range, &options(10_000)).expect("tree");
    assert_eq!(tree.node_type, "diff_context");
    assert_eq!(tree.fragment_count, 0);
    assert!(tree.fragments.is_empty());
    assert_eq!(tree.used_tokens, 0);
}

#[test]
fn single_function_change_selects_exactly_that_fragment() {
    let repo = TestRepo::new();
    repo.write("calc.py", "def add(a,b):\n    return a+b\n");
    repo.commit("initial");
    repo.write("calc.py", "def add(a,b):\n    return a-b\n");
    repo.commit("flip sign");

    let tree = build_diff_context(repo.root(), "HEAD~1..HEAD", &options(10_000)).expect("tree");
    assert_eq!(tree.fragment_count, 1);
    let frag = &tree.fragments[0];
    assert_eq!(frag.path, "calc.py");
    assert_eq!(frag.lines, "1-2");
    assert_eq!(
        serde_json::to_value(frag.kind).expect("kind"),
        serde_json::json!("function")
    );
    assert_eq!(frag.content.as_deref(), Some("def add(a,b):\n    return a-b\n"));
}

#[test]
fn cross_file_caller_callee_pulls_definition() {
    let repo = TestRepo::new();
    repo.write("util.py", "def helper():\n    return 42\n");
    repo.write("main.py", "def main():\n    return 0\n");
    repo.commit("initial");
    repo.write(
        "main.py",
        "from util import helper\n\ndef main():\n    return helper()\n",
    );
    repo.commit("call helper");

    let tree = build_diff_context(repo.root(), "HEAD~1..HEAD", &options(10_000)).expect("tree");
    let paths = paths_of(&tree);
    assert!(paths.contains(&"main.py"), "core file missing: {paths:?}");
    assert!(paths.contains(&"util.py"), "expansion file missing: {paths:?}");
}

#[test]
fn appended_function_is_core_and_tight_budget_excludes_siblings() {
    let repo = TestRepo::new();
    let base = "def add(a, b):\n    return a + b\n\ndef sub(a, b):\n    return a - b\n\ndef mul(a, b):\n    return a * b\n";
    repo.write("calculator.py", base);
    repo.commit("initial");
    repo.write(
        "calculator.py",
        &format!(
            "{base}\ndef div(a, b):\n    if b == 0:\n        raise ValueError('division by zero')\n    return a / b\n"
        ),
    );
    repo.commit("add div");

    // Budget large enough for the changed region, too small for the rest.
    let tree = build_diff_context(repo.root(), "HEAD~1..HEAD", &options(30)).expect("tree");
    let contents = contents_of(&tree);
    assert!(contents.contains("def div"), "appended function missing");
    assert!(!contents.contains("def mul"), "unchanged sibling leaked in");
}

#[test]
fn preconditions_are_enforced() {
    let repo = TestRepo::new();
    repo.write("a.py", "x = 1\n");
    repo.commit("initial");

    let mut bad_alpha = options(1_000);
    bad_alpha.alpha = 1.0;
    assert!(matches!(
        build_diff_context(repo.root(), "HEAD", &bad_alpha),
        Err(Error::Precondition(_))
    ));

    let mut bad_tau = options(1_000);
    bad_tau.tau = -0.5;
    assert!(matches!(
        build_diff_context(repo.root(), "HEAD", &bad_tau),
        Err(Error::Precondition(_))
    ));

    let bad_budget = options(0);
    assert!(matches!(
        build_diff_context(repo.root(), "HEAD", &bad_budget),
        Err(Error::Precondition(_))
    ));
}

#[test]
fn bad_range_propagates_adapter_error() {
    let repo = TestRepo::new();
    repo.write("a.py", "x = 1\n");
    repo.commit("only");
    assert!(matches!(
        build_diff_context(repo.root(), "HEAD~10..HEAD", &options(1_000)),
        Err(Error::Git(_))
    ));
}

#[test]
fn pipeline_is_deterministic() {
    let repo = TestRepo::new();
    repo.write("util.py", "def helper():\n    return 42\n");
    repo.write("config.yaml", "database_host: localhost\ndatabase_port: 5432\n");
    repo.write("main.py", "def main():\n    return 0\n");
    repo.commit("initial");
    repo.write(
        "main.py",
        "from util import helper\n\ndef main():\n    return helper()\n",
    );
    repo.commit("change");

    let first = build_diff_context(repo.root(), "HEAD~1..HEAD", &options(5_000)).expect("tree");
    for _ in 0..3 {
        let again =
            build_diff_context(repo.root(), "HEAD~1..HEAD", &options(5_000)).expect("tree");
        assert_eq!(
            first.to_json().expect("json"),
            again.to_json().expect("json"),
            "identical runs must serialize identically"
        );
    }
}

#[test]
fn budget_respected_for_expansion() {
    let repo = TestRepo::new();
    for i in 0..6 {
        repo.write(
            &format!("mod{i}.py"),
            &format!("def shared_entry_{i}():\n    return common_helper()\n"),
        );
    }
    repo.write("helper.py", "def common_helper():\n    return 1\n");
    repo.commit("initial");
    repo.write(
        "mod0.py",
        "def shared_entry_0():\n    return common_helper() + 1\n",
    );
    repo.commit("change one");

    let budget = 80;
    let tree = build_diff_context(repo.root(), "HEAD~1..HEAD", &options(budget)).expect("tree");
    assert!(
        tree.used_tokens <= budget,
        "expansion exceeded budget: {} > {budget}",
        tree.used_tokens
    );
    assert!(paths_of(&tree).contains(&"mod0.py"));
}

#[test]
fn binary_files_are_skipped() {
    let repo = TestRepo::new();
    repo.write("code.py", "def f():\n    return 1\n");
    fs::write(repo.root().join("image.bin"), b"\x00\x01\x02\x03").expect("binary");
    repo.commit("initial");
    repo.write("code.py", "def f():\n    return 2\n");
    fs::write(repo.root().join("image.bin"), b"\x00\x05\x06\x07").expect("binary");
    repo.commit("change both");

    let tree = build_diff_context(repo.root(), "HEAD~1..HEAD", &options(10_000)).expect("tree");
    let paths = paths_of(&tree);
    assert!(paths.contains(&"code.py"));
    assert!(!paths.iter().any(|p| p.ends_with(".bin")));
}

#[test]
fn deleted_file_does_not_break_the_run() {
    let repo = TestRepo::new();
    repo.write("to_delete.py", "def will_be_deleted():\n    return 1\n");
    repo.write("keep.py", "def keep_this():\n    return 2\n");
    repo.commit("initial");
    fs::remove_file(repo.root().join("to_delete.py")).expect("rm");
    repo.commit("delete");

    let tree = build_diff_context(repo.root(), "HEAD~1..HEAD", &options(10_000)).expect("tree");
    assert_eq!(tree.node_type, "diff_context");
    assert!(!paths_of(&tree).contains(&"to_delete.py"));
}

#[test]
fn no_content_omits_payload_but_keeps_spans() {
    let repo = TestRepo::new();
    repo.write("calc.py", "def add(a,b):\n    return a+b\n");
    repo.commit("initial");
    repo.write("calc.py", "def add(a,b):\n    return a-b\n");
    repo.commit("change");

    let mut opts = options(10_000);
    opts.no_content = true;
    let tree = build_diff_context(repo.root(), "HEAD~1..HEAD", &opts).expect("tree");
    assert_eq!(tree.fragment_count, 1);
    assert!(tree.fragments[0].content.is_none());
    assert_eq!(tree.fragments[0].lines, "1-2");
}

#[test]
fn full_mode_ignores_budget_and_covers_changed_files() {
    let repo = TestRepo::new();
    let content = "def a():\n    return 1\n\ndef b():\n    return 2\n\ndef c():\n    return 3\n";
    repo.write("big.py", content);
    repo.write("other.py", "def other():\n    return 4\n");
    repo.commit("initial");
    repo.write("big.py", &content.replace("return 1", "return 10"));
    repo.commit("change");

    let mut opts = options(1);
    opts.full = true;
    let tree = build_diff_context(repo.root(), "HEAD~1..HEAD", &opts).expect("tree");
    let contents = contents_of(&tree);
    assert!(contents.contains("def a"));
    assert!(contents.contains("def b"));
    assert!(contents.contains("def c"));
    assert!(
        !paths_of(&tree).contains(&"other.py"),
        "full mode only covers changed files"
    );
    // Fragments never overlap in the emitted tree.
    for (i, a) in tree.fragments.iter().enumerate() {
        for b in &tree.fragments[i + 1..] {
            if a.path == b.path {
                let (a_s, a_e) = span_of(&a.lines);
                let (b_s, b_e) = span_of(&b.lines);
                assert!(a_e < b_s || b_e < a_s, "overlap: {a_s}-{a_e} vs {b_s}-{b_e}");
            }
        }
    }
}

fn span_of(lines: &str) -> (u32, u32) {
    let (s, e) = lines.split_once('-').expect("lines format");
    (s.parse().expect("start"), e.parse().expect("end"))
}

#[test]
fn config_change_pulls_code_using_same_key() {
    let repo = TestRepo::new();
    repo.write("config.yaml", "database_host: localhost\ndatabase_port: 5432\n");
    repo.write(
        "db.py",
        "import os\n\ndatabase_host = os.getenv(\"DATABASE_HOST\", \"localhost\")\n",
    );
    repo.commit("initial");
    repo.write("config.yaml", "database_host: db.example.com\ndatabase_port: 5432\n");
    repo.commit("point at prod");

    let tree = build_diff_context(repo.root(), "HEAD~1..HEAD", &options(10_000)).expect("tree");
    let paths = paths_of(&tree);
    assert!(paths.contains(&"config.yaml"));
    assert!(paths.contains(&"db.py"), "shared key should pull db.py: {paths:?}");
}

#[test]
fn unrelated_unreferenced_file_never_selected_under_tight_budget() {
    let repo = TestRepo::new();
    repo.write("core.py", "def core_func():\n    return specific_helper()\n");
    repo.write("helper.py", "def specific_helper():\n    return 7\n");
    repo.commit("initial");
    repo.write("core.py", "def core_func():\n    return specific_helper() * 2\n");
    repo.commit("change");

    let before = build_diff_context(repo.root(), "HEAD~1..HEAD", &options(30)).expect("tree");

    repo.write("zz_unrelated.py", "def totally_unrelated_thing():\n    return 'nothing'\n");
    repo.commit("add unrelated");

    let after = build_diff_context(repo.root(), "HEAD~2..HEAD~1", &options(30)).expect("tree");
    assert!(!paths_of(&after).contains(&"zz_unrelated.py"));
    assert_eq!(paths_of(&before), paths_of(&after));
}

#[test]
fn changed_file_with_hunk_always_contributes_when_budget_permits() {
    let repo = TestRepo::new();
    repo.write("a.py", "def a_func():\n    return 1\n");
    repo.write("b.py", "def b_func():\n    return 2\n");
    repo.commit("initial");
    repo.write("a.py", "def a_func():\n    return 10\n");
    repo.write("b.py", "def b_func():\n    return 20\n");
    repo.commit("change both");

    let tree = build_diff_context(repo.root(), "HEAD~1..HEAD", &options(50_000)).expect("tree");
    let paths = paths_of(&tree);
    assert!(paths.contains(&"a.py"));
    assert!(paths.contains(&"b.py"));
}

#[test]
fn selected_tree_is_sorted_by_path_then_start() {
    let repo = TestRepo::new();
    repo.write("z_module.py", "def z_func():\n    pass\n");
    repo.write("a_module.py", "def a_func():\n    pass\n");
    repo.commit("initial");
    repo.write("z_module.py", "def z_func():\n    return 1\n");
    repo.write("a_module.py", "def a_func():\n    return 1\n");
    repo.commit("change");

    let tree = build_diff_context(repo.root(), "HEAD~1..HEAD", &options(10_000)).expect("tree");
    let paths = paths_of(&tree);
    let mut sorted = paths.clone();
    sorted.sort();
    assert_eq!(paths, sorted);
}

#[test]
fn markdown_section_change_selected_as_section() {
    let repo = TestRepo::new();
    repo.write(
        "docs.md",
        "# Main Section\n\nThis is a large section.\nLine 1\nLine 2\n",
    );
    repo.commit("initial");
    repo.write(
        "docs.md",
        "# Main Section\n\nThis is a MODIFIED section.\nLine 1\nLine 2\n",
    );
    repo.commit("edit docs");

    let tree = build_diff_context(repo.root(), "HEAD~1..HEAD", &options(10_000)).expect("tree");
    let contents = contents_of(&tree);
    assert!(contents.contains("# Main Section"));
    assert!(
        tree.fragments
            .iter()
            .any(|f| serde_json::to_value(f.kind).expect("kind") == serde_json::json!("section")),
        "changed markdown should surface as a section fragment"
    );
}

#[test]
fn dotenv_change_is_selected() {
    let repo = TestRepo::new();
    repo.write(
        "app.py",
        "import os\n\nDEBUG = os.getenv(\"DEBUG\", False)\n\ndef main():\n    if DEBUG:\n        print(\"Debug mode\")\n",
    );
    repo.write(".env", "DEBUG=false\n");
    repo.commit("initial");
    repo.write(".env", "DEBUG=true\n");
    repo.commit("enable debug");

    let tree = build_diff_context(repo.root(), "HEAD~1..HEAD", &options(10_000)).expect("tree");
    assert!(paths_of(&tree).contains(&".env"), "{:?}", paths_of(&tree));
}
