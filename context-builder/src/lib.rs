//! Driver for the diff-context pipeline.
//!
//! Single public entry point [`build_diff_context`]:
//!
//! 1. **Resolve** the diff range: changed files, parsed hunks, raw diff text.
//! 2. **Fragment** every changed file and every enumerated neighbor into
//!    spans (functions, classes, config sections, heading blocks, chunks).
//! 3. **Identify core**: the enclosing fragment of every added line (and the
//!    anchor line of pure deletions) is mandatory context.
//! 4. **Score**: build the relevance graph and run personalized PageRank
//!    seeded on the core fragments; scores are max-normalized to `[0, 1]`.
//! 5. **Select**: lazy-greedy submodular maximization of diff-concept
//!    coverage under the token budget.
//! 6. **Emit** the ordered `DiffContextTree`.
//!
//! Everything is synchronous and deterministic; the same repository state
//! and range produce an identical tree.

pub mod concepts;
pub mod config;
pub mod errors;
pub mod neighbors;
pub mod tree;

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use fragment_prep::{Fragment, FragmentId, enclosing_fragment, fragment_file};
use git_diff_engine::{Hunk, get_changed_files, get_diff_text, parse_unified_diff, read_file};
use relevance_graph::{
    SelectionReason, build_graph, lazy_greedy_select, personalized_pagerank,
};
use tracing::{debug, info, warn};

pub use concepts::concepts_from_diff_text;
pub use config::BuildConfig;
pub use errors::{CtxResult, Error};
pub use neighbors::enumerate_neighbors;
pub use tree::{DiffContextTree, FragmentNode};

/// Default token budget, shared with the CLI `--budget` flag.
pub const DEFAULT_BUDGET_TOKENS: u64 = 50_000;

/// Default PageRank restart parameter.
pub const DEFAULT_ALPHA: f64 = 0.55;

/// Tunable knobs of one diff-context build.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Hard ceiling on the summed token counts of the selection.
    pub budget_tokens: u64,
    /// PageRank neighbor-following mass, `[0, 1)`.
    pub alpha: f64,
    /// Early-stop threshold; `0` disables early stopping.
    pub tau: f64,
    /// Ignore the budget and emit every changed-file fragment.
    pub full: bool,
    /// Emit fragments without their content payload.
    pub no_content: bool,
    /// Neighbor enumeration filters and limits.
    pub config: BuildConfig,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            budget_tokens: DEFAULT_BUDGET_TOKENS,
            alpha: DEFAULT_ALPHA,
            tau: 0.0,
            full: false,
            no_content: false,
            config: BuildConfig::default(),
        }
    }
}

/// Build the diff-context tree for `diff_range` of the repository at
/// `root_dir`.
///
/// # Errors
/// - [`Error::Precondition`] for invalid `alpha`, `tau`, or `budget_tokens`;
/// - [`Error::Git`] when the range cannot be resolved or the repository is
///   unreadable.
///
/// An empty diff is not an error: it produces an empty tree.
#[tracing::instrument(level = "info", skip_all, fields(range = diff_range))]
pub fn build_diff_context(
    root_dir: &Path,
    diff_range: &str,
    options: &BuildOptions,
) -> CtxResult<DiffContextTree> {
    validate_options(options)?;
    let root = dunce::canonicalize(root_dir).unwrap_or_else(|_| root_dir.to_path_buf());

    let changed: BTreeSet<PathBuf> = get_changed_files(&root, diff_range)?.into_iter().collect();
    let diff_text = get_diff_text(&root, diff_range)?;
    let hunks = parse_unified_diff(&diff_text);
    if changed.is_empty() && hunks.is_empty() {
        info!("empty diff, returning empty tree");
        return Ok(DiffContextTree::empty());
    }

    let by_path = fragment_universe(&root, &changed, options);
    let core_ids = identify_core(&by_path, &hunks);
    info!(
        files = by_path.len(),
        core = core_ids.len(),
        hunks = hunks.len(),
        "universe assembled"
    );

    if options.full {
        return Ok(full_tree(&by_path, &changed, options));
    }

    let universe: Vec<Fragment> = by_path.values().flatten().cloned().collect();
    let concepts = concepts_from_diff_text(&diff_text);
    let graph = build_graph(&universe);
    let scores = personalized_pagerank(&graph, &core_ids, options.alpha)?;
    let rel = normalize_scores(scores);

    let result = lazy_greedy_select(
        &universe,
        &core_ids,
        &rel,
        &concepts,
        options.budget_tokens,
        options.tau,
    );
    info!(
        selected = result.selected.len(),
        used_tokens = result.used_tokens,
        reason = %result.reason,
        "selection complete"
    );
    Ok(DiffContextTree::from_selection(
        result.selected,
        result.used_tokens,
        result.reason,
        options.no_content,
    ))
}

fn validate_options(options: &BuildOptions) -> CtxResult<()> {
    if options.budget_tokens < 1 {
        return Err(Error::Precondition(format!(
            "budget_tokens must be >= 1, got {}",
            options.budget_tokens
        )));
    }
    if !options.alpha.is_finite() || !(0.0..1.0).contains(&options.alpha) {
        return Err(Error::Precondition(format!(
            "alpha must be in [0, 1), got {}",
            options.alpha
        )));
    }
    if !options.tau.is_finite() || options.tau < 0.0 {
        return Err(Error::Precondition(format!(
            "tau must be >= 0, got {}",
            options.tau
        )));
    }
    options.config.validate()
}

/// Fragment every candidate file; binary and unreadable files are skipped.
fn fragment_universe(
    root: &Path,
    changed: &BTreeSet<PathBuf>,
    options: &BuildOptions,
) -> BTreeMap<PathBuf, Vec<Fragment>> {
    let mut by_path = BTreeMap::new();
    for rel in enumerate_neighbors(root, changed, &options.config) {
        let abs = root.join(&rel);
        let file = match read_file(&abs) {
            Ok(Some(file)) => file,
            Ok(None) => {
                debug!(path = %rel.display(), "skipping binary file");
                continue;
            }
            Err(err) => {
                warn!(path = %rel.display(), error = %err, "skipping unreadable file");
                continue;
            }
        };
        if !file.encoding_ok {
            debug!(path = %rel.display(), "decoded with replacement characters");
        }
        let fragments = fragment_file(&rel, &file.content);
        if !fragments.is_empty() {
            by_path.insert(rel, fragments);
        }
    }
    by_path
}

/// Core fragments: the enclosing fragment of every added line; a hunk that
/// only deletes anchors at its new-side start so the surrounding fragment
/// still counts as changed.
fn identify_core(
    by_path: &BTreeMap<PathBuf, Vec<Fragment>>,
    hunks: &[Hunk],
) -> BTreeSet<FragmentId> {
    let mut core = BTreeSet::new();
    for hunk in hunks {
        let Some(fragments) = by_path.get(&hunk.path) else {
            continue;
        };
        if hunk.is_pure_deletion() {
            if let Some(frag) = enclosing_fragment(fragments, hunk.new_start.max(1)) {
                core.insert(frag.id.clone());
            }
            continue;
        }
        for line in hunk.added_lines() {
            if let Some(frag) = enclosing_fragment(fragments, line) {
                core.insert(frag.id.clone());
            }
        }
    }
    core
}

/// `full` mode: every top-level fragment of every changed file, budget
/// ignored.
fn full_tree(
    by_path: &BTreeMap<PathBuf, Vec<Fragment>>,
    changed: &BTreeSet<PathBuf>,
    options: &BuildOptions,
) -> DiffContextTree {
    let mut selected = Vec::new();
    for (path, fragments) in by_path {
        if !changed.contains(path) {
            continue;
        }
        // Fragments are sorted parents-first; skipping anything already
        // covered keeps exactly the top-level spans.
        let mut cover_end = 0u32;
        for frag in fragments {
            if frag.id.start_line > cover_end {
                selected.push(frag.clone());
                cover_end = frag.id.end_line;
            }
        }
    }
    let used = selected.iter().map(|f| f.token_count as u64).sum();
    DiffContextTree::from_selection(
        selected,
        used,
        SelectionReason::NoCandidates,
        options.no_content,
    )
}

/// Normalize PageRank scores to `[0, 1]` by the maximum score.
fn normalize_scores(scores: BTreeMap<FragmentId, f64>) -> BTreeMap<FragmentId, f64> {
    let max = scores.values().copied().fold(0.0_f64, f64::max);
    if max <= 0.0 {
        return scores;
    }
    scores.into_iter().map(|(id, s)| (id, s / max)).collect()
}
