//! The query engine: lookup, validity checking, recomputation, cycle
//! detection and dependency recording, all confined to one [`Context`].

use std::cell::{Cell, RefCell};
use std::mem;
use std::rc::Rc;

use diagnostic::Diagnostic;
use rustc_data_structures::fx::{FxHashMap, FxHashSet};

use crate::entry::{CacheEntry, Dependency, EntryState, QueryValue};
use crate::error::{CycleError, QueryError};
use crate::key::{Query, QueryKey};
use crate::revision::Revision;

/// Counters for a session's query activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    /// Times a query body actually ran.
    pub executions: u64,
    /// Times a cached value was served without running the body.
    pub hits: u64,
    /// Times a stale entry was proven still valid by walking its
    /// dependencies.
    pub validations: u64,
}

/// A dependency-recording frame for one in-progress query.
struct Frame {
    key: QueryKey,
    dependencies: Vec<Dependency>,
    diagnostics: Vec<Diagnostic>,
}

impl Frame {
    fn new(key: QueryKey) -> Frame {
        Frame {
            key,
            dependencies: Vec::new(),
            diagnostics: Vec::new(),
        }
    }
}

/// Session-wide owner of the revision clock, every cache entry, and the
/// in-progress stack.
///
/// All mutation happens inside `invoke`; consumers only ever hold shared
/// `Rc`s to immutable values. The context is single-threaded by design
/// (`Cell`/`RefCell` interior mutability, no `Sync`), matching the
/// cooperative-by-call-stack scheduling model: the only suspension-like
/// situation is re-entry into an in-progress query, and that is a hard
/// cycle error rather than a wait.
pub struct Context {
    revision: Cell<Revision>,
    entries: RefCell<FxHashMap<QueryKey, CacheEntry>>,
    stack: RefCell<Vec<Frame>>,
    /// Raw values for input queries, written by `set_input`.
    inputs: RefCell<FxHashMap<QueryKey, Rc<dyn QueryValue>>>,
    /// Diagnostics reported outside any query frame.
    detached: RefCell<Vec<Diagnostic>>,
    eviction_window: Cell<u64>,
    stats: Cell<Stats>,
}

impl Context {
    pub fn new() -> Context {
        Context {
            revision: Cell::new(Revision::START),
            entries: RefCell::new(FxHashMap::default()),
            stack: RefCell::new(Vec::new()),
            inputs: RefCell::new(FxHashMap::default()),
            detached: RefCell::new(Vec::new()),
            eviction_window: Cell::new(2),
            stats: Cell::new(Stats::default()),
        }
    }

    pub fn current_revision(&self) -> Revision {
        self.revision.get()
    }

    /// Advance the logical clock. Called exactly when an external input
    /// changes; touches no entries, staleness is discovered lazily.
    pub fn bump_revision(&self) -> Revision {
        assert!(
            self.stack.borrow().is_empty(),
            "revision bumped while queries are executing"
        );
        let next = self.revision.get().next();
        self.revision.set(next);
        next
    }

    /// The root-input change signal: store the raw value for an input
    /// query and bump the revision. The input query's `compute` reads the
    /// stored value back through [`Context::input_value`] on its next
    /// (per-revision) execution.
    pub fn set_input<Q: Query>(&self, args: Q::Args, value: Q::Value) {
        assert!(
            Q::INPUT,
            "set_input on `{}`, which is not an input query",
            Q::KIND.0
        );
        let key = QueryKey::of::<Q>(args);
        self.inputs.borrow_mut().insert(key, Rc::new(value));
        self.bump_revision();
    }

    /// The raw value last stored for an input query, if any.
    pub fn input_value<Q: Query>(&self, args: &Q::Args) -> Option<Rc<Q::Value>> {
        let key = QueryKey::of::<Q>(args.clone());
        let raw = self.inputs.borrow().get(&key)?.clone();
        raw.into_any().downcast::<Q::Value>().ok()
    }

    /// Append a diagnostic to the currently executing query. The entry
    /// stores what its computation reported, replacing the previous
    /// computation's set on recomputation. Reports issued outside any
    /// query accumulate on the context until drained.
    pub fn report(&self, diagnostic: Diagnostic) {
        match self.stack.borrow_mut().last_mut() {
            Some(frame) => frame.diagnostics.push(diagnostic),
            None => self.detached.borrow_mut().push(diagnostic),
        }
    }

    pub fn take_detached_diagnostics(&self) -> Vec<Diagnostic> {
        mem::take(&mut *self.detached.borrow_mut())
    }

    /// Diagnostics stored for a query and, transitively, for everything it
    /// depends on. Cached sub-computations keep contributing their
    /// diagnostics without re-running.
    pub fn diagnostics<Q: Query>(&self, args: Q::Args) -> Vec<Diagnostic> {
        let key = QueryKey::of::<Q>(args);
        let mut seen = FxHashSet::default();
        let mut out = Vec::new();
        self.collect_diagnostics(&key, &mut seen, &mut out);
        out
    }

    fn collect_diagnostics(
        &self,
        key: &QueryKey,
        seen: &mut FxHashSet<QueryKey>,
        out: &mut Vec<Diagnostic>,
    ) {
        if !seen.insert(key.clone()) {
            return;
        }
        let (diagnostics, dependencies) = {
            let entries = self.entries.borrow();
            let Some(entry) = entries.get(key) else { return };
            (entry.diagnostics.clone(), entry.dependencies.clone())
        };
        out.extend(diagnostics);
        for dependency in &dependencies {
            self.collect_diagnostics(&dependency.key, seen, out);
        }
    }

    pub fn stats(&self) -> Stats {
        self.stats.get()
    }

    pub fn entry_count(&self) -> usize {
        self.entries.borrow().len()
    }

    /// How many revisions an entry may go unvalidated before
    /// `collect_garbage` drops it.
    pub fn set_eviction_window(&self, revisions: u64) {
        self.eviction_window.set(revisions);
    }

    /// Drop entries that have not been computed or validated within the
    /// eviction window. Interning entries are exempt (their identity must
    /// hold for the life of the context), as is anything in progress.
    /// Validation refreshes `checked_at` of every dependency of a fresh
    /// entry, so nothing reachable from a fresh entry is ever dropped.
    pub fn collect_garbage(&self) -> usize {
        assert!(
            self.stack.borrow().is_empty(),
            "garbage collected while queries are executing"
        );
        let current = self.revision.get().as_u64();
        let window = self.eviction_window.get();
        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|_, entry| {
            entry.intern
                || entry.state == EntryState::InProgress
                || current.saturating_sub(entry.checked_at.as_u64()) <= window
        });
        before - entries.len()
    }

    /// Execute a query exactly once per (key, dependency values); serve
    /// the cached result otherwise. Returns a shared reference into the
    /// context-owned entry, stable for as long as recomputations keep
    /// producing structurally equal values.
    pub fn invoke<Q: Query>(&self, args: Q::Args) -> Result<Rc<Q::Value>, QueryError> {
        let key = QueryKey::of::<Q>(args);
        let value = self.invoke_key::<Q>(&key)?;
        match value.into_any().downcast::<Q::Value>() {
            Ok(value) => Ok(value),
            Err(_) => panic!("query `{}` stored a value of the wrong type", key.name()),
        }
    }

    fn invoke_key<Q: Query>(&self, key: &QueryKey) -> Result<Rc<dyn QueryValue>, QueryError> {
        if self.in_progress(key) {
            return Err(QueryError::Cycle(self.cycle_error(key)));
        }
        if let Some(value) = self.try_reuse(key)? {
            return Ok(value);
        }
        self.execute::<Q>(key)
    }

    /// The revision the value for `key` last changed at.
    pub(crate) fn changed_at(&self, key: &QueryKey) -> Revision {
        self.entries
            .borrow()
            .get(key)
            .map(|entry| entry.changed_at)
            .unwrap_or(Revision::ZERO)
    }

    fn in_progress(&self, key: &QueryKey) -> bool {
        self.stack.borrow().iter().any(|frame| frame.key == *key)
    }

    fn cycle_error(&self, key: &QueryKey) -> CycleError {
        CycleError {
            key: key.clone(),
            chain: self.stack.borrow().iter().map(|f| f.key.clone()).collect(),
        }
    }

    fn push_frame(&self, key: QueryKey) {
        self.stack.borrow_mut().push(Frame::new(key));
    }

    fn pop_frame(&self) -> Frame {
        self.stack
            .borrow_mut()
            .pop()
            .expect("query frame stack underflow")
    }

    /// Record, for the query currently on top of the stack, that it read
    /// `key` (whose value last changed at `changed_at`).
    fn record_dependency(&self, key: &QueryKey, changed_at: Revision) {
        if let Some(frame) = self.stack.borrow_mut().last_mut() {
            frame.dependencies.push(Dependency {
                key: key.clone(),
                changed_at,
            });
        }
    }

    fn bump_stats(&self, update: impl FnOnce(&mut Stats)) {
        let mut stats = self.stats.get();
        update(&mut stats);
        self.stats.set(stats);
    }

    fn mark_checked(&self, key: &QueryKey, revision: Revision) {
        if let Some(entry) = self.entries.borrow_mut().get_mut(key) {
            entry.checked_at = revision;
        }
    }

    /// The validity check: decide whether a `Done` entry can be trusted at
    /// the current revision without blindly recomputing it.
    ///
    /// Returns the cached value if so (recording the dependency in the
    /// caller's frame), `None` if the entry is missing or must be
    /// recomputed.
    fn try_reuse(&self, key: &QueryKey) -> Result<Option<Rc<dyn QueryValue>>, QueryError> {
        let current = self.revision.get();

        let (value, changed_at, checked_at, input, dependencies) = {
            let entries = self.entries.borrow();
            let Some(entry) = entries.get(key) else {
                return Ok(None);
            };
            if entry.state != EntryState::Done {
                return Ok(None);
            }
            let Some(value) = entry.value.clone() else {
                return Ok(None);
            };
            (
                value,
                entry.changed_at,
                entry.checked_at,
                entry.input,
                entry.dependencies.clone(),
            )
        };

        // Already computed or validated this revision.
        if checked_at == current {
            self.bump_stats(|s| s.hits += 1);
            self.record_dependency(key, changed_at);
            return Ok(Some(value));
        }

        // Input queries re-execute once per revision; their recompute is
        // what notices changed external state.
        if input {
            return Ok(None);
        }

        // A derived query with no dependencies is a pure function of its
        // arguments alone: it can never be invalidated.
        if dependencies.is_empty() {
            self.mark_checked(key, current);
            self.bump_stats(|s| s.hits += 1);
            self.record_dependency(key, changed_at);
            return Ok(Some(value));
        }

        // Walk the recorded dependencies in order, forcing each up to date
        // through the engine. The walk runs under an in-progress frame for
        // this key, so it is cycle-guarded exactly like execution, and any
        // dependencies it records are discarded with the frame.
        self.push_frame(key.clone());
        let verdict = self.dependencies_unchanged(&dependencies);
        self.pop_frame();

        match verdict? {
            true => {
                self.mark_checked(key, current);
                self.bump_stats(|s| {
                    s.validations += 1;
                    s.hits += 1;
                });
                self.record_dependency(key, changed_at);
                Ok(Some(value))
            }
            false => Ok(None),
        }
    }

    fn dependencies_unchanged(&self, dependencies: &[Dependency]) -> Result<bool, QueryError> {
        for dependency in dependencies {
            // Value-based early cutoff: a dependency that recomputed to an
            // equal value kept its changed_at, so it still matches the
            // revision we captured.
            let now = dependency.key.force(self)?;
            if now != dependency.changed_at {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Run the query body, record its dependencies and diagnostics, and
    /// store the result. The previous value (if any) stays in the entry
    /// until the new one is produced, both for error recovery and for the
    /// early-cutoff comparison.
    fn execute<Q: Query>(&self, key: &QueryKey) -> Result<Rc<dyn QueryValue>, QueryError> {
        let current = self.revision.get();

        {
            let mut entries = self.entries.borrow_mut();
            let entry = entries.entry(key.clone()).or_insert_with(CacheEntry::new);
            entry.state = EntryState::InProgress;
        }

        self.push_frame(key.clone());
        let computed = Q::compute(self, key.args_as::<Q::Args>());
        let frame = self.pop_frame();
        self.bump_stats(|s| s.executions += 1);

        match computed {
            Err(error) => {
                // Cycle errors are not cached: restore the previous Done
                // value if there was one, drop the entry otherwise.
                let mut entries = self.entries.borrow_mut();
                match entries.get_mut(key) {
                    Some(entry) if entry.value.is_some() => entry.state = EntryState::Done,
                    _ => {
                        entries.remove(key);
                    }
                }
                Err(error)
            }
            Ok(value) => {
                let new_value: Rc<dyn QueryValue> = Rc::new(value);
                let changed_at = {
                    let mut entries = self.entries.borrow_mut();
                    let entry = entries
                        .get_mut(key)
                        .expect("in-progress entry disappeared during execution");
                    let unchanged = entry
                        .value
                        .as_ref()
                        .is_some_and(|old| old.eq_dyn(new_value.as_ref()));
                    if !unchanged {
                        entry.value = Some(new_value);
                        entry.changed_at = current;
                    }
                    entry.checked_at = current;
                    entry.state = EntryState::Done;
                    entry.dependencies = frame.dependencies;
                    entry.diagnostics = frame.diagnostics;
                    entry.input = Q::INPUT;
                    entry.intern = Q::INTERN;
                    entry.changed_at
                };
                let value = self
                    .entries
                    .borrow()
                    .get(key)
                    .and_then(|entry| entry.value.clone())
                    .expect("done entry has a value");
                self.record_dependency(key, changed_at);
                Ok(value)
            }
        }
    }
}

impl Default for Context {
    fn default() -> Context {
        Context::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::QueryKind;
    use std::cell::Cell as StdCell;

    thread_local! {
        static SOURCE_RUNS: StdCell<u32> = StdCell::new(0);
        static LINES_RUNS: StdCell<u32> = StdCell::new(0);
        static DOUBLED_RUNS: StdCell<u32> = StdCell::new(0);
        static LOOPY_RUNS: StdCell<u32> = StdCell::new(0);
    }

    fn reset_counters() {
        SOURCE_RUNS.with(|c| c.set(0));
        LINES_RUNS.with(|c| c.set(0));
        DOUBLED_RUNS.with(|c| c.set(0));
        LOOPY_RUNS.with(|c| c.set(0));
    }

    /// Root input: the text of a named pseudo-file.
    struct SourceText;

    impl Query for SourceText {
        type Args = &'static str;
        type Value = String;
        const KIND: QueryKind = QueryKind("test_source_text");
        const INPUT: bool = true;

        fn compute(ctx: &Context, args: &&'static str) -> Result<String, QueryError> {
            SOURCE_RUNS.with(|c| c.set(c.get() + 1));
            Ok(ctx
                .input_value::<SourceText>(args)
                .map(|text| (*text).clone())
                .unwrap_or_default())
        }
    }

    /// Derived: number of lines in the text.
    struct LineCount;

    impl Query for LineCount {
        type Args = &'static str;
        type Value = usize;
        const KIND: QueryKind = QueryKind("test_line_count");

        fn compute(ctx: &Context, args: &&'static str) -> Result<usize, QueryError> {
            LINES_RUNS.with(|c| c.set(c.get() + 1));
            let text = ctx.invoke::<SourceText>(args)?;
            Ok(text.lines().count())
        }
    }

    /// Derived from derived: twice the line count.
    struct DoubledLineCount;

    impl Query for DoubledLineCount {
        type Args = &'static str;
        type Value = usize;
        const KIND: QueryKind = QueryKind("test_doubled_line_count");

        fn compute(ctx: &Context, args: &&'static str) -> Result<usize, QueryError> {
            DOUBLED_RUNS.with(|c| c.set(c.get() + 1));
            let lines = ctx.invoke::<LineCount>(args)?;
            Ok(*lines * 2)
        }
    }

    /// Derived, no dependencies: pure function of its argument.
    struct Parity;

    impl Query for Parity {
        type Args = u64;
        type Value = bool;
        const KIND: QueryKind = QueryKind("test_parity");

        fn compute(_ctx: &Context, args: &u64) -> Result<bool, QueryError> {
            Ok(args % 2 == 0)
        }
    }

    #[test]
    fn memoizes_within_a_revision() {
        reset_counters();
        let ctx = Context::new();
        ctx.set_input::<SourceText>("a.vl", "one\ntwo\n".to_string());

        let first = ctx.invoke::<LineCount>("a.vl").unwrap();
        let second = ctx.invoke::<LineCount>("a.vl").unwrap();

        assert_eq!(*first, 2);
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(LINES_RUNS.with(|c| c.get()), 1);
        assert_eq!(SOURCE_RUNS.with(|c| c.get()), 1);
    }

    #[test]
    fn distinct_arguments_are_distinct_queries() {
        reset_counters();
        let ctx = Context::new();
        ctx.set_input::<SourceText>("a.vl", "one\n".to_string());
        ctx.set_input::<SourceText>("b.vl", "one\ntwo\n".to_string());

        assert_eq!(*ctx.invoke::<LineCount>("a.vl").unwrap(), 1);
        assert_eq!(*ctx.invoke::<LineCount>("b.vl").unwrap(), 2);
        assert_eq!(LINES_RUNS.with(|c| c.get()), 2);
    }

    #[test]
    fn input_change_invalidates_dependents() {
        reset_counters();
        let ctx = Context::new();
        ctx.set_input::<SourceText>("a.vl", "one\n".to_string());
        assert_eq!(*ctx.invoke::<LineCount>("a.vl").unwrap(), 1);

        ctx.set_input::<SourceText>("a.vl", "one\ntwo\n".to_string());
        assert_eq!(*ctx.invoke::<LineCount>("a.vl").unwrap(), 2);
        assert_eq!(LINES_RUNS.with(|c| c.get()), 2);
        assert_eq!(SOURCE_RUNS.with(|c| c.get()), 2);
    }

    #[test]
    fn early_cutoff_stops_propagation() {
        reset_counters();
        let ctx = Context::new();
        ctx.set_input::<SourceText>("a.vl", "one\ntwo\n".to_string());

        let first = ctx.invoke::<DoubledLineCount>("a.vl").unwrap();
        assert_eq!(*first, 4);
        assert_eq!(DOUBLED_RUNS.with(|c| c.get()), 1);

        // Same line count, different text: the input and the line count
        // recompute, the doubled count must not.
        ctx.set_input::<SourceText>("a.vl", "eins\nzwei\n".to_string());
        let second = ctx.invoke::<DoubledLineCount>("a.vl").unwrap();

        assert_eq!(SOURCE_RUNS.with(|c| c.get()), 2);
        assert_eq!(LINES_RUNS.with(|c| c.get()), 2);
        assert_eq!(DOUBLED_RUNS.with(|c| c.get()), 1);
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn unrelated_input_change_revalidates_without_recompute() {
        reset_counters();
        let ctx = Context::new();
        ctx.set_input::<SourceText>("a.vl", "one\n".to_string());
        ctx.invoke::<DoubledLineCount>("a.vl").unwrap();
        assert_eq!(DOUBLED_RUNS.with(|c| c.get()), 1);

        // A different file changes; "a.vl"'s chain revalidates only.
        ctx.set_input::<SourceText>("b.vl", "x\n".to_string());
        ctx.invoke::<DoubledLineCount>("a.vl").unwrap();
        assert_eq!(DOUBLED_RUNS.with(|c| c.get()), 1);
        assert_eq!(LINES_RUNS.with(|c| c.get()), 1);
        // a.vl's input re-executed once this revision, to equal text.
        assert_eq!(SOURCE_RUNS.with(|c| c.get()), 2);
    }

    #[test]
    fn derived_query_without_dependencies_is_never_invalidated() {
        reset_counters();
        let ctx = Context::new();
        let first = ctx.invoke::<Parity>(32).unwrap();

        ctx.set_input::<SourceText>("a.vl", "unrelated".to_string());
        let second = ctx.invoke::<Parity>(32).unwrap();

        assert!(Rc::ptr_eq(&first, &second));
        let stats = ctx.stats();
        assert_eq!(stats.hits, 1);
    }

    /// Directly self-recursive query.
    struct Loopy;

    impl Query for Loopy {
        type Args = u32;
        type Value = u32;
        const KIND: QueryKind = QueryKind("test_loopy");

        fn compute(ctx: &Context, args: &u32) -> Result<u32, QueryError> {
            LOOPY_RUNS.with(|c| c.set(c.get() + 1));
            let inner = ctx.invoke::<Loopy>(*args)?;
            Ok(*inner)
        }
    }

    /// Two-step cycle: PingPong(n) -> PongPing(n) -> PingPong(n).
    struct PingPong;
    struct PongPing;

    impl Query for PingPong {
        type Args = u32;
        type Value = u32;
        const KIND: QueryKind = QueryKind("test_ping_pong");

        fn compute(ctx: &Context, args: &u32) -> Result<u32, QueryError> {
            Ok(*ctx.invoke::<PongPing>(*args)?)
        }
    }

    impl Query for PongPing {
        type Args = u32;
        type Value = u32;
        const KIND: QueryKind = QueryKind("test_pong_ping");

        fn compute(ctx: &Context, args: &u32) -> Result<u32, QueryError> {
            Ok(*ctx.invoke::<PingPong>(*args)?)
        }
    }

    #[test]
    fn direct_cycle_is_an_error() {
        reset_counters();
        let ctx = Context::new();
        let err = ctx.invoke::<Loopy>(1).unwrap_err();
        let QueryError::Cycle(cycle) = err;
        assert_eq!(cycle.key.name(), "test_loopy");
        assert_eq!(cycle.chain.len(), 1);
    }

    #[test]
    fn indirect_cycle_is_an_error() {
        let ctx = Context::new();
        let err = ctx.invoke::<PingPong>(7).unwrap_err();
        let QueryError::Cycle(cycle) = &err;
        assert_eq!(cycle.key.name(), "test_ping_pong");
        assert_eq!(cycle.chain.len(), 2);
        let rendered = format!("{}", err);
        assert!(rendered.contains("test_ping_pong"));
        assert!(rendered.contains("test_pong_ping"));
    }

    #[test]
    fn cycle_errors_are_not_cached() {
        reset_counters();
        let ctx = Context::new();
        assert!(ctx.invoke::<Loopy>(1).is_err());
        assert!(ctx.invoke::<Loopy>(1).is_err());
        // The body ran again: the failure was not memoized as Done.
        assert_eq!(LOOPY_RUNS.with(|c| c.get()), 2);
        assert_eq!(ctx.entry_count(), 0);
    }

    /// Reports a diagnostic naming the revision it ran at.
    struct Noisy;

    impl Query for Noisy {
        type Args = &'static str;
        type Value = usize;
        const KIND: QueryKind = QueryKind("test_noisy");

        fn compute(ctx: &Context, args: &&'static str) -> Result<usize, QueryError> {
            let text = ctx.invoke::<SourceText>(args)?;
            ctx.report(Diagnostic::warning(
                *args,
                format!("saw {} bytes", text.len()),
            ));
            Ok(text.len())
        }
    }

    #[test]
    fn diagnostics_are_replaced_on_recomputation() {
        let ctx = Context::new();
        ctx.set_input::<SourceText>("a.vl", "abc".to_string());
        ctx.invoke::<Noisy>("a.vl").unwrap();
        let diags = ctx.diagnostics::<Noisy>("a.vl");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "saw 3 bytes");

        ctx.set_input::<SourceText>("a.vl", "abcdef".to_string());
        ctx.invoke::<Noisy>("a.vl").unwrap();
        let diags = ctx.diagnostics::<Noisy>("a.vl");
        assert_eq!(diags.len(), 1, "stale diagnostics must be discarded");
        assert_eq!(diags[0].message, "saw 6 bytes");
    }

    /// Depends on Noisy without reporting anything itself.
    struct Quiet;

    impl Query for Quiet {
        type Args = &'static str;
        type Value = usize;
        const KIND: QueryKind = QueryKind("test_quiet");

        fn compute(ctx: &Context, args: &&'static str) -> Result<usize, QueryError> {
            Ok(*ctx.invoke::<Noisy>(args)? + 1)
        }
    }

    #[test]
    fn diagnostics_are_collected_transitively() {
        let ctx = Context::new();
        ctx.set_input::<SourceText>("a.vl", "abc".to_string());
        ctx.invoke::<Quiet>("a.vl").unwrap();
        let diags = ctx.diagnostics::<Quiet>("a.vl");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "saw 3 bytes");
    }

    #[test]
    fn detached_reports_accumulate_on_the_context() {
        let ctx = Context::new();
        ctx.report(Diagnostic::error("driver", "no such file"));
        let drained = ctx.take_detached_diagnostics();
        assert_eq!(drained.len(), 1);
        assert!(ctx.take_detached_diagnostics().is_empty());
    }

    #[test]
    fn garbage_collection_keeps_fresh_and_validated_entries() {
        reset_counters();
        let ctx = Context::new();
        ctx.set_eviction_window(1);
        ctx.set_input::<SourceText>("a.vl", "one\n".to_string());
        ctx.set_input::<SourceText>("b.vl", "two\n".to_string());
        ctx.invoke::<DoubledLineCount>("a.vl").unwrap();
        ctx.invoke::<LineCount>("b.vl").unwrap();

        // Several revisions in which only a.vl's chain is exercised.
        for text in ["1\n", "2\n", "3\n"] {
            ctx.set_input::<SourceText>("a.vl", text.to_string());
            ctx.invoke::<DoubledLineCount>("a.vl").unwrap();
        }

        let evicted = ctx.collect_garbage();
        assert!(evicted >= 2, "b.vl chain should age out, evicted {evicted}");

        // The a.vl chain was validated this revision and must survive.
        let runs_before = DOUBLED_RUNS.with(|c| c.get());
        ctx.invoke::<DoubledLineCount>("a.vl").unwrap();
        assert_eq!(DOUBLED_RUNS.with(|c| c.get()), runs_before);
    }

    #[test]
    #[should_panic(expected = "not an input query")]
    fn set_input_on_derived_query_is_a_contract_violation() {
        let ctx = Context::new();
        ctx.set_input::<LineCount>("a.vl", 3);
    }

    #[test]
    fn stats_count_hits_and_executions() {
        reset_counters();
        let ctx = Context::new();
        ctx.set_input::<SourceText>("a.vl", "one\n".to_string());
        ctx.invoke::<LineCount>("a.vl").unwrap();
        ctx.invoke::<LineCount>("a.vl").unwrap();
        let stats = ctx.stats();
        assert_eq!(stats.executions, 2); // SourceText + LineCount
        assert_eq!(stats.hits, 1);
    }
}
