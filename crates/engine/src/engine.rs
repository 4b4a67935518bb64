//! Engine context: one generation's rule table and kernel repositories,
//! the procamp table and the combined-kernel cache.
//!
//! A request runs `start_search` → `search` → `build`, or all three behind
//! the cache with [`Engine::lookup_or_build`].

use kdll_cache::{fnv1a, fnv1a_extend, CacheEntry, CacheStats, CombinedKernel, KernelCache};
use kdll_common::{
    chain_key, EngineConfig, FilterEntry, KdllResult, LinkError, Procamp, ProcampTable, SearchError,
};
use kdll_csc::CoefficientMapping;
use kdll_linker::{ComponentRepository, KernelLinker};
use kdll_rules::{
    legacy, CscPatchData, KernelCatalog, Rule, RuleTable, SearchFlags, SearchState, Searcher,
};
use tracing::{debug, info};

use crate::generation::Generation;

/// Everything a build reads. Kept apart from the cache so a cache miss can
/// build while the cache is borrowed.
struct Library {
    config: EngineConfig,
    catalog: KernelCatalog,
    builtin: Vec<Rule>,
    table: RuleTable,
    main: ComponentRepository,
    custom: Option<ComponentRepository>,
    procamps: ProcampTable,
    mapping: Box<dyn CoefficientMapping>,
    provider: CscPatchData,
}

impl Library {
    fn searcher(&self) -> Searcher<'_> {
        Searcher {
            table: &self.table,
            limits: &self.config.limits,
            packing: &self.config.output_packing,
            procamps: &self.procamps,
            mapping: self.mapping.as_ref(),
            provider: &self.provider,
        }
    }

    fn build(&self, state: &SearchState) -> KdllResult<CombinedKernel> {
        if !state.is_complete() {
            return Err(SearchError::NotStarted.into());
        }
        let linked = KernelLinker::new(&self.main, self.custom.as_ref(), &self.config.limits)
            .link(&state.kernels, &state.patches)?;
        debug!(
            kernels = state.kernels.len(),
            placed = linked.kernels.len(),
            bytes = linked.binary.len(),
            matrices = state.csc.matrices.len(),
            "Combined kernel built"
        );
        Ok(CombinedKernel {
            linked,
            csc: state.csc.clone(),
        })
    }

    fn search_and_build(
        &self,
        chain: &[FilterEntry],
        flags: SearchFlags,
    ) -> KdllResult<CombinedKernel> {
        let searcher = self.searcher();
        let mut state = searcher.start_search(chain, flags)?;
        searcher.search(&mut state)?;
        self.build(&state)
    }
}

pub struct Engine {
    generation: Box<dyn Generation>,
    library: Library,
    cache: KernelCache,
}

impl Engine {
    /// Load `kernels` (the generation's component repository blob) and
    /// compile the generation's rule table.
    pub fn new(
        generation: Box<dyn Generation>,
        kernels: &[u8],
        mut config: EngineConfig,
    ) -> KdllResult<Self> {
        config.validate()?;
        generation.configure(&mut config);

        let catalog = generation.catalog();
        let main = ComponentRepository::from_bytes(kernels)?;
        if main.len() < catalog.len() {
            return Err(LinkError::MalformedBlob(format!(
                "repository has {} kernels, {} catalog names {}",
                main.len(),
                generation.name(),
                catalog.len()
            ))
            .into());
        }
        let builtin = generation.rules(&catalog)?;
        let table = RuleTable::compile(&builtin, None)?;
        let cache = KernelCache::new(&config.cache);

        info!(
            generation = generation.name(),
            kernels = main.len(),
            rule_sets = table.len(),
            cache_entries = config.cache.max_entries,
            "KDLL engine initialized"
        );

        Ok(Self {
            library: Library {
                procamps: ProcampTable::new(config.procamp_slots),
                mapping: generation.coefficient_mapping(),
                provider: CscPatchData,
                config,
                catalog,
                builtin,
                table,
                main,
                custom: None,
            },
            generation,
            cache,
        })
    }

    /// Install a custom kernel repository with its override rules. Rule sets
    /// tagged `Custom` select kernels from `kernels`. Cached kernels are
    /// dropped.
    pub fn load_custom(&mut self, kernels: &[u8], rules: &[Rule]) -> KdllResult<()> {
        let custom = ComponentRepository::from_bytes(kernels)?;
        let table = RuleTable::compile(&self.library.builtin, Some(rules))?;
        self.library.custom = Some(custom);
        self.library.table = table;
        self.cache = KernelCache::new(&self.library.config.cache);
        info!(
            generation = self.generation.name(),
            rule_sets = self.library.table.len(),
            "Custom kernels loaded"
        );
        Ok(())
    }

    /// [`load_custom`](Self::load_custom) with the override rules given as
    /// a serialized legacy opcode stream.
    pub fn load_custom_legacy(&mut self, kernels: &[u8], rules: &[u8]) -> KdllResult<()> {
        let rules = legacy::decode(&legacy::parse(rules)?)?;
        debug!(rules = rules.len(), "Legacy custom rules decoded");
        self.load_custom(kernels, &rules)
    }

    pub fn start_search(
        &self,
        chain: &[FilterEntry],
        flags: SearchFlags,
    ) -> KdllResult<SearchState> {
        Ok(self.library.searcher().start_search(chain, flags)?)
    }

    /// Plan CSC and run the rule machine to `End`.
    pub fn search(&self, state: &mut SearchState) -> KdllResult<()> {
        Ok(self.library.searcher().search(state)?)
    }

    /// Link a completed search into a combined kernel. Does not touch the
    /// cache.
    pub fn build(&self, state: &SearchState) -> KdllResult<CombinedKernel> {
        self.library.build(state)
    }

    /// The cached kernel for `chain`, searching and building on a miss.
    /// `hash` must be the caller's hash of the chain; the search flags are
    /// folded into it and into the key, and key bytes decide the hit.
    /// Nothing is cached when the search or build fails.
    pub fn lookup_or_build(
        &mut self,
        chain: &[FilterEntry],
        hash: u32,
        flags: SearchFlags,
    ) -> KdllResult<&CacheEntry> {
        let hash = fnv1a_extend(hash, &flags.key_bytes());
        let library = &self.library;
        self.cache.lookup_or_build_keyed(request_key(chain, flags), hash, || {
            library.search_and_build(chain, flags)
        })
    }

    /// [`lookup_or_build`](Self::lookup_or_build) hashing the chain and
    /// flags with FNV-1a.
    pub fn lookup_or_build_hashed(
        &mut self,
        chain: &[FilterEntry],
        flags: SearchFlags,
    ) -> KdllResult<&CacheEntry> {
        let key = request_key(chain, flags);
        let hash = fnv1a(&key);
        let library = &self.library;
        self.cache
            .lookup_or_build_keyed(key, hash, || library.search_and_build(chain, flags))
    }

    /// Store procamp parameters; returns the new version. Cached kernels
    /// keep their coefficients until [`refresh_coefficients`](Self::refresh_coefficients).
    pub fn set_procamp(&mut self, id: u8, params: Procamp) -> KdllResult<u32> {
        Ok(self.library.procamps.set(id, params)?)
    }

    /// Recompute stale procamp matrices of every cached kernel. Returns the
    /// number of entries whose coefficients changed.
    pub fn refresh_coefficients(&mut self) -> usize {
        let library = &self.library;
        let mut changed = 0;
        for entry in self.cache.entries_mut() {
            if entry
                .kernel
                .csc
                .refresh(&library.procamps, library.mapping.as_ref())
            {
                changed += 1;
            }
        }
        debug!(changed, entries = self.cache.len(), "Cached coefficients refreshed");
        changed
    }

    pub fn generation(&self) -> &dyn Generation {
        self.generation.as_ref()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.library.config
    }

    pub fn catalog(&self) -> &KernelCatalog {
        &self.library.catalog
    }

    pub fn table(&self) -> &RuleTable {
        &self.library.table
    }

    pub fn cache(&self) -> &KernelCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut KernelCache {
        &mut self.cache
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

/// Chain key followed by the flag bytes. Kernels searched under different
/// flags never share a cache entry.
fn request_key(chain: &[FilterEntry], flags: SearchFlags) -> Vec<u8> {
    let mut key = chain_key(chain);
    key.extend_from_slice(&flags.key_bytes());
    key
}
