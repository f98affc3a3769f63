pub mod checkpoint;
pub(crate) mod sweep;

pub use checkpoint::{grid_folder, run_folder, RunProperties};

use crate::block::{BlockRange, GridBlock};
use crate::domain::{representative, FundamentalDomain};
use crate::error::{AetherError, Result};
use crate::limits::validate_single_source;
use crate::region::GridRegion;
use crate::slice::SliceBuffer;
use crate::storage::{BlockStorage, DirectoryStorage};
use crate::store::PagedGridStore;
use crate::traits::{EvolvingModel, Quantity, RegionProcessor};
use checkpoint::{AUTOMATON_NAME, GRID_FOLDER_NAME, PROPERTIES_FORMAT_VERSION};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use sweep::{NewSliceWindow, SliceSweeper};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationSettings {
    /// Memory the two resident grid blocks may take up together. Does not bound
    /// the size of the grid itself.
    pub memory_budget_bytes: u64,
    /// Runs keep their working grid under `<working_root>/Aether/<N>D/<seed>/`.
    pub working_root: PathBuf,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            memory_budget_bytes: 512 * 1024 * 1024,
            working_root: PathBuf::from("aether_data"),
        }
    }
}

impl SimulationSettings {
    fn block_budget(&self) -> u64 {
        self.memory_budget_bytes / 2
    }
}

/// Aether automaton seeded with a single source at the origin, simulated over the
/// fundamental domain of an `N`-dimensional lattice.
///
/// The grid is kept in blocks of outer-coordinate slices; at most two blocks are in
/// memory and the rest live in the storage `S`.
pub struct Aether<Q: Quantity, const N: usize, S: BlockStorage<Q> = DirectoryStorage> {
    seed: Q,
    settings: SimulationSettings,
    domain: FundamentalDomain<N>,
    store: PagedGridStore<Q, S>,
    sweeper: SliceSweeper<Q, N>,
    processors: Vec<Box<dyn RegionProcessor<Q>>>,
    step: u64,
    /// Outermost slice that may hold or receive a non-zero value next step.
    max_outer: i64,
    extents: [i64; N],
    /// Last region handed to processors during the current step.
    processed: Option<BlockRange>,
}

impl<Q: Quantity, const N: usize> Aether<Q, N, DirectoryStorage> {
    /// Starts a run whose grid lives under `settings.working_root`. Any grid left by
    /// an earlier run with the same seed is cleared.
    pub fn new(seed: Q, settings: SimulationSettings) -> Result<Self> {
        let folder = grid_folder(&settings.working_root, N, &seed);
        let storage = DirectoryStorage::create(folder)?;
        Self::with_storage(seed, settings, storage)
    }

    /// Resumes from a folder written by [`back_up`](Self::back_up).
    ///
    /// The backup is only read; the first step copies its blocks into the working
    /// folder given by `settings` and continues there.
    pub fn restore(backup_folder: impl AsRef<Path>, settings: SimulationSettings) -> Result<Self> {
        let backup_folder = backup_folder.as_ref();
        let properties = RunProperties::<Q>::read(backup_folder)?;
        properties.check(N)?;
        let working = grid_folder(&settings.working_root, N, &properties.seed);
        let storage =
            DirectoryStorage::open_read_only(backup_folder.join(GRID_FOLDER_NAME), working)?;
        tracing::info!(
            "Restoring step {} from {}",
            properties.step,
            backup_folder.display()
        );
        if properties.memory_budget_bytes != settings.memory_budget_bytes {
            tracing::debug!(
                "Backup was written with a {} byte budget, continuing with {}",
                properties.memory_budget_bytes,
                settings.memory_budget_bytes
            );
        }
        Self::from_storage(properties, settings, storage)
    }
}

impl<Q: Quantity, const N: usize, S: BlockStorage<Q>> Aether<Q, N, S> {
    /// Starts a run on the given storage, which is cleared first.
    pub fn with_storage(seed: Q, settings: SimulationSettings, mut storage: S) -> Result<Self> {
        validate_single_source(N, &seed)?;
        let domain = FundamentalDomain::new()?;
        let free_dims = N - 1;
        let mut origin_block = GridBlock::new(0, free_dims, settings.block_budget())?;
        let mut origin_slice = SliceBuffer::new(0, free_dims);
        let origin = [0i64; N];
        origin_slice.accumulate(&origin[1..], &seed);
        origin_block.set_slice(origin_slice);

        storage.clear()?;
        let store =
            PagedGridStore::with_origin_block(storage, free_dims, settings.block_budget(), origin_block);
        Ok(Self {
            seed,
            settings,
            domain,
            store,
            sweeper: SliceSweeper::new(),
            processors: Vec::new(),
            step: 0,
            // one empty shell around the occupied region
            max_outer: 1,
            extents: [0; N],
            processed: None,
        })
    }

    /// Resumes a run from its properties and a storage holding its blocks.
    pub fn from_storage(
        properties: RunProperties<Q>,
        settings: SimulationSettings,
        storage: S,
    ) -> Result<Self> {
        properties.check(N)?;
        let domain = FundamentalDomain::new()?;
        let store = PagedGridStore::open(storage, N - 1, settings.block_budget())?;
        let mut extents = [0i64; N];
        extents.copy_from_slice(&properties.extents);
        Ok(Self {
            seed: properties.seed,
            settings,
            domain,
            store,
            sweeper: SliceSweeper::new(),
            processors: Vec::new(),
            step: properties.step,
            max_outer: properties.max_outer,
            extents,
            processed: None,
        })
    }

    pub fn seed(&self) -> &Q {
        &self.seed
    }

    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    pub fn max_outer(&self) -> i64 {
        self.max_outer
    }

    /// Largest canonical coordinate of any non-zero cell so far, per axis.
    pub fn extents(&self) -> [i64; N] {
        self.extents
    }

    pub fn storage(&self) -> &S {
        self.store.storage()
    }

    /// Ranges of every block created so far.
    pub fn block_ranges(&self) -> Result<Vec<BlockRange>> {
        self.store.block_ranges()
    }

    pub fn add_processor(&mut self, processor: Box<dyn RegionProcessor<Q>>) {
        self.processors.push(processor);
    }

    pub fn properties(&self) -> RunProperties<Q> {
        RunProperties {
            format_version: PROPERTIES_FORMAT_VERSION,
            automaton: AUTOMATON_NAME.to_string(),
            dimension: N,
            quantity: Q::TYPE_NAME.to_string(),
            seed: self.seed.clone(),
            step: self.step,
            max_outer: self.max_outer,
            extents: self.extents.to_vec(),
            memory_budget_bytes: self.settings.memory_budget_bytes,
        }
    }

    /// Writes a restorable copy of the current state to `<backup_root>/<name>/`,
    /// replacing any earlier backup with that name.
    ///
    /// A run restored from that same backup is moved to its working folder first,
    /// so replacing the backup never removes the blocks the run reads from.
    pub fn back_up(&mut self, backup_root: impl AsRef<Path>, name: &str) -> Result<PathBuf> {
        self.store.make_writable()?;
        let folder = backup_root.as_ref().join(name);
        let grid = self.store.storage().location();
        if grid.starts_with(&folder) {
            return Err(AetherError::Configuration(format!(
                "Backup folder {} holds the run's working grid {}",
                folder.display(),
                grid.display()
            )));
        }
        if folder.exists() {
            tracing::warn!("Replacing existing backup at {}", folder.display());
            fs::remove_dir_all(&folder)?;
        }
        fs::create_dir_all(&folder)?;
        self.store.save_resident()?;
        self.store
            .storage()
            .export_to(&folder.join(GRID_FOLDER_NAME))?;
        self.properties().write(&folder)?;
        tracing::info!("Backed up step {} to {}", self.step, folder.display());
        Ok(folder)
    }

    /// Hands every block of the grid, from the origin outward, to the processors.
    pub fn process_grid(&mut self) -> Result<()> {
        for processor in &mut self.processors {
            processor.before_processing()?;
        }
        self.store.rewind()?;
        loop {
            self.emit_current_region(self.step)?;
            if self.store.current_range()?.max_outer >= self.max_outer {
                break;
            }
            self.store.ensure_next()?;
            self.store.advance()?;
        }
        self.store.rewind()?;
        for processor in &mut self.processors {
            processor.after_processing()?;
        }
        Ok(())
    }

    fn emit_current_region(&mut self, step: u64) -> Result<()> {
        if self.processors.is_empty() {
            return Ok(());
        }
        let Some(block) = self.store.current() else {
            return Ok(());
        };
        let Some(region) = GridRegion::of_block(block, self.max_outer, step) else {
            return Ok(());
        };
        for processor in &mut self.processors {
            processor.process_region(&region)?;
        }
        Ok(())
    }

    /// Hands the current block to the processors unless that already happened this step.
    fn finish_current_block(&mut self) -> Result<()> {
        let range = self.store.current_range()?;
        if self.processed == Some(range) {
            return Ok(());
        }
        self.processed = Some(range);
        self.emit_current_region(self.step + 1)
    }

    /// Stores a next-generation slice. Once the current block's last slice is in, the
    /// block is final for this step and the sweep moves on to the next one.
    fn commit(&mut self, slice: SliceBuffer<Q>, more_follow: bool) -> Result<()> {
        let outer = slice.outer();
        self.store.commit_slice(slice)?;
        if outer == self.store.current_range()?.max_outer {
            self.finish_current_block()?;
            if more_follow {
                self.store.advance()?;
            }
        }
        Ok(())
    }
}

impl<Q: Quantity, const N: usize, S: BlockStorage<Q>> EvolvingModel<Q, N> for Aether<Q, N, S> {
    fn next_step(&mut self) -> Result<bool> {
        self.store.make_writable()?;
        for processor in &mut self.processors {
            processor.before_processing()?;
        }
        self.processed = None;
        self.store.rewind()?;

        let frontier = self.max_outer;
        let free_dims = N - 1;
        let mut window = NewSliceWindow::start(free_dims);
        let mut changed = false;
        for outer in 0..=frontier {
            if outer > 0 {
                window.slide(SliceBuffer::new(outer + 1, free_dims));
            }
            if !self.store.is_resident(outer + 1) {
                self.store.ensure_next()?;
            }
            let old = [
                if outer > 0 {
                    self.store.slice(outer - 1)
                } else {
                    None
                },
                self.store.slice(outer),
                self.store.slice(outer + 1),
            ];
            let outcome = self.sweeper.topple_slice(
                &self.domain,
                old,
                outer,
                frontier,
                &mut window,
                &mut self.extents,
            );
            changed |= outcome.toppled;
            if outcome.reached_frontier && self.max_outer == frontier {
                self.max_outer += 1;
            }
            if let Some(finished) = window.take_left() {
                self.commit(finished, true)?;
            }
        }
        let (center, right) = window.into_remaining();
        self.commit(center, true)?;
        self.commit(right, false)?;
        self.finish_current_block()?;

        self.step += 1;
        for processor in &mut self.processors {
            processor.after_processing()?;
        }
        tracing::info!(
            step = self.step,
            max_outer = self.max_outer,
            changed,
            "Aether step completed"
        );
        Ok(changed)
    }

    fn step(&self) -> u64 {
        self.step
    }

    fn value_at(&mut self, point: &[i64; N]) -> Result<Q> {
        let rep = representative(point);
        if rep[0] > self.max_outer {
            return Ok(Q::zero());
        }
        if !self.store.ensure_resident(rep[0])? {
            return Err(AetherError::MissingBlock {
                min_outer: rep[0],
                location: self.store.storage().location(),
            });
        }
        Ok(self
            .store
            .slice(rep[0])
            .map(|slice| slice.get(&rep[1..]).clone())
            .unwrap_or_else(Q::zero))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::symmetry_count;
    use crate::explicit::{cube_points, ExplicitAether};
    use crate::slice::CanonicalPoints;
    use crate::storage::MemoryStorage;
    use num_bigint::BigInt;
    use num_rational::BigRational;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn settings(memory_budget_bytes: u64) -> SimulationSettings {
        SimulationSettings {
            memory_budget_bytes,
            working_root: PathBuf::from("unused"),
        }
    }

    fn in_memory<Q: Quantity, const N: usize>(
        seed: Q,
        memory_budget_bytes: u64,
    ) -> Aether<Q, N, MemoryStorage> {
        Aether::with_storage(seed, settings(memory_budget_bytes), MemoryStorage::new())
            .expect("valid run")
    }

    fn assert_same_values<Q: Quantity, const N: usize>(
        a: &mut impl EvolvingModel<Q, N>,
        b: &mut impl EvolvingModel<Q, N>,
        radius: i64,
    ) {
        for point in cube_points::<N>(radius) {
            assert_eq!(
                a.value_at(&point).expect("value"),
                b.value_at(&point).expect("value"),
                "values differ at {point:?} after step {}",
                a.step()
            );
        }
    }

    fn assert_matches_explicit<Q: Quantity, const N: usize>(seed: Q, steps: u64) {
        let mut folded = in_memory::<Q, N>(seed.clone(), 1 << 22);
        let mut explicit = ExplicitAether::<Q, N>::new(seed).expect("valid seed");
        for _ in 0..steps {
            let folded_changed = folded.next_step().expect("folded step");
            let explicit_changed = explicit.next_step().expect("explicit step");
            assert_eq!(folded_changed, explicit_changed);
            assert!(explicit.extent() < folded.max_outer());
            let radius = folded.max_outer() + 1;
            assert_same_values(&mut folded, &mut explicit, radius);
        }
    }

    fn folded_mass<const N: usize, S: BlockStorage<i64>>(model: &mut Aether<i64, N, S>) -> i64 {
        let mut mass = 0i64;
        for outer in 0..=model.max_outer() {
            for point in CanonicalPoints::<N>::new(outer) {
                let value = model.value_at(&point).expect("value");
                mass += value * symmetry_count(&point) as i64;
            }
        }
        mass
    }

    #[test]
    fn first_step_matches_hand_computation() {
        let mut model = in_memory::<i64, 3>(100, 1 << 20);
        assert_eq!(model.value_at(&[0, 0, 0]).expect("value"), 100);
        assert_eq!(model.value_at(&[1, 0, 0]).expect("value"), 0);

        assert!(model.next_step().expect("step"));
        assert_eq!(model.step(), 1);
        assert_eq!(model.value_at(&[0, 0, 0]).expect("value"), 100 - 6 * 14);
        for point in [[1, 0, 0], [-1, 0, 0], [0, 1, 0], [0, -1, 0], [0, 0, 1], [0, 0, -1]] {
            assert_eq!(model.value_at(&point).expect("value"), 14);
        }
        let total: i64 = cube_points::<3>(3)
            .map(|p| model.value_at(&p).expect("value"))
            .sum();
        assert_eq!(total, 100);
        assert_eq!(model.max_outer(), 2);
        assert_eq!(model.extents(), [1, 0, 0]);
    }

    #[test]
    fn folded_mass_is_conserved() {
        let mut model = in_memory::<i64, 3>(1000, 1 << 20);
        for _ in 0..20 {
            model.next_step().expect("step");
            assert_eq!(folded_mass(&mut model), 1000);
        }
        let mut negative = in_memory::<i64, 4>(-300, 1 << 20);
        for _ in 0..8 {
            negative.next_step().expect("step");
            assert_eq!(folded_mass(&mut negative), -300);
        }
    }

    #[test]
    fn folded_grid_matches_explicit_lattice_2d() {
        assert_matches_explicit::<i64, 2>(500, 15);
        assert_matches_explicit::<i16, 2>(-90, 12);
    }

    #[test]
    fn folded_grid_matches_explicit_lattice_3d() {
        assert_matches_explicit::<i64, 3>(300, 12);
        assert_matches_explicit::<i64, 3>(-200, 12);
        assert_matches_explicit::<BigInt, 3>(BigInt::from(777), 8);
    }

    #[test]
    fn folded_grid_matches_explicit_lattice_4d() {
        assert_matches_explicit::<i32, 4>(100, 6);
        assert_matches_explicit::<i32, 4>(-60, 5);
    }

    #[test]
    fn folded_grid_matches_explicit_lattice_with_rationals() {
        let seed = BigRational::from_integer(BigInt::from(7));
        assert_matches_explicit::<BigRational, 2>(seed, 5);
    }

    #[test]
    fn one_dimensional_runs_work() {
        assert_matches_explicit::<i64, 1>(1000, 20);
    }

    #[test]
    fn paging_does_not_change_results() {
        let mut paged = in_memory::<i64, 2>(3000, 2000);
        let mut resident = in_memory::<i64, 2>(3000, 1 << 20);
        for step in 1..=40 {
            assert_eq!(
                paged.next_step().expect("paged step"),
                resident.next_step().expect("resident step")
            );
            if step % 10 == 0 {
                let radius = resident.max_outer() + 1;
                assert_same_values(&mut paged, &mut resident, radius);
            }
        }
        assert_eq!(paged.max_outer(), resident.max_outer());
        assert!(paged.block_ranges().expect("ranges").len() >= 3);
        assert_eq!(resident.block_ranges().expect("ranges").len(), 1);
    }

    #[test]
    fn growth_is_at_most_one_shell_per_step() {
        let mut model = in_memory::<i64, 2>(5000, 1 << 20);
        let mut previous = model.max_outer();
        for _ in 0..30 {
            model.next_step().expect("step");
            assert!(model.max_outer() - previous <= 1);
            assert!(model.max_outer() >= previous);
            previous = model.max_outer();
        }
        assert!(previous > 5);
    }

    #[test]
    fn small_seed_is_quiescent() {
        let mut model = in_memory::<i64, 2>(4, 1 << 20);
        assert!(!model.next_step().expect("step"));
        assert_eq!(model.value_at(&[0, 0]).expect("value"), 4);
        assert_eq!(model.max_outer(), 1);
    }

    #[test]
    fn invalid_configurations_are_rejected() {
        let overflow = Aether::<i32, 4, MemoryStorage>::with_storage(
            -613_566_758,
            settings(1 << 20),
            MemoryStorage::new(),
        );
        assert!(matches!(overflow, Err(AetherError::Configuration(_))));

        let cramped =
            Aether::<i64, 3, MemoryStorage>::with_storage(100, settings(100), MemoryStorage::new());
        assert!(matches!(cramped, Err(AetherError::Capacity { .. })));
    }

    #[test]
    fn lost_blocks_are_reported() {
        let mut model = in_memory::<i64, 2>(3000, 2000);
        for _ in 0..30 {
            model.next_step().expect("step");
        }
        assert!(!model.store.is_resident(0));
        BlockStorage::<i64>::clear(model.store.storage_mut()).expect("clear");
        assert!(matches!(
            model.next_step(),
            Err(AetherError::MissingBlock { min_outer: 0, .. })
        ));
    }

    #[derive(Default)]
    struct Recorded {
        before: usize,
        after: usize,
        regions: Vec<(u64, BlockRange)>,
    }

    struct Recorder(Rc<RefCell<Recorded>>);

    impl RegionProcessor<i64> for Recorder {
        fn before_processing(&mut self) -> anyhow::Result<()> {
            self.0.borrow_mut().before += 1;
            Ok(())
        }

        fn process_region(&mut self, region: &GridRegion<'_, i64>) -> anyhow::Result<()> {
            self.0.borrow_mut().regions.push((region.step(), region.range()));
            Ok(())
        }

        fn after_processing(&mut self) -> anyhow::Result<()> {
            self.0.borrow_mut().after += 1;
            Ok(())
        }
    }

    fn assert_covers(regions: &[(u64, BlockRange)], step: u64, max_outer: i64) {
        let ranges: Vec<BlockRange> = regions
            .iter()
            .filter(|(s, _)| *s == step)
            .map(|(_, r)| *r)
            .collect();
        assert!(!ranges.is_empty());
        assert_eq!(ranges[0].min_outer, 0);
        for pair in ranges.windows(2) {
            assert_eq!(pair[1].min_outer, pair[0].max_outer + 1);
        }
        assert_eq!(ranges.last().map(|r| r.max_outer), Some(max_outer));
    }

    #[test]
    fn regions_are_emitted_once_per_step_in_order() {
        let recorded = Rc::new(RefCell::new(Recorded::default()));
        let mut model = in_memory::<i64, 2>(3000, 2000);
        model.add_processor(Box::new(Recorder(recorded.clone())));
        for step in 1..=25 {
            model.next_step().expect("step");
            assert_covers(&recorded.borrow().regions, step, model.max_outer());
        }
        assert_eq!(recorded.borrow().before, 25);
        assert_eq!(recorded.borrow().after, 25);

        recorded.borrow_mut().regions.clear();
        model.process_grid().expect("process grid");
        assert_covers(&recorded.borrow().regions, 25, model.max_outer());
        assert!(model.store.is_resident(0));
    }

    struct Failing;

    impl RegionProcessor<i64> for Failing {
        fn process_region(&mut self, _region: &GridRegion<'_, i64>) -> anyhow::Result<()> {
            anyhow::bail!("renderer out of paper")
        }
    }

    #[test]
    fn processor_errors_surface() {
        let mut model = in_memory::<i64, 2>(100, 1 << 20);
        model.add_processor(Box::new(Failing));
        assert!(matches!(model.next_step(), Err(AetherError::Processor(_))));
    }

    #[test]
    fn run_folder_is_created_under_working_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = SimulationSettings {
            memory_budget_bytes: 1 << 20,
            working_root: dir.path().to_path_buf(),
        };
        let mut model = Aether::<i64, 3>::new(100, settings).expect("run");
        model.next_step().expect("step");
        assert!(dir
            .path()
            .join("Aether/3D/100/asymmetric_section/grid")
            .is_dir());
    }

    #[test]
    fn checkpoint_round_trip_continues_identically() {
        let dir = tempfile::tempdir().expect("tempdir");
        let run_settings = |root: &str| SimulationSettings {
            memory_budget_bytes: 2000,
            working_root: dir.path().join(root),
        };
        let mut original = Aether::<i64, 2>::new(3000, run_settings("work")).expect("run");
        for _ in 0..12 {
            original.next_step().expect("step");
        }
        let backup = original
            .back_up(dir.path().join("backups"), "step12")
            .expect("backup");
        let backed_up_blocks = fs::read_dir(backup.join(GRID_FOLDER_NAME))
            .expect("grid folder")
            .count();
        assert!(backed_up_blocks >= 2);

        let mut restored = Aether::<i64, 2>::restore(&backup, run_settings("resumed")).expect("restore");
        assert_eq!(restored.step(), 12);
        assert_eq!(restored.max_outer(), original.max_outer());
        let radius = original.max_outer() + 1;
        assert_same_values(&mut restored, &mut original, radius);

        for _ in 0..10 {
            assert_eq!(
                original.next_step().expect("step"),
                restored.next_step().expect("step")
            );
        }
        assert_eq!(restored.step(), 22);
        let radius = original.max_outer() + 1;
        assert_same_values(&mut restored, &mut original, radius);

        // the backup itself is never written to
        let props = RunProperties::<i64>::read(&backup).expect("properties");
        assert_eq!(props.step, 12);
        let mut again = Aether::<i64, 2>::restore(&backup, run_settings("again")).expect("restore");
        assert_eq!(again.step(), 12);
        again.next_step().expect("step");
    }

    #[test]
    fn memory_run_can_be_restored_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut model = in_memory::<BigInt, 3>(BigInt::from(-5000), 1 << 16);
        for _ in 0..6 {
            model.next_step().expect("step");
        }
        let backup = model.back_up(dir.path(), "bigint").expect("backup");
        let settings = SimulationSettings {
            memory_budget_bytes: 1 << 16,
            working_root: dir.path().join("work"),
        };
        let mut restored = Aether::<BigInt, 3>::restore(&backup, settings).expect("restore");
        let radius = model.max_outer() + 1;
        assert_same_values(&mut restored, &mut model, radius);
    }

    #[test]
    fn restoring_with_wrong_shape_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut model = in_memory::<i64, 2>(50, 1 << 20);
        model.next_step().expect("step");
        let backup = model.back_up(dir.path(), "b").expect("backup");
        let settings = SimulationSettings {
            memory_budget_bytes: 1 << 20,
            working_root: dir.path().join("work"),
        };
        assert!(Aether::<i64, 3>::restore(&backup, settings.clone()).is_err());
        assert!(Aether::<i32, 2>::restore(&backup, settings.clone()).is_err());
        assert!(Aether::<i64, 2>::restore(dir.path().join("absent"), settings).is_err());
    }

    #[test]
    fn backing_up_over_the_restored_backup_keeps_the_run() {
        let dir = tempfile::tempdir().expect("tempdir");
        let backups = dir.path().join("backups");
        let run_settings = |root: &str| SimulationSettings {
            memory_budget_bytes: 2000,
            working_root: dir.path().join(root),
        };
        let mut original = Aether::<i64, 2>::new(3000, run_settings("work")).expect("run");
        for _ in 0..12 {
            original.next_step().expect("step");
        }
        let latest = original.back_up(&backups, "latest").expect("backup");

        let mut resumed = Aether::<i64, 2>::restore(&latest, run_settings("resumed")).expect("restore");
        assert_eq!(resumed.back_up(&backups, "latest").expect("backup again"), latest);
        let block_files = fs::read_dir(latest.join(GRID_FOLDER_NAME))
            .expect("grid folder")
            .count();
        assert!(block_files >= 2);

        for _ in 0..5 {
            assert_eq!(
                original.next_step().expect("step"),
                resumed.next_step().expect("step")
            );
        }
        let radius = original.max_outer() + 1;
        assert_same_values(&mut resumed, &mut original, radius);

        let mut again = Aether::<i64, 2>::restore(&latest, run_settings("again")).expect("restore");
        assert_eq!(again.step(), 12);
        again.next_step().expect("step");
    }

    #[test]
    fn backups_cannot_replace_the_working_grid() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = SimulationSettings {
            memory_budget_bytes: 1 << 20,
            working_root: dir.path().join("runs"),
        };
        let mut model = Aether::<i64, 2>::new(100, settings).expect("run");
        model.next_step().expect("step");
        assert!(matches!(
            model.back_up(dir.path(), "runs"),
            Err(AetherError::Configuration(_))
        ));
        model.next_step().expect("step after refused backup");
        assert_eq!(model.step(), 2);
    }

    #[test]
    fn points_at_the_coordinate_limits_read_as_zero() {
        let mut model = in_memory::<i64, 2>(500, 1 << 20);
        model.next_step().expect("step");
        for point in [[i64::MIN, 0], [i64::MAX, i64::MIN], [0, i64::MIN], [i64::MIN, i64::MIN]] {
            assert_eq!(model.value_at(&point).expect("value"), 0);
        }
    }
}
