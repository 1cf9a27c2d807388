//! E2E del pipeline taxi con importer: tres corridas contra el mismo store.
//!
//! Corrida 1: todo se ejecuta. Corrida 2: el resolver encuentra el modelo
//! bendecido, Evaluator y Pusher se re-ejecutan (+3 artifacts). Corrida 3:
//! nada nuevo.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use pipe_adapters::{TaxiPipelineParams, COMPONENT_COUNT};
use pipe_core::{ExecutionState, InMemoryMetadataStore, MetadataStore, Scheduling};
use pipe_persistence::{with_store, ConnectionConfig};
use pipeflow::{run_pipeline, run_pipeline_with_store, summarize_store, RunSummary, StoreSummary};

fn taxi_data() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("data/taxi")
}

fn params(work: &Path) -> TaxiPipelineParams {
    TaxiPipelineParams::new("chicago_taxi_beam", &taxi_data(), work)
}

fn metadata_path(work: &Path, name: &str) -> PathBuf {
    work.join("tfx").join("metadata").join(name).join("metadata.db")
}

/// Cada directorio bajo el componente contiene exactamente una ejecución.
fn assert_executed_once(pipeline_root: &Path, component: &str) {
    let component_path = pipeline_root.join(component);
    assert!(component_path.is_dir(), "missing {}", component_path.display());
    for output in fs::read_dir(&component_path).unwrap() {
        let output = output.unwrap().path();
        let executions = fs::read_dir(&output).unwrap().count();
        assert_eq!(executions, 1, "{}", output.display());
    }
}

fn assert_pipeline_execution(pipeline_root: &Path, summary: &RunSummary) {
    for outcome in &summary.result.outcomes {
        assert_executed_once(pipeline_root, &outcome.component);
    }
}

/// Subdirectorios `<root>/<componente>/.system/executions/*` por componente.
fn execution_dirs(pipeline_root: &Path) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for component in fs::read_dir(pipeline_root).unwrap() {
        let component = component.unwrap().path();
        let executions = component.join(".system").join("executions");
        if executions.is_dir() {
            let name = component.file_name().unwrap().to_string_lossy().into_owned();
            counts.insert(name, fs::read_dir(&executions).unwrap().count());
        }
    }
    counts
}

/// Corre tres veces. Tras la primera cada componente tiene una sola
/// ejecución; tras cada corrida los directorios de ejecución coinciden con lo
/// que registra el store y crecen en uno por componente.
fn run_three_times(pipeline_root: &Path, mut run: impl FnMut() -> (RunSummary, StoreSummary)) -> [RunSummary; 3] {
    let mut previous: BTreeMap<String, usize> = BTreeMap::new();
    let mut runs = Vec::new();
    for round in 0..3 {
        let (summary, store) = run();
        if round == 0 {
            assert_pipeline_execution(pipeline_root, &summary);
        }
        let dirs = execution_dirs(pipeline_root);
        assert_eq!(dirs, store.executions_by_component);
        assert_eq!(dirs.len(), COMPONENT_COUNT);
        for (component, n) in &dirs {
            assert_eq!(*n, previous.get(component).copied().unwrap_or(0) + 1, "{component}");
        }
        previous = dirs;
        runs.push(summary);
    }
    runs.try_into().unwrap()
}

fn states(summary: &RunSummary) -> Vec<(&str, ExecutionState)> {
    summary.result.outcomes.iter().map(|o| (o.component.as_str(), o.state)).collect()
}

fn assert_three_runs(runs: [RunSummary; 3]) {
    let [first, second, third] = runs;
    assert_eq!(first.result.outcomes.len(), COMPONENT_COUNT);
    assert_eq!(first.executions, 10);
    assert_eq!(first.artifacts, 12);
    assert!(first.artifacts >= first.executions);

    assert_eq!(second.executions, 20);
    assert_eq!(second.artifacts, first.artifacts + 3);
    for (component, state) in states(&second) {
        let expected = match component {
            "LatestBlessedModelResolver" | "Evaluator" | "Pusher" => ExecutionState::Complete,
            _ => ExecutionState::Cached,
        };
        assert_eq!(state, expected, "{component}");
    }

    assert_eq!(third.executions, 30);
    assert_eq!(third.artifacts, second.artifacts);
    assert_eq!(third.result.count_in_state(ExecutionState::Cached), COMPONENT_COUNT - 1);
}

#[test]
fn taxi_pipeline_with_importer_on_sqlite() {
    let work = tempfile::tempdir().unwrap();
    let params = params(work.path());
    let metadata = ConnectionConfig::sqlite(metadata_path(work.path(), &params.pipeline_name));

    let runs = run_three_times(&params.pipeline_root, || {
        // cada corrida reabre el store desde el archivo
        let run = run_pipeline(&params, &metadata, Scheduling::Sequential).unwrap();
        let store = with_store(&metadata, |store| summarize_store(store)).unwrap().unwrap();
        (run, store)
    });
    assert!(params.serving_model_dir.is_dir());
    assert_three_runs(runs);

    let summary = with_store(&metadata, |store| summarize_store(store)).unwrap().unwrap();
    assert_eq!(summary.executions_by_state.get("failed"), None);
    assert_eq!(summary.executions_by_component["Evaluator"], 3);
    assert_eq!(summary.artifacts_by_type["ModelBlessing"], 2);
}

#[test]
fn in_memory_store_gives_the_same_accounting() {
    let work = tempfile::tempdir().unwrap();
    let params = params(work.path());
    let store = InMemoryMetadataStore::new();
    let runs = run_three_times(&params.pipeline_root, || {
        let run = run_pipeline_with_store(&params, &store, Scheduling::Sequential).unwrap();
        (run, summarize_store(&store).unwrap())
    });
    assert_three_runs(runs);
}

#[test]
fn parallel_scheduling_gives_the_same_accounting() {
    let work = tempfile::tempdir().unwrap();
    let params = params(work.path());
    let metadata = ConnectionConfig::sqlite(metadata_path(work.path(), &params.pipeline_name));
    let parallel = Scheduling::Parallel { threads: 4 };
    let runs = run_three_times(&params.pipeline_root, || {
        let run = run_pipeline(&params, &metadata, parallel).unwrap();
        (run, with_store(&metadata, |store| summarize_store(store)).unwrap().unwrap())
    });
    assert_three_runs(runs);
}

#[test]
fn disabled_cache_reexecutes_everything() {
    let work = tempfile::tempdir().unwrap();
    let mut params = params(work.path());
    let store = InMemoryMetadataStore::new();
    let first = run_pipeline_with_store(&params, &store, Scheduling::Sequential).unwrap();

    params.enable_cache = false;
    let forced = run_pipeline_with_store(&params, &store, Scheduling::Sequential).unwrap();
    assert_eq!(forced.result.count_in_state(ExecutionState::Complete), COMPONENT_COUNT);
    assert_eq!(forced.executions, 20);
    // imports externos idempotentes; Importer y resolver reutilizan ids
    assert_eq!(forced.artifacts, first.artifacts + 10);

    // la corrida forzada no cambia lo que la cache sirve después
    params.enable_cache = true;
    let again = run_pipeline_with_store(&params, &store, Scheduling::Sequential).unwrap();
    assert_eq!(again.result.outcome("Trainer").unwrap().state, ExecutionState::Cached);
    assert!(store.get_executions().unwrap().iter().all(|e| e.state != ExecutionState::Running));
}
