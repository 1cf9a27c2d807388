//! pipe-core: motor de ejecución de pipelines DAG con cache por contenido.
pub mod cache;
pub mod component;
pub mod constants;
pub mod engine;
pub mod errors;
pub mod hashing;
pub mod model;
pub mod pipeline;
pub mod store;

pub use cache::{CacheKeyResolver, InputIdentity, KeyLocks};
pub use component::{ChannelSource, Component, ComponentNode, ComponentOutputs, ComponentRunResult, ComponentSpec};
pub use engine::{ComponentExecutor, ComponentOutcome, DagRunner, OutputLayout, PipelineRunResult, Scheduling};
pub use errors::{DagError, DefinitionError, EngineError, StoreError};
pub use model::{Artifact, ArtifactDraft, ArtifactId, ArtifactSpec, CacheKey, CachingPolicy, Execution, ExecutionContext,
                ExecutionId, ExecutionState, MetadataReader, OutputArtifact, PipelineScope};
pub use pipeline::{PipelineBuilder, PipelineDefinition, RunContext};
pub use store::{CompletionOutcome, InMemoryMetadataStore, MetadataStore};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    typed_artifact!(Numbers { values: Vec<i64> } type_name: "Numbers");
    typed_artifact!(Total { sum: i64 } type_name: "Total");

    #[derive(Debug)]
    struct Source;
    impl Component for Source {
        fn run(&self, ctx: &ExecutionContext<'_>) -> ComponentRunResult {
            let n = ctx.config_value("n").and_then(|v| v.as_i64()).unwrap_or(3);
            ComponentOutputs::new().typed("numbers",
                                          Numbers { values: (1..=n).collect(),
                                                    schema_version: 1 })
                                   .map_err(|e| e.to_string())
                                   .into()
        }
    }

    #[derive(Debug)]
    struct Sum;
    impl Component for Sum {
        fn run(&self, ctx: &ExecutionContext<'_>) -> ComponentRunResult {
            let run = || -> Result<ComponentOutputs, String> {
                let nums = Numbers::from_artifact(ctx.single_input("numbers")?).map_err(|e| e.to_string())?;
                ComponentOutputs::new().typed("total",
                                              Total { sum: nums.values.iter().sum(),
                                                      schema_version: 1 })
                                       .map_err(|e| e.to_string())
            };
            run().into()
        }
    }

    fn pipeline(n: i64) -> PipelineDefinition {
        PipelineBuilder::new("sum").component(ComponentSpec::new("source").output("numbers", "Numbers")
                                                                         .config(json!({ "n": n })),
                                              Source)
                                   .component(ComponentSpec::new("sum").input("numbers", "Numbers", "source", "numbers")
                                                                      .output("total", "Total"),
                                              Sum)
                                   .build()
                                   .unwrap()
    }

    #[test]
    fn second_run_is_fully_cached() {
        let dir = tempfile::tempdir().unwrap();
        let store = InMemoryMetadataStore::new();
        let runner = DagRunner::new(&store);

        let first = runner.run(&pipeline(3), dir.path()).unwrap();
        assert_eq!(first.count_in_state(ExecutionState::Complete), 2);
        let total = Total::from_artifact(&first.outcome("sum").unwrap().output("total")[0]).unwrap();
        assert_eq!(total.sum, 6);

        let second = runner.run(&pipeline(3), dir.path()).unwrap();
        assert_eq!(second.count_in_state(ExecutionState::Cached), 2);
        assert_eq!(store.get_artifacts().unwrap().len(), 2);
        assert_eq!(store.get_executions().unwrap().len(), 4);
    }

    #[test]
    fn config_change_reexecutes_downstream() {
        let dir = tempfile::tempdir().unwrap();
        let store = InMemoryMetadataStore::new();
        let runner = DagRunner::new(&store);
        runner.run(&pipeline(3), dir.path()).unwrap();
        let again = runner.run(&pipeline(4), dir.path()).unwrap();
        assert_eq!(again.count_in_state(ExecutionState::Complete), 2);
        let total = Total::from_artifact(&again.outcome("sum").unwrap().output("total")[0]).unwrap();
        assert_eq!(total.sum, 10);
    }
}
